//! Arena-backed storage for logged rows and streamed messages.
//!
//! Both stores address the same caller-provided byte arena but keep their own
//! cursors. Starting one mode invalidates the other's data; only one of them
//! is considered active at a time.

pub mod row_store;
pub mod stream_log;

pub use row_store::*;
pub use stream_log::*;

use serde::{Deserialize, Serialize};

/// Address range in the target's memory map that no row may overlap.
///
/// Some microcontrollers have a boundary between RAM banks that cannot be
/// accessed across in one transfer. Rows that would span it are skipped on
/// both the write and the read path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardRegion {
    /// First forbidden address
    pub start: usize,
    /// One past the last forbidden address
    pub end: usize,
}

impl HazardRegion {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// True if `[addr, addr + len)` intersects the region
    pub const fn overlaps(&self, addr: usize, len: usize) -> bool {
        addr < self.end && self.start < addr + len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_edges() {
        let hazard = HazardRegion::new(100, 104);
        assert!(!hazard.overlaps(94, 6));
        assert!(hazard.overlaps(95, 6));
        assert!(hazard.overlaps(103, 6));
        assert!(!hazard.overlaps(104, 6));
    }
}
