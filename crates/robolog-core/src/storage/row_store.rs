//! Fixed-layout row storage in the shared arena

use log::debug;

use super::HazardRegion;

/// Notice sent once when sampling stops because no row is left
pub const ROWS_FULL_NOTICE: &str = "# log buffer full\r\n";

/// Lifecycle of the row store. Leaves `Full` only through a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    /// Reset, no rows yet
    Empty,
    /// At least one row recorded and space remains
    Sampling,
    /// A row was refused; sticky until reset
    Full,
}

/// Bookkeeping for rows stored back to back in the arena.
///
/// Row `i` (0-based) starts at byte `i * row_size`. Rows whose address range
/// overlaps the hazard region are skipped: the row counter advances past
/// them without anything being written, and readers skip the same indices.
#[derive(Debug, Clone)]
pub struct RowStore {
    /// Address of arena byte 0 in the target's memory map
    base_address: usize,
    hazard: Option<HazardRegion>,
    row_size: usize,
    max_rows: usize,
    /// Rows begun so far, skipped rows included
    row_count: usize,
    state: RowState,
}

impl RowStore {
    pub const fn new(base_address: usize, hazard: Option<HazardRegion>) -> Self {
        Self {
            base_address,
            hazard,
            row_size: 0,
            max_rows: 0,
            row_count: 0,
            state: RowState::Empty,
        }
    }

    /// Starts a new generation of rows of `row_size` bytes in an arena of
    /// `capacity` bytes. An empty arena or an oversized row gives zero capacity.
    pub fn reset(&mut self, row_size: usize, capacity: usize) {
        self.row_size = row_size;
        self.max_rows = if row_size == 0 { 0 } else { capacity / row_size };
        self.clear();
    }

    /// Forgets all rows but keeps the row size
    pub fn clear(&mut self) {
        self.row_count = 0;
        self.state = RowState::Empty;
    }

    pub fn row_size(&self) -> usize {
        self.row_size
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn state(&self) -> RowState {
        self.state
    }

    pub fn is_full(&self) -> bool {
        self.state == RowState::Full
    }

    /// True if the row at `index` (0-based) overlaps the hazard region
    pub fn is_skipped(&self, index: usize) -> bool {
        match self.hazard {
            Some(hazard) => hazard.overlaps(
                self.base_address + index * self.row_size,
                self.row_size,
            ),
            None => false,
        }
    }

    /// Claims the next row. Returns false, and enters [`RowState::Full`],
    /// when no row is left.
    pub fn begin_row(&mut self) -> bool {
        if self.row_count >= self.max_rows {
            self.state = RowState::Full;
            return false;
        }
        if self.is_skipped(self.row_count) {
            debug!("Skipping row {} across hazard region", self.row_count);
            self.row_count += 1;
            if self.row_count >= self.max_rows {
                self.state = RowState::Full;
                return false;
            }
        }
        self.row_count += 1;
        self.state = RowState::Sampling;
        true
    }

    /// Copies `bytes` into row `row_number` (1-based, the value of
    /// [`row_count`](Self::row_count) right after [`begin_row`](Self::begin_row))
    /// at `field_offset`.
    ///
    /// The caller guarantees the offset comes from the current layout.
    pub fn write_field(
        &self,
        arena: &mut [u8],
        row_number: usize,
        field_offset: usize,
        bytes: &[u8],
    ) {
        debug_assert!(row_number >= 1 && row_number <= self.row_count);
        debug_assert!(field_offset + bytes.len() <= self.row_size);
        let start = (row_number - 1) * self.row_size + field_offset;
        arena[start..start + bytes.len()].copy_from_slice(bytes);
    }

    /// Bytes of stored row `index` (0-based). `None` past the last row and
    /// for skipped rows.
    pub fn row<'a>(&self, arena: &'a [u8], index: usize) -> Option<&'a [u8]> {
        if index >= self.row_count || self.is_skipped(index) {
            return None;
        }
        let start = index * self.row_size;
        arena.get(start..start + self.row_size)
    }
}
