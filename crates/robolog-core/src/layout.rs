//! Enabled-set bitmap and row layout compilation
//!
//! A [`RowLayout`] is derived from an [`EnabledSet`] by walking the registry
//! in fixed enumeration order and assigning each enabled field the current
//! cumulative byte offset. The layout is never edited in place; a changed
//! enabled set always produces a fresh layout (and a reset row store).

use crate::registry::{FIELD_COUNT, FieldId};

/// Bitmap of fields participating in row logging, bit `i` = [`FieldId`] index `i`.
///
/// `Time` is always enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnabledSet(u32);

impl EnabledSet {
    const TIME_BIT: u32 = 1 << FieldId::Time as u32;
    const VALID_BITS: u32 = (1 << FIELD_COUNT) - 1;

    /// Builds a set from a persisted bitmap. Unknown bits are dropped and
    /// `Time` is forced on.
    pub const fn from_bits(bits: u32) -> Self {
        Self((bits & Self::VALID_BITS) | Self::TIME_BIT)
    }

    pub const fn only_time() -> Self {
        Self(Self::TIME_BIT)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, field: FieldId) -> bool {
        self.0 & (1 << field as u32) != 0
    }

    /// Enables or disables a field. Disabling `Time` is ignored.
    pub fn set(&mut self, field: FieldId, enabled: bool) {
        if enabled {
            self.0 |= 1 << field as u32;
        } else if field != FieldId::Time {
            self.0 &= !(1 << field as u32);
        }
    }

    /// Enabled fields in enumeration order
    pub fn iter(self) -> impl Iterator<Item = FieldId> {
        FieldId::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

impl Default for EnabledSet {
    /// Mission, motor reference and voltage, wheel velocity, pose and battery
    fn default() -> Self {
        let mut set = Self::only_time();
        for field in [
            FieldId::Mission,
            FieldId::MotorVelRef,
            FieldId::MotorVoltage,
            FieldId::WheelVel,
            FieldId::Pose,
            FieldId::Battery,
        ] {
            set.set(field, true);
        }
        set
    }
}

/// Byte offset of every enabled field within a row, plus the total row size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowLayout {
    enabled: EnabledSet,
    offsets: [Option<u16>; FIELD_COUNT],
    row_size: usize,
}

impl RowLayout {
    /// Computes the layout for an enabled set. Pure and deterministic.
    pub fn compile(enabled: EnabledSet) -> Self {
        let mut offsets = [None; FIELD_COUNT];
        let mut row_size = 0usize;
        for field in enabled.iter() {
            offsets[field.index()] = Some(row_size as u16);
            row_size += field.descriptor().byte_size();
        }
        Self {
            enabled,
            offsets,
            row_size,
        }
    }

    pub fn enabled(&self) -> EnabledSet {
        self.enabled
    }

    /// Total bytes per row
    pub fn row_size(&self) -> usize {
        self.row_size
    }

    /// Offset of a field within a row, `None` when the field is not logged
    pub fn offset(&self, field: FieldId) -> Option<usize> {
        self.offsets[field.index()].map(usize::from)
    }

    /// `(field, offset)` pairs in enumeration order
    pub fn iter(&self) -> impl Iterator<Item = (FieldId, usize)> + '_ {
        FieldId::ALL
            .into_iter()
            .filter_map(|f| self.offset(f).map(|offset| (f, offset)))
    }
}

impl Default for RowLayout {
    fn default() -> Self {
        Self::compile(EnabledSet::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_always_enabled() {
        let mut set = EnabledSet::from_bits(0);
        assert!(set.contains(FieldId::Time));
        set.set(FieldId::Time, false);
        assert!(set.contains(FieldId::Time));
    }

    #[test]
    fn test_unknown_bits_dropped() {
        let set = EnabledSet::from_bits(u32::MAX);
        assert_eq!(set.bits(), (1 << FIELD_COUNT) - 1);
    }

    #[test]
    fn test_time_and_battery_layout() {
        let mut set = EnabledSet::only_time();
        set.set(FieldId::Battery, true);
        let layout = RowLayout::compile(set);
        assert_eq!(layout.row_size(), 6);
        assert_eq!(layout.offset(FieldId::Time), Some(0));
        assert_eq!(layout.offset(FieldId::Battery), Some(4));
        assert_eq!(layout.offset(FieldId::Pose), None);
    }

    #[test]
    fn test_offsets_follow_enumeration_order() {
        let mut set = EnabledSet::only_time();
        // Enable in reverse order, the layout must not care
        set.set(FieldId::Chirp, true);
        set.set(FieldId::Pose, true);
        set.set(FieldId::Mission, true);
        let layout = RowLayout::compile(set);

        let order: Vec<_> = layout.iter().collect();
        assert_eq!(
            order,
            vec![
                (FieldId::Time, 0),
                (FieldId::Mission, 4),
                (FieldId::Pose, 12),
                (FieldId::Chirp, 28),
            ]
        );
        assert_eq!(layout.row_size(), 44);
    }

    #[test]
    fn test_compile_is_deterministic() {
        let set = EnabledSet::from_bits(0b1010_1010_1010_1011);
        assert_eq!(RowLayout::compile(set), RowLayout::compile(set));
    }

    #[test]
    fn test_all_fields_row_size() {
        let layout = RowLayout::compile(EnabledSet::from_bits(u32::MAX));
        let expected: usize = FieldId::ALL
            .iter()
            .map(|f| f.descriptor().byte_size())
            .sum();
        assert_eq!(layout.row_size(), expected);
    }
}
