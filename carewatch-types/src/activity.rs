//! Activity levels and the fixed-length movement history.

use core::fmt;

/// Number of slots kept in a patient's movement history.
pub const MOVEMENT_HISTORY_LEN: usize = 24;

/// How active a patient currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ActivityLevel {
    Normal,
    Low,
    #[default]
    None,
}

impl ActivityLevel {
    /// Returns the display label for this level.
    pub fn label(&self) -> &'static str {
        match self {
            ActivityLevel::Normal => "normal",
            ActivityLevel::Low => "low",
            ActivityLevel::None => "none",
        }
    }
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Oldest-first ring of the last 24 activity readings.
///
/// The length is part of the type, so every push evicts exactly one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct MovementHistory([ActivityLevel; MOVEMENT_HISTORY_LEN]);

impl MovementHistory {
    /// A history where every slot holds the same level.
    pub const fn filled(level: ActivityLevel) -> Self {
        Self([level; MOVEMENT_HISTORY_LEN])
    }

    /// Build from an explicit array of readings, oldest first.
    pub const fn from_array(levels: [ActivityLevel; MOVEMENT_HISTORY_LEN]) -> Self {
        Self(levels)
    }

    /// Drop the oldest reading and append `level` as the newest.
    pub fn push(&mut self, level: ActivityLevel) {
        self.0.rotate_left(1);
        self.0[MOVEMENT_HISTORY_LEN - 1] = level;
    }

    /// Returns a copy with `level` pushed.
    pub fn with_pushed(mut self, level: ActivityLevel) -> Self {
        self.push(level);
        self
    }

    /// The newest reading.
    pub fn latest(&self) -> ActivityLevel {
        self.0[MOVEMENT_HISTORY_LEN - 1]
    }

    /// Number of slots. Always 24.
    pub const fn len(&self) -> usize {
        MOVEMENT_HISTORY_LEN
    }

    /// Always false; present for API symmetry with collections.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Iterate oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ActivityLevel> {
        self.0.iter()
    }

    /// The readings as a slice, oldest first.
    pub fn as_slice(&self) -> &[ActivityLevel] {
        &self.0
    }
}

impl Default for MovementHistory {
    fn default() -> Self {
        Self::filled(ActivityLevel::None)
    }
}

impl<'a> IntoIterator for &'a MovementHistory {
    type Item = &'a ActivityLevel;
    type IntoIter = core::slice::Iter<'a, ActivityLevel>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_evicts_oldest() {
        let mut history = MovementHistory::filled(ActivityLevel::None);
        history.push(ActivityLevel::Normal);
        history.push(ActivityLevel::Low);

        assert_eq!(history.len(), 24);
        assert_eq!(history.latest(), ActivityLevel::Low);
        assert_eq!(history.as_slice()[22], ActivityLevel::Normal);
        assert_eq!(history.as_slice()[0], ActivityLevel::None);
    }

    #[test]
    fn full_rotation_replaces_every_slot() {
        let mut history = MovementHistory::filled(ActivityLevel::None);
        for _ in 0..MOVEMENT_HISTORY_LEN {
            history.push(ActivityLevel::Normal);
        }
        assert!(history.iter().all(|l| *l == ActivityLevel::Normal));
    }

    #[test]
    fn oldest_entry_shifts_out_in_order() {
        let mut levels = [ActivityLevel::None; MOVEMENT_HISTORY_LEN];
        levels[0] = ActivityLevel::Normal;
        levels[1] = ActivityLevel::Low;
        let history = MovementHistory::from_array(levels).with_pushed(ActivityLevel::Normal);

        assert_eq!(history.as_slice()[0], ActivityLevel::Low);
        assert_eq!(history.latest(), ActivityLevel::Normal);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serializes_as_plain_array() {
        let history = MovementHistory::filled(ActivityLevel::Low);
        let json = serde_json::to_string(&history).unwrap();
        assert!(json.starts_with("[\"low\""));

        let short = "[\"low\", \"none\"]";
        assert!(serde_json::from_str::<MovementHistory>(short).is_err());
    }
}
