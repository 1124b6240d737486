//! Weekly step history.

/// Number of days kept in the weekly step history.
pub const WEEK_LEN: usize = 7;

const DEFAULT_DAYS: [&str; WEEK_LEN] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Steps recorded for one day.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DaySteps {
    pub day: String,
    pub steps: u32,
}

impl DaySteps {
    pub fn new(day: impl Into<String>, steps: u32) -> Self {
        Self {
            day: day.into(),
            steps,
        }
    }
}

/// Seven days of step counts, oldest first. The last slot is today.
///
/// Only today's slot is ever rewritten once the history is built.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct WeeklySteps([DaySteps; WEEK_LEN]);

impl WeeklySteps {
    /// Build from seven day records, oldest first.
    pub fn new(days: [DaySteps; WEEK_LEN]) -> Self {
        Self(days)
    }

    /// Build from past step counts with default day labels, ending at `today`.
    pub fn from_counts(past: [u32; WEEK_LEN - 1], today: u32) -> Self {
        Self(core::array::from_fn(|i| {
            let steps = if i == WEEK_LEN - 1 { today } else { past[i] };
            DaySteps::new(DEFAULT_DAYS[i], steps)
        }))
    }

    /// Today's record.
    pub fn today(&self) -> &DaySteps {
        &self.0[WEEK_LEN - 1]
    }

    /// Overwrite today's step count.
    pub fn set_today(&mut self, steps: u32) {
        self.0[WEEK_LEN - 1].steps = steps;
    }

    /// Iterate oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &DaySteps> {
        self.0.iter()
    }

    /// Number of days. Always 7.
    pub const fn len(&self) -> usize {
        WEEK_LEN
    }

    /// Always false; present for API symmetry with collections.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Total steps across the week.
    pub fn total(&self) -> u64 {
        self.0.iter().map(|d| u64::from(d.steps)).sum()
    }
}

impl Default for WeeklySteps {
    fn default() -> Self {
        Self::from_counts([0; WEEK_LEN - 1], 0)
    }
}
