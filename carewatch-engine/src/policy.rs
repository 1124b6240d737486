//! Tunables for the simulator and the alarm lifecycle.

use std::ops::RangeInclusive;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Default interval between simulator ticks.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(3);

/// Probabilities and magnitudes driving one simulated tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationPolicy {
    /// Chance the sampled patient is moving this tick.
    pub moving_probability: f64,
    /// Chance a moving patient is at `normal` rather than `low` activity.
    pub normal_activity_probability: f64,
    /// Smallest step increment for a moving patient below goal.
    pub step_increment_min: u32,
    /// Largest step increment for a moving patient below goal.
    pub step_increment_max: u32,
    /// Chance the patient walks into the next room.
    pub room_change_probability: f64,
    /// Only moving patients change room.
    pub room_change_requires_movement: bool,
    /// Jitter (+/- degrees) around the new room's baseline temperature.
    pub temperature_noise: f64,
    /// Drift (+/- degrees) of the temperature when the room is unchanged.
    pub temperature_drift: f64,
    /// Chance of a fall per tick.
    pub fall_probability: f64,
    /// Chance the meal record advances to the next meal.
    pub meal_probability: f64,
    /// Chance an advanced meal is recorded as skipped.
    pub meal_skip_probability: f64,
}

impl Default for SimulationPolicy {
    fn default() -> Self {
        Self {
            moving_probability: 0.65,
            normal_activity_probability: 0.5,
            step_increment_min: 5,
            step_increment_max: 14,
            room_change_probability: 0.1,
            room_change_requires_movement: true,
            temperature_noise: 0.5,
            temperature_drift: 0.3,
            fall_probability: 0.005,
            meal_probability: 0.02,
            meal_skip_probability: 0.15,
        }
    }
}

impl SimulationPolicy {
    /// Step increment range for a moving patient.
    pub fn step_increment(&self) -> RangeInclusive<u32> {
        self.step_increment_min..=self.step_increment_max
    }

    /// Reject values that would make a tick panic or break invariants.
    pub fn validate(&self) -> Result<(), EngineError> {
        let probabilities = [
            ("moving_probability", self.moving_probability),
            ("normal_activity_probability", self.normal_activity_probability),
            ("room_change_probability", self.room_change_probability),
            ("fall_probability", self.fall_probability),
            ("meal_probability", self.meal_probability),
            ("meal_skip_probability", self.meal_skip_probability),
        ];
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(EngineError::Config(format!(
                    "{name} must be within [0, 1], got {p}"
                )));
            }
        }

        for (name, amplitude) in [
            ("temperature_noise", self.temperature_noise),
            ("temperature_drift", self.temperature_drift),
        ] {
            if !amplitude.is_finite() || amplitude < 0.0 {
                return Err(EngineError::Config(format!(
                    "{name} must be a non-negative number, got {amplitude}"
                )));
            }
        }

        if self.step_increment_min > self.step_increment_max {
            return Err(EngineError::Config(format!(
                "step increment range {}..={} is empty",
                self.step_increment_min, self.step_increment_max
            )));
        }
        Ok(())
    }
}

/// How long a raised fall stays active before it auto-expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmPolicy {
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for AlarmPolicy {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(20),
            max_delay: Duration::from_secs(25),
        }
    }
}

impl AlarmPolicy {
    /// A policy that always waits exactly `delay`.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            min_delay: delay,
            max_delay: delay,
        }
    }

    /// Draw an expiry delay uniformly from `[min_delay, max_delay]`.
    pub fn sample_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.min_delay >= self.max_delay {
            return self.min_delay;
        }
        rng.gen_range(self.min_delay..=self.max_delay)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.min_delay > self.max_delay {
            return Err(EngineError::Config(format!(
                "alarm min delay {:?} exceeds max delay {:?}",
                self.min_delay, self.max_delay
            )));
        }
        Ok(())
    }
}
