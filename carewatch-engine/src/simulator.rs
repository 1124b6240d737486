//! Telemetry simulator: one randomized patient update per tick.
//!
//! The simulator is synchronous and owns no randomness. Callers pass the
//! RNG and the clock reading, which keeps ticks reproducible under a seed.

use carewatch_types::{
    clamp_temperature, ActivityLevel, MealStatus, Patient, PatientUpdate,
};
use chrono::{DateTime, NaiveTime, Timelike, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::{selectors, SimulationPolicy, Store};

/// What a tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No active facility, or it has no patients.
    Idle,
    /// The sampled patient has an active fall; nothing was written.
    SkippedFallActive { patient_id: String },
    /// One update was committed for the patient.
    Committed {
        patient_id: String,
        fall_raised: bool,
    },
}

impl TickOutcome {
    /// The patient a fall was raised for, if any.
    pub fn raised_fall(&self) -> Option<&str> {
        match self {
            TickOutcome::Committed {
                patient_id,
                fall_raised: true,
            } => Some(patient_id),
            _ => None,
        }
    }
}

/// The next-state draw for one patient.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub update: PatientUpdate,
    pub fall_raised: bool,
}

/// Generates randomized telemetry for patients of the active facility.
#[derive(Debug, Clone, Default)]
pub struct Simulator {
    policy: SimulationPolicy,
}

impl Simulator {
    pub fn new(policy: SimulationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &SimulationPolicy {
        &self.policy
    }

    /// Draw the next state of `patient` without committing it.
    pub fn step<R: Rng + ?Sized>(
        &self,
        patient: &Patient,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Step {
        let policy = &self.policy;

        let is_moving = rng.gen_bool(policy.moving_probability);
        let activity = match (is_moving, rng.gen_bool(policy.normal_activity_probability)) {
            (false, _) => ActivityLevel::None,
            (true, true) => ActivityLevel::Normal,
            (true, false) => ActivityLevel::Low,
        };

        let mut step_count = patient.step_count;
        if is_moving && step_count < patient.step_goal {
            step_count = step_count.saturating_add(rng.gen_range(policy.step_increment()));
        }

        let mut update = PatientUpdate::new()
            .moving(is_moving, activity)
            .movement_history(patient.movement_history.with_pushed(activity))
            .step_count(step_count);

        let may_change_room = is_moving || !policy.room_change_requires_movement;
        let temperature = if may_change_room && rng.gen_bool(policy.room_change_probability) {
            let room = patient.location.next();
            update = update.location(room);
            room.baseline_temperature() + jitter(rng, policy.temperature_noise)
        } else {
            patient.room_temperature + jitter(rng, policy.temperature_drift)
        };
        update = update.room_temperature(clamp_temperature(temperature));

        let fall_raised = rng.gen_bool(policy.fall_probability);
        if fall_raised {
            update = update.fall(Some(now));
        }

        if rng.gen_bool(policy.meal_probability) {
            let status = if rng.gen_bool(policy.meal_skip_probability) {
                MealStatus::Skipped
            } else {
                MealStatus::Completed
            };
            let time = NaiveTime::from_hms_opt(now.hour(), now.minute(), 0)
                .unwrap_or(patient.last_meal.time);
            update = update.last_meal(patient.last_meal.advance(time, status));
        }

        if is_moving {
            update = update.last_movement(now);
        }

        Step {
            update,
            fall_raised,
        }
    }

    /// Pick one patient of the active facility and commit its next state.
    ///
    /// Patients with an active fall are frozen until the fall clears.
    pub fn tick<R: Rng + ?Sized>(
        &self,
        store: &Store,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> TickOutcome {
        let snapshot = store.snapshot();
        let Some(patient) = selectors::patients_in_active_facility(&snapshot).choose(rng) else {
            return TickOutcome::Idle;
        };

        if patient.fall_detected() {
            debug!(patient = %patient.id, "tick skipped, fall active");
            return TickOutcome::SkippedFallActive {
                patient_id: patient.id.clone(),
            };
        }

        let step = self.step(patient, rng, now);
        if !store.update_patient(&patient.id, &step.update) {
            return TickOutcome::Idle;
        }

        debug!(
            patient = %patient.id,
            revision = store.revision(),
            fall = step.fall_raised,
            "tick committed"
        );
        TickOutcome::Committed {
            patient_id: patient.id.clone(),
            fall_raised: step.fall_raised,
        }
    }
}

fn jitter<R: Rng + ?Sized>(rng: &mut R, amplitude: f64) -> f64 {
    if amplitude > 0.0 {
        rng.gen_range(-amplitude..=amplitude)
    } else {
        0.0
    }
}
