//! Patient - the unit of live telemetry.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    clamp_temperature, ActivityLevel, Meal, MovementHistory, Room, WeeklySteps, MAX_TEMPERATURE,
    MIN_TEMPERATURE, WEEK_LEN,
};

/// Default daily step goal for patients built without one.
pub const DEFAULT_STEP_GOAL: u32 = 3000;

/// A broken entity invariant. Reaching one of these means a bug in the core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvariantViolation {
    #[error("patient {0}: step goal must be greater than zero")]
    ZeroStepGoal(String),

    #[error("patient {id}: room temperature {celsius} outside [15, 30]")]
    TemperatureOutOfRange { id: String, celsius: f64 },

    #[error("patient {id}: today's weekly steps {weekly} do not mirror step count {steps}")]
    WeeklyMirror { id: String, weekly: u32, steps: u32 },

    #[error("patient {id}: fall flag {detected} disagrees with fall timestamp")]
    FallState { id: String, detected: bool },

    #[error("duplicate patient id {0}")]
    DuplicatePatient(String),

    #[error("selected patient {patient} is not in facility {facility}")]
    SelectionOutsideFacility { facility: String, patient: String },
}

/// A patient and their current telemetry.
///
/// The fall flag is derived from [`Patient::fall_timestamp`], so
/// `fall_detected() == fall_timestamp.is_some()` always holds.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "PatientRecord", into = "PatientRecord")
)]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub age: u32,
    pub avatar: String,
    pub location: Room,
    pub is_moving: bool,
    pub activity_level: ActivityLevel,
    pub movement_history: MovementHistory,
    pub step_count: u32,
    pub step_goal: u32,
    pub weekly_steps: WeeklySteps,
    pub last_meal: Meal,
    pub room_temperature: f64,
    pub fall_timestamp: Option<DateTime<Utc>>,
    pub last_movement: DateTime<Utc>,
}

impl Patient {
    /// Create a builder for a patient.
    pub fn builder(id: impl Into<String>, name: impl Into<String>) -> PatientBuilder {
        PatientBuilder::new(id, name)
    }

    /// Whether a fall alarm is active for this patient.
    pub fn fall_detected(&self) -> bool {
        self.fall_timestamp.is_some()
    }

    /// Progress toward the daily step goal, as a percentage in `[0, 100]`.
    pub fn step_progress(&self) -> f64 {
        if self.step_goal == 0 {
            return 0.0;
        }
        (f64::from(self.step_count) / f64::from(self.step_goal) * 100.0).min(100.0)
    }

    /// Whether today's goal has been reached.
    pub fn goal_reached(&self) -> bool {
        self.step_count >= self.step_goal
    }

    /// Check the invariants that the type system does not already enforce.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if self.step_goal == 0 {
            return Err(InvariantViolation::ZeroStepGoal(self.id.clone()));
        }
        if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&self.room_temperature) {
            return Err(InvariantViolation::TemperatureOutOfRange {
                id: self.id.clone(),
                celsius: self.room_temperature,
            });
        }
        let weekly = self.weekly_steps.today().steps;
        if weekly != self.step_count {
            return Err(InvariantViolation::WeeklyMirror {
                id: self.id.clone(),
                weekly,
                steps: self.step_count,
            });
        }
        Ok(())
    }

    /// Returns a copy of this patient with `update` merged in.
    pub fn merged(&self, update: &PatientUpdate) -> Self {
        let mut next = self.clone();
        update.apply(&mut next);
        next
    }
}

/// Builder for constructing `Patient` seed records.
#[derive(Debug, Clone)]
pub struct PatientBuilder {
    patient: Patient,
}

impl PatientBuilder {
    /// Create a new builder with resting defaults.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let room = Room::default();
        Self {
            patient: Patient {
                id: id.into(),
                name: name.into(),
                age: 0,
                avatar: String::new(),
                location: room,
                is_moving: false,
                activity_level: ActivityLevel::None,
                movement_history: MovementHistory::default(),
                step_count: 0,
                step_goal: DEFAULT_STEP_GOAL,
                weekly_steps: WeeklySteps::default(),
                last_meal: Meal::default(),
                room_temperature: room.baseline_temperature(),
                fall_timestamp: None,
                last_movement: Utc::now(),
            },
        }
    }

    pub fn age(mut self, age: u32) -> Self {
        self.patient.age = age;
        self
    }

    pub fn avatar(mut self, avatar: impl Into<String>) -> Self {
        self.patient.avatar = avatar.into();
        self
    }

    /// Place the patient in `room`, resetting the temperature to its baseline.
    pub fn room(mut self, room: Room) -> Self {
        self.patient.location = room;
        self.patient.room_temperature = room.baseline_temperature();
        self
    }

    pub fn temperature(mut self, celsius: f64) -> Self {
        self.patient.room_temperature = clamp_temperature(celsius);
        self
    }

    pub fn moving(mut self, activity: ActivityLevel) -> Self {
        self.patient.is_moving = activity != ActivityLevel::None;
        self.patient.activity_level = activity;
        self
    }

    pub fn movement_history(mut self, history: MovementHistory) -> Self {
        self.patient.movement_history = history;
        self
    }

    /// Set today's step count and the daily goal.
    pub fn steps(mut self, count: u32, goal: u32) -> Self {
        self.patient.step_count = count;
        self.patient.step_goal = goal;
        self
    }

    /// Set the six days preceding today. Today's slot always mirrors the step count.
    pub fn past_week(mut self, past: [u32; WEEK_LEN - 1]) -> Self {
        self.patient.weekly_steps = WeeklySteps::from_counts(past, 0);
        self
    }

    pub fn weekly_steps(mut self, weekly: WeeklySteps) -> Self {
        self.patient.weekly_steps = weekly;
        self
    }

    pub fn last_meal(mut self, meal: Meal) -> Self {
        self.patient.last_meal = meal;
        self
    }

    pub fn last_movement(mut self, at: DateTime<Utc>) -> Self {
        self.patient.last_movement = at;
        self
    }

    pub fn fallen_at(mut self, at: DateTime<Utc>) -> Self {
        self.patient.fall_timestamp = Some(at);
        self
    }

    /// Build the patient.
    pub fn build(mut self) -> Patient {
        let steps = self.patient.step_count;
        self.patient.weekly_steps.set_today(steps);
        self.patient
    }
}

/// A partial set of patient fields to merge in one atomic commit.
///
/// Unset fields are left untouched. Writing the step count also rewrites
/// today's weekly slot so the two never disagree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientUpdate {
    pub location: Option<Room>,
    pub is_moving: Option<bool>,
    pub activity_level: Option<ActivityLevel>,
    pub movement_history: Option<MovementHistory>,
    pub step_count: Option<u32>,
    pub weekly_steps: Option<WeeklySteps>,
    pub last_meal: Option<Meal>,
    pub room_temperature: Option<f64>,
    pub fall: Option<Option<DateTime<Utc>>>,
    pub last_movement: Option<DateTime<Utc>>,
}

impl PatientUpdate {
    /// An empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// The update that clears an active fall.
    pub fn clear_fall() -> Self {
        Self {
            fall: Some(None),
            ..Self::default()
        }
    }

    /// The update that raises a fall at `at`.
    pub fn raise_fall(at: DateTime<Utc>) -> Self {
        Self {
            fall: Some(Some(at)),
            ..Self::default()
        }
    }

    pub fn location(mut self, room: Room) -> Self {
        self.location = Some(room);
        self
    }

    pub fn moving(mut self, is_moving: bool, activity: ActivityLevel) -> Self {
        self.is_moving = Some(is_moving);
        self.activity_level = Some(activity);
        self
    }

    pub fn movement_history(mut self, history: MovementHistory) -> Self {
        self.movement_history = Some(history);
        self
    }

    pub fn step_count(mut self, steps: u32) -> Self {
        self.step_count = Some(steps);
        self
    }

    pub fn weekly_steps(mut self, weekly: WeeklySteps) -> Self {
        self.weekly_steps = Some(weekly);
        self
    }

    pub fn last_meal(mut self, meal: Meal) -> Self {
        self.last_meal = Some(meal);
        self
    }

    pub fn room_temperature(mut self, celsius: f64) -> Self {
        self.room_temperature = Some(celsius);
        self
    }

    pub fn fall(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.fall = Some(at);
        self
    }

    pub fn last_movement(mut self, at: DateTime<Utc>) -> Self {
        self.last_movement = Some(at);
        self
    }

    /// Check if no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge the set fields into `patient`.
    pub fn apply(&self, patient: &mut Patient) {
        if let Some(room) = self.location {
            patient.location = room;
        }
        if let Some(is_moving) = self.is_moving {
            patient.is_moving = is_moving;
        }
        if let Some(activity) = self.activity_level {
            patient.activity_level = activity;
        }
        if let Some(history) = self.movement_history {
            patient.movement_history = history;
        }
        if let Some(weekly) = &self.weekly_steps {
            patient.weekly_steps = weekly.clone();
        }
        if let Some(steps) = self.step_count {
            patient.step_count = steps;
        }
        if self.step_count.is_some() || self.weekly_steps.is_some() {
            patient.weekly_steps.set_today(patient.step_count);
        }
        if let Some(meal) = self.last_meal {
            patient.last_meal = meal;
        }
        if let Some(celsius) = self.room_temperature {
            patient.room_temperature = clamp_temperature(celsius);
        }
        if let Some(fall) = self.fall {
            patient.fall_timestamp = fall;
        }
        if let Some(at) = self.last_movement {
            patient.last_movement = at;
        }
    }
}

/// Wire form of a patient: carries the fall flag and timestamp side by side.
#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct PatientRecord {
    id: String,
    name: String,
    age: u32,
    #[serde(default)]
    avatar: String,
    location: Room,
    is_moving: bool,
    activity_level: ActivityLevel,
    movement_history: MovementHistory,
    step_count: u32,
    step_goal: u32,
    weekly_steps: WeeklySteps,
    last_meal: Meal,
    room_temperature: f64,
    #[serde(default)]
    fall_detected: bool,
    #[serde(default)]
    fall_timestamp: Option<DateTime<Utc>>,
    last_movement: DateTime<Utc>,
}

#[cfg(feature = "serde")]
impl From<Patient> for PatientRecord {
    fn from(p: Patient) -> Self {
        Self {
            fall_detected: p.fall_detected(),
            id: p.id,
            name: p.name,
            age: p.age,
            avatar: p.avatar,
            location: p.location,
            is_moving: p.is_moving,
            activity_level: p.activity_level,
            movement_history: p.movement_history,
            step_count: p.step_count,
            step_goal: p.step_goal,
            weekly_steps: p.weekly_steps,
            last_meal: p.last_meal,
            room_temperature: p.room_temperature,
            fall_timestamp: p.fall_timestamp,
            last_movement: p.last_movement,
        }
    }
}

#[cfg(feature = "serde")]
impl TryFrom<PatientRecord> for Patient {
    type Error = InvariantViolation;

    fn try_from(r: PatientRecord) -> Result<Self, Self::Error> {
        if r.fall_detected != r.fall_timestamp.is_some() {
            return Err(InvariantViolation::FallState {
                id: r.id,
                detected: r.fall_detected,
            });
        }
        let patient = Patient {
            id: r.id,
            name: r.name,
            age: r.age,
            avatar: r.avatar,
            location: r.location,
            is_moving: r.is_moving,
            activity_level: r.activity_level,
            movement_history: r.movement_history,
            step_count: r.step_count,
            step_goal: r.step_goal,
            weekly_steps: r.weekly_steps,
            last_meal: r.last_meal,
            room_temperature: r.room_temperature,
            fall_timestamp: r.fall_timestamp,
            last_movement: r.last_movement,
        };
        patient.check_invariants()?;
        Ok(patient)
    }
}
