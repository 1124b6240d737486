//! # carewatch-types
//!
//! Core entity types for carewatch. This crate defines the facility/patient
//! graph that the engine owns, mutates and publishes as snapshots.
//!
//! ## Design Goals
//!
//! - **Invariants by construction**: the 24-slot movement history and the
//!   7-day step history are fixed-size arrays, and the fall flag is derived
//!   from the fall timestamp, so none of them can drift
//! - **Optional serialization**: enable the `serde` feature for JSON seed
//!   files and snapshot export
//! - **Ergonomic builders**: fluent API for constructing seed data
//!
//! ## Example
//!
//! ```rust
//! use carewatch_types::{Facility, Patient, Room};
//!
//! let facility = Facility::builder("home-1", "Residencia Los Olivos")
//!     .patient(
//!         Patient::builder("pat-1", "Elena Vargas")
//!             .age(82)
//!             .room(Room::Kitchen)
//!             .steps(1450, 3000)
//!             .build(),
//!     )
//!     .build();
//!
//! assert_eq!(facility.patients.len(), 1);
//! assert_eq!(facility.patients[0].weekly_steps.today().steps, 1450);
//! ```

mod activity;
mod facility;
mod meal;
mod patient;
mod room;
mod steps;

pub use activity::*;
pub use facility::*;
pub use meal::*;
pub use patient::*;
pub use room::*;
pub use steps::*;

/// Lower bound of any room temperature, in °C.
pub const MIN_TEMPERATURE: f64 = 15.0;

/// Upper bound of any room temperature, in °C.
pub const MAX_TEMPERATURE: f64 = 30.0;

/// Clamp a temperature into the supported `[15.0, 30.0]` range.
pub fn clamp_temperature(celsius: f64) -> f64 {
    if celsius.is_nan() {
        return MIN_TEMPERATURE;
    }
    celsius.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE)
}
