//! # carewatch-engine
//!
//! Reactive telemetry state engine for care-home monitoring.
//!
//! The engine owns a graph of facilities and patients, advances it with a
//! randomized telemetry simulator, and manages the lifecycle of fall alarms.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use carewatch_engine::Engine;
//! use carewatch_types::{Facility, Patient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = Engine::builder()
//!         .facility(
//!             Facility::builder("home-1", "Los Olivos")
//!                 .patient(Patient::builder("p1", "Ana").age(82).build())
//!                 .build(),
//!         )
//!         .build()
//!         .unwrap();
//!
//!     let handle = engine.start();
//!
//!     if let Some(patient) = engine.active_patient() {
//!         println!("{} is in the {}", patient.name, patient.location);
//!     }
//!
//!     handle.stop();
//! }
//! ```
//!
//! ## Components
//!
//! - [`Store`]: single owner of the entity graph, copy-on-write snapshots
//! - [`selectors`]: derived read-only views
//! - [`Simulator`]: one randomized update per tick
//! - [`AlarmManager`]: fall raise, auto-expiry and dismissal
//! - [`SummaryTrigger`]: narrative summaries on selection change or fall

pub mod alarm;
pub mod engine;
pub mod error;
pub mod policy;
pub mod selectors;
pub mod simulator;
pub mod store;
pub mod trigger;

pub use alarm::AlarmManager;
pub use engine::{Engine, EngineBuilder, EngineHandle};
pub use error::EngineError;
pub use policy::{AlarmPolicy, SimulationPolicy, DEFAULT_TICK_PERIOD};
pub use simulator::{Simulator, Step, TickOutcome};
pub use store::{CommitListener, Selection, Snapshot, Store};
pub use trigger::{ChangeDetector, Observation, SummaryState, SummaryTrigger};

// Re-export the entity model for convenience
pub use carewatch_types;
