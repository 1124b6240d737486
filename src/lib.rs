//! # carewatch
//!
//! A headless care-home telemetry simulator.
//!
//! The binary wires the engine from `carewatch-engine` to layered
//! configuration, seed data, an operator console on stdin and a JSON
//! snapshot export.
//!
//! ## Usage
//!
//! ```bash
//! # Interactive console with the built-in demo facilities
//! carewatch
//!
//! # Reproducible headless run
//! carewatch --rng-seed 42 --ticks 500 --export state.json
//!
//! # Custom seed data and config
//! carewatch --config carewatch.toml --seed-file facilities.json
//! ```
//!
//! ## As a library
//!
//! ```
//! use carewatch::{cli, config::Settings};
//!
//! let engine = cli::build_engine(&Settings::default()).unwrap();
//! assert_eq!(engine.facility_list().len(), 2);
//! ```

pub mod cli;
pub mod config;
pub mod console;
pub mod duration;
pub mod export;
pub mod seed;

pub use cli::{build_engine, Args};
pub use config::Settings;
