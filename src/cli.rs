//! Command-line flags and engine assembly.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use carewatch_engine::Engine;
use clap::Parser;
use tracing::info;

use crate::config::Settings;
use crate::duration::format_duration;
use crate::seed;

#[derive(Parser, Debug)]
#[command(name = "carewatch")]
#[command(about = "Care-home telemetry simulator with fall alarm lifecycle")]
pub struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// JSON file with seed facilities (defaults to the built-in demo)
    #[arg(short, long)]
    pub seed_file: Option<PathBuf>,

    /// Seed for the simulator RNG
    #[arg(long)]
    pub rng_seed: Option<u64>,

    /// Tick period (e.g., "3s", "500ms")
    #[arg(short, long)]
    pub tick: Option<String>,

    /// Facility to select at startup
    #[arg(short, long)]
    pub facility: Option<String>,

    /// Run this many ticks headless, then export and exit
    #[arg(long, requires = "export")]
    pub ticks: Option<u64>,

    /// Export the final state to a JSON file and exit
    #[arg(short, long)]
    pub export: Option<PathBuf>,
}

impl Args {
    /// Apply flags on top of file and environment settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(seed) = self.rng_seed {
            settings.engine.rng_seed = Some(seed);
        }
        if let Some(tick) = &self.tick {
            settings.engine.tick = tick.clone();
        }
        if let Some(facility) = &self.facility {
            settings.engine.facility = Some(facility.clone());
        }
        if let Some(path) = &self.seed_file {
            settings.engine.seed_file = Some(path.display().to_string());
        }
    }
}

/// Build an engine from resolved settings.
pub fn build_engine(settings: &Settings) -> Result<Engine> {
    let facilities = match &settings.engine.seed_file {
        Some(path) => seed::load(Path::new(path))?,
        None => seed::demo(),
    };

    let mut builder = Engine::builder()
        .facilities(facilities)
        .simulation(settings.simulation.clone())
        .alarm(settings.alarm_policy()?)
        .tick_period(settings.tick_period()?)
        .summarizer(settings.summary.summarizer()?);
    if let Some(seed) = settings.engine.rng_seed {
        builder = builder.rng_seed(seed);
    }
    let engine = builder.build().context("Invalid engine configuration")?;

    if let Some(facility) = &settings.engine.facility {
        engine
            .select_facility(facility)
            .with_context(|| format!("Unknown startup facility {facility}"))?;
    }

    info!(
        facilities = engine.facility_list().len(),
        tick = %format_duration(engine.tick_period()),
        summaries = settings.summary.is_configured(),
        "engine ready"
    );
    Ok(engine)
}
