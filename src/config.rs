//! Layered configuration: TOML file, then `CAREWATCH__*` environment
//! variables, then command-line flags (applied by the caller).
//!
//! ```toml
//! [engine]
//! tick = "3s"
//! rng_seed = 42
//!
//! [simulation]
//! fall_probability = 0.01
//!
//! [alarm]
//! min_delay = "20s"
//! max_delay = "25s"
//!
//! [summary]
//! api_key = "..."
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use carewatch_engine::{AlarmPolicy, SimulationPolicy};
use carewatch_summary::{Summarizer, UnconfiguredSummarizer};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::duration::parse_duration;

/// Prefix for environment overrides, e.g. `CAREWATCH__ALARM__MIN_DELAY=5s`.
pub const ENV_PREFIX: &str = "CAREWATCH";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub engine: EngineSettings,
    pub simulation: SimulationPolicy,
    pub alarm: AlarmSettings,
    pub summary: SummarySettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Tick period, e.g. "3s".
    pub tick: String,
    pub rng_seed: Option<u64>,
    /// Facility selected at startup instead of the first one.
    pub facility: Option<String>,
    /// JSON file with seed facilities.
    pub seed_file: Option<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tick: "3s".to_string(),
            rng_seed: None,
            facility: None,
            seed_file: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlarmSettings {
    pub min_delay: String,
    pub max_delay: String,
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            min_delay: "20s".to_string(),
            max_delay: "25s".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SummarySettings {
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub timeout: String,
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: None,
            model: None,
            timeout: "15s".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from an optional file plus environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn tick_period(&self) -> Result<Duration> {
        parse_duration(&self.engine.tick).context("Invalid engine.tick")
    }

    pub fn alarm_policy(&self) -> Result<AlarmPolicy> {
        Ok(AlarmPolicy {
            min_delay: parse_duration(&self.alarm.min_delay).context("Invalid alarm.min_delay")?,
            max_delay: parse_duration(&self.alarm.max_delay).context("Invalid alarm.max_delay")?,
        })
    }
}

impl SummarySettings {
    /// Whether an API key is present.
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.trim().is_empty())
    }

    /// Build the summarizer these settings describe.
    ///
    /// Without an API key this is the summarizer that only reports that
    /// summaries are not configured.
    pub fn summarizer(&self) -> Result<Arc<dyn Summarizer>> {
        let Some(api_key) = self.api_key.as_deref().filter(|_| self.is_configured()) else {
            return Ok(Arc::new(UnconfiguredSummarizer));
        };
        self.remote(api_key)
    }

    #[cfg(feature = "gemini")]
    fn remote(&self, api_key: &str) -> Result<Arc<dyn Summarizer>> {
        let mut builder = carewatch_summary::GeminiSummarizer::builder()
            .api_key(api_key)
            .timeout(parse_duration(&self.timeout).context("Invalid summary.timeout")?);
        if let Some(endpoint) = &self.endpoint {
            builder = builder.endpoint(endpoint.clone());
        }
        if let Some(model) = &self.model {
            builder = builder.model(model.clone());
        }
        Ok(Arc::new(builder.build()?))
    }

    #[cfg(not(feature = "gemini"))]
    fn remote(&self, _api_key: &str) -> Result<Arc<dyn Summarizer>> {
        tracing::warn!("summary api key set but the gemini feature is disabled");
        Ok(Arc::new(UnconfiguredSummarizer))
    }
}
