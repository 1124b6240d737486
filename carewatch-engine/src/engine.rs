//! The main Engine type: owns the store and schedules simulator ticks.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use carewatch_summary::Summarizer;
use carewatch_types::{Facility, FacilitySummary, Patient};
use chrono::Utc;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::{
    selectors, AlarmManager, AlarmPolicy, CommitListener, EngineError, SimulationPolicy,
    Simulator, Snapshot, Store, SummaryState, SummaryTrigger, TickOutcome, DEFAULT_TICK_PERIOD,
};

struct EngineInner {
    store: Arc<Store>,
    simulator: Simulator,
    alarms: AlarmManager,
    summary: Option<Arc<SummaryTrigger>>,
    rng: Mutex<StdRng>,
    tick_period: Duration,
}

/// The telemetry engine.
///
/// Cloning is cheap; clones drive the same store.
///
/// # Example
///
/// ```rust,no_run
/// use carewatch_engine::Engine;
/// use carewatch_types::{Facility, Patient};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let engine = Engine::builder()
///         .facility(
///             Facility::builder("home-1", "Los Olivos")
///                 .patient(Patient::builder("p1", "Ana").build())
///                 .build(),
///         )
///         .tick_period(Duration::from_secs(3))
///         .build()
///         .unwrap();
///
///     let handle = engine.start();
///     tokio::time::sleep(Duration::from_secs(30)).await;
///     handle.stop();
/// }
/// ```
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    /// Create a builder for configuring the engine.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.inner.store
    }

    pub fn alarms(&self) -> &AlarmManager {
        &self.inner.alarms
    }

    pub fn tick_period(&self) -> Duration {
        self.inner.tick_period
    }

    pub fn snapshot(&self) -> Snapshot {
        self.inner.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.inner.store.subscribe()
    }

    /// Summary updates, when a summarizer is configured.
    pub fn summaries(&self) -> Option<watch::Receiver<SummaryState>> {
        self.inner.summary.as_ref().map(|s| s.subscribe())
    }

    pub fn facility_list(&self) -> Vec<FacilitySummary> {
        selectors::facility_list(&self.snapshot())
    }

    pub fn active_facility(&self) -> Result<Arc<Facility>, EngineError> {
        selectors::active_facility(&self.snapshot()).cloned()
    }

    pub fn patients_in_active_facility(&self) -> Vec<Arc<Patient>> {
        selectors::patients_in_active_facility(&self.snapshot()).to_vec()
    }

    pub fn active_patient(&self) -> Option<Arc<Patient>> {
        selectors::active_patient(&self.snapshot()).cloned()
    }

    pub fn select_facility(&self, facility_id: &str) -> Result<(), EngineError> {
        self.inner.store.select_facility(facility_id)?;
        info!(facility = facility_id, "facility selected");
        Ok(())
    }

    pub fn select_patient(&self, patient_id: &str) -> Result<(), EngineError> {
        self.inner.store.select_patient(patient_id)?;
        debug!(patient = patient_id, "patient selected");
        Ok(())
    }

    /// Clear a fall and cancel its expiry. Idempotent.
    pub fn dismiss_fall_alert(&self, patient_id: &str) {
        self.inner.alarms.dismiss(patient_id);
    }

    /// Raise a fall from outside the simulator. Requires a tokio runtime.
    pub fn raise_fall(&self, patient_id: &str) -> Result<(), EngineError> {
        let mut rng = self.inner.rng.lock();
        self.inner.alarms.raise(patient_id, Utc::now(), &mut *rng)
    }

    /// Run one simulator tick now.
    ///
    /// A fall raised by the tick arms its expiry timer, so this must run
    /// inside a tokio runtime.
    pub fn tick(&self) -> TickOutcome {
        let inner = &self.inner;
        let mut rng = inner.rng.lock();
        let _lifecycle = inner.alarms.lifecycle();
        let outcome = inner.simulator.tick(&inner.store, &mut *rng, Utc::now());
        if let Some(patient_id) = outcome.raised_fall() {
            if inner.alarms.arm_random(patient_id, &mut *rng).is_some() {
                warn!(patient = patient_id, "fall detected, alarm raised");
            } else {
                info!(patient = patient_id, "fall cleared before its alarm was armed");
            }
        }
        outcome
    }

    /// Start periodic ticking.
    ///
    /// The first tick fires one period after the call. Falls already active
    /// in the store get an expiry timer counted from now. Returns a handle
    /// that stops ticking and cancels pending alarms.
    pub fn start(&self) -> EngineHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let engine = self.clone();
        let period = self.inner.tick_period;

        if let Some(summary) = &self.inner.summary {
            summary.on_commit(&self.snapshot());
        }

        let seeded = self.inner.alarms.arm_unexpired(&mut *self.inner.rng.lock());
        if seeded > 0 {
            info!(falls = seeded, "armed alarms for falls already active");
        }

        let task = tokio::spawn(async move {
            let mut interval_timer =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut stop_rx = stop_rx;

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        if catch_unwind(AssertUnwindSafe(|| engine.tick())).is_err() {
                            error!("simulator tick panicked, continuing");
                        }
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("tick loop stopped");
        });

        info!(?period, "engine started");
        EngineHandle {
            stop_tx,
            task,
            alarms: self.inner.alarms.clone(),
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("store", &self.inner.store)
            .field("alarms", &self.inner.alarms)
            .field("summary", &self.inner.summary)
            .field("tick_period", &self.inner.tick_period)
            .finish()
    }
}

/// Builder for configuring an Engine.
#[derive(Debug, Default)]
pub struct EngineBuilder {
    facilities: Vec<Facility>,
    simulation: SimulationPolicy,
    alarm: AlarmPolicy,
    tick_period: Option<Duration>,
    rng_seed: Option<u64>,
    summarizer: Option<Arc<dyn Summarizer>>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a seed facility. Facilities keep insertion order.
    pub fn facility(mut self, facility: Facility) -> Self {
        self.facilities.push(facility);
        self
    }

    pub fn facilities(mut self, facilities: impl IntoIterator<Item = Facility>) -> Self {
        self.facilities.extend(facilities);
        self
    }

    pub fn simulation(mut self, policy: SimulationPolicy) -> Self {
        self.simulation = policy;
        self
    }

    pub fn alarm(mut self, policy: AlarmPolicy) -> Self {
        self.alarm = policy;
        self
    }

    /// Set the tick period. Defaults to 3 seconds.
    pub fn tick_period(mut self, period: Duration) -> Self {
        self.tick_period = Some(period);
        self
    }

    /// Seed the RNG for reproducible runs.
    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Validate the configuration and build the engine.
    pub fn build(self) -> Result<Engine, EngineError> {
        self.simulation.validate()?;
        self.alarm.validate()?;
        let tick_period = self.tick_period.unwrap_or(DEFAULT_TICK_PERIOD);
        if tick_period.is_zero() {
            return Err(EngineError::Config("tick period must be non-zero".into()));
        }

        let store = Arc::new(Store::new(self.facilities)?);
        let summary = self.summarizer.map(|summarizer| {
            let trigger = Arc::new(SummaryTrigger::new(summarizer));
            store.add_listener(trigger.clone());
            trigger
        });

        let rng = match self.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Engine {
            inner: Arc::new(EngineInner {
                alarms: AlarmManager::new(Arc::clone(&store), self.alarm),
                store,
                simulator: Simulator::new(self.simulation),
                summary,
                rng: Mutex::new(rng),
                tick_period,
            }),
        })
    }
}

/// Handle for controlling the tick loop.
///
/// Dropping the handle also stops ticking, but leaves alarm timers armed.
#[derive(Debug)]
pub struct EngineHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
    alarms: AlarmManager,
}

impl EngineHandle {
    /// Stop ticking and cancel every pending alarm timer.
    pub fn stop(self) {
        let _ = self.stop_tx.send(true);
        self.alarms.shutdown();
    }

    /// Stop, then wait for the tick loop to exit.
    pub async fn shutdown(self) {
        let _ = self.stop_tx.send(true);
        self.alarms.shutdown();
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> EngineBuilder {
        Engine::builder()
            .facility(
                Facility::builder("home-1", "A")
                    .patient(Patient::builder("a", "Ana").build())
                    .build(),
            )
            .rng_seed(1)
    }

    #[test]
    fn default_tick_period_is_three_seconds() {
        let engine = engine().build().unwrap();
        assert_eq!(engine.tick_period(), Duration::from_secs(3));
    }

    #[test]
    fn invalid_policy_fails_build() {
        let err = engine()
            .simulation(SimulationPolicy {
                fall_probability: -0.1,
                ..Default::default()
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn zero_tick_period_fails_build() {
        assert!(engine().tick_period(Duration::ZERO).build().is_err());
    }

    #[test]
    fn selector_pass_throughs() {
        let engine = engine().build().unwrap();
        assert_eq!(engine.facility_list().len(), 1);
        assert_eq!(engine.active_facility().unwrap().id, "home-1");
        assert_eq!(engine.patients_in_active_facility().len(), 1);
        assert_eq!(engine.active_patient().unwrap().id, "a");
        assert!(engine.summaries().is_none());
    }

    #[test]
    fn select_unknown_facility_is_not_found() {
        let engine = engine().build().unwrap();
        let err = engine.select_facility("nope").unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_ends_ticking() {
        let engine = engine()
            .simulation(SimulationPolicy {
                fall_probability: 0.0,
                ..Default::default()
            })
            .tick_period(Duration::from_secs(1))
            .build()
            .unwrap();
        let handle = engine.start();

        tokio::time::sleep(Duration::from_millis(3500)).await;
        let revision = engine.store().revision();
        assert_eq!(revision, 3);

        handle.shutdown().await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(engine.store().revision(), revision);
    }
}
