//! Fall alarm lifecycle: raise, auto-expire, dismiss.
//!
//! Each active fall owns at most one timer task. Timers are tagged with a
//! generation so that a superseded timer that still fires does nothing.
//!
//! Raising, arming, expiring and dismissing all run under one lifecycle
//! lock, so a patient has a pending timer exactly when their fall is active.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use carewatch_types::PatientUpdate;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{AlarmPolicy, EngineError, Store};

struct ArmedTimer {
    generation: u64,
    deadline: Instant,
    task: JoinHandle<()>,
}

struct AlarmInner {
    store: Arc<Store>,
    policy: AlarmPolicy,
    // Reentrant: commit listeners may dismiss while a raise is in progress
    lifecycle: ReentrantMutex<()>,
    timers: Mutex<HashMap<String, ArmedTimer>>,
    next_generation: AtomicU64,
}

impl AlarmInner {
    fn is_fallen(&self, patient_id: &str) -> bool {
        self.store
            .snapshot()
            .patient(patient_id)
            .is_some_and(|p| p.fall_detected())
    }

    fn expire(&self, patient_id: &str, generation: u64) {
        let _lifecycle = self.lifecycle.lock();
        {
            let mut timers = self.timers.lock();
            match timers.get(patient_id) {
                Some(timer) if timer.generation == generation => {
                    timers.remove(patient_id);
                }
                _ => {
                    debug!(patient = patient_id, generation, "superseded alarm timer ignored");
                    return;
                }
            }
        }

        if self.store.update_patient(patient_id, &PatientUpdate::clear_fall()) {
            info!(patient = patient_id, "fall alarm expired");
        }
    }
}

/// Owns the pending expiry timers of every active fall.
///
/// Cloning is cheap; clones share the same timers.
#[derive(Clone)]
pub struct AlarmManager {
    inner: Arc<AlarmInner>,
}

impl AlarmManager {
    pub fn new(store: Arc<Store>, policy: AlarmPolicy) -> Self {
        Self {
            inner: Arc::new(AlarmInner {
                store,
                policy,
                lifecycle: ReentrantMutex::new(()),
                timers: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(1),
            }),
        }
    }

    pub fn policy(&self) -> &AlarmPolicy {
        &self.inner.policy
    }

    /// Hold the lifecycle lock so that a fall commit and the arming of its
    /// timer cannot be interleaved with a dismissal or an expiry.
    pub fn lifecycle(&self) -> ReentrantMutexGuard<'_, ()> {
        self.inner.lifecycle.lock()
    }

    /// Schedule expiry of `patient_id`'s fall after `delay`.
    ///
    /// Supersedes any timer already armed for the patient. Does nothing if
    /// the patient has no active fall. Must be called from within a tokio
    /// runtime. Returns the new timer's generation.
    pub fn arm(&self, patient_id: &str, delay: Duration) -> Option<u64> {
        let _lifecycle = self.inner.lifecycle.lock();
        if !self.inner.is_fallen(patient_id) {
            debug!(patient = patient_id, "no active fall, alarm timer not armed");
            self.cancel(patient_id);
            return None;
        }

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let deadline = Instant::now() + delay;

        // Spawn while holding the lock so the task cannot observe the map
        // before its own entry is in place.
        let mut timers = self.inner.timers.lock();
        let inner = Arc::clone(&self.inner);
        let id = patient_id.to_string();
        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            inner.expire(&id, generation);
        });

        let previous = timers.insert(
            patient_id.to_string(),
            ArmedTimer {
                generation,
                deadline,
                task,
            },
        );
        if let Some(previous) = previous {
            previous.task.abort();
            debug!(patient = patient_id, "previous alarm timer superseded");
        }

        debug!(patient = patient_id, ?delay, generation, "alarm timer armed");
        Some(generation)
    }

    /// Arm a timer with a delay drawn from the policy.
    pub fn arm_random<R: Rng + ?Sized>(&self, patient_id: &str, rng: &mut R) -> Option<u64> {
        let delay = self.inner.policy.sample_delay(rng);
        self.arm(patient_id, delay)
    }

    /// Arm a timer for every active fall that has none, such as falls
    /// present in seed data. Returns how many timers were armed.
    pub fn arm_unexpired<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let _lifecycle = self.inner.lifecycle.lock();
        let snapshot = self.inner.store.snapshot();
        let mut armed = 0;
        for patient in snapshot.patients().filter(|p| p.fall_detected()) {
            if !self.armed(&patient.id) && self.arm_random(&patient.id, rng).is_some() {
                warn!(patient = %patient.id, "fall active at startup, alarm armed");
                armed += 1;
            }
        }
        armed
    }

    /// Raise a fall for `patient_id` at `now` and arm its expiry timer.
    pub fn raise<R: Rng + ?Sized>(
        &self,
        patient_id: &str,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<(), EngineError> {
        let _lifecycle = self.inner.lifecycle.lock();
        if !self
            .inner
            .store
            .update_patient(patient_id, &PatientUpdate::raise_fall(now))
        {
            return Err(EngineError::PatientNotFound(patient_id.to_string()));
        }
        warn!(patient = patient_id, "fall detected, alarm raised");
        self.arm_random(patient_id, rng);
        Ok(())
    }

    /// Clear `patient_id`'s fall and cancel its timer.
    ///
    /// Idempotent. Unknown ids are ignored.
    pub fn dismiss(&self, patient_id: &str) {
        let _lifecycle = self.inner.lifecycle.lock();
        let cancelled = self.cancel(patient_id);
        let was_fallen = self.inner.is_fallen(patient_id);

        if !self
            .inner
            .store
            .update_patient(patient_id, &PatientUpdate::clear_fall())
        {
            debug!(patient = patient_id, "dismiss for unknown patient ignored");
            return;
        }

        if was_fallen || cancelled {
            info!(patient = patient_id, "fall alarm dismissed");
        }
    }

    /// Cancel the pending timer without touching the fall flag.
    pub fn cancel(&self, patient_id: &str) -> bool {
        match self.inner.timers.lock().remove(patient_id) {
            Some(timer) => {
                timer.task.abort();
                true
            }
            None => false,
        }
    }

    /// Whether a timer is pending for the patient.
    pub fn armed(&self, patient_id: &str) -> bool {
        self.inner.timers.lock().contains_key(patient_id)
    }

    /// Number of pending timers.
    pub fn armed_count(&self) -> usize {
        self.inner.timers.lock().len()
    }

    /// When the patient's pending timer fires.
    pub fn deadline(&self, patient_id: &str) -> Option<Instant> {
        self.inner.timers.lock().get(patient_id).map(|t| t.deadline)
    }

    /// Cancel every pending timer.
    pub fn shutdown(&self) {
        let timers: Vec<_> = self.inner.timers.lock().drain().collect();
        for (patient_id, timer) in timers {
            timer.task.abort();
            debug!(patient = %patient_id, "alarm timer cancelled on shutdown");
        }
    }
}

impl std::fmt::Debug for AlarmManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlarmManager")
            .field("policy", &self.inner.policy)
            .field("armed", &self.armed_count())
            .finish()
    }
}
