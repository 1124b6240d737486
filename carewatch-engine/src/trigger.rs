//! Summary trigger: asks the summarizer for a narrative when the observed
//! patient changes or falls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use carewatch_summary::{summarize_or_fallback, Summarizer, FALLBACK_NOTICE};
use carewatch_types::Patient;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{selectors, CommitListener, Snapshot};

/// What a commit means for the summary.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// New active patient, or the active patient just fell.
    Summarize(Arc<Patient>),
    /// No patient is selected any more.
    Cleared,
    Unchanged,
}

/// Tracks `(active patient id, fall flag)` across snapshots.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    last_revision: Option<u64>,
    observed: Option<(String, bool)>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `snapshot` against the last observed one.
    ///
    /// Snapshots older than one already seen are ignored.
    pub fn observe(&mut self, snapshot: &Snapshot) -> Observation {
        if self
            .last_revision
            .is_some_and(|seen| snapshot.revision < seen)
        {
            return Observation::Unchanged;
        }
        self.last_revision = Some(snapshot.revision);

        let Some(patient) = selectors::active_patient(snapshot) else {
            return match self.observed.take() {
                Some(_) => Observation::Cleared,
                None => Observation::Unchanged,
            };
        };

        let fallen = patient.fall_detected();
        let changed = match &self.observed {
            None => true,
            Some((id, was_fallen)) => *id != patient.id || (fallen && !was_fallen),
        };
        self.observed = Some((patient.id.clone(), fallen));

        if changed {
            Observation::Summarize(Arc::clone(patient))
        } else {
            Observation::Unchanged
        }
    }
}

/// The summary shown for the active patient.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SummaryState {
    #[default]
    Idle,
    Pending {
        patient_id: String,
    },
    Ready {
        patient_id: String,
        text: String,
    },
}

/// Commit listener that drives the summarizer.
pub struct SummaryTrigger {
    detector: Mutex<ChangeDetector>,
    summarizer: Arc<dyn Summarizer>,
    state: Arc<watch::Sender<SummaryState>>,
    latest_request: Arc<AtomicU64>,
}

impl SummaryTrigger {
    pub fn new(summarizer: Arc<dyn Summarizer>) -> Self {
        let (state, _) = watch::channel(SummaryState::Idle);
        Self {
            detector: Mutex::new(ChangeDetector::new()),
            summarizer,
            state: Arc::new(state),
            latest_request: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SummaryState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> SummaryState {
        self.state.borrow().clone()
    }

    /// Number of summaries requested so far.
    pub fn requests(&self) -> u64 {
        self.latest_request.load(Ordering::SeqCst)
    }

    fn request(&self, patient: Arc<Patient>) {
        let request = self.latest_request.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_replace(SummaryState::Pending {
            patient_id: patient.id.clone(),
        });
        debug!(patient = %patient.id, request, summarizer = self.summarizer.name(), "summary requested");

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(patient = %patient.id, "no runtime available, summary not generated");
            self.state.send_replace(SummaryState::Ready {
                patient_id: patient.id.clone(),
                text: FALLBACK_NOTICE.to_string(),
            });
            return;
        };

        let summarizer = Arc::clone(&self.summarizer);
        let state = Arc::clone(&self.state);
        let latest = Arc::clone(&self.latest_request);
        runtime.spawn(async move {
            let text = summarize_or_fallback(summarizer.as_ref(), &patient).await;
            if latest.load(Ordering::SeqCst) != request {
                debug!(patient = %patient.id, request, "stale summary dropped");
                return;
            }
            info!(patient = %patient.id, "summary ready");
            state.send_replace(SummaryState::Ready {
                patient_id: patient.id.clone(),
                text,
            });
        });
    }
}

impl CommitListener for SummaryTrigger {
    fn on_commit(&self, snapshot: &Snapshot) {
        let observation = self.detector.lock().observe(snapshot);
        match observation {
            Observation::Summarize(patient) => self.request(patient),
            Observation::Cleared => {
                self.latest_request.fetch_add(1, Ordering::SeqCst);
                self.state.send_replace(SummaryState::Idle);
            }
            Observation::Unchanged => {}
        }
    }
}

impl std::fmt::Debug for SummaryTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummaryTrigger")
            .field("summarizer", &self.summarizer.name())
            .field("requests", &self.requests())
            .finish()
    }
}
