//! Summary requests driven by selection changes and falls.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use carewatch_engine::{Engine, EngineHandle, SummaryState};
use carewatch_summary::{Summarizer, SummaryError, FALLBACK_NOTICE};
use carewatch_types::{Facility, Patient, PatientUpdate};
use chrono::Utc;

#[derive(Debug, Default)]
struct Recording {
    calls: AtomicUsize,
    delay: Option<Duration>,
    fail: bool,
}

#[async_trait]
impl Summarizer for Recording {
    async fn summarize(&self, patient: &Patient) -> Result<String, SummaryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(SummaryError::Auth("bad key".to_string()));
        }
        Ok(format!("{} is fine", patient.name))
    }

    fn name(&self) -> &str {
        "recording"
    }
}

fn start(summarizer: Arc<Recording>) -> (Engine, EngineHandle) {
    let engine = Engine::builder()
        .facility(
            Facility::builder("home-1", "A")
                .patient(Patient::builder("p1", "Ana").build())
                .patient(Patient::builder("p2", "Bruno").build())
                .build(),
        )
        .facility(Facility::new("home-2", "Empty"))
        .tick_period(Duration::from_secs(3600))
        .rng_seed(1)
        .summarizer(summarizer)
        .build()
        .unwrap();
    let handle = engine.start();
    (engine, handle)
}

async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

fn current(engine: &Engine) -> SummaryState {
    engine.summaries().unwrap().borrow().clone()
}

#[tokio::test(start_paused = true)]
async fn one_request_per_observed_change() {
    let summarizer = Arc::new(Recording::default());
    let (engine, handle) = start(summarizer.clone());
    settle().await;
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        current(&engine),
        SummaryState::Ready {
            patient_id: "p1".to_string(),
            text: "Ana is fine".to_string()
        }
    );

    // Plain telemetry does not trigger
    for steps in [10, 20, 30] {
        engine
            .store()
            .update_patient("p1", &PatientUpdate::new().step_count(steps));
    }
    settle().await;
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);

    engine.select_patient("p2").unwrap();
    settle().await;
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 2);

    engine
        .store()
        .update_patient("p2", &PatientUpdate::raise_fall(Utc::now()));
    engine
        .store()
        .update_patient("p2", &PatientUpdate::new().step_count(5));
    settle().await;
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 3);

    handle.stop();
}

#[tokio::test(start_paused = true)]
async fn failure_falls_back_to_notice() {
    let summarizer = Arc::new(Recording {
        fail: true,
        ..Default::default()
    });
    let (engine, handle) = start(summarizer);
    settle().await;

    assert_eq!(
        current(&engine),
        SummaryState::Ready {
            patient_id: "p1".to_string(),
            text: FALLBACK_NOTICE.to_string()
        }
    );
    handle.stop();
}

#[tokio::test(start_paused = true)]
async fn superseded_result_is_dropped() {
    let summarizer = Arc::new(Recording {
        delay: Some(Duration::from_secs(2)),
        ..Default::default()
    });
    let (engine, handle) = start(summarizer.clone());
    settle().await;
    assert_eq!(
        current(&engine),
        SummaryState::Pending {
            patient_id: "p1".to_string()
        }
    );

    tokio::time::advance(Duration::from_secs(1)).await;
    engine.select_patient("p2").unwrap();

    // p1's summary finishes first but must not be shown
    tokio::time::advance(Duration::from_millis(1500)).await;
    settle().await;
    assert_eq!(
        current(&engine),
        SummaryState::Pending {
            patient_id: "p2".to_string()
        }
    );

    tokio::time::advance(Duration::from_secs(1)).await;
    settle().await;
    assert_eq!(
        current(&engine),
        SummaryState::Ready {
            patient_id: "p2".to_string(),
            text: "Bruno is fine".to_string()
        }
    );
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 2);
    handle.stop();
}

#[tokio::test(start_paused = true)]
async fn empty_facility_goes_idle() {
    let summarizer = Arc::new(Recording::default());
    let (engine, handle) = start(summarizer.clone());
    settle().await;

    engine.select_facility("home-2").unwrap();
    settle().await;
    assert_eq!(current(&engine), SummaryState::Idle);
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);
    handle.stop();
}
