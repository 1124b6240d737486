//! Raise, expiry and dismissal of fall alarms under virtual time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use carewatch_engine::{
    AlarmManager, AlarmPolicy, CommitListener, Engine, SimulationPolicy, Snapshot, TickOutcome,
};
use carewatch_types::{Facility, Patient};
use chrono::Utc;

fn engine(fall_probability: f64) -> Engine {
    engine_with(Patient::builder("p1", "Ana").build(), fall_probability)
}

fn engine_with(patient: Patient, fall_probability: f64) -> Engine {
    Engine::builder()
        .facility(Facility::builder("home-1", "A").patient(patient).build())
        .simulation(SimulationPolicy {
            fall_probability,
            ..Default::default()
        })
        .alarm(AlarmPolicy::fixed(Duration::from_secs(20)))
        .rng_seed(1)
        .build()
        .unwrap()
}

fn fallen(engine: &Engine) -> bool {
    engine.active_patient().unwrap().fall_detected()
}

async fn settle() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn forced_fall_expires_after_timer() {
    let engine = engine(1.0);

    let outcome = engine.tick();
    assert_eq!(outcome.raised_fall(), Some("p1"));
    assert!(fallen(&engine));
    assert!(engine.alarms().armed("p1"));
    assert!(engine.active_patient().unwrap().fall_timestamp.is_some());

    tokio::time::advance(Duration::from_secs(20)).await;
    settle().await;

    let patient = engine.active_patient().unwrap();
    assert!(!patient.fall_detected());
    assert_eq!(patient.fall_timestamp, None);
    assert_eq!(engine.alarms().armed_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn manual_dismiss_cancels_timer() {
    let engine = engine(1.0);
    engine.tick();
    assert!(fallen(&engine));

    tokio::time::advance(Duration::from_secs(5)).await;
    engine.dismiss_fall_alert("p1");
    assert!(!fallen(&engine));
    assert_eq!(engine.alarms().armed_count(), 0);

    let revision = engine.store().revision();
    tokio::time::advance(Duration::from_secs(30)).await;
    settle().await;
    assert_eq!(engine.store().revision(), revision, "no spurious commit");
}

#[tokio::test(start_paused = true)]
async fn dismiss_after_expiry_is_harmless() {
    let engine = engine(1.0);
    engine.tick();

    tokio::time::advance(Duration::from_secs(21)).await;
    settle().await;
    assert!(!fallen(&engine));

    engine.dismiss_fall_alert("p1");
    engine.dismiss_fall_alert("p1");
    let patient = engine.active_patient().unwrap();
    assert!(!patient.fall_detected());
    assert_eq!(patient.fall_timestamp, None);
}

#[tokio::test(start_paused = true)]
async fn ticks_resume_after_fall_clears() {
    let engine = engine(1.0);
    engine.tick();
    assert!(matches!(
        engine.tick(),
        TickOutcome::SkippedFallActive { .. }
    ));

    engine.dismiss_fall_alert("p1");
    assert!(matches!(engine.tick(), TickOutcome::Committed { .. }));
}

#[tokio::test(start_paused = true)]
async fn external_raise_arms_a_single_timer() {
    let engine = engine(0.0);

    engine.raise_fall("p1").unwrap();
    engine.raise_fall("p1").unwrap();
    assert_eq!(engine.alarms().armed_count(), 1);

    tokio::time::advance(Duration::from_secs(20)).await;
    settle().await;
    assert!(!fallen(&engine));
    assert_eq!(engine.alarms().armed_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn running_engine_raises_and_expires_falls() {
    let engine = engine(1.0);
    let handle = engine.start();

    // First tick fires one period after start
    tokio::time::sleep(Duration::from_millis(3100)).await;
    assert!(fallen(&engine));

    // Ticks during the alarm are skipped; the timer clears it at 23s and
    // the tick at 24s raises a new one
    tokio::time::sleep(Duration::from_secs(21)).await;
    settle().await;
    assert!(fallen(&engine));
    assert_eq!(engine.alarms().armed_count(), 1);

    handle.stop();
    assert_eq!(engine.alarms().armed_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn seeded_fall_expires_once_started() {
    let patient = Patient::builder("p1", "Ana").fallen_at(Utc::now()).build();
    let engine = engine_with(patient, 0.0);
    assert!(fallen(&engine));
    assert_eq!(engine.alarms().armed_count(), 0);

    let handle = engine.start();
    assert!(engine.alarms().armed("p1"));

    tokio::time::sleep(Duration::from_secs(21)).await;
    settle().await;
    assert!(!fallen(&engine));
    assert_eq!(engine.alarms().armed_count(), 0);

    handle.stop();
}

/// Dismisses the first fall it sees, from inside the commit that raised it.
struct DismissOnFall {
    alarms: AlarmManager,
    fired: AtomicBool,
}

impl CommitListener for DismissOnFall {
    fn on_commit(&self, snapshot: &Snapshot) {
        let fallen = snapshot.patient("p1").is_some_and(|p| p.fall_detected());
        if fallen && !self.fired.swap(true, Ordering::SeqCst) {
            self.alarms.dismiss("p1");
        }
    }
}

#[tokio::test(start_paused = true)]
async fn fall_dismissed_during_commit_leaves_no_timer() {
    let engine = engine(1.0);
    let listener = Arc::new(DismissOnFall {
        alarms: engine.alarms().clone(),
        fired: AtomicBool::new(false),
    });
    engine.store().add_listener(listener.clone());

    assert_eq!(engine.tick().raised_fall(), Some("p1"));
    assert!(listener.fired.load(Ordering::SeqCst));
    assert!(!fallen(&engine));
    assert_eq!(engine.alarms().armed_count(), 0);

    let revision = engine.store().revision();
    tokio::time::advance(Duration::from_secs(30)).await;
    settle().await;
    assert_eq!(engine.store().revision(), revision);
}
