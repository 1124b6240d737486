//! Invariants that must hold after any sequence of ticks and commits.

use std::sync::Arc;

use carewatch_engine::{selectors, Engine, SimulationPolicy, TickOutcome};
use carewatch_types::{
    ActivityLevel, Facility, Patient, PatientUpdate, Room, MAX_TEMPERATURE, MIN_TEMPERATURE,
    MOVEMENT_HISTORY_LEN,
};
use chrono::Utc;

fn facilities() -> Vec<Facility> {
    vec![
        Facility::builder("home-1", "Los Olivos")
            .patient(
                Patient::builder("p1", "Ana")
                    .room(Room::Kitchen)
                    .steps(1200, 3000)
                    .build(),
            )
            .patient(Patient::builder("p2", "Bruno").temperature(29.8).build())
            .patient(
                Patient::builder("p3", "Carmen")
                    .temperature(15.1)
                    .steps(2990, 3000)
                    .build(),
            )
            .build(),
        Facility::builder("home-2", "El Pinar")
            .patient(Patient::builder("p4", "Diego").build())
            .build(),
        Facility::new("home-3", "Casa Vacía"),
    ]
}

fn engine(policy: SimulationPolicy, seed: u64) -> Engine {
    Engine::builder()
        .facilities(facilities())
        .simulation(policy)
        .rng_seed(seed)
        .build()
        .unwrap()
}

fn no_falls() -> SimulationPolicy {
    SimulationPolicy {
        fall_probability: 0.0,
        ..Default::default()
    }
}

#[tokio::test]
async fn invariants_hold_after_many_ticks() {
    let policy = SimulationPolicy {
        room_change_probability: 0.5,
        temperature_drift: 2.0,
        meal_probability: 0.3,
        ..no_falls()
    };

    for seed in [1, 7, 42] {
        let engine = engine(policy.clone(), seed);
        for _ in 0..500 {
            engine.tick();
            let snapshot = engine.snapshot();
            snapshot.check_invariants().unwrap();

            for patient in snapshot.patients() {
                assert_eq!(patient.movement_history.len(), MOVEMENT_HISTORY_LEN);
                assert_eq!(patient.weekly_steps.today().steps, patient.step_count);
                assert!(
                    (MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&patient.room_temperature),
                    "{} at {}",
                    patient.id,
                    patient.room_temperature
                );
                assert_eq!(patient.fall_detected(), patient.fall_timestamp.is_some());
            }
        }
    }
}

#[tokio::test]
async fn only_active_facility_is_simulated() {
    let engine = engine(no_falls(), 3);
    let before = engine.snapshot();

    for _ in 0..100 {
        engine.tick();
    }

    let after = engine.snapshot();
    assert!(Arc::ptr_eq(&before.facilities[1], &after.facilities[1]));
    assert!(Arc::ptr_eq(&before.facilities[2], &after.facilities[2]));
}

#[tokio::test]
async fn fallen_patient_is_frozen() {
    let engine = Engine::builder()
        .facility(
            Facility::builder("home-1", "A")
                .patient(Patient::builder("p1", "Ana").steps(100, 3000).build())
                .build(),
        )
        .simulation(SimulationPolicy {
            moving_probability: 1.0,
            room_change_probability: 1.0,
            ..no_falls()
        })
        .rng_seed(5)
        .build()
        .unwrap();

    engine
        .store()
        .update_patient("p1", &PatientUpdate::raise_fall(Utc::now()));
    let frozen = engine.active_patient().unwrap();

    for _ in 0..50 {
        assert_eq!(
            engine.tick(),
            TickOutcome::SkippedFallActive {
                patient_id: "p1".to_string()
            }
        );
    }

    let patient = engine.active_patient().unwrap();
    assert!(Arc::ptr_eq(&frozen, &patient));
    assert_eq!(patient.step_count, 100);
    assert_eq!(patient.activity_level, ActivityLevel::None);
    assert_eq!(patient.location, Room::LivingRoom);
}

#[tokio::test]
async fn select_facility_never_leaks_previous_patient() {
    let engine = engine(no_falls(), 11);

    for (facility, expected) in [
        ("home-2", Some("p4")),
        ("home-3", None),
        ("home-1", Some("p1")),
        ("home-3", None),
    ] {
        engine.select_facility(facility).unwrap();
        engine.tick();
        let snapshot = engine.snapshot();
        let active = selectors::active_patient(&snapshot).map(|p| p.id.as_str());
        assert_eq!(active, expected, "after selecting {facility}");
        snapshot.check_invariants().unwrap();
    }
}

#[tokio::test]
async fn unknown_ids_leave_state_unchanged() {
    let engine = engine(no_falls(), 2);
    let before = engine.snapshot();

    assert!(engine.select_facility("missing").unwrap_err().is_not_found());
    assert!(engine.select_patient("p4").unwrap_err().is_not_found());
    assert!(engine.raise_fall("missing").unwrap_err().is_not_found());
    engine.dismiss_fall_alert("missing");

    let after = engine.snapshot();
    assert_eq!(after.revision, before.revision);
    assert_eq!(after.selection, before.selection);
}

#[tokio::test]
async fn steps_grow_within_bounds_until_goal() {
    let engine = Engine::builder()
        .facility(
            Facility::builder("home-1", "A")
                .patient(Patient::builder("p1", "Ana").steps(1450, 3000).build())
                .build(),
        )
        .simulation(SimulationPolicy {
            moving_probability: 1.0,
            ..no_falls()
        })
        .rng_seed(1450)
        .build()
        .unwrap();

    let mut previous = 1450;
    for _ in 0..200 {
        assert!(matches!(engine.tick(), TickOutcome::Committed { .. }));
        let steps = engine.active_patient().unwrap().step_count;

        if previous < 3000 {
            let delta = steps - previous;
            assert!((5..=14).contains(&delta), "grew by {delta}");
        } else {
            assert_eq!(steps, previous, "count must stick once the goal is reached");
        }
        previous = steps;
    }
}

#[tokio::test]
async fn steps_strictly_increase_below_goal() {
    let engine = Engine::builder()
        .facility(
            Facility::builder("home-1", "A")
                .patient(Patient::builder("p1", "Ana").steps(1450, 3000).build())
                .build(),
        )
        .simulation(SimulationPolicy {
            moving_probability: 1.0,
            step_increment_min: 5,
            step_increment_max: 7,
            ..no_falls()
        })
        .rng_seed(9)
        .build()
        .unwrap();

    let mut previous = 1450;
    for _ in 0..200 {
        engine.tick();
        let steps = engine.active_patient().unwrap().step_count;
        assert!(steps > previous);
        assert!(steps - previous <= 14);
        previous = steps;
    }
    assert!(previous < 3000);
}
