use criterion::{black_box, criterion_group, criterion_main, Criterion};

use carewatch_engine::{SimulationPolicy, Simulator, Store};
use carewatch_types::{Facility, Patient};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn store(patients: usize) -> Store {
    let mut facility = Facility::builder("home-1", "Bench");
    for i in 0..patients {
        facility =
            facility.patient(Patient::builder(format!("p{i}"), format!("Patient {i}")).build());
    }
    Store::new(vec![facility.build(), Facility::new("home-2", "Other")]).unwrap()
}

fn bench_tick(c: &mut Criterion) {
    let policy = SimulationPolicy {
        fall_probability: 0.0,
        ..Default::default()
    };
    let simulator = Simulator::new(policy);

    for patients in [4, 64, 512] {
        let store = store(patients);
        let mut rng = StdRng::seed_from_u64(0);
        c.bench_function(&format!("tick/{patients}_patients"), |b| {
            b.iter(|| black_box(simulator.tick(&store, &mut rng, Utc::now())))
        });
    }
}

fn bench_snapshot(c: &mut Criterion) {
    let store = store(512);
    c.bench_function("snapshot/512_patients", |b| {
        b.iter(|| black_box(store.snapshot()))
    });
}

criterion_group!(benches, bench_tick, bench_snapshot);
criterion_main!(benches);
