use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rewards_tracker::models::{Coordinate, LocationBucket, LocationSample, Restaurant};
use rewards_tracker::services::geo_math::distance_meters;
use rewards_tracker::services::points_policy::{apply_restaurant_bonus, steps_to_points};
use rewards_tracker::services::ProximityState;

fn benchmark_location_update(c: &mut Criterion) {
    let here = Coordinate::new(40.7306, -73.9352).expect("valid coordinate");
    let there = Coordinate::new(40.7484, -73.9857).expect("valid coordinate");

    let sample = LocationSample {
        coordinate: here,
        heading: Some(45.0),
        timestamp: Utc::now(),
    };
    let destination = Restaurant {
        id: "r-1".to_string(),
        name: "Corner Bistro".to_string(),
        coordinate: there,
        address: None,
        cuisine: None,
        rating: None,
    };

    // Work done for every location sample
    let mut group = c.benchmark_group("location_update");

    group.bench_function("haversine_distance", |b| {
        b.iter(|| distance_meters(black_box(&here), black_box(&there)))
    });

    group.bench_function("proximity_state", |b| {
        b.iter(|| {
            ProximityState::compute(
                black_box(Some(&sample)),
                black_box(Some(&destination)),
                150.0,
            )
        })
    });

    group.bench_function("location_bucket", |b| {
        b.iter(|| LocationBucket::from_coordinate(black_box(here), 250.0))
    });

    group.finish();
}

fn benchmark_points(c: &mut Criterion) {
    c.bench_function("steps_to_points", |b| {
        b.iter(|| {
            (0..10_000u64)
                .step_by(97)
                .map(|s| steps_to_points(black_box(s)))
                .sum::<u64>()
        })
    });

    c.bench_function("restaurant_bonus", |b| {
        b.iter(|| apply_restaurant_bonus(black_box(7_143), black_box(5_000.0)))
    });
}

criterion_group!(benches, benchmark_location_update, benchmark_points);
criterion_main!(benches);
