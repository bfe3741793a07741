use criterion::{criterion_group, criterion_main, Criterion};
use slimbuddy_tracker::services::connect_key::{hash_key, is_well_formed};
use slimbuddy_tracker::services::normalize::{
    length_to_cm, normalize_date, weight_to_kg, LengthUnit, WeightUnit,
};
use std::hint::black_box;

fn benchmark_normalize_date(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize_date");

    // Fast paths: already canonical and day-first
    group.bench_function("iso", |b| {
        b.iter(|| normalize_date(black_box(Some("2024-12-31"))))
    });
    group.bench_function("day_first_slashes", |b| {
        b.iter(|| normalize_date(black_box(Some("31/12/2024"))))
    });

    // Falls through to the general parser
    group.bench_function("rfc3339", |b| {
        b.iter(|| normalize_date(black_box(Some("2024-12-31T08:15:00+01:00"))))
    });
    group.bench_function("month_name", |b| {
        b.iter(|| normalize_date(black_box(Some("31 December 2024"))))
    });
    group.bench_function("garbage", |b| {
        b.iter(|| normalize_date(black_box(Some("next tuesday"))))
    });

    group.finish();
}

fn benchmark_units(c: &mut Criterion) {
    let mut group = c.benchmark_group("units");

    group.bench_function("st_lbs_to_kg", |b| {
        b.iter(|| {
            weight_to_kg(
                black_box(None),
                WeightUnit::StLbs,
                black_box(Some(12.0)),
                black_box(Some(7.0)),
            )
        })
    });
    group.bench_function("inches_to_cm", |b| {
        b.iter(|| length_to_cm(black_box(Some(32.0)), LengthUnit::Inches))
    });

    group.finish();
}

fn benchmark_connect_key_checks(c: &mut Criterion) {
    let key = "SB-4F9K-2MX-G-7QH2";

    c.bench_function("connect_key_shape_and_hash", |b| {
        b.iter(|| is_well_formed(black_box(key)) && !hash_key(black_box(key)).is_empty())
    });
}

criterion_group!(
    benches,
    benchmark_normalize_date,
    benchmark_units,
    benchmark_connect_key_checks
);
criterion_main!(benches);
