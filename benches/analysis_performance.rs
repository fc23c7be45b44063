use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use laptrace::stats::{HampelParams, hampel, rolling_mean};
use laptrace::telemetry::{
    Channel, LapLabel, LapTel, LapTelemetry, TelemetrySample,
    diff::{DiffOptions, Marker, channel_delta, col_max_inds},
};
use std::time::Duration;

fn lap_times(count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| 90_000.0 + (i as f64 * 0.37).sin() * 800.0 + if i % 17 == 0 { 6_000.0 } else { 0.0 })
        .collect()
}

fn lap(driver: &str, lap_number: u32, samples: usize, offset: f64) -> LapTelemetry {
    let speed: Vec<f64> = (0..samples)
        .map(|i| 200.0 + (i as f64 / 40.0 + offset).sin() * 90.0)
        .collect();
    LapTelemetry {
        driver: driver.to_string(),
        lap_number: LapLabel::Number(lap_number),
        tel: TelemetrySample {
            time: (0..samples).map(|i| i as f64 * 16.0 + offset * i as f64).collect(),
            distance: (0..samples).map(|i| i as f64 * 5.0).collect(),
            speed,
            ..Default::default()
        },
    }
}

fn bench_lap_filters(c: &mut Criterion) {
    let mut group = c.benchmark_group("lap_filters");

    for count in [50, 500, 5000] {
        let times = lap_times(count);
        group.bench_with_input(BenchmarkId::new("hampel", count), &times, |b, times| {
            b.iter(|| hampel(black_box(times), HampelParams::default()).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("rolling_mean", count), &times, |b, times| {
            b.iter(|| rolling_mean(black_box(times), 7).unwrap());
        });
    }

    group.finish();
}

fn bench_telemetry_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("telemetry_diff");

    let lap_tel = LapTel::new(vec![
        lap("VER", 44, 1200, 0.0),
        lap("LEC", 45, 1200, 0.1),
        lap("HAM", 43, 1200, 0.2),
    ])
    .unwrap();
    let options = DiffOptions {
        marker: Some(Marker::Fraction(0.5)),
        rolling: Some(5),
        ..Default::default()
    };

    group.bench_function("time_delta", |b| {
        b.iter(|| channel_delta(black_box(&lap_tel), Channel::Time, 0, 1, &options).unwrap());
    });

    group.bench_function("fastest_lap_per_sample", |b| {
        b.iter(|| col_max_inds(black_box(&lap_tel), Channel::Speed).unwrap());
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(5))
        .sample_size(50);
    targets = bench_lap_filters, bench_telemetry_diff
}
criterion_main!(benches);
