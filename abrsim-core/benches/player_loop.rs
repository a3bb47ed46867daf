use abrsim_core::config::PlayerConfig;
use abrsim_core::player::Player;
use abrsim_core::trace::{BandwidthTrace, TraceSample};
use criterion::{Criterion, criterion_group, criterion_main};

fn hour_long_trace() -> BandwidthTrace {
    let samples = (0..3600u64)
        .map(|second| TraceSample::with_bandwidth(400 + (second * 37) % 3000, 1000))
        .collect();
    BandwidthTrace::from_samples("bench", samples)
}

fn bench_player_run(c: &mut Criterion) {
    let trace = hour_long_trace();
    c.bench_function("player_run_one_hour", |b| {
        b.iter(|| {
            let config = PlayerConfig {
                record_ticks: false,
                ..Default::default()
            };
            Player::new(&trace, config).unwrap().run()
        });
    });
}

fn bench_trace_lookup(c: &mut Criterion) {
    let trace = hour_long_trace();
    c.bench_function("trace_cursor_full_scan", |b| {
        b.iter(|| {
            let mut cursor = trace.cursor();
            let mut time_ms = 0;
            while cursor.bandwidth_at(time_ms).is_some() {
                time_ms += 200;
            }
            time_ms
        });
    });
}

criterion_group!(benches, bench_player_run, bench_trace_lookup);
criterion_main!(benches);
