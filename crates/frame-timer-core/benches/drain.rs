use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use frame_timer_core::{CallbackKey, OwnerId, Repeat, SchedulerConfig, TimerRequest};
use frame_timer_testing::TimerHarness;

const FRAME_MILLIS: u64 = 16;
const TIMER_COUNT_SAMPLES: &[usize] = &[16, 64, 256, 1024];

fn prewarmed_harness(capacity: usize) -> TimerHarness {
    TimerHarness::with_config(SchedulerConfig::default().with_initial_capacity(capacity))
}

fn bench_schedule_and_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("schedule_and_drain");
    for &count in TIMER_COUNT_SAMPLES {
        group.bench_with_input(BenchmarkId::new("timers", count), &count, |b, &count| {
            let harness = prewarmed_harness(count);
            let handle = harness.handle();
            b.iter(|| {
                for index in 0..count {
                    let delay = (index as u64 * 7) % FRAME_MILLIS;
                    handle
                        .schedule_once(delay, || {})
                        .expect("schedule");
                }
                harness.advance_by(FRAME_MILLIS);
                black_box(harness.runtime().pooled_count());
            });
        });
    }
    group.finish();
}

fn bench_repeating_frames(c: &mut Criterion) {
    let mut group = c.benchmark_group("repeating_frame");
    for &count in TIMER_COUNT_SAMPLES {
        group.bench_with_input(BenchmarkId::new("timers", count), &count, |b, &count| {
            let harness = prewarmed_harness(count);
            let handle = harness.handle();
            for index in 0..count {
                let interval = 1 + (index as u64 % FRAME_MILLIS);
                handle
                    .schedule_repeating(interval, Repeat::Forever, || {})
                    .expect("schedule");
            }
            b.iter(|| harness.advance_by(FRAME_MILLIS));
        });
    }
    group.finish();
}

fn bench_cancel_owner(c: &mut Criterion) {
    let harness = prewarmed_harness(256);
    let handle = harness.handle();
    let owners: Vec<OwnerId> = (0..16).map(|_| OwnerId::next()).collect();
    let key = CallbackKey::named("bench");

    c.bench_function("cancel_all_owner", |b| {
        b.iter(|| {
            for (index, owner) in owners.iter().cycle().take(256).enumerate() {
                let request = TimerRequest::once(1_000 + index as u64, || {})
                    .with_identity(key, *owner);
                handle.schedule_after(request).expect("schedule");
            }
            for owner in &owners {
                black_box(handle.cancel_all(*owner));
            }
        });
    });
}

criterion_group!(
    drain,
    bench_schedule_and_drain,
    bench_repeating_frames,
    bench_cancel_owner
);
criterion_main!(drain);
