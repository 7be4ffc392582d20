use std::rc::Rc;

use frame_timer_core::{
    callback_key, CallbackKey, FixedClock, OwnerId, Repeat, SchedulerConfig, TimerIdentity,
    TimerRequest, TimerRuntime,
};
use frame_timer_testing::{EventLog, TimerHarness};

#[test]
fn three_repeats_then_finish() {
    let harness = TimerHarness::new();
    let handle = harness.handle();
    let owner = OwnerId::next();
    let key = CallbackKey::named("pulse");
    let log = EventLog::new();

    let request = TimerRequest::new(100, Repeat::Times(3), log.recorder("fire"))
        .with_identity(key, owner)
        .on_finish(log.recorder("finish"));
    handle.schedule_after(request).expect("schedule");

    let mut seen = Vec::new();
    for now in (0..=400).step_by(50) {
        harness.advance_to(now);
        seen.push((now, log.count(&"fire"), handle.exists(key, owner)));
    }

    assert_eq!(
        seen,
        vec![
            (0, 0, true),
            (50, 0, true),
            (100, 1, true),
            (150, 1, true),
            (200, 2, true),
            (250, 2, true),
            (300, 3, false),
            (350, 3, false),
            (400, 3, false),
        ]
    );
    assert_eq!(log.snapshot(), vec!["fire", "fire", "fire", "finish"]);
}

#[test]
fn next_frame_callback_runs_during_first_tick() {
    let harness = TimerHarness::new();
    let log = EventLog::new();
    let mut record = log.recorder("next");
    harness
        .handle()
        .schedule_next_frame(move || record())
        .expect("schedule");

    harness.advance_to(16);
    assert_eq!(log.len(), 1);
    harness.advance_to(32);
    assert_eq!(log.len(), 1);
}

#[test]
fn pops_always_return_the_earliest_fire_time() {
    let harness = TimerHarness::new();
    let handle = harness.handle();
    let log: EventLog<u64> = EventLog::new();

    // a scrambled but deterministic set of start times and delays
    for index in 0..64u64 {
        let start = (index * 37) % 101;
        let delay = (index * 13) % 29;
        let log = log.clone();
        handle
            .schedule_at(
                start,
                TimerRequest::once(delay, move || log.push(start + delay)),
            )
            .expect("schedule");
    }

    harness.run_frames(200, 1);
    let fired = log.snapshot();
    assert_eq!(fired.len(), 64);
    assert!(fired.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn backlog_after_a_stall_is_spread_over_frames() {
    let harness = TimerHarness::with_config(SchedulerConfig::default().with_frame_budget(5));
    let handle = harness.handle();
    let clock = harness.clock();
    let log: EventLog<u64> = EventLog::new();

    for _ in 0..12 {
        let clock = clock.clone();
        let log = log.clone();
        handle
            .schedule_once(10, move || {
                clock.advance(3);
                log.push(1);
            })
            .expect("schedule");
    }

    // nothing ran for a whole second
    harness.advance_to(1_000);
    assert_eq!(log.len(), 2);

    harness.tick();
    assert_eq!(log.len(), 4);

    assert!(harness.run_until_idle(16, 10));
    assert_eq!(log.len(), 12);
}

#[test]
fn retired_and_cancelled_entries_leave_no_trace() {
    let harness = TimerHarness::new();
    let handle = harness.handle();
    let owner = OwnerId::next();
    let key = callback_key!();

    let done = handle
        .schedule_after(TimerRequest::once(10, || {}).with_identity(key, owner))
        .expect("schedule");
    let cancelled = handle
        .schedule_after(TimerRequest::forever(10, || {}).with_identity(key, owner))
        .expect("schedule");

    harness.advance_to(10);
    assert!(!handle.is_pending(done));
    assert!(handle.is_pending(cancelled));
    assert!(handle.exists(key, owner));

    assert!(handle.cancel(cancelled));
    assert!(!handle.exists(key, owner));
    assert_eq!(harness.runtime().pending_count(), 0);

    // a reused slot must not resurrect the stale handles
    let fresh = handle.schedule_once(10, || {}).expect("schedule");
    assert!(handle.is_pending(fresh));
    assert!(!handle.is_pending(done));
    assert!(!handle.is_pending(cancelled));
    assert!(!handle.cancel(done));
    assert!(handle.is_pending(fresh));
}

#[test]
fn owner_teardown_cancels_every_timer_of_the_widget() {
    let harness = TimerHarness::new();
    let handle = harness.handle();
    let widget = OwnerId::next();
    let log = EventLog::new();

    for (name, delay) in [("sample", 16), ("blink", 250), ("hint", 1_000)] {
        handle
            .schedule_after(
                TimerRequest::new(delay, Repeat::Forever, log.recorder(name))
                    .with_identity(CallbackKey::named(name), widget),
            )
            .expect("schedule");
    }
    let next_frame = handle
        .schedule_next_frame_for(
            TimerIdentity::new(CallbackKey::named("layout"), widget),
            {
                let mut record = log.recorder("layout");
                move || record()
            },
        )
        .expect("schedule");

    harness.run_frames(4, 16);
    assert_eq!(log.count(&"layout"), 1);
    assert!(!handle.is_pending(next_frame));
    let sampled = log.count(&"sample");
    assert!(sampled >= 3);

    assert_eq!(handle.cancel_all(widget), 3);
    harness.run_frames(100, 16);
    assert_eq!(log.count(&"sample"), sampled);
    assert_eq!(log.count(&"blink"), 0);
    assert!(harness.runtime().is_idle());
}

#[test]
fn on_finish_can_chain_a_new_timer() {
    let harness = TimerHarness::new();
    let handle = harness.handle();
    let log = EventLog::new();

    let chained = {
        let handle = handle.clone();
        let log = log.clone();
        move || {
            handle
                .schedule_once(50, log.recorder("chained"))
                .expect("schedule from on_finish");
        }
    };
    let request = TimerRequest::new(10, Repeat::Times(2), log.recorder("step")).on_finish(chained);
    handle.schedule_after(request).expect("schedule");

    harness.run_frames(10, 10);
    assert_eq!(log.snapshot(), vec!["step", "step", "chained"]);
}

#[test]
fn fixed_clock_runtime_driven_by_tick_alone() {
    let runtime = TimerRuntime::new(Rc::new(FixedClock(0)));
    let handle = runtime.handle();
    let log = EventLog::new();

    let detached = handle
        .register(TimerRequest::new(10, Repeat::Times(2), log.recorder("detached")))
        .expect("register")
        .detach();
    let guarded = handle
        .register(TimerRequest::forever(10, log.recorder("guarded")))
        .expect("register");
    let cancelled = handle
        .register(TimerRequest::once(10, log.recorder("cancelled")))
        .expect("register");
    assert!(cancelled.cancel());

    runtime.tick(10);
    assert!(guarded.is_pending());
    drop(guarded);

    // with a frozen clock a repeat is only held back past the tick that fired it
    runtime.tick(11);
    runtime.tick(20);
    assert_eq!(log.snapshot(), vec!["detached", "guarded", "detached"]);
    assert!(detached.is_some_and(|token| !handle.is_pending(token)));
    assert!(runtime.is_idle());
}
