//! Standard clock and frame driver backed by Rust's `std` library.
//!
//! This crate provides a concrete [`Clock`] for `frame-timer-core`. Hosts
//! construct a [`StdTimerRuntime`], hand its [`TimerRuntimeHandle`] to
//! whatever schedules timers, and call [`StdTimerRuntime::drive_frame`]
//! once per frame.

use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use frame_timer_core::{Clock, SchedulerConfig, TimerRuntime, TimerRuntimeHandle};

/// Clock implementation backed by [`std::time::Instant`].
///
/// Reports milliseconds elapsed since the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    origin: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn origin(&self) -> Instant {
        self.origin
    }

    /// Returns the elapsed time as a [`Duration`] for convenience.
    pub fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now_millis(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Convenience container bundling the standard clock and a timer runtime.
#[derive(Clone)]
pub struct StdTimerRuntime {
    clock: Rc<StdClock>,
    runtime: TimerRuntime,
}

impl StdTimerRuntime {
    /// Creates a runtime with the default configuration.
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        let clock = Rc::new(StdClock::new());
        let runtime = TimerRuntime::with_config(clock.clone(), config);
        Self { clock, runtime }
    }

    /// Returns the underlying [`TimerRuntime`].
    pub fn runtime(&self) -> TimerRuntime {
        self.runtime.clone()
    }

    /// Returns a handle for scheduling and cancelling timers.
    pub fn handle(&self) -> TimerRuntimeHandle {
        self.runtime.handle()
    }

    /// Returns the clock implementation.
    pub fn clock(&self) -> Rc<StdClock> {
        Rc::clone(&self.clock)
    }

    /// Runs one frame at the clock's current time and returns that time.
    pub fn drive_frame(&self) -> u64 {
        let now = self.clock.now_millis();
        log::trace!("driving frame at {now}ms");
        self.runtime.tick(now);
        now
    }

    /// Returns whether another frame has work to do.
    pub fn wants_frame(&self) -> bool {
        !self.runtime.is_idle()
    }

    /// Time until the earliest queued timer is due, or `None` when nothing
    /// is queued. Zero when a timer is already overdue.
    pub fn time_until_next(&self) -> Option<Duration> {
        let due = self.runtime.next_due()?;
        let now = self.clock.now_millis();
        Some(Duration::from_millis(due.saturating_sub(now)))
    }
}

impl fmt::Debug for StdTimerRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdTimerRuntime")
            .field("clock", &self.clock)
            .field("runtime", &self.runtime)
            .finish()
    }
}

impl Default for StdTimerRuntime {
    fn default() -> Self {
        Self::new()
    }
}
