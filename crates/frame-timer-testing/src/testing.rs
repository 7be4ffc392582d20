use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use frame_timer_core::{Clock, SchedulerConfig, TimerRuntime, TimerRuntimeHandle};

/// Clock whose time only moves when a test moves it.
///
/// Clones share the same time, so a clone captured by a callback can
/// simulate a slow callback by advancing the clock.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new(now: u64) -> Self {
        Self {
            now: Rc::new(Cell::new(now)),
        }
    }

    pub fn set(&self, now: u64) {
        self.now.set(now);
    }

    pub fn advance(&self, millis: u64) {
        self.now.set(self.now.get().saturating_add(millis));
    }

    pub fn get(&self) -> u64 {
        self.now.get()
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.get()
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ManualClock").field(&self.now.get()).finish()
    }
}

/// Headless driver for exercising timers in tests.
///
/// Owns a [`TimerRuntime`] wired to a [`ManualClock`] and moves both forward
/// together, the way a host frame loop would.
pub struct TimerHarness {
    clock: ManualClock,
    runtime: TimerRuntime,
}

impl TimerHarness {
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        let clock = ManualClock::new(0);
        let runtime = TimerRuntime::with_config(Rc::new(clock.clone()), config);
        Self { clock, runtime }
    }

    pub fn clock(&self) -> ManualClock {
        self.clock.clone()
    }

    pub fn runtime(&self) -> &TimerRuntime {
        &self.runtime
    }

    pub fn handle(&self) -> TimerRuntimeHandle {
        self.runtime.handle()
    }

    pub fn now(&self) -> u64 {
        self.clock.get()
    }

    /// Moves the clock to `now` and runs one frame there.
    pub fn advance_to(&self, now: u64) {
        self.clock.set(now);
        self.runtime.tick(now);
    }

    pub fn advance_by(&self, millis: u64) {
        self.advance_to(self.clock.get().saturating_add(millis));
    }

    /// Runs a frame without moving the clock.
    pub fn tick(&self) {
        self.runtime.tick(self.clock.get());
    }

    /// Runs `frames` frames spaced `frame_millis` apart.
    pub fn run_frames(&self, frames: usize, frame_millis: u64) {
        for _ in 0..frames {
            self.advance_by(frame_millis);
        }
    }

    /// Advances frame by frame until no timer is left or `max_frames` ran.
    /// Returns whether the runtime went idle.
    pub fn run_until_idle(&self, frame_millis: u64, max_frames: usize) -> bool {
        for _ in 0..max_frames {
            if self.runtime.is_idle() {
                return true;
            }
            self.advance_by(frame_millis);
        }
        self.runtime.is_idle()
    }
}

impl Default for TimerHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared, cloneable record of what callbacks did.
#[derive(Clone, Default)]
pub struct EventLog<T: Clone = &'static str> {
    events: Rc<RefCell<Vec<T>>>,
}

impl<T: Clone> EventLog<T> {
    pub fn new() -> Self {
        Self {
            events: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn push(&self, event: T) {
        self.events.borrow_mut().push(event);
    }

    /// Closure that records `event` every time it is called.
    pub fn recorder(&self, event: T) -> impl FnMut() + 'static
    where
        T: 'static,
    {
        let log = self.clone();
        move || log.push(event.clone())
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.events.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl<T: Clone + PartialEq> EventLog<T> {
    pub fn count(&self, event: &T) -> usize {
        self.events.borrow().iter().filter(|e| *e == event).count()
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for EventLog<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.events.borrow().iter()).finish()
    }
}
