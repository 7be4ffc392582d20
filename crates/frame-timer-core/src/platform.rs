//! Platform abstraction traits for the timer runtime.
//!
//! The scheduler never reads time on its own; it asks the host through
//! [`Clock`]. This keeps the core independent from `std::time` and lets
//! tests drive time by hand.

/// Provides timing information for the scheduler.
///
/// Implementations must be monotonic for delays to behave. Small backward
/// jumps are tolerated and simply make nothing newly due.
pub trait Clock {
    /// Returns the current time in milliseconds.
    fn now_millis(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for std::rc::Rc<C> {
    fn now_millis(&self) -> u64 {
        (**self).now_millis()
    }
}

/// Clock that always reports the same instant.
///
/// Useful when the host only ever drives the scheduler through
/// [`tick`](crate::TimerRuntime::tick) and never reschedules relative to "now".
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_millis(&self) -> u64 {
        self.0
    }
}
