use std::fmt;

/// Reasons a schedule request is refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The handle outlived the [`TimerRuntime`](crate::TimerRuntime) it points to.
    RuntimeDropped,
    /// `start + delay` does not fit the clock's range.
    FireTimeOverflow { start: u64, delay: u64 },
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::RuntimeDropped => write!(f, "timer runtime has been dropped"),
            ScheduleError::FireTimeOverflow { start, delay } => {
                write!(f, "fire time overflows: start {start} + delay {delay}")
            }
        }
    }
}

impl std::error::Error for ScheduleError {}
