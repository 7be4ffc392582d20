#![doc = r"Frame-synchronous timer scheduler.

Timers are resolved once per frame by [`TimerRuntime::tick`] instead of by OS
timers. Entries are pooled, kept sorted by fire time, and can be cancelled
through the [`TimerHandle`] returned when they were scheduled or by their
[`CallbackKey`]/[`OwnerId`] identity."]

pub mod config;
pub mod error;
pub mod identity;
pub mod platform;
pub mod registration;
pub mod request;
pub mod runtime;

mod entry;
mod queue;

pub use config::{SchedulerConfig, DEFAULT_FRAME_BUDGET_MILLIS};
pub use error::ScheduleError;
pub use identity::{CallbackKey, OwnerId, TimerHandle, TimerIdentity};
pub use platform::{Clock, FixedClock};
pub use registration::TimerRegistration;
pub use request::{Repeat, TimerRequest};
pub use runtime::{TimerRuntime, TimerRuntimeHandle};
