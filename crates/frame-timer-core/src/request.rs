use crate::identity::{CallbackKey, OwnerId, TimerIdentity};

pub(crate) type TimerCallback = Box<dyn FnMut() + 'static>;
pub(crate) type FinishCallback = Box<dyn FnOnce() + 'static>;

/// How many times a timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Repeat {
    #[default]
    Once,
    /// Fires `n` times. `Times(0)` means forever, `Times(1)` is the same as `Once`.
    Times(u32),
    /// Fires until cancelled. Never runs `on_finish`.
    Forever,
}

impl Repeat {
    /// Interprets a plain repeat count where 0 means "forever".
    pub fn from_count(count: u32) -> Self {
        match count {
            0 => Repeat::Forever,
            1 => Repeat::Once,
            n => Repeat::Times(n),
        }
    }

    pub(crate) fn normalize(self) -> (bool, u32) {
        match self {
            Repeat::Once => (false, 1),
            Repeat::Times(0) | Repeat::Forever => (true, 0),
            Repeat::Times(n) => (false, n),
        }
    }
}

/// Everything needed to schedule a time-based timer.
pub struct TimerRequest {
    pub(crate) delay: u64,
    pub(crate) repeat: Repeat,
    pub(crate) identity: Option<TimerIdentity>,
    pub(crate) callback: TimerCallback,
    pub(crate) on_finish: Option<FinishCallback>,
}

impl TimerRequest {
    /// A timer that fires every `delay_millis`, `repeat` times.
    pub fn new(delay_millis: u64, repeat: Repeat, callback: impl FnMut() + 'static) -> Self {
        Self {
            delay: delay_millis,
            repeat,
            identity: None,
            callback: Box::new(callback),
            on_finish: None,
        }
    }

    pub fn once(delay_millis: u64, callback: impl FnMut() + 'static) -> Self {
        Self::new(delay_millis, Repeat::Once, callback)
    }

    pub fn forever(interval_millis: u64, callback: impl FnMut() + 'static) -> Self {
        Self::new(interval_millis, Repeat::Forever, callback)
    }

    /// Tags the timer so [`cancel_matching`](crate::TimerRuntimeHandle::cancel_matching),
    /// [`cancel_all`](crate::TimerRuntimeHandle::cancel_all) and
    /// [`exists`](crate::TimerRuntimeHandle::exists) can find it.
    pub fn with_identity(mut self, key: CallbackKey, owner: OwnerId) -> Self {
        self.identity = Some(TimerIdentity::new(key, owner));
        self
    }

    /// Runs once after the last firing of a counted timer. Not run when the
    /// timer is cancelled, and never for [`Repeat::Forever`].
    pub fn on_finish(mut self, on_finish: impl FnOnce() + 'static) -> Self {
        self.on_finish = Some(Box::new(on_finish));
        self
    }

    pub fn delay_millis(&self) -> u64 {
        self.delay
    }

    pub fn repeat(&self) -> Repeat {
        self.repeat
    }
}

impl std::fmt::Debug for TimerRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerRequest")
            .field("delay", &self.delay)
            .field("repeat", &self.repeat)
            .field("identity", &self.identity)
            .field("on_finish", &self.on_finish.is_some())
            .finish()
    }
}
