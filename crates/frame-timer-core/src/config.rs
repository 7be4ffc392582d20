/// Default per-tick time slice for draining overdue timers, in milliseconds.
pub const DEFAULT_FRAME_BUDGET_MILLIS: u64 = 5;

/// Tunables for a [`TimerRuntime`](crate::TimerRuntime).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Once draining has taken longer than this, the rest of the due
    /// entries wait for the next tick.
    pub frame_budget_millis: u64,
    /// Catch panics from callbacks and keep draining. When off, the panic
    /// resumes after the scheduler state has been restored.
    pub isolate_panics: bool,
    /// Entries pre-allocated into the pool so the first frames do not allocate.
    pub initial_capacity: usize,
}

impl SchedulerConfig {
    pub fn with_frame_budget(mut self, millis: u64) -> Self {
        self.frame_budget_millis = millis;
        self
    }

    pub fn with_panic_isolation(mut self, isolate: bool) -> Self {
        self.isolate_panics = isolate;
        self
    }

    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            frame_budget_millis: DEFAULT_FRAME_BUDGET_MILLIS,
            isolate_panics: true,
            initial_capacity: 0,
        }
    }
}
