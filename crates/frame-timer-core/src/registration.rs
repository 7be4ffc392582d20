use crate::identity::TimerHandle;
use crate::runtime::TimerRuntimeHandle;

/// Scope guard for a timer: the timer is cancelled when the registration is
/// dropped, unless it was [`detach`](Self::detach)ed first.
pub struct TimerRegistration {
    runtime: TimerRuntimeHandle,
    handle: Option<TimerHandle>,
}

impl TimerRegistration {
    pub(crate) fn new(runtime: TimerRuntimeHandle, handle: TimerHandle) -> Self {
        Self {
            runtime,
            handle: Some(handle),
        }
    }

    pub fn handle(&self) -> Option<TimerHandle> {
        self.handle
    }

    pub fn is_pending(&self) -> bool {
        self.handle
            .map(|handle| self.runtime.is_pending(handle))
            .unwrap_or(false)
    }

    pub fn cancel(mut self) -> bool {
        match self.handle.take() {
            Some(handle) => self.runtime.cancel(handle),
            None => false,
        }
    }

    /// Lets the timer run to completion without the guard.
    pub fn detach(mut self) -> Option<TimerHandle> {
        self.handle.take()
    }
}

impl Drop for TimerRegistration {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.runtime.cancel(handle);
        }
    }
}

impl std::fmt::Debug for TimerRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerRegistration")
            .field("handle", &self.handle)
            .finish()
    }
}
