use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use crate::config::SchedulerConfig;
use crate::entry::{Advance, EntryLocation, EntryPool, Retired};
use crate::error::ScheduleError;
use crate::identity::{CallbackKey, OwnerId, TimerHandle, TimerIdentity};
use crate::platform::Clock;
use crate::queue::TimerQueue;
use crate::registration::TimerRegistration;
use crate::request::{Repeat, TimerCallback, TimerRequest};

type PanicPayload = Box<dyn Any + Send + 'static>;

struct SchedulerState {
    pool: EntryPool,
    queue: TimerQueue,
    next_frame: Vec<TimerHandle>,
    spare_next_frame: Vec<TimerHandle>,
    dispatching: Option<TimerHandle>,
    // whether the dispatching entry was popped from the time queue
    dispatching_queued: bool,
    frame_id: u64,
    current_time: u64,
    ticking: bool,
}

impl SchedulerState {
    fn new(capacity: usize) -> Self {
        Self {
            pool: EntryPool::with_capacity(capacity),
            queue: TimerQueue::with_capacity(capacity),
            next_frame: Vec::with_capacity(capacity),
            spare_next_frame: Vec::with_capacity(capacity),
            dispatching: None,
            dispatching_queued: false,
            frame_id: 0,
            current_time: 0,
            ticking: false,
        }
    }
}

pub(crate) struct SchedulerInner {
    clock: Rc<dyn Clock>,
    config: SchedulerConfig,
    state: RefCell<SchedulerState>,
}

impl SchedulerInner {
    fn new(clock: Rc<dyn Clock>, config: SchedulerConfig) -> Self {
        Self {
            clock,
            config,
            state: RefCell::new(SchedulerState::new(config.initial_capacity)),
        }
    }

    fn schedule_at(&self, start: u64, request: TimerRequest) -> Result<TimerHandle, ScheduleError> {
        let delay = request.delay;
        let fire_time = start
            .checked_add(delay)
            .ok_or(ScheduleError::FireTimeOverflow { start, delay })?;
        let mut state = self.state.borrow_mut();
        let handle = state.pool.acquire();
        state.pool.slot_mut(handle.slot).configure(request, fire_time);
        state.queue.insert(fire_time, handle.slot);
        log::trace!("timer {handle:?} scheduled for {fire_time}");
        Ok(handle)
    }

    fn schedule_next_frame(
        &self,
        identity: Option<TimerIdentity>,
        callback: TimerCallback,
    ) -> TimerHandle {
        let mut state = self.state.borrow_mut();
        let handle = state.pool.acquire();
        state
            .pool
            .slot_mut(handle.slot)
            .configure_next_frame(identity, callback);
        state.next_frame.push(handle);
        log::trace!("timer {handle:?} scheduled for next frame");
        handle
    }

    fn cancel(&self, handle: TimerHandle) -> bool {
        let retired = {
            let mut state = self.state.borrow_mut();
            let (location, fire_time) = match state.pool.get(handle) {
                Some(entry) => (entry.location, entry.fire_time),
                None => return false,
            };
            match location {
                EntryLocation::Dispatching => {
                    if let Some(entry) = state.pool.get_mut(handle) {
                        entry.cancel_in_flight();
                    }
                    log::trace!("timer {handle:?} cancelled while firing");
                    return true;
                }
                EntryLocation::Queued => {
                    state.queue.remove_slot(fire_time, handle.slot);
                    state.pool.release(handle.slot)
                }
                // the stale handle left in the next-frame list is skipped on drain
                EntryLocation::NextFrame => state.pool.release(handle.slot),
                EntryLocation::Pooled => return false,
            }
        };
        drop(retired);
        log::trace!("timer {handle:?} cancelled");
        true
    }

    fn cancel_where(&self, matches: impl Fn(&TimerIdentity) -> bool) -> usize {
        let mut degraded = 0;
        let retired: Vec<Retired> = {
            let mut state = self.state.borrow_mut();
            let state = &mut *state;
            if let (Some(handle), true) = (state.dispatching, state.dispatching_queued) {
                if let Some(entry) = state.pool.get_mut(handle) {
                    if !entry.is_cancelled() && entry.identity.as_ref().is_some_and(&matches) {
                        entry.cancel_in_flight();
                        degraded = 1;
                    }
                }
            }
            let mut removed = Vec::new();
            let pool = &state.pool;
            state.queue.remove_where(
                |slot| pool.slot(slot).identity.as_ref().is_some_and(&matches),
                &mut removed,
            );
            removed
                .into_iter()
                .map(|slot| state.pool.release(slot))
                .collect()
        };
        let cancelled = retired.len() + degraded;
        drop(retired);
        cancelled
    }

    fn exists(&self, key: CallbackKey, owner: OwnerId) -> bool {
        let state = self.state.borrow();
        let found = state.queue.iter().any(|item| {
            state
                .pool
                .slot(item.slot)
                .identity
                .is_some_and(|identity| identity.matches(key, owner))
        });
        found
    }

    fn is_pending(&self, handle: TimerHandle) -> bool {
        self.state
            .borrow()
            .pool
            .get(handle)
            .is_some_and(|entry| !entry.is_cancelled())
    }

    fn tick(&self, now: u64) {
        {
            let mut state = self.state.borrow_mut();
            if state.ticking {
                log::warn!("nested tick at {now} ignored");
                return;
            }
            state.ticking = true;
            state.frame_id += 1;
            state.current_time = now;
        }
        let _guard = TickGuard { inner: self };
        self.drain_next_frame();
        self.drain_due(now);
    }

    fn drain_next_frame(&self) {
        let mut batch = {
            let mut state = self.state.borrow_mut();
            if state.next_frame.is_empty() {
                return;
            }
            let spare = mem::take(&mut state.spare_next_frame);
            mem::replace(&mut state.next_frame, spare)
        };

        let mut index = 0;
        while index < batch.len() {
            let handle = batch[index];
            index += 1;
            let mut callback = {
                let mut state = self.state.borrow_mut();
                let state = &mut *state;
                match state.pool.get_mut(handle) {
                    Some(entry) if entry.location == EntryLocation::NextFrame => {
                        entry.location = EntryLocation::Dispatching;
                        state.dispatching = Some(handle);
                        state.dispatching_queued = false;
                        entry.callback.take()
                    }
                    _ => continue,
                }
            };

            let outcome = invoke(&mut callback);
            let retired = {
                let mut state = self.state.borrow_mut();
                state.dispatching = None;
                state.pool.release(handle.slot)
            };
            drop(retired);
            drop(callback);

            if let Err(payload) = outcome {
                if let Some(payload) = self.recover(handle, payload) {
                    // the rest of the batch runs next tick, ahead of anything queued since
                    let mut state = self.state.borrow_mut();
                    state.next_frame.splice(0..0, batch[index..].iter().copied());
                    drop(state);
                    panic::resume_unwind(payload);
                }
            }
        }

        batch.clear();
        self.state.borrow_mut().spare_next_frame = batch;
    }

    fn drain_due(&self, now: u64) {
        loop {
            let (handle, mut callback) = {
                let mut state = self.state.borrow_mut();
                let state = &mut *state;
                let Some(item) = state.queue.pop_due(now) else {
                    break;
                };
                let handle = state.pool.handle_of(item.slot);
                let entry = state.pool.slot_mut(item.slot);
                entry.location = EntryLocation::Dispatching;
                state.dispatching = Some(handle);
                state.dispatching_queued = true;
                (handle, entry.callback.take())
            };

            let outcome = invoke(&mut callback);
            let recomputed = self.clock.now_millis();

            let retired = {
                let mut state = self.state.borrow_mut();
                let state = &mut *state;
                state.dispatching = None;
                let entry = state.pool.slot_mut(handle.slot);
                entry.callback = callback;
                // never due again within the tick that just fired it
                entry.fire_time = recomputed
                    .saturating_add(entry.delay)
                    .max(now.saturating_add(1));
                let advance = if outcome.is_err() {
                    Advance::Cancelled
                } else {
                    entry.advance()
                };
                match advance {
                    Advance::Repeat => {
                        entry.location = EntryLocation::Queued;
                        let fire_time = entry.fire_time;
                        state.queue.insert(fire_time, handle.slot);
                        None
                    }
                    Advance::Finished => Some((state.pool.release(handle.slot), true)),
                    Advance::Cancelled => Some((state.pool.release(handle.slot), false)),
                }
            };

            if let Err(payload) = outcome {
                drop(retired);
                if let Some(payload) = self.recover(handle, payload) {
                    panic::resume_unwind(payload);
                }
            } else if let Some((mut retired, finished)) = retired {
                let on_finish = if finished {
                    retired.on_finish.take()
                } else {
                    None
                };
                drop(retired);
                log::trace!("timer {handle:?} retired");
                if let Some(on_finish) = on_finish {
                    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(on_finish)) {
                        if let Some(payload) = self.recover(handle, payload) {
                            panic::resume_unwind(payload);
                        }
                    }
                }
            }

            let spent = recomputed.saturating_sub(now);
            if spent > self.config.frame_budget_millis {
                if log::log_enabled!(log::Level::Debug) {
                    let state = self.state.borrow();
                    let deferred = state
                        .queue
                        .iter()
                        .rev()
                        .take_while(|item| item.fire_time <= now)
                        .count();
                    log::debug!(
                        "frame {} spent {spent}ms draining timers, deferring {deferred}",
                        state.frame_id
                    );
                }
                break;
            }
        }
    }

    /// Logs and swallows a callback panic when isolating, otherwise hands the
    /// payload back so the caller can resume it.
    fn recover(&self, handle: TimerHandle, payload: PanicPayload) -> Option<PanicPayload> {
        if self.config.isolate_panics {
            log::error!(
                "timer {handle:?} callback panicked: {}",
                panic_message(payload.as_ref())
            );
            None
        } else {
            Some(payload)
        }
    }
}

fn invoke(callback: &mut Option<TimerCallback>) -> Result<(), PanicPayload> {
    panic::catch_unwind(AssertUnwindSafe(|| {
        if let Some(callback) = callback.as_mut() {
            callback();
        }
    }))
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Resets per-tick state even when a callback panic unwinds through `tick`.
struct TickGuard<'a> {
    inner: &'a SchedulerInner,
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.inner.state.try_borrow_mut() {
            state.ticking = false;
            state.dispatching = None;
            state.dispatching_queued = false;
        }
    }
}

/// Owns the scheduler. Drive it with [`tick`](Self::tick) once per frame and
/// hand out [`TimerRuntimeHandle`]s to code that schedules timers.
#[derive(Clone)]
pub struct TimerRuntime {
    inner: Rc<SchedulerInner>,
}

impl TimerRuntime {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self::with_config(clock, SchedulerConfig::default())
    }

    pub fn with_config(clock: Rc<dyn Clock>, config: SchedulerConfig) -> Self {
        Self {
            inner: Rc::new(SchedulerInner::new(clock, config)),
        }
    }

    pub fn handle(&self) -> TimerRuntimeHandle {
        TimerRuntimeHandle(Rc::downgrade(&self.inner))
    }

    pub fn config(&self) -> SchedulerConfig {
        self.inner.config
    }

    /// Runs one frame: the next-frame batch first, then every due timer
    /// until the queue is drained or the frame budget is spent.
    pub fn tick(&self, now: u64) {
        self.inner.tick(now);
    }

    /// Number of ticks run so far.
    pub fn frame_id(&self) -> u64 {
        self.inner.state.borrow().frame_id
    }

    /// Time passed to the current or most recent tick.
    pub fn current_time(&self) -> u64 {
        self.inner.state.borrow().current_time
    }

    /// Reads the injected clock.
    pub fn now(&self) -> u64 {
        self.inner.clock.now_millis()
    }

    /// Fire time of the timer due first, if any.
    pub fn next_due(&self) -> Option<u64> {
        self.inner.state.borrow().queue.peek().map(|item| item.fire_time)
    }

    /// Entries not yet retired, including one that is currently firing.
    pub fn pending_count(&self) -> usize {
        self.inner.state.borrow().pool.live_count()
    }

    /// Cleared entries waiting for reuse.
    pub fn pooled_count(&self) -> usize {
        self.inner.state.borrow().pool.pooled_count()
    }

    /// Total entry slots ever allocated.
    pub fn pool_capacity(&self) -> usize {
        self.inner.state.borrow().pool.capacity()
    }

    pub fn queued_count(&self) -> usize {
        self.inner.state.borrow().queue.len()
    }

    pub fn is_idle(&self) -> bool {
        let state = self.inner.state.borrow();
        state.queue.is_empty() && state.next_frame.is_empty()
    }
}

impl fmt::Debug for TimerRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("TimerRuntime")
            .field("config", &self.inner.config)
            .field("frame_id", &state.frame_id)
            .field("current_time", &state.current_time)
            .field("queued", &state.queue.len())
            .field("next_frame", &state.next_frame.len())
            .field("pooled", &state.pool.pooled_count())
            .finish()
    }
}

/// Weak handle to a [`TimerRuntime`], cheap to clone into callbacks.
///
/// Operations on a handle whose runtime is gone fail with
/// [`ScheduleError::RuntimeDropped`] or report "nothing found".
#[derive(Clone)]
pub struct TimerRuntimeHandle(Weak<SchedulerInner>);

impl TimerRuntimeHandle {
    fn upgrade(&self) -> Result<Rc<SchedulerInner>, ScheduleError> {
        self.0.upgrade().ok_or(ScheduleError::RuntimeDropped)
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    /// Schedules `request` to first fire at `start + delay`.
    pub fn schedule_at(
        &self,
        start: u64,
        request: TimerRequest,
    ) -> Result<TimerHandle, ScheduleError> {
        self.upgrade()?.schedule_at(start, request)
    }

    /// Schedules `request` to first fire `delay` after the clock's current time.
    pub fn schedule_after(&self, request: TimerRequest) -> Result<TimerHandle, ScheduleError> {
        let inner = self.upgrade()?;
        let start = inner.clock.now_millis();
        inner.schedule_at(start, request)
    }

    pub fn schedule_once(
        &self,
        delay_millis: u64,
        callback: impl FnMut() + 'static,
    ) -> Result<TimerHandle, ScheduleError> {
        self.schedule_after(TimerRequest::once(delay_millis, callback))
    }

    pub fn schedule_repeating(
        &self,
        interval_millis: u64,
        repeat: Repeat,
        callback: impl FnMut() + 'static,
    ) -> Result<TimerHandle, ScheduleError> {
        self.schedule_after(TimerRequest::new(interval_millis, repeat, callback))
    }

    /// Runs `callback` once at the start of the next tick.
    ///
    /// Callbacks added while the next-frame batch is draining wait for the
    /// tick after.
    pub fn schedule_next_frame(
        &self,
        callback: impl FnOnce() + 'static,
    ) -> Result<TimerHandle, ScheduleError> {
        let inner = self.upgrade()?;
        Ok(inner.schedule_next_frame(None, once_callback(callback)))
    }

    pub fn schedule_next_frame_for(
        &self,
        identity: TimerIdentity,
        callback: impl FnOnce() + 'static,
    ) -> Result<TimerHandle, ScheduleError> {
        let inner = self.upgrade()?;
        Ok(inner.schedule_next_frame(Some(identity), once_callback(callback)))
    }

    /// Like [`schedule_after`](Self::schedule_after), but the timer is
    /// cancelled when the returned registration is dropped.
    pub fn register(&self, request: TimerRequest) -> Result<TimerRegistration, ScheduleError> {
        let handle = self.schedule_after(request)?;
        Ok(TimerRegistration::new(self.clone(), handle))
    }

    /// Cancels one timer. A timer that is currently firing finishes its
    /// callback and is then retired. Returns whether anything was cancelled.
    pub fn cancel(&self, handle: TimerHandle) -> bool {
        self.0
            .upgrade()
            .map(|inner| inner.cancel(handle))
            .unwrap_or(false)
    }

    /// Cancels every queued timer scheduled with this `(key, owner)` pair.
    ///
    /// Next-frame callbacks are left alone; cancel those by handle.
    pub fn cancel_matching(&self, key: CallbackKey, owner: OwnerId) -> usize {
        self.0
            .upgrade()
            .map(|inner| inner.cancel_where(|identity| identity.matches(key, owner)))
            .unwrap_or(0)
    }

    /// Cancels every queued timer that belongs to `owner`.
    pub fn cancel_all(&self, owner: OwnerId) -> usize {
        self.0
            .upgrade()
            .map(|inner| inner.cancel_where(|identity| identity.owner == owner))
            .unwrap_or(0)
    }

    /// Whether a timer with this `(key, owner)` pair waits in the time queue.
    ///
    /// Next-frame callbacks and the timer currently firing are not counted.
    pub fn exists(&self, key: CallbackKey, owner: OwnerId) -> bool {
        self.0
            .upgrade()
            .map(|inner| inner.exists(key, owner))
            .unwrap_or(false)
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.0
            .upgrade()
            .map(|inner| inner.is_pending(handle))
            .unwrap_or(false)
    }

    pub fn tick(&self, now: u64) {
        if let Some(inner) = self.0.upgrade() {
            inner.tick(now);
        }
    }

    pub fn frame_id(&self) -> u64 {
        self.0
            .upgrade()
            .map(|inner| inner.state.borrow().frame_id)
            .unwrap_or(0)
    }

    pub fn current_time(&self) -> u64 {
        self.0
            .upgrade()
            .map(|inner| inner.state.borrow().current_time)
            .unwrap_or(0)
    }
}

impl fmt::Debug for TimerRuntimeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TimerRuntimeHandle")
            .field(&self.is_alive())
            .finish()
    }
}

fn once_callback(callback: impl FnOnce() + 'static) -> TimerCallback {
    let mut callback = Some(callback);
    Box::new(move || {
        if let Some(callback) = callback.take() {
            callback();
        }
    })
}

#[cfg(test)]
pub(crate) struct TestClock(pub(crate) std::cell::Cell<u64>);

#[cfg(test)]
impl TestClock {
    pub(crate) fn new(now: u64) -> Rc<Self> {
        Rc::new(Self(std::cell::Cell::new(now)))
    }

    pub(crate) fn set(&self, now: u64) {
        self.0.set(now);
    }
}

#[cfg(test)]
impl Clock for TestClock {
    fn now_millis(&self) -> u64 {
        self.0.get()
    }
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
