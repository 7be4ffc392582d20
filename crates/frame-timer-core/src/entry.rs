//! Pooled timer entries.
//!
//! Entries live in a generational arena. Slots are never freed, only
//! cleared and pushed onto a free list, so once the pool has grown to the
//! peak number of live timers, scheduling stops allocating entry storage.

use crate::identity::{TimerHandle, TimerIdentity};
use crate::request::{FinishCallback, TimerCallback, TimerRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryLocation {
    Pooled,
    Queued,
    NextFrame,
    Dispatching,
}

/// What happens to an entry after it fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Advance {
    Repeat,
    Finished,
    Cancelled,
}

pub(crate) struct TimerEntry {
    pub(crate) generation: u32,
    pub(crate) location: EntryLocation,
    pub(crate) delay: u64,
    pub(crate) forever: bool,
    pub(crate) repeat_count: u32,
    pub(crate) fire_time: u64,
    pub(crate) identity: Option<TimerIdentity>,
    pub(crate) callback: Option<TimerCallback>,
    pub(crate) on_finish: Option<FinishCallback>,
    cancelled: bool,
}

impl TimerEntry {
    fn cleared(generation: u32) -> Self {
        Self {
            generation,
            location: EntryLocation::Pooled,
            delay: 0,
            forever: false,
            repeat_count: 0,
            fire_time: 0,
            identity: None,
            callback: None,
            on_finish: None,
            cancelled: false,
        }
    }

    pub(crate) fn configure(&mut self, request: TimerRequest, fire_time: u64) {
        let (forever, repeat_count) = request.repeat.normalize();
        self.location = EntryLocation::Queued;
        self.delay = request.delay;
        self.forever = forever;
        self.repeat_count = repeat_count;
        self.fire_time = fire_time;
        self.identity = request.identity;
        self.callback = Some(request.callback);
        self.on_finish = request.on_finish;
        self.cancelled = false;
    }

    pub(crate) fn configure_next_frame(
        &mut self,
        identity: Option<TimerIdentity>,
        callback: TimerCallback,
    ) {
        self.location = EntryLocation::NextFrame;
        self.forever = false;
        self.repeat_count = 1;
        self.identity = identity;
        self.callback = Some(callback);
        self.cancelled = false;
    }

    /// Keeps an in-flight entry from being re-inserted once its callback returns.
    pub(crate) fn cancel_in_flight(&mut self) {
        self.forever = false;
        self.repeat_count = 0;
        self.cancelled = true;
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub(crate) fn advance(&mut self) -> Advance {
        if self.cancelled {
            Advance::Cancelled
        } else if self.forever {
            Advance::Repeat
        } else if self.repeat_count > 1 {
            self.repeat_count -= 1;
            Advance::Repeat
        } else {
            Advance::Finished
        }
    }
}

/// Closures taken out of a released entry.
///
/// Dropping them can run arbitrary user code, so the scheduler drops them
/// only after it has let go of its own state.
#[must_use]
pub(crate) struct Retired {
    pub(crate) callback: Option<TimerCallback>,
    pub(crate) on_finish: Option<FinishCallback>,
}

#[derive(Default)]
pub(crate) struct EntryPool {
    entries: Vec<TimerEntry>,
    free: Vec<u32>,
}

impl EntryPool {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let entries = (0..capacity).map(|_| TimerEntry::cleared(0)).collect();
        // reversed so slot 0 is handed out first
        let free = (0..capacity as u32).rev().collect();
        Self { entries, free }
    }

    pub(crate) fn acquire(&mut self) -> TimerHandle {
        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => {
                self.entries.push(TimerEntry::cleared(0));
                (self.entries.len() - 1) as u32
            }
        };
        self.handle_of(slot)
    }

    pub(crate) fn handle_of(&self, slot: u32) -> TimerHandle {
        TimerHandle {
            slot,
            generation: self.entries[slot as usize].generation,
        }
    }

    /// Live entry behind `handle`, if the handle is not stale.
    pub(crate) fn get(&self, handle: TimerHandle) -> Option<&TimerEntry> {
        self.entries
            .get(handle.slot as usize)
            .filter(|entry| {
                entry.generation == handle.generation && entry.location != EntryLocation::Pooled
            })
    }

    pub(crate) fn get_mut(&mut self, handle: TimerHandle) -> Option<&mut TimerEntry> {
        self.entries
            .get_mut(handle.slot as usize)
            .filter(|entry| {
                entry.generation == handle.generation && entry.location != EntryLocation::Pooled
            })
    }

    pub(crate) fn slot(&self, slot: u32) -> &TimerEntry {
        &self.entries[slot as usize]
    }

    pub(crate) fn slot_mut(&mut self, slot: u32) -> &mut TimerEntry {
        &mut self.entries[slot as usize]
    }

    /// Clears the entry, invalidates outstanding handles and returns the slot
    /// to the free list.
    pub(crate) fn release(&mut self, slot: u32) -> Retired {
        let entry = &mut self.entries[slot as usize];
        debug_assert_ne!(entry.location, EntryLocation::Pooled, "double release");
        let retired = Retired {
            callback: entry.callback.take(),
            on_finish: entry.on_finish.take(),
        };
        *entry = TimerEntry::cleared(entry.generation.wrapping_add(1));
        self.free.push(slot);
        retired
    }

    pub(crate) fn live_count(&self) -> usize {
        self.entries.len() - self.free.len()
    }

    pub(crate) fn pooled_count(&self) -> usize {
        self.free.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
#[path = "tests/entry_tests.rs"]
mod tests;
