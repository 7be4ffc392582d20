//! Fire-time ordered queue of pool slots.
//!
//! Items are kept in descending `fire_time` order, so the entry due first is
//! always the last element: peeking and popping it are tail operations, and
//! an insert is a binary search plus one splice.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct QueueItem {
    pub(crate) fire_time: u64,
    pub(crate) slot: u32,
}

#[derive(Debug, Default)]
pub(crate) struct TimerQueue {
    items: Vec<QueueItem>,
}

impl TimerQueue {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn insert(&mut self, fire_time: u64, slot: u32) {
        // first index whose fire time is <= the new one
        let index = self.items.partition_point(|item| item.fire_time > fire_time);
        self.items.insert(index, QueueItem { fire_time, slot });
    }

    /// The entry that is due first.
    pub(crate) fn peek(&self) -> Option<QueueItem> {
        self.items.last().copied()
    }

    /// Pops the first entry if it is due at `now`.
    pub(crate) fn pop_due(&mut self, now: u64) -> Option<QueueItem> {
        match self.items.last() {
            Some(item) if item.fire_time <= now => self.items.pop(),
            _ => None,
        }
    }

    /// Removes the item for `slot`, which was inserted with `fire_time`.
    pub(crate) fn remove_slot(&mut self, fire_time: u64, slot: u32) -> bool {
        let start = self.items.partition_point(|item| item.fire_time > fire_time);
        let position = self.items[start..]
            .iter()
            .take_while(|item| item.fire_time == fire_time)
            .position(|item| item.slot == slot);
        match position {
            Some(offset) => {
                self.items.remove(start + offset);
                true
            }
            None => false,
        }
    }

    /// Removes every item whose slot matches `predicate` and appends the
    /// removed slots to `removed`. The relative order of the rest is kept.
    pub(crate) fn remove_where(
        &mut self,
        mut predicate: impl FnMut(u32) -> bool,
        removed: &mut Vec<u32>,
    ) {
        self.items.retain(|item| {
            if predicate(item.slot) {
                removed.push(item.slot);
                false
            } else {
                true
            }
        });
    }

    pub(crate) fn iter(&self) -> std::slice::Iter<'_, QueueItem> {
        self.items.iter()
    }
}

#[cfg(test)]
#[path = "tests/queue_tests.rs"]
mod tests;
