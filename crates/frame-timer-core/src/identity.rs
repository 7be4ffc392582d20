//! Identities used to find timers again after they were scheduled.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_OWNER_ID: AtomicU64 = AtomicU64::new(1);

/// Groups the timers of one logical owner (a widget or a game entity).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(u64);

impl OwnerId {
    /// Mints a process-unique owner id.
    pub fn next() -> Self {
        Self(NEXT_OWNER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OwnerId({})", self.0)
    }
}

/// Names "which callback" a timer runs, independently of the closure value.
///
/// Closures have no identity in Rust, so code that wants to cancel or probe
/// timers by callback picks a key up front, either by name or by call site.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackKey(u64);

impl CallbackKey {
    pub fn named(name: &str) -> Self {
        Self(stable_hash(name))
    }

    pub fn from_location(file: &str, line: u32, column: u32) -> Self {
        Self(stable_hash(&(file, line, column)))
    }

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for CallbackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallbackKey({:#018x})", self.0)
    }
}

// fixed keys: the same input hashes the same in every process
fn stable_hash<T: Hash + ?Sized>(value: &T) -> u64 {
    #[cfg(feature = "std-hash")]
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    #[cfg(not(feature = "std-hash"))]
    let mut hasher = ahash::AHasher::default();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Key derived from the invocation site.
#[macro_export]
macro_rules! callback_key {
    () => {
        $crate::CallbackKey::from_location(file!(), line!(), column!())
    };
}

/// The `(callback, owner)` pair that identity-based cancellation matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerIdentity {
    pub key: CallbackKey,
    pub owner: OwnerId,
}

impl TimerIdentity {
    pub const fn new(key: CallbackKey, owner: OwnerId) -> Self {
        Self { key, owner }
    }

    pub(crate) fn matches(&self, key: CallbackKey, owner: OwnerId) -> bool {
        self.key == key && self.owner == owner
    }
}

/// Opaque reference to one scheduled entry.
///
/// Handles are generational: once the entry retires or is cancelled, the
/// handle goes stale and every operation on it is a no-op, even after the
/// underlying slot has been reused by another timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    pub(crate) slot: u32,
    pub(crate) generation: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_stable_and_distinct() {
        assert_eq!(CallbackKey::named("blink"), CallbackKey::named("blink"));
        assert_ne!(CallbackKey::named("blink"), CallbackKey::named("fade"));

        let first = crate::callback_key!();
        let second = crate::callback_key!();
        assert_ne!(first, second);
        assert_eq!(
            CallbackKey::from_location("widget.rs", 3, 7),
            CallbackKey::from_location("widget.rs", 3, 7)
        );
    }

    #[test]
    fn owner_ids_are_unique() {
        let a = OwnerId::next();
        let b = OwnerId::next();
        assert_ne!(a, b);
        assert_eq!(OwnerId::from_raw(a.as_raw()), a);
    }
}
