//! The timer service the engines schedule their timeouts on.

use std::{
    collections::HashMap,
    fmt,
    hash::Hash,
    time::{Duration, Instant},
};

/// Identifies one scheduled timer.
///
/// Handles are never reused by a timer service, so a stale handle never
/// matches a newer timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn new(id: u64) -> Self {
        TimerHandle(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A cancellable one-shot timer service.
///
/// Expiries are delivered back to the engine as `(TimerHandle, E)` by
/// whatever drives it.
pub trait Timers<E> {
    fn now(&self) -> Instant;

    fn schedule(&mut self, delay: Duration, event: E) -> TimerHandle;

    /// Cancelling an expired or unknown handle is a no-op.
    fn cancel(&mut self, handle: TimerHandle);
}

/// The timers an engine has currently armed, at most one per key.
#[derive(Debug)]
pub struct TimerSet<K> {
    armed: HashMap<K, TimerHandle>,
}

impl<K> Default for TimerSet<K> {
    fn default() -> Self {
        TimerSet {
            armed: HashMap::new(),
        }
    }
}

impl<K> TimerSet<K>
where
    K: Copy + Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `key` after `delay`, cancelling a previous timer with the same key.
    pub fn arm<T: Timers<K>>(&mut self, timers: &mut T, key: K, delay: Duration) {
        let handle = timers.schedule(delay, key);
        if let Some(previous) = self.armed.insert(key, handle) {
            timers.cancel(previous);
        }
    }

    pub fn disarm<T: Timers<K>>(&mut self, timers: &mut T, key: K) {
        if let Some(handle) = self.armed.remove(&key) {
            timers.cancel(handle);
        }
    }

    pub fn disarm_all<T: Timers<K>>(&mut self, timers: &mut T) {
        for (_, handle) in self.armed.drain() {
            timers.cancel(handle);
        }
    }

    /// Consumes an expiry.
    ///
    /// Returns `false` if `handle` is not the timer currently armed for `key`,
    /// in which case the expiry must be ignored.
    pub fn fire(&mut self, key: K, handle: TimerHandle) -> bool {
        match self.armed.get(&key) {
            Some(armed) if *armed == handle => {
                self.armed.remove(&key);
                true
            }
            _ => false,
        }
    }

    pub fn is_armed(&self, key: K) -> bool {
        self.armed.contains_key(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.armed.is_empty()
    }
}
