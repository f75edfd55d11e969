//! Time-bounded memoization of rendered pages and mirror status.
//!
//! Entries expire lazily: an expired entry is treated as absent on read and
//! removed at that point. Time comes from a [`Clock`] so expiry can be driven
//! deterministically in tests.

use std::{
  sync::{Arc, Mutex},
  time::{Duration, Instant},
};

use dashmap::DashMap;
use timble_core::Channel;
use tracing::trace;

/// Source of monotonic time for cache expiry.
pub trait Clock: Send + Sync {
  fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> Instant {
    Instant::now()
  }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
  origin: Instant,
  offset: Mutex<Duration>,
}

impl ManualClock {
  pub fn new() -> Self {
    Self {
      origin: Instant::now(),
      offset: Mutex::new(Duration::ZERO),
    }
  }

  pub fn advance(&self, by: Duration) {
    let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
    *offset += by;
  }
}

impl Default for ManualClock {
  fn default() -> Self {
    Self::new()
  }
}

impl Clock for ManualClock {
  fn now(&self) -> Instant {
    let offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
    self.origin + *offset
  }
}

/// Cache key for a rendered page.
pub fn page_key(channel: &Channel) -> String {
  format!("chat_{}", channel.as_str())
}

/// Cache key for a channel's mirror status.
pub fn sync_status_key(channel: &Channel) -> String {
  format!("sync_{}", channel.as_str())
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
  value: V,
  stored_at: Instant,
}

/// Per-key state. The generation outlives the entry so an invalidation is
/// still visible to a reader that started computing before it.
#[derive(Debug)]
struct Slot<V> {
  generation: u64,
  entry: Option<CacheEntry<V>>,
}

impl<V> Default for Slot<V> {
  fn default() -> Self {
    Self {
      generation: 0,
      entry: None,
    }
  }
}

/// Snapshot of a key's invalidation count, taken before computing a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation(u64);

/// Concurrent key/value cache with a single TTL for all entries.
///
/// Readers that compute a value on a miss should take a [`Generation`] first
/// and store through [`TtlCache::set_if_current`], so a value computed before
/// an invalidation is never cached after it.
pub struct TtlCache<V> {
  name: &'static str,
  ttl: Duration,
  slots: DashMap<String, Slot<V>>,
  clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
  pub fn new(name: &'static str, ttl: Duration) -> Self {
    Self::with_clock(name, ttl, Arc::new(SystemClock))
  }

  pub fn with_clock(name: &'static str, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
    Self {
      name,
      ttl,
      slots: DashMap::new(),
      clock,
    }
  }

  fn is_expired(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
    now.saturating_duration_since(entry.stored_at) > self.ttl
  }

  /// Return the stored value if it is still fresh.
  pub fn get(&self, key: &str) -> Option<V> {
    let now = self.clock.now();
    match self.slots.get(key).as_deref().and_then(|slot| slot.entry.as_ref()) {
      None => return None,
      Some(entry) if !self.is_expired(entry, now) => return Some(entry.value.clone()),
      Some(_) => {}
    }

    if self.evict_expired(key, now) {
      trace!(cache = self.name, key, "Cache entry expired");
    }
    None
  }

  /// Clear `key` if its entry is expired at `now`. The read guard in `get` is
  /// released before this runs, so a writer may have refreshed the entry.
  fn evict_expired(&self, key: &str, now: Instant) -> bool {
    match self.slots.get_mut(key) {
      Some(mut slot) if slot.entry.as_ref().is_some_and(|entry| self.is_expired(entry, now)) => {
        slot.entry = None;
        true
      }
      _ => false,
    }
  }

  /// Current generation of `key`. Take it before computing a value to store.
  pub fn generation(&self, key: &str) -> Generation {
    Generation(self.slots.get(key).map_or(0, |slot| slot.generation))
  }

  pub fn set(&self, key: impl Into<String>, value: V) {
    let key = key.into();
    trace!(cache = self.name, key = %key, "Cache set");
    let stored_at = self.clock.now();
    self.slots.entry(key).or_default().entry = Some(CacheEntry { value, stored_at });
  }

  /// Store `value` only if `key` has not been invalidated since `seen` was
  /// taken. Returns whether the value was stored.
  pub fn set_if_current(&self, key: impl Into<String>, seen: Generation, value: V) -> bool {
    let key = key.into();
    let stored_at = self.clock.now();
    let mut slot = self.slots.entry(key.clone()).or_default();
    if slot.generation != seen.0 {
      trace!(cache = self.name, key = %key, "Discarding value computed before invalidation");
      return false;
    }
    slot.entry = Some(CacheEntry { value, stored_at });
    trace!(cache = self.name, key = %key, "Cache set");
    true
  }

  /// Remove `key` and advance its generation. Removing an absent key is a
  /// no-op apart from the generation.
  pub fn invalidate(&self, key: &str) {
    let mut slot = self.slots.entry(key.to_string()).or_default();
    slot.generation += 1;
    if slot.entry.take().is_some() {
      trace!(cache = self.name, key, "Cache invalidated");
    }
  }

  /// Number of stored entries, expired ones included until they are next read.
  pub fn len(&self) -> usize {
    self.slots.iter().filter(|slot| slot.entry.is_some()).count()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
