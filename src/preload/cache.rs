//! Prefetch cache
//!
//! Plain storage from absolute URL to the fetch that was issued for it and the instant it goes
//! stale. Nothing expires on a timer; readers compare `expiry` against the current time.

use crate::fetch::FetchRequest;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct CacheEntry {
  pub request: Rc<FetchRequest>,
  pub expiry: Instant,
}

impl CacheEntry {
  /// Fresh strictly before `expiry`.
  pub fn is_fresh(&self, now: Instant) -> bool {
    now < self.expiry
  }
}

/// Shared by reference between the preloader and the session that owns it.
#[derive(Debug, Default)]
pub struct PrefetchCache {
  entries: RefCell<FxHashMap<String, CacheEntry>>,
}

impl PrefetchCache {
  pub fn new() -> Self {
    Self::default()
  }

  /// Insert or replace the entry for `url`. A replaced fetch is not cancelled.
  pub fn set(&self, url: &str, entry: CacheEntry) {
    self.entries.borrow_mut().insert(url.to_string(), entry);
  }

  /// The entry for `url`, fresh or not.
  pub fn get(&self, url: &str) -> Option<CacheEntry> {
    self.entries.borrow().get(url).cloned()
  }

  /// The entry for `url` only if it is still fresh at `now`.
  pub fn get_fresh(&self, url: &str, now: Instant) -> Option<CacheEntry> {
    self.get(url).filter(|entry| entry.is_fresh(now))
  }

  pub fn clear(&self) {
    self.entries.borrow_mut().clear();
  }

  pub fn len(&self) -> usize {
    self.entries.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.borrow().is_empty()
  }
}
