//! Clocks and one-shot timers
//!
//! The page event loop reads time through a [`Clock`] so tests can run against a
//! [`ManualClock`] and step time deterministically. Timers are plain deadline entries in a
//! [`TimerQueue`]; nothing fires on its own, the event loop pops whatever is due.

use crate::page::Page;
use std::cell::Cell;
use std::fmt;
use std::time::{Duration, Instant};

pub trait Clock {
  fn now(&self) -> Instant;

  /// Block (or, for virtual clocks, jump) until `deadline`. Never moves time backwards.
  fn sleep_until(&self, deadline: Instant);
}

/// Virtual time that only moves when asked to.
#[derive(Debug)]
pub struct ManualClock {
  now: Cell<Instant>,
}

impl ManualClock {
  pub fn new() -> Self {
    Self {
      now: Cell::new(Instant::now()),
    }
  }

  pub fn advance(&self, by: Duration) {
    self.now.set(self.now.get() + by);
  }
}

impl Default for ManualClock {
  fn default() -> Self {
    Self::new()
  }
}

impl Clock for ManualClock {
  fn now(&self) -> Instant {
    self.now.get()
  }

  fn sleep_until(&self, deadline: Instant) {
    if deadline > self.now.get() {
      self.now.set(deadline);
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "timer#{}", self.0)
  }
}

pub type TimerCallback = Box<dyn FnOnce(&mut Page)>;

struct Timer {
  id: TimerId,
  deadline: Instant,
  callback: TimerCallback,
}

#[derive(Default)]
pub struct TimerQueue {
  next_id: u64,
  timers: Vec<Timer>,
}

impl TimerQueue {
  pub fn schedule(&mut self, deadline: Instant, callback: TimerCallback) -> TimerId {
    self.next_id += 1;
    let id = TimerId(self.next_id);
    self.timers.push(Timer {
      id,
      deadline,
      callback,
    });
    id
  }

  /// Cancel a pending timer. Returns `false` if it already fired or was cancelled.
  pub fn cancel(&mut self, id: TimerId) -> bool {
    let before = self.timers.len();
    self.timers.retain(|t| t.id != id);
    self.timers.len() != before
  }

  pub fn is_scheduled(&self, id: TimerId) -> bool {
    self.timers.iter().any(|t| t.id == id)
  }

  pub fn len(&self) -> usize {
    self.timers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.timers.is_empty()
  }

  pub fn next_deadline(&self) -> Option<Instant> {
    self.timers.iter().map(|t| t.deadline).min()
  }

  /// Remove and return the earliest timer due at `now`; ties fire in scheduling order.
  pub fn pop_due(&mut self, now: Instant) -> Option<(TimerId, TimerCallback)> {
    let index = self
      .timers
      .iter()
      .enumerate()
      .filter(|(_, t)| t.deadline <= now)
      .min_by_key(|(_, t)| (t.deadline, t.id))
      .map(|(index, _)| index)?;
    let timer = self.timers.remove(index);
    Some((timer.id, timer.callback))
  }
}
