//! Host page and event loop
//!
//! A [`Page`] is the single-threaded environment the preload engine runs in: it owns the
//! [`Document`], the clock, timers, the task queue, mutation observers, event listeners and the
//! transport. Everything runs cooperatively on the caller's thread; nothing happens until the
//! host dispatches an event, drains tasks ([`Page::run_until_idle`]) or lets time pass
//! ([`Page::advance`]).
//!
//! Input helpers (`hover`, `mouse_down`) and lifecycle helpers (`finish_loading`,
//! `dispatch_load`) drain the task queue afterwards, so network requests caused by them have
//! reached the transport by the time they return.

use crate::dom::{Document, NodeId, ReadyState};
use crate::event::{Event, EventListeners, EventType, Listener, ListenerId, ListenerOptions, MatchedListener};
use crate::mutation::{
  MutationCallback, MutationObserverId, MutationObserverInit, MutationObservers, MutationRecord,
};
use crate::resource::ResourceFetcher;
use crate::timer::{Clock, TimerId, TimerQueue};
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

type Task = Box<dyn FnOnce(&mut Page)>;

pub struct Page {
  document: Document,
  clock: Rc<dyn Clock>,
  fetcher: Arc<dyn ResourceFetcher>,
  listeners: EventListeners,
  timers: TimerQueue,
  tasks: VecDeque<Task>,
  observers: MutationObservers,
  /// Hovered elements, innermost first.
  hovered: Vec<NodeId>,
}

impl Page {
  pub fn new(document: Document, fetcher: Arc<dyn ResourceFetcher>, clock: Rc<dyn Clock>) -> Self {
    Self {
      document,
      clock,
      fetcher,
      listeners: EventListeners::default(),
      timers: TimerQueue::default(),
      tasks: VecDeque::new(),
      observers: MutationObservers::default(),
      hovered: Vec::new(),
    }
  }

  pub fn document(&self) -> &Document {
    &self.document
  }

  /// Direct document access. Mutations made through this bypass mutation observers; use
  /// [`Page::set_attribute`] and friends for observed changes.
  pub fn document_mut(&mut self) -> &mut Document {
    &mut self.document
  }

  pub fn now(&self) -> Instant {
    self.clock.now()
  }

  pub fn fetcher(&self) -> Arc<dyn ResourceFetcher> {
    Arc::clone(&self.fetcher)
  }

  // ==========================================================================
  // Events
  // ==========================================================================

  pub fn add_event_listener<F>(
    &mut self,
    target: NodeId,
    event_type: EventType,
    options: ListenerOptions,
    listener: F,
  ) -> ListenerId
  where
    F: Fn(&mut Page, &mut Event) + 'static,
  {
    let listener: Listener = Rc::new(listener);
    self.listeners.add(target, event_type, options, listener)
  }

  pub fn remove_event_listener(&mut self, id: ListenerId) -> bool {
    self.listeners.remove(id)
  }

  pub fn has_event_listener(&self, id: ListenerId) -> bool {
    self.listeners.contains(id)
  }

  pub fn event_listeners(&self) -> &EventListeners {
    &self.listeners
  }

  /// Dispatch `event` along its propagation path: capture listeners from the document down,
  /// listeners on the target, then bubbling listeners back up when the event bubbles.
  pub fn dispatch_event(&mut self, event: &mut Event) {
    let target = event.target();
    let event_type = event.event_type();
    let path: Vec<NodeId> = self.document.ancestors(target).collect();
    trace!(event = %event_type, target = target.index(), "dispatch");

    for &node in path.iter().skip(1).rev() {
      let matched = self.listeners.matching(node, event_type, Some(true));
      self.invoke_listeners(matched, event);
    }

    let matched = self.listeners.matching(target, event_type, None);
    self.invoke_listeners(matched, event);

    if event.bubbles() {
      for &node in path.iter().skip(1) {
        let matched = self.listeners.matching(node, event_type, Some(false));
        self.invoke_listeners(matched, event);
      }
    }
  }

  fn invoke_listeners(&mut self, matched: Vec<MatchedListener>, event: &mut Event) {
    for entry in matched {
      // Removed by an earlier listener in this dispatch.
      if !self.listeners.contains(entry.id) {
        continue;
      }
      if entry.options.once {
        self.listeners.remove(entry.id);
      }
      event.set_in_passive_listener(entry.options.passive);
      (entry.listener)(self, event);
      event.set_in_passive_listener(false);
    }
  }

  // ==========================================================================
  // Timers and tasks
  // ==========================================================================

  pub fn set_timeout<F>(&mut self, delay: Duration, callback: F) -> TimerId
  where
    F: FnOnce(&mut Page) + 'static,
  {
    let deadline = self.now() + delay;
    self.timers.schedule(deadline, Box::new(callback))
  }

  pub fn clear_timeout(&mut self, id: TimerId) -> bool {
    self.timers.cancel(id)
  }

  pub fn is_timer_scheduled(&self, id: TimerId) -> bool {
    self.timers.is_scheduled(id)
  }

  pub fn pending_timers(&self) -> usize {
    self.timers.len()
  }

  pub fn queue_task<F>(&mut self, task: F)
  where
    F: FnOnce(&mut Page) + 'static,
  {
    self.tasks.push_back(Box::new(task));
  }

  pub fn pending_tasks(&self) -> usize {
    self.tasks.len()
  }

  /// Deliver queued mutation records and run queued tasks until both are empty.
  pub fn run_until_idle(&mut self) {
    loop {
      self.deliver_mutation_records();
      match self.tasks.pop_front() {
        Some(task) => task(self),
        None => break,
      }
    }
  }

  /// Let `duration` pass, firing every timer that comes due in deadline order and draining the
  /// task queue after each.
  pub fn advance(&mut self, duration: Duration) {
    self.run_until_idle();
    let until = self.now() + duration;
    while let Some(deadline) = self.timers.next_deadline().filter(|&d| d <= until) {
      self.clock.sleep_until(deadline);
      if let Some((id, callback)) = self.timers.pop_due(self.clock.now()) {
        trace!(timer = %id, "timer fired");
        callback(self);
      }
      self.run_until_idle();
    }
    self.clock.sleep_until(until);
    self.run_until_idle();
  }

  // ==========================================================================
  // Observed mutations
  // ==========================================================================

  pub fn observe_mutations<F>(
    &mut self,
    target: NodeId,
    init: MutationObserverInit,
    callback: F,
  ) -> MutationObserverId
  where
    F: Fn(&mut Page, Vec<MutationRecord>) + 'static,
  {
    let callback: MutationCallback = Rc::new(callback);
    self.observers.observe(target, init, callback)
  }

  pub fn disconnect_mutation_observer(&mut self, id: MutationObserverId) -> bool {
    self.observers.disconnect(id)
  }

  pub fn is_observing_mutations(&self, id: MutationObserverId) -> bool {
    self.observers.is_observing(id)
  }

  fn deliver_mutation_records(&mut self) {
    while self.observers.has_pending() {
      for (id, callback, records) in self.observers.take_pending() {
        // Disconnected by an earlier callback in this checkpoint.
        if self.observers.is_observing(id) {
          callback(self, records);
        }
      }
    }
  }

  pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
    if !self.document.is_element(node) {
      return;
    }
    let old_value = self.document.set_attribute(node, name, value);
    self.observers.queue(
      &self.document,
      MutationRecord::Attributes {
        target: node,
        attribute_name: name.to_ascii_lowercase(),
        old_value,
      },
    );
  }

  pub fn remove_attribute(&mut self, node: NodeId, name: &str) {
    if let Some(old_value) = self.document.remove_attribute(node, name) {
      self.observers.queue(
        &self.document,
        MutationRecord::Attributes {
          target: node,
          attribute_name: name.to_ascii_lowercase(),
          old_value: Some(old_value),
        },
      );
    }
  }

  pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
    if !self.document.append_child(parent, child) {
      return false;
    }
    self.observers.queue(
      &self.document,
      MutationRecord::ChildList {
        target: parent,
        added_nodes: vec![child],
      },
    );
    true
  }

  // ==========================================================================
  // Lifecycle
  // ==========================================================================

  /// Finish parsing: the document becomes interactive, `DOMContentLoaded` fires, then the
  /// document is complete.
  pub fn finish_loading(&mut self) {
    if self.document.ready_state() != ReadyState::Loading {
      return;
    }
    self.document.set_ready_state(ReadyState::Interactive);
    let mut event = Event::new(EventType::DomContentLoaded, self.document.root());
    self.dispatch_event(&mut event);
    self.document.set_ready_state(ReadyState::Complete);
    self.run_until_idle();
  }

  /// Signal that a full-page navigation finished rendering.
  pub fn dispatch_load(&mut self) {
    let mut event = Event::new(EventType::Load, self.document.root());
    self.dispatch_event(&mut event);
    self.run_until_idle();
  }

  /// Signal that the frame rooted at `frame` finished a navigation.
  pub fn dispatch_frame_load(&mut self, frame: NodeId) {
    let mut event = Event::new(EventType::FrameLoad, frame);
    self.dispatch_event(&mut event);
    self.run_until_idle();
  }

  // ==========================================================================
  // Pointer input
  // ==========================================================================

  pub fn hovered(&self) -> Option<NodeId> {
    self.hovered.first().copied()
  }

  /// Move the pointer over `node`: `mouseleave` for elements no longer hovered (innermost
  /// first), `mouseenter` for newly hovered ones (outermost first), then `mouseover`.
  pub fn hover(&mut self, node: NodeId) {
    let next: Vec<NodeId> = self
      .document
      .ancestors(node)
      .filter(|&n| self.document.is_element(n))
      .collect();
    let left: Vec<NodeId> = self
      .hovered
      .iter()
      .copied()
      .filter(|n| !next.contains(n))
      .collect();
    let entered: Vec<NodeId> = next
      .iter()
      .rev()
      .copied()
      .filter(|n| !self.hovered.contains(n))
      .collect();
    self.hovered = next;

    for element in left {
      self.dispatch_event(&mut Event::new(EventType::MouseLeave, element));
    }
    for element in entered {
      self.dispatch_event(&mut Event::new(EventType::MouseEnter, element));
    }
    if self.document.is_element(node) {
      self.dispatch_event(&mut Event::new(EventType::MouseOver, node));
    }
    self.run_until_idle();
  }

  /// Hover `node` and press the primary button on it.
  pub fn mouse_down(&mut self, node: NodeId) {
    self.hover(node);
    self.dispatch_event(&mut Event::new(EventType::MouseDown, node));
    self.run_until_idle();
  }
}
