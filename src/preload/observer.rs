//! Trigger detection
//!
//! [`LinkPreloadObserver`] decides *when* a link should be preloaded and forwards the decision to
//! a [`LinkPreloadDelegate`]. It never checks eligibility itself.
//!
//! ```text
//!   Stopped --start (loading)--> Starting --DOMContentLoaded--> Started
//!   Stopped --start (parsed)---------------------------------> Started
//!   Starting/Started --stop--> Stopped
//! ```
//!
//! Once started it listens, on the document, for page and frame loads (eager scan), outgoing
//! navigation fetches (cache splice) and, when predictive preloading is enabled, the configured
//! pointer event. A mutation watch on the body picks up links that gain the eager marker or are
//! inserted carrying it.

use super::config::{predictive_preload_enabled, trigger_event};
use super::preloader::Preloader;
use super::EAGER_PRELOAD_ATTRIBUTE;
use crate::dom::{Document, NodeId, ReadyState};
use crate::event::{Event, EventType, ListenerId, ListenerOptions};
use crate::mutation::{MutationObserverId, MutationObserverInit, MutationRecord};
use crate::page::Page;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tracing::{debug, trace};

/// What the observer asks of whoever acts on its triggers.
pub trait LinkPreloadDelegate {
  /// An eagerly marked link was found.
  fn preload_anchor(&self, page: &mut Page, link: NodeId);

  /// The pointer trigger fired on a link.
  fn predictive_preload_triggered(&self, page: &mut Page, link: NodeId);

  /// A real navigation is about to fetch; the delegate may swap in another request.
  fn use_cached_request_for_preload_fetch_request_event(&self, page: &mut Page, event: &mut Event);
}

impl LinkPreloadDelegate for Preloader {
  fn preload_anchor(&self, page: &mut Page, link: NodeId) {
    Preloader::preload_anchor(self, page, link);
  }

  fn predictive_preload_triggered(&self, page: &mut Page, link: NodeId) {
    Preloader::predictive_preload_triggered(self, page, link);
  }

  fn use_cached_request_for_preload_fetch_request_event(&self, page: &mut Page, event: &mut Event) {
    Preloader::use_cached_request_for_preload_fetch_request_event(self, page, event);
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverState {
  Stopped,
  /// Waiting for `DOMContentLoaded` before wiring up.
  Starting,
  Started,
}

#[derive(Default)]
struct Wiring {
  listeners: Vec<ListenerId>,
  mutations: Option<MutationObserverId>,
}

pub struct LinkPreloadObserver {
  this: Weak<LinkPreloadObserver>,
  delegate: Rc<dyn LinkPreloadDelegate>,
  state: Cell<ObserverState>,
  deferred_start: Cell<Option<ListenerId>>,
  wiring: RefCell<Wiring>,
}

/// `a[href]` not targeting a named browsing context keyword and not a download.
fn is_predictive_target(document: &Document, node: NodeId) -> bool {
  document.has_tag(node, "a")
    && document.has_attribute(node, "href")
    && !document.has_attribute(node, "download")
    && !document
      .get_attribute_ref(node, "target")
      .is_some_and(|target| target.starts_with('_'))
}

impl LinkPreloadObserver {
  pub fn new(delegate: Rc<dyn LinkPreloadDelegate>) -> Rc<Self> {
    Rc::new_cyclic(|this| Self {
      this: this.clone(),
      delegate,
      state: Cell::new(ObserverState::Stopped),
      deferred_start: Cell::new(None),
      wiring: RefCell::new(Wiring::default()),
    })
  }

  pub fn state(&self) -> ObserverState {
    self.state.get()
  }

  pub fn is_started(&self) -> bool {
    self.state.get() == ObserverState::Started
  }

  pub fn start(&self, page: &mut Page) {
    if self.state.get() != ObserverState::Stopped {
      return;
    }

    if page.document().ready_state() == ReadyState::Loading {
      let this = self.this.clone();
      let root = page.document().root();
      let id = page.add_event_listener(
        root,
        EventType::DomContentLoaded,
        ListenerOptions::default().once(),
        move |page, _| {
          if let Some(observer) = this.upgrade() {
            observer.deferred_start.set(None);
            observer.wire(page);
          }
        },
      );
      self.deferred_start.set(Some(id));
      self.state.set(ObserverState::Starting);
      debug!("link preload observer waiting for DOMContentLoaded");
    } else {
      self.wire(page);
    }
  }

  pub fn stop(&self, page: &mut Page) {
    if let Some(id) = self.deferred_start.take() {
      page.remove_event_listener(id);
    }
    let wiring = std::mem::take(&mut *self.wiring.borrow_mut());
    for id in wiring.listeners {
      page.remove_event_listener(id);
    }
    if let Some(id) = wiring.mutations {
      page.disconnect_mutation_observer(id);
    }
    if self.state.replace(ObserverState::Stopped) != ObserverState::Stopped {
      debug!("link preload observer stopped");
    }
  }

  fn wire(&self, page: &mut Page) {
    let root = page.document().root();
    let mut listeners = Vec::new();

    for event_type in [EventType::Load, EventType::FrameLoad] {
      let this = self.this.clone();
      listeners.push(page.add_event_listener(
        root,
        event_type,
        ListenerOptions::capture(),
        move |page, _| {
          if let Some(observer) = this.upgrade() {
            observer.preload_links_immediately(page);
          }
        },
      ));
    }

    let delegate = Rc::clone(&self.delegate);
    listeners.push(page.add_event_listener(
      root,
      EventType::BeforeFetchRequest,
      ListenerOptions::capture(),
      move |page, event| delegate.use_cached_request_for_preload_fetch_request_event(page, event),
    ));

    let this = self.this.clone();
    let body = page.document().body();
    let mutations = page.observe_mutations(
      body,
      MutationObserverInit {
        attribute_filter: Some(vec![EAGER_PRELOAD_ATTRIBUTE.to_string()]),
        child_list: true,
        subtree: true,
        ..Default::default()
      },
      move |page, records| {
        if let Some(observer) = this.upgrade() {
          observer.preload_mutated_links(page, records);
        }
      },
    );

    self.preload_links_immediately(page);

    if predictive_preload_enabled(page.document()) {
      let trigger = trigger_event(page.document());
      let delegate = Rc::clone(&self.delegate);
      listeners.push(page.add_event_listener(
        root,
        trigger.event_type(),
        ListenerOptions::capture().passive(),
        move |page, event| {
          // The meta tag can be flipped off after wiring.
          if !predictive_preload_enabled(page.document()) {
            return;
          }
          let target = event.target();
          if is_predictive_target(page.document(), target) {
            delegate.predictive_preload_triggered(page, target);
          }
        },
      ));
      debug!(trigger = trigger.as_str(), "predictive preloading enabled");
    }

    *self.wiring.borrow_mut() = Wiring {
      listeners,
      mutations: Some(mutations),
    };
    self.state.set(ObserverState::Started);
    debug!("link preload observer started");
  }

  fn preload_links_immediately(&self, page: &mut Page) {
    let document = page.document();
    let links: Vec<NodeId> = document
      .elements_with_attribute(document.body(), EAGER_PRELOAD_ATTRIBUTE)
      .into_iter()
      .filter(|&node| document.has_tag(node, "a"))
      .collect();
    trace!(count = links.len(), "eager preload scan");
    for link in links {
      self.delegate.preload_anchor(page, link);
    }
  }

  fn preload_mutated_links(&self, page: &mut Page, records: Vec<MutationRecord>) {
    for record in records {
      let candidates = match record {
        MutationRecord::Attributes { target, .. } => vec![target],
        MutationRecord::ChildList { added_nodes, .. } => added_nodes
          .into_iter()
          .flat_map(|node| {
            page
              .document()
              .elements_with_attribute(node, EAGER_PRELOAD_ATTRIBUTE)
          })
          .collect(),
      };
      for node in candidates {
        // Removing the marker also produces a record.
        let document = page.document();
        if document.has_tag(node, "a") && document.has_attribute(node, EAGER_PRELOAD_ATTRIBUTE) {
          self.delegate.preload_anchor(page, node);
        }
      }
    }
  }
}
