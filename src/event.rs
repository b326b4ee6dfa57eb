//! Events and listener registration
//!
//! Listeners are registered on a node (the document node for document-level listeners) with
//! capture/passive/once options. [`Page::dispatch_event`](crate::page::Page::dispatch_event)
//! walks the propagation path and asks the registry for matching listeners per phase.

use crate::dom::NodeId;
use crate::fetch::{FetchMethod, FetchRequest};
use crate::page::Page;
use crate::resource::FetchedResource;
use std::fmt;
use std::rc::Rc;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
  DomContentLoaded,
  /// A full-page navigation finished rendering.
  Load,
  /// A frame-scoped navigation finished rendering.
  FrameLoad,
  /// A real navigation is about to issue its fetch.
  BeforeFetchRequest,
  /// A fetch received a response and is about to hand it to its delegate.
  BeforeFetchResponse,
  MouseEnter,
  MouseLeave,
  MouseOver,
  MouseDown,
}

impl EventType {
  pub fn as_str(self) -> &'static str {
    match self {
      EventType::DomContentLoaded => "DOMContentLoaded",
      EventType::Load => "page:load",
      EventType::FrameLoad => "page:frame-load",
      EventType::BeforeFetchRequest => "page:before-fetch-request",
      EventType::BeforeFetchResponse => "page:before-fetch-response",
      EventType::MouseEnter => "mouseenter",
      EventType::MouseLeave => "mouseleave",
      EventType::MouseOver => "mouseover",
      EventType::MouseDown => "mousedown",
    }
  }

  pub fn bubbles(self) -> bool {
    !matches!(self, EventType::MouseEnter | EventType::MouseLeave)
  }
}

impl fmt::Display for EventType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
  pub method: FetchMethod,
}

/// Detail of a before-fetch-request event. Listeners may replace `fetch_request` to make the
/// navigation reuse another request.
#[derive(Clone)]
pub struct FetchRequestDetail {
  pub url: Url,
  pub fetch_options: FetchOptions,
  pub fetch_request: Rc<FetchRequest>,
}

#[derive(Clone)]
pub struct FetchResponseDetail {
  pub fetch_request: Rc<FetchRequest>,
  pub fetch_response: FetchedResource,
}

#[derive(Clone, Default)]
pub enum EventDetail {
  #[default]
  None,
  FetchRequest(FetchRequestDetail),
  FetchResponse(FetchResponseDetail),
}

pub struct Event {
  event_type: EventType,
  target: NodeId,
  bubbles: bool,
  default_prevented: bool,
  in_passive_listener: bool,
  pub detail: EventDetail,
}

impl Event {
  pub fn new(event_type: EventType, target: NodeId) -> Self {
    Self {
      event_type,
      target,
      bubbles: event_type.bubbles(),
      default_prevented: false,
      in_passive_listener: false,
      detail: EventDetail::None,
    }
  }

  pub fn with_detail(mut self, detail: EventDetail) -> Self {
    self.detail = detail;
    self
  }

  pub fn event_type(&self) -> EventType {
    self.event_type
  }

  pub fn target(&self) -> NodeId {
    self.target
  }

  pub fn bubbles(&self) -> bool {
    self.bubbles
  }

  /// Ignored while a passive listener is running.
  pub fn prevent_default(&mut self) {
    if !self.in_passive_listener {
      self.default_prevented = true;
    }
  }

  pub fn default_prevented(&self) -> bool {
    self.default_prevented
  }

  pub(crate) fn set_in_passive_listener(&mut self, passive: bool) {
    self.in_passive_listener = passive;
  }

  pub fn fetch_request_detail(&self) -> Option<&FetchRequestDetail> {
    match &self.detail {
      EventDetail::FetchRequest(detail) => Some(detail),
      _ => None,
    }
  }

  pub fn fetch_request_detail_mut(&mut self) -> Option<&mut FetchRequestDetail> {
    match &mut self.detail {
      EventDetail::FetchRequest(detail) => Some(detail),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListenerOptions {
  pub capture: bool,
  pub passive: bool,
  pub once: bool,
}

impl ListenerOptions {
  pub fn capture() -> Self {
    Self {
      capture: true,
      ..Self::default()
    }
  }

  pub fn passive(mut self) -> Self {
    self.passive = true;
    self
  }

  pub fn once(mut self) -> Self {
    self.once = true;
    self
  }
}

pub type Listener = Rc<dyn Fn(&mut Page, &mut Event)>;

struct Registration {
  id: ListenerId,
  target: NodeId,
  event_type: EventType,
  options: ListenerOptions,
  listener: Listener,
}

/// A listener selected for one phase of a dispatch.
#[derive(Clone)]
pub(crate) struct MatchedListener {
  pub id: ListenerId,
  pub options: ListenerOptions,
  pub listener: Listener,
}

#[derive(Default)]
pub struct EventListeners {
  next_id: u64,
  registrations: Vec<Registration>,
}

impl EventListeners {
  pub fn add(
    &mut self,
    target: NodeId,
    event_type: EventType,
    options: ListenerOptions,
    listener: Listener,
  ) -> ListenerId {
    self.next_id += 1;
    let id = ListenerId(self.next_id);
    self.registrations.push(Registration {
      id,
      target,
      event_type,
      options,
      listener,
    });
    id
  }

  pub fn remove(&mut self, id: ListenerId) -> bool {
    let before = self.registrations.len();
    self.registrations.retain(|r| r.id != id);
    self.registrations.len() != before
  }

  pub fn contains(&self, id: ListenerId) -> bool {
    self.registrations.iter().any(|r| r.id == id)
  }

  pub fn len(&self) -> usize {
    self.registrations.len()
  }

  pub fn is_empty(&self) -> bool {
    self.registrations.is_empty()
  }

  /// Listeners registered for `event_type` on `node`.
  pub fn count_on(&self, node: NodeId, event_type: EventType) -> usize {
    self
      .registrations
      .iter()
      .filter(|r| r.target == node && r.event_type == event_type)
      .count()
  }

  /// Listeners on `node` for `event_type`, filtered by phase. `capture: None` selects both
  /// (at-target phase).
  pub(crate) fn matching(
    &self,
    node: NodeId,
    event_type: EventType,
    capture: Option<bool>,
  ) -> Vec<MatchedListener> {
    self
      .registrations
      .iter()
      .filter(|r| r.target == node && r.event_type == event_type)
      .filter(|r| capture.map_or(true, |c| r.options.capture == c))
      .map(|r| MatchedListener {
        id: r.id,
        options: r.options,
        listener: Rc::clone(&r.listener),
      })
      .collect()
  }
}
