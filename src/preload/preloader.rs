//! Prefetch issuance
//!
//! The [`Preloader`] turns "this link is worth fetching" into a started [`FetchRequest`] parked in
//! the [`PrefetchCache`], owns the hover-delay timer, and lets a real navigation adopt a parked
//! request instead of fetching again.
//!
//! Only one delay timer is tracked at a time. A second delayed trigger that arrives while one is
//! pending replaces the tracked [`PendingDelay`]; the earlier timer stays scheduled and can no
//! longer be cancelled by its own link's `mouseleave`. [`Preloader::halt`] turns every timer that
//! is still scheduled into a no-op.

use super::cache::{CacheEntry, PrefetchCache};
use super::config::{link_cache_ttl, link_delay};
use super::eligibility::{self, enclosing_frame, Rejection};
use super::{FRAME_ATTRIBUTE, FRAME_HEADER, PURPOSE_HEADER, PURPOSE_PREFETCH, TOP_FRAME};
use crate::dom::{Document, NodeId};
use crate::error::FetchError;
use crate::event::{Event, EventType, ListenerId, ListenerOptions};
use crate::fetch::{FetchMethod, FetchRequest, FetchRequestDelegate};
use crate::page::Page;
use crate::timer::TimerId;
use std::cell::Cell;
use std::rc::{Rc, Weak};
use tracing::{debug, trace};
use url::Url;

/// A hover trigger waiting out its delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingDelay {
  pub link: NodeId,
  pub timer: TimerId,
  /// One-shot `mouseleave` listener on `link` that cancels the tracked timer.
  pub cancel_listener: ListenerId,
}

pub struct Preloader {
  this: Weak<Preloader>,
  cache: Rc<PrefetchCache>,
  pending: Cell<Option<PendingDelay>>,
  /// Bumped by [`Preloader::halt`]; delay timers from an older generation do nothing.
  generation: Cell<u64>,
}

impl Preloader {
  pub fn new(cache: Rc<PrefetchCache>) -> Rc<Self> {
    Rc::new_cyclic(|this| Self {
      this: this.clone(),
      cache,
      pending: Cell::new(None),
      generation: Cell::new(0),
    })
  }

  pub fn cache(&self) -> &Rc<PrefetchCache> {
    &self.cache
  }

  /// The delay currently tracked for cancellation, if any.
  pub fn pending_delay(&self) -> Option<PendingDelay> {
    self.pending.get()
  }

  /// Eligibility for pointer-triggered prefetches.
  pub fn check_preloadable(&self, document: &Document, link: NodeId) -> Result<Url, Rejection> {
    eligibility::check_preloadable(document, link)
  }

  /// Eligibility for links marked for eager preloading, which also must not drive a frame.
  pub fn check_eager_preloadable(
    &self,
    document: &Document,
    link: NodeId,
  ) -> Result<Url, Rejection> {
    eligibility::check_eager_preloadable(document, link)
  }

  /// Cancel the tracked delay. Superseded delay timers scheduled before the halt still fire but
  /// no longer prefetch.
  pub fn halt(&self, page: &mut Page) {
    self.cancel_preload_timeout_if_any(page);
    self.generation.set(self.generation.get() + 1);
  }

  /// Start a GET for `link`'s target and park it in the cache. Returns the started request, or
  /// `None` when the link has no resolvable target.
  pub fn preload_anchor(&self, page: &mut Page, link: NodeId) -> Option<Rc<FetchRequest>> {
    let Some(url) = page.document().location_for_link(link) else {
      debug!(link = link.index(), "preload skipped: unresolvable href");
      return None;
    };
    let ttl = link_cache_ttl(page.document(), link);
    let delegate: Weak<dyn FetchRequestDelegate> = self.this.clone();

    let request = FetchRequest::new(
      Some(delegate),
      FetchMethod::Get,
      url.clone(),
      Vec::new(),
      Some(link),
    );
    request.perform(page);

    self.cache.set(
      url.as_str(),
      CacheEntry {
        request: Rc::clone(&request),
        expiry: page.now() + ttl,
      },
    );
    debug!(url = %url, ttl_ms = ttl.as_millis() as u64, "prefetch issued");
    Some(request)
  }

  /// Entry point for pointer triggers. Waits out the link's delay first when it has one.
  pub fn predictive_preload_triggered(&self, page: &mut Page, link: NodeId) {
    let delay = link_delay(page.document(), link);
    if delay.is_zero() {
      self.preload_anchor_unless_cached(page, link);
      return;
    }

    let this = self.this.clone();
    let generation = self.generation.get();
    let timer = page.set_timeout(delay, move |page| {
      if let Some(preloader) = this.upgrade() {
        preloader.delay_elapsed(page, link, generation);
      }
    });

    let this = self.this.clone();
    let cancel_listener = page.add_event_listener(
      link,
      EventType::MouseLeave,
      ListenerOptions::capture().passive().once(),
      move |page, _event: &mut Event| {
        if let Some(preloader) = this.upgrade() {
          preloader.cancel_preload_timeout_if_any(page);
        }
      },
    );

    let next = PendingDelay {
      link,
      timer,
      cancel_listener,
    };
    if let Some(previous) = self.pending.replace(Some(next)) {
      if page.is_timer_scheduled(previous.timer) {
        debug!(
          timer = %previous.timer,
          link = previous.link.index(),
          "pending delay superseded; earlier timer stays scheduled"
        );
      }
    }
    debug!(timer = %timer, delay_ms = delay.as_millis() as u64, "prefetch delayed");
  }

  fn delay_elapsed(&self, page: &mut Page, link: NodeId, generation: u64) {
    if generation != self.generation.get() {
      trace!(link = link.index(), "delay from before halt elapsed; ignored");
      return;
    }
    // Only the tracked timer clears the tracked state; a superseded timer just fires.
    if let Some(pending) = self.pending.get() {
      if pending.link == link && !page.is_timer_scheduled(pending.timer) {
        page.remove_event_listener(pending.cancel_listener);
        self.pending.set(None);
      }
    }
    self.preload_anchor_unless_cached(page, link);
  }

  /// Prefetch `link` unless the cache already holds a fresh entry for its URL.
  pub fn preload_anchor_unless_cached(&self, page: &mut Page, link: NodeId) {
    let Some(url) = page.document().location_for_link(link) else {
      return;
    };
    if self.cache.get_fresh(url.as_str(), page.now()).is_some() {
      trace!(url = %url, "prefetch cache hit");
      return;
    }
    self.preload_anchor(page, link);
  }

  /// Cancel the tracked delay timer, whichever link it belongs to.
  pub fn cancel_preload_timeout_if_any(&self, page: &mut Page) {
    if let Some(pending) = self.pending.take() {
      if page.clear_timeout(pending.timer) {
        debug!(timer = %pending.timer, "prefetch delay cancelled");
      }
      page.remove_event_listener(pending.cancel_listener);
    }
  }

  /// Let an outgoing GET navigation adopt a fresh prefetched request. Consuming any entry clears
  /// the whole cache. Returns whether the request was substituted.
  pub fn use_cached_request_for_preload_fetch_request_event(
    &self,
    page: &mut Page,
    event: &mut Event,
  ) -> bool {
    if page.document().has_tag(event.target(), "form") {
      return false;
    }
    let now = page.now();
    let Some(detail) = event.fetch_request_detail_mut() else {
      return false;
    };
    if detail.fetch_options.method != FetchMethod::Get {
      return false;
    }

    let mut url = detail.url.clone();
    url.set_fragment(None);
    let Some(entry) = self.cache.get_fresh(url.as_str(), now) else {
      trace!(url = %url, "no fresh prefetch for navigation");
      return false;
    };

    detail.fetch_request = entry.request;
    let dropped = self.cache.len();
    self.cache.clear();
    debug!(url = %url, dropped, "navigation adopted prefetched request; cache cleared");
    true
  }
}

impl FetchRequestDelegate for Preloader {
  fn prepare_request(&self, document: &Document, request: &FetchRequest) {
    request.set_header(PURPOSE_HEADER, PURPOSE_PREFETCH);
    let Some(link) = request.target() else {
      return;
    };

    match document.get_attribute_ref(link, FRAME_ATTRIBUTE) {
      Some(TOP_FRAME) => {}
      Some(frame) if !frame.is_empty() => request.set_header(FRAME_HEADER, frame),
      _ => {
        let frame_id = enclosing_frame(document, link)
          .and_then(|frame| document.get_attribute_ref(frame, "id"))
          .filter(|id| !id.is_empty());
        if let Some(id) = frame_id {
          request.set_header(FRAME_HEADER, id);
        }
      }
    }
  }

  fn request_errored(&self, request: &FetchRequest, error: &FetchError) {
    trace!(url = %request.url(), error = %error, "prefetch errored; entry kept");
  }
}
