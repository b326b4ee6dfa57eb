//! Composition root for predictive preloading
//!
//! A [`PreloadSession`] owns the one [`PrefetchCache`] a page uses, the [`Preloader`] writing to
//! it, and the [`LinkPreloadObserver`] feeding it. The observer reports raw triggers; the session
//! filters them through the preloader's eligibility rules before acting on them. Eagerly marked
//! links must also not drive a content frame.

use crate::dom::NodeId;
use crate::event::Event;
use crate::page::Page;
use crate::preload::{LinkPreloadDelegate, LinkPreloadObserver, PrefetchCache, Preloader, Rejection};
use std::rc::Rc;
use tracing::debug;
use url::Url;

struct SessionDelegate {
  preloader: Rc<Preloader>,
}

impl SessionDelegate {
  fn admit(link: NodeId, trigger: &'static str, verdict: Result<Url, Rejection>) -> bool {
    match verdict {
      Ok(_) => true,
      Err(rejection) => {
        debug!(link = link.index(), trigger, %rejection, "preload rejected");
        false
      }
    }
  }
}

impl LinkPreloadDelegate for SessionDelegate {
  fn preload_anchor(&self, page: &mut Page, link: NodeId) {
    let verdict = self.preloader.check_eager_preloadable(page.document(), link);
    if Self::admit(link, "eager", verdict) {
      self.preloader.preload_anchor(page, link);
    }
  }

  fn predictive_preload_triggered(&self, page: &mut Page, link: NodeId) {
    let verdict = self.preloader.check_preloadable(page.document(), link);
    if Self::admit(link, "predictive", verdict) {
      self.preloader.predictive_preload_triggered(page, link);
    }
  }

  fn use_cached_request_for_preload_fetch_request_event(&self, page: &mut Page, event: &mut Event) {
    self
      .preloader
      .use_cached_request_for_preload_fetch_request_event(page, event);
  }
}

pub struct PreloadSession {
  cache: Rc<PrefetchCache>,
  preloader: Rc<Preloader>,
  observer: Rc<LinkPreloadObserver>,
}

impl Default for PreloadSession {
  fn default() -> Self {
    Self::new()
  }
}

impl PreloadSession {
  pub fn new() -> Self {
    let cache = Rc::new(PrefetchCache::new());
    let preloader = Preloader::new(Rc::clone(&cache));
    let observer = LinkPreloadObserver::new(Rc::new(SessionDelegate {
      preloader: Rc::clone(&preloader),
    }));
    Self {
      cache,
      preloader,
      observer,
    }
  }

  pub fn start(&self, page: &mut Page) {
    self.observer.start(page);
  }

  /// Stop observing, silence pending hover delays and empty the cache.
  pub fn stop(&self, page: &mut Page) {
    self.observer.stop(page);
    self.preloader.halt(page);
    self.cache.clear();
  }

  pub fn is_started(&self) -> bool {
    self.observer.is_started()
  }

  pub fn cache(&self) -> &Rc<PrefetchCache> {
    &self.cache
  }

  pub fn preloader(&self) -> &Rc<Preloader> {
    &self.preloader
  }

  pub fn observer(&self) -> &Rc<LinkPreloadObserver> {
    &self.observer
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::dom::parse_html;
  use crate::resource::{FetchedResource, HttpRequest, ResourceFetcher};
  use crate::timer::ManualClock;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;

  #[derive(Default)]
  struct Counter(AtomicUsize);

  impl ResourceFetcher for Counter {
    fn fetch(&self, _request: &HttpRequest) -> crate::Result<FetchedResource> {
      self.0.fetch_add(1, Ordering::SeqCst);
      Ok(FetchedResource::new(Vec::new(), Some("text/html".into())))
    }
  }

  fn loaded_page(html: &str) -> (Page, Arc<Counter>) {
    let counter = Arc::new(Counter::default());
    let document = parse_html(html, "https://example.com/here").unwrap();
    let mut page = Page::new(document, counter.clone(), Rc::new(ManualClock::new()));
    page.finish_loading();
    (page, counter)
  }

  #[test]
  fn ineligible_eager_links_are_not_fetched() {
    let (mut page, counter) = loaded_page(
      r#"<a href="/ok" data-preload>ok</a>
         <a href="/here" data-preload>same page</a>
         <a href="https://other.example/" data-preload>away</a>"#,
    );
    let session = PreloadSession::new();
    session.start(&mut page);
    page.run_until_idle();
    assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    assert_eq!(session.cache().len(), 1);
  }

  #[test]
  fn stop_clears_cache_and_pending_delay() {
    let (mut page, counter) = loaded_page(
      r#"<meta name="predictive-preload-enabled" content="true">
         <a id="now" href="/now" data-preload>now</a>
         <a id="later" href="/later" data-predictive-preload-delay="100">later</a>"#,
    );
    let session = PreloadSession::new();
    session.start(&mut page);
    assert!(session.is_started());
    let later = page.document().element_by_id("later").unwrap();
    page.hover(later);
    assert!(session.preloader().pending_delay().is_some());

    session.stop(&mut page);
    assert!(!session.is_started());
    assert!(session.cache().is_empty());
    assert!(session.preloader().pending_delay().is_none());
    page.advance(std::time::Duration::from_millis(200));
    assert_eq!(counter.0.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn eager_links_driving_a_frame_are_skipped() {
    let (mut page, counter) = loaded_page(
      r#"<content-frame id="hello"><a href="/inner" data-preload>inner</a></content-frame>
         <a href="/targeted" data-frame="hello" data-preload>targeted</a>
         <content-frame id="menu"><a href="/top" data-frame="_top" data-preload>top</a></content-frame>"#,
    );
    let session = PreloadSession::new();
    session.start(&mut page);
    page.run_until_idle();
    assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    assert!(session.cache().get("https://example.com/top").is_some());
  }

  #[test]
  fn superseded_delay_does_not_refill_cache_after_stop() {
    let (mut page, counter) = loaded_page(
      r#"<meta name="predictive-preload-enabled" content="true">
         <meta name="predictive-preload-delay" content="300">
         <a id="a" href="/a">a</a><a id="b" href="/b">b</a>"#,
    );
    let session = PreloadSession::new();
    session.start(&mut page);
    let a = page.document().element_by_id("a").unwrap();
    let b = page.document().element_by_id("b").unwrap();
    session.preloader().predictive_preload_triggered(&mut page, a);
    session.preloader().predictive_preload_triggered(&mut page, b);

    session.stop(&mut page);
    page.advance(std::time::Duration::from_millis(400));
    assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    assert!(session.cache().is_empty());
  }
}
