//! Shared doubles for the integration tests: an in-memory server that records every request and
//! a page driven by a manual clock.

#![allow(dead_code)]

use predictive_preload::dom::{parse_html, NodeId};
use predictive_preload::resource::{FetchedResource, HttpRequest, ResourceFetcher};
use predictive_preload::timer::ManualClock;
use predictive_preload::{Page, PreloadSession};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

pub const LOCATION: &str = "https://example.com/current";
pub const ENABLED: &str = r#"<meta name="predictive-preload-enabled" content="true">"#;

/// Answers every request with a small HTML page, or with a configured status.
#[derive(Default)]
pub struct Server {
  requests: Mutex<Vec<HttpRequest>>,
  statuses: HashMap<String, u16>,
}

impl Server {
  pub fn with_status(mut self, url: &str, status: u16) -> Self {
    self.statuses.insert(url.to_string(), status);
    self
  }

  pub fn requests(&self) -> Vec<HttpRequest> {
    self.requests.lock().unwrap().clone()
  }

  pub fn urls(&self) -> Vec<String> {
    self.requests().into_iter().map(|r| r.url).collect()
  }

  pub fn count(&self) -> usize {
    self.requests.lock().unwrap().len()
  }
}

impl ResourceFetcher for Server {
  fn fetch(&self, request: &HttpRequest) -> predictive_preload::Result<FetchedResource> {
    self.requests.lock().unwrap().push(request.clone());
    let status = self.statuses.get(&request.url).copied().unwrap_or(200);
    let body = format!("<html><body>{}</body></html>", request.url);
    Ok(FetchedResource::new(body.into_bytes(), Some("text/html".to_string())).with_status(status))
  }
}

pub struct Harness {
  pub page: Page,
  pub server: Arc<Server>,
  pub session: PreloadSession,
}

impl Harness {
  /// A fully loaded page with a started session.
  pub fn new(head: &str, body: &str) -> Self {
    Self::with_server(head, body, Server::default())
  }

  pub fn with_server(head: &str, body: &str, server: Server) -> Self {
    let html = format!("<html><head>{head}</head><body>{body}</body></html>");
    let document = parse_html(&html, LOCATION).unwrap();
    let server = Arc::new(server);
    let mut page = Page::new(document, server.clone(), Rc::new(ManualClock::new()));
    page.finish_loading();
    let session = PreloadSession::new();
    session.start(&mut page);
    page.run_until_idle();
    Self {
      page,
      server,
      session,
    }
  }

  pub fn el(&self, id: &str) -> NodeId {
    self
      .page
      .document()
      .element_by_id(id)
      .unwrap_or_else(|| panic!("no element #{id}"))
  }

  pub fn hover(&mut self, id: &str) {
    let node = self.el(id);
    self.page.hover(node);
  }

  pub fn fetches(&self) -> usize {
    self.server.count()
  }
}
