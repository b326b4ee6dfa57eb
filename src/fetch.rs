//! Fetch requests
//!
//! A [`FetchRequest`] is the shareable handle to one in-flight or completed fetch. Prefetches
//! park the handle in the prefetch cache; a later navigation can adopt the same handle and wait
//! on it with [`FetchRequest::when_finished`] instead of issuing a second network request.
//!
//! `perform` is fire-and-forget: it prepares and marks the request started synchronously, then
//! queues a page task that runs the transport and reports the outcome to the delegate.

use crate::dom::{Document, NodeId};
use crate::error::FetchError;
use crate::event::{Event, EventDetail, EventType, FetchResponseDetail};
use crate::page::Page;
use crate::resource::{FetchedResource, HttpRequest};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, trace};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchMethod {
  Get,
  Post,
  Put,
  Patch,
  Delete,
}

impl FetchMethod {
  /// Parse a method name case-insensitively.
  pub fn parse(value: &str) -> Option<Self> {
    match value.trim().to_ascii_lowercase().as_str() {
      "get" => Some(FetchMethod::Get),
      "post" => Some(FetchMethod::Post),
      "put" => Some(FetchMethod::Put),
      "patch" => Some(FetchMethod::Patch),
      "delete" => Some(FetchMethod::Delete),
      _ => None,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      FetchMethod::Get => "GET",
      FetchMethod::Post => "POST",
      FetchMethod::Put => "PUT",
      FetchMethod::Patch => "PATCH",
      FetchMethod::Delete => "DELETE",
    }
  }
}

impl fmt::Display for FetchMethod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchState {
  Pending,
  Started,
  Succeeded(FetchedResource),
  Failed(FetchedResource),
  /// The response arrived but a before-fetch-response listener took over handling it.
  Prevented(FetchedResource),
  Errored(FetchError),
}

impl FetchState {
  pub fn is_finished(&self) -> bool {
    !matches!(self, FetchState::Pending | FetchState::Started)
  }
}

/// Hooks invoked over a request's lifecycle. Every hook defaults to a no-op.
pub trait FetchRequestDelegate {
  /// Mutate the outgoing request (headers) before it is sent.
  fn prepare_request(&self, _document: &Document, _request: &FetchRequest) {}

  fn request_started(&self, _request: &FetchRequest) {}

  fn request_prevented_handling_response(
    &self,
    _request: &FetchRequest,
    _response: &FetchedResource,
  ) {
  }

  fn request_succeeded_with_response(&self, _request: &FetchRequest, _response: &FetchedResource) {}

  fn request_failed_with_response(&self, _request: &FetchRequest, _response: &FetchedResource) {}

  fn request_errored(&self, _request: &FetchRequest, _error: &FetchError) {}

  fn request_finished(&self, _request: &FetchRequest) {}
}

type Waiter = Box<dyn FnOnce(&mut Page, &Rc<FetchRequest>)>;

pub struct FetchRequest {
  delegate: Option<Weak<dyn FetchRequestDelegate>>,
  method: FetchMethod,
  url: Url,
  body: Option<String>,
  target: Option<NodeId>,
  headers: RefCell<Vec<(String, String)>>,
  state: RefCell<FetchState>,
  waiters: RefCell<Vec<Waiter>>,
}

impl fmt::Debug for FetchRequest {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FetchRequest")
      .field("method", &self.method)
      .field("url", &self.url.as_str())
      .field("target", &self.target)
      .field("state", &self.state.borrow())
      .finish()
  }
}

impl FetchRequest {
  /// Build a request. For GET, `params` augment the URL query; otherwise they form the body.
  pub fn new(
    delegate: Option<Weak<dyn FetchRequestDelegate>>,
    method: FetchMethod,
    mut url: Url,
    params: Vec<(String, String)>,
    target: Option<NodeId>,
  ) -> Rc<Self> {
    let body = if method == FetchMethod::Get {
      if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params.iter());
      }
      None
    } else {
      Some(
        url::form_urlencoded::Serializer::new(String::new())
          .extend_pairs(params.iter())
          .finish(),
      )
    };

    Rc::new(Self {
      delegate,
      method,
      url,
      body,
      target,
      headers: RefCell::new(vec![(
        "Accept".to_string(),
        "text/html, application/xhtml+xml".to_string(),
      )]),
      state: RefCell::new(FetchState::Pending),
      waiters: RefCell::new(Vec::new()),
    })
  }

  pub fn method(&self) -> FetchMethod {
    self.method
  }

  pub fn url(&self) -> &Url {
    &self.url
  }

  /// Element that initiated the request.
  pub fn target(&self) -> Option<NodeId> {
    self.target
  }

  pub fn set_header(&self, name: &str, value: &str) {
    let mut headers = self.headers.borrow_mut();
    if let Some((_, existing)) = headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
      *existing = value.to_string();
    } else {
      headers.push((name.to_string(), value.to_string()));
    }
  }

  pub fn header(&self, name: &str) -> Option<String> {
    self
      .headers
      .borrow()
      .iter()
      .find(|(k, _)| k.eq_ignore_ascii_case(name))
      .map(|(_, v)| v.clone())
  }

  pub fn state(&self) -> FetchState {
    self.state.borrow().clone()
  }

  pub fn is_finished(&self) -> bool {
    self.state.borrow().is_finished()
  }

  /// The response, once one has been received.
  pub fn response(&self) -> Option<FetchedResource> {
    match &*self.state.borrow() {
      FetchState::Succeeded(response)
      | FetchState::Failed(response)
      | FetchState::Prevented(response) => Some(response.clone()),
      _ => None,
    }
  }

  pub fn to_http_request(&self) -> HttpRequest {
    HttpRequest {
      method: self.method,
      url: self.url.to_string(),
      headers: self.headers.borrow().clone(),
      body: self.body.clone(),
    }
  }

  fn delegate(&self) -> Option<Rc<dyn FetchRequestDelegate>> {
    self.delegate.as_ref().and_then(Weak::upgrade)
  }

  /// Start the request. Calling `perform` on a request that already started is a no-op.
  pub fn perform(self: &Rc<Self>, page: &mut Page) {
    if *self.state.borrow() != FetchState::Pending {
      trace!(url = %self.url, "fetch already performed");
      return;
    }

    let delegate = self.delegate();
    if let Some(delegate) = &delegate {
      delegate.prepare_request(page.document(), self);
    }
    *self.state.borrow_mut() = FetchState::Started;
    if let Some(delegate) = &delegate {
      delegate.request_started(self);
    }
    debug!(method = %self.method, url = %self.url, "fetch started");

    let request = Rc::clone(self);
    page.queue_task(move |page| {
      let http = request.to_http_request();
      let result = page.fetcher().fetch(&http);
      request.finish(page, result);
    });
  }

  fn finish(self: &Rc<Self>, page: &mut Page, result: crate::Result<FetchedResource>) {
    let delegate = self.delegate();
    match result {
      Ok(response) => {
        let prevented = self.dispatch_before_fetch_response(page, &response);
        let state = if prevented {
          if let Some(delegate) = &delegate {
            delegate.request_prevented_handling_response(self, &response);
          }
          FetchState::Prevented(response)
        } else if response.is_success() {
          if let Some(delegate) = &delegate {
            delegate.request_succeeded_with_response(self, &response);
          }
          FetchState::Succeeded(response)
        } else {
          if let Some(delegate) = &delegate {
            delegate.request_failed_with_response(self, &response);
          }
          FetchState::Failed(response)
        };
        *self.state.borrow_mut() = state;
      }
      Err(err) => {
        let error = FetchError::from_error(self.url.as_str(), err);
        debug!(url = %self.url, error = %error, "fetch errored");
        if let Some(delegate) = &delegate {
          delegate.request_errored(self, &error);
        }
        *self.state.borrow_mut() = FetchState::Errored(error);
      }
    }

    if let Some(delegate) = &delegate {
      delegate.request_finished(self);
    }

    let waiters = std::mem::take(&mut *self.waiters.borrow_mut());
    for waiter in waiters {
      waiter(page, self);
    }
  }

  fn dispatch_before_fetch_response(
    self: &Rc<Self>,
    page: &mut Page,
    response: &FetchedResource,
  ) -> bool {
    let Some(target) = self.target.filter(|&t| page.document().is_connected(t)) else {
      return false;
    };
    let mut event = Event::new(EventType::BeforeFetchResponse, target).with_detail(
      EventDetail::FetchResponse(FetchResponseDetail {
        fetch_request: Rc::clone(self),
        fetch_response: response.clone(),
      }),
    );
    page.dispatch_event(&mut event);
    event.default_prevented()
  }

  /// Run `callback` once the request has finished; immediately if it already has.
  pub fn when_finished<F>(self: &Rc<Self>, page: &mut Page, callback: F)
  where
    F: FnOnce(&mut Page, &Rc<FetchRequest>) + 'static,
  {
    if self.is_finished() {
      callback(page, self);
    } else {
      self.waiters.borrow_mut().push(Box::new(callback));
    }
  }
}
