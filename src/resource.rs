//! Resource fetching abstraction
//!
//! The preload engine never talks to the network itself. A [`FetchRequest`] hands a fully
//! prepared [`HttpRequest`] to whatever [`ResourceFetcher`] the host page was built with, which
//! keeps the engine agnostic about transports and lets tests count requests.
//!
//! # Example
//!
//! ```rust,ignore
//! use predictive_preload::resource::{FetchedResource, HttpRequest, ResourceFetcher};
//!
//! struct Offline;
//!
//! impl ResourceFetcher for Offline {
//!   fn fetch(&self, request: &HttpRequest) -> predictive_preload::Result<FetchedResource> {
//!     Ok(FetchedResource::new(b"<html></html>".to_vec(), Some("text/html".into())))
//!   }
//! }
//! ```
//!
//! [`FetchRequest`]: crate::fetch::FetchRequest

use crate::error::Result;
use crate::fetch::FetchMethod;
use std::sync::Arc;

/// A request as handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
  pub method: FetchMethod,
  pub url: String,
  /// Headers in insertion order; names keep the casing they were set with.
  pub headers: Vec<(String, String)>,
  /// Form-encoded body for non-GET requests.
  pub body: Option<String>,
}

impl HttpRequest {
  /// Case-insensitive header lookup.
  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(k, _)| k.eq_ignore_ascii_case(name))
      .map(|(_, v)| v.as_str())
  }
}

/// Result of fetching a resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResource {
  /// Raw bytes of the resource
  pub bytes: Vec<u8>,
  /// Content-Type header value, if available (e.g., "text/html")
  pub content_type: Option<String>,
  /// HTTP status code, when the transport reports one
  pub status: Option<u16>,
}

impl FetchedResource {
  /// Create a new FetchedResource
  pub fn new(bytes: Vec<u8>, content_type: Option<String>) -> Self {
    Self {
      bytes,
      content_type,
      status: None,
    }
  }

  pub fn with_status(mut self, status: u16) -> Self {
    self.status = Some(status);
    self
  }

  /// Responses without a status (file/data transports) count as successful.
  pub fn is_success(&self) -> bool {
    self
      .status
      .map(|status| (200..300).contains(&status))
      .unwrap_or(true)
  }

  pub fn text(&self) -> String {
    String::from_utf8_lossy(&self.bytes).into_owned()
  }
}

/// Trait for the transport behind fetch requests
///
/// Implementations must be `Send + Sync` so a single transport can be shared between pages.
pub trait ResourceFetcher: Send + Sync {
  /// Perform `request`, returning the response or a transport error.
  ///
  /// Non-2xx responses should be returned as `Ok` with `status` set; `Err` is reserved for
  /// failures where no response was received.
  fn fetch(&self, request: &HttpRequest) -> Result<FetchedResource>;
}

// Allow Arc<dyn ResourceFetcher> to be used as ResourceFetcher
impl<T: ResourceFetcher + ?Sized> ResourceFetcher for Arc<T> {
  fn fetch(&self, request: &HttpRequest) -> Result<FetchedResource> {
    (**self).fetch(request)
  }
}
