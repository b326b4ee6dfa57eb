//! Error types for predictive preloading
//!
//! This module provides the error types surfaced by the crate:
//! - Parse errors (HTML documents, URLs)
//! - Fetch errors (transport failures reported by a [`ResourceFetcher`])
//!
//! Eligibility checks and configuration reads never produce errors; they degrade to
//! "do not prefetch" or to documented defaults instead.
//!
//! All errors use the `thiserror` crate for minimal boilerplate and
//! proper error trait implementations.
//!
//! [`ResourceFetcher`]: crate::resource::ResourceFetcher

use thiserror::Error;

/// Result type alias for predictive preload operations
///
/// # Examples
///
/// ```
/// use predictive_preload::Result;
///
/// fn parse_page(html: &str) -> Result<()> {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
///
/// Each variant wraps a more specific error type for that subsystem.
#[derive(Error, Debug)]
pub enum Error {
  /// HTML or URL parsing error
  #[error("Parse error: {0}")]
  Parse(#[from] ParseError),

  /// Network error while fetching a resource
  #[error("Fetch error: {0}")]
  Fetch(#[from] FetchError),

  /// I/O error (file reading, transport, etc.)
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
}

/// Errors that occur while parsing documents or locations
///
/// # Examples
///
/// ```
/// use predictive_preload::error::ParseError;
///
/// let error = ParseError::InvalidUrl {
///     url: "http://".to_string(),
///     reason: "empty host".to_string(),
/// };
/// assert!(error.to_string().contains("http://"));
/// ```
#[derive(Error, Debug, Clone)]
pub enum ParseError {
  /// Invalid HTML input
  #[error("Invalid HTML: {message}")]
  InvalidHtml { message: String },

  /// A document location or base URL could not be parsed
  #[error("Invalid URL '{url}': {reason}")]
  InvalidUrl { url: String, reason: String },
}

/// Errors that occur while a fetch request is in flight
///
/// These are stored on the [`FetchRequest`](crate::fetch::FetchRequest) handle so any consumer
/// that later reuses the handle observes the same failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
  /// The transport failed before a response was received
  #[error("Failed to fetch '{url}': {reason}")]
  Transport { url: String, reason: String },
}

impl FetchError {
  /// Flatten any crate error into a transport failure for `url`.
  pub fn from_error(url: &str, error: Error) -> Self {
    match error {
      Error::Fetch(err) => err,
      other => FetchError::Transport {
        url: url.to_string(),
        reason: other.to_string(),
      },
    }
  }
}
