//! Prefetch eligibility
//!
//! A pure function of the link's attributes, its ancestors, and the document location. Rules
//! run in a fixed order and the first failing rule decides the [`Rejection`].

use super::{
  FRAME_ATTRIBUTE, FRAME_ELEMENT, METHOD_ATTRIBUTE, NAVIGATE_ATTRIBUTE,
  PREDICTIVE_PRELOAD_ATTRIBUTE, STREAM_ATTRIBUTE, TOP_FRAME,
};
use crate::dom::{Document, NodeId};
use crate::fetch::FetchMethod;
use serde::Serialize;
use std::fmt;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rejection {
  MissingHref,
  EmptyFragment,
  NavigationDisabled,
  PreloadDisabled,
  StreamResponse,
  Unresolvable,
  CrossOrigin,
  UnsupportedScheme,
  SamePage,
  NonGetMethod,
  TargetsFrame,
  SubtreeDisabled,
  DrivesFrame,
}

impl Rejection {
  pub fn describe(self) -> &'static str {
    match self {
      Rejection::MissingHref => "link has no href",
      Rejection::EmptyFragment => "href is a bare '#'",
      Rejection::NavigationDisabled => "navigation disabled on the link or an ancestor",
      Rejection::PreloadDisabled => "preloading disabled on the link",
      Rejection::StreamResponse => "link expects a stream response",
      Rejection::Unresolvable => "href does not resolve to an absolute URL",
      Rejection::CrossOrigin => "target is on another origin",
      Rejection::UnsupportedScheme => "target scheme is not http or https",
      Rejection::SamePage => "target is the current page",
      Rejection::NonGetMethod => "link navigates with a non-GET method",
      Rejection::TargetsFrame => "link targets an embedded frame",
      Rejection::SubtreeDisabled => "preloading disabled on an enclosing element",
      Rejection::DrivesFrame => "link navigates a content frame, not the page",
    }
  }
}

impl fmt::Display for Rejection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.describe())
  }
}

fn is_false(value: &str) -> bool {
  value.trim().eq_ignore_ascii_case("false")
}

fn path_and_query(url: &Url) -> (&str, &str) {
  (url.path(), url.query().unwrap_or(""))
}

/// Whether `link`'s `target` names an `<iframe>` in this document.
pub fn targets_frame(document: &Document, link: NodeId) -> bool {
  let Some(target) = document
    .get_attribute_ref(link, "target")
    .map(str::trim)
    .filter(|t| !t.is_empty())
  else {
    return false;
  };
  document
    .elements_by_tag_name("iframe")
    .into_iter()
    .any(|frame| document.get_attribute_ref(frame, "name") == Some(target))
}

/// Run every eligibility rule, returning the resolved target URL when the link may be
/// prefetched.
pub fn check_preloadable(document: &Document, link: NodeId) -> Result<Url, Rejection> {
  let href = document
    .get_attribute_ref(link, "href")
    .map(str::trim)
    .filter(|href| !href.is_empty())
    .ok_or(Rejection::MissingHref)?;
  if href == "#" {
    return Err(Rejection::EmptyFragment);
  }
  // The nearest explicit value wins, so a `data-navigate="true"` inside a disabled subtree
  // re-enables it.
  if document
    .closest_with_attribute(link, NAVIGATE_ATTRIBUTE)
    .and_then(|node| document.get_attribute_ref(node, NAVIGATE_ATTRIBUTE))
    .is_some_and(is_false)
  {
    return Err(Rejection::NavigationDisabled);
  }
  if document
    .get_attribute_ref(link, PREDICTIVE_PRELOAD_ATTRIBUTE)
    .is_some_and(is_false)
  {
    return Err(Rejection::PreloadDisabled);
  }
  if document
    .get_attribute_ref(link, STREAM_ATTRIBUTE)
    .is_some_and(|value| !is_false(value))
  {
    return Err(Rejection::StreamResponse);
  }

  let url = document
    .location_for_link(link)
    .ok_or(Rejection::Unresolvable)?;
  let location = document.location();

  if url.origin() != location.origin() {
    return Err(Rejection::CrossOrigin);
  }
  if !matches!(url.scheme(), "http" | "https") {
    return Err(Rejection::UnsupportedScheme);
  }
  if path_and_query(&url) == path_and_query(location) {
    return Err(Rejection::SamePage);
  }
  if document
    .get_attribute_ref(link, METHOD_ATTRIBUTE)
    .is_some_and(|method| FetchMethod::parse(method) != Some(FetchMethod::Get))
  {
    return Err(Rejection::NonGetMethod);
  }
  if targets_frame(document, link) {
    return Err(Rejection::TargetsFrame);
  }
  if document
    .closest_with_attribute(link, PREDICTIVE_PRELOAD_ATTRIBUTE)
    .and_then(|node| document.get_attribute_ref(node, PREDICTIVE_PRELOAD_ATTRIBUTE))
    .is_some_and(is_false)
  {
    return Err(Rejection::SubtreeDisabled);
  }

  Ok(url)
}

pub fn is_preloadable(document: &Document, link: NodeId) -> bool {
  check_preloadable(document, link).is_ok()
}

/// Whether following `link` replaces a content frame rather than the page: an explicit
/// `data-frame` other than `_top`, or no `data-frame` inside a frame container.
pub fn drives_frame(document: &Document, link: NodeId) -> bool {
  match document
    .get_attribute_ref(link, FRAME_ATTRIBUTE)
    .map(str::trim)
    .filter(|frame| !frame.is_empty())
  {
    Some(TOP_FRAME) => false,
    Some(_) => true,
    None => enclosing_frame(document, link).is_some(),
  }
}

/// [`check_preloadable`] plus the frame check applied to links marked for eager preloading.
/// A frame-scoped response is not a page the user can navigate to.
pub fn check_eager_preloadable(document: &Document, link: NodeId) -> Result<Url, Rejection> {
  let url = check_preloadable(document, link)?;
  if drives_frame(document, link) {
    return Err(Rejection::DrivesFrame);
  }
  Ok(url)
}

/// The frame container enclosing `link`, if any.
pub fn enclosing_frame(document: &Document, link: NodeId) -> Option<NodeId> {
  document.closest(link, |doc, node| doc.has_tag(node, FRAME_ELEMENT))
}
