//! Driven navigation
//!
//! The smallest navigation pipeline that exercises the prefetch splice: build the request for a
//! link or form, announce it with a `before-fetch-request` event whose listeners may replace the
//! request, then perform whatever request survived. A substituted request is never performed
//! again; the visit waits on it as-is.

use crate::dom::{Document, NodeId};
use crate::event::{Event, EventDetail, EventType, FetchOptions, FetchRequestDetail};
use crate::fetch::{FetchMethod, FetchRequest};
use crate::page::Page;
use crate::preload::{METHOD_ATTRIBUTE, NAVIGATE_ATTRIBUTE};
use crate::resource::FetchedResource;
use std::rc::Rc;
use tracing::{debug, info};
use url::Url;

/// A navigation that has been handed to the network layer.
#[derive(Debug, Clone)]
pub struct Visit {
  /// The link or form that started the visit.
  pub element: NodeId,
  pub url: Url,
  pub request: Rc<FetchRequest>,
  /// The request was adopted from the prefetch cache instead of being issued.
  pub used_prefetch: bool,
}

impl Visit {
  pub fn is_finished(&self) -> bool {
    self.request.is_finished()
  }

  pub fn response(&self) -> Option<FetchedResource> {
    self.request.response()
  }
}

fn navigation_disabled(document: &Document, element: NodeId) -> bool {
  document
    .closest_with_attribute(element, NAVIGATE_ATTRIBUTE)
    .and_then(|node| document.get_attribute_ref(node, NAVIGATE_ATTRIBUTE))
    .is_some_and(|value| value.trim().eq_ignore_ascii_case("false"))
}

/// Follow `link`. Returns `None` when the link has no usable target or opts out of driven
/// navigation.
pub fn visit_link(page: &mut Page, link: NodeId) -> Option<Visit> {
  let document = page.document();
  if navigation_disabled(document, link) {
    debug!(link = link.index(), "navigation not driven");
    return None;
  }
  let url = document.location_for_link(link)?;
  let method = document
    .get_attribute_ref(link, METHOD_ATTRIBUTE)
    .and_then(FetchMethod::parse)
    .unwrap_or(FetchMethod::Get);
  Some(start_visit(page, link, method, url, Vec::new()))
}

/// Submit `form` with the values of its named `<input>` descendants.
pub fn submit_form(page: &mut Page, form: NodeId) -> Option<Visit> {
  let document = page.document();
  if !document.has_tag(form, "form") || navigation_disabled(document, form) {
    return None;
  }
  let url = match document.get_attribute_ref(form, "action") {
    Some(action) if !action.trim().is_empty() => document.resolve_url(action)?,
    _ => {
      let mut location = document.location().clone();
      location.set_fragment(None);
      location
    }
  };
  let method = document
    .get_attribute_ref(form, "method")
    .and_then(FetchMethod::parse)
    .unwrap_or(FetchMethod::Get);
  let params = document
    .descendants(form)
    .into_iter()
    .filter(|&node| document.has_tag(node, "input") && !document.has_attribute(node, "disabled"))
    .filter_map(|input| {
      let name = document.get_attribute(input, "name")?;
      let value = document.get_attribute(input, "value").unwrap_or_default();
      Some((name, value))
    })
    .collect();
  Some(start_visit(page, form, method, url, params))
}

/// Press on `node` and follow the closest enclosing link, if any.
pub fn click(page: &mut Page, node: NodeId) -> Option<Visit> {
  page.mouse_down(node);
  let link = page
    .document()
    .closest(node, |doc, n| doc.has_tag(n, "a") && doc.has_attribute(n, "href"))?;
  visit_link(page, link)
}

fn start_visit(
  page: &mut Page,
  element: NodeId,
  method: FetchMethod,
  url: Url,
  params: Vec<(String, String)>,
) -> Visit {
  let request = FetchRequest::new(None, method, url, params, Some(element));
  let url = request.url().clone();

  let mut event = Event::new(EventType::BeforeFetchRequest, element).with_detail(
    EventDetail::FetchRequest(FetchRequestDetail {
      url: url.clone(),
      fetch_options: FetchOptions { method },
      fetch_request: Rc::clone(&request),
    }),
  );
  page.dispatch_event(&mut event);

  let adopted = event
    .fetch_request_detail()
    .map(|detail| Rc::clone(&detail.fetch_request))
    .unwrap_or_else(|| Rc::clone(&request));
  let used_prefetch = !Rc::ptr_eq(&adopted, &request);
  if !used_prefetch {
    adopted.perform(page);
  }
  info!(%method, url = %url, used_prefetch, "visit started");
  page.run_until_idle();

  Visit {
    element,
    url,
    request: adopted,
    used_prefetch,
  }
}
