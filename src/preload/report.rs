//! Preload plan for a static document

use super::config::{link_cache_ttl, link_delay, PreloadSettings};
use super::eligibility::{check_eager_preloadable, check_preloadable, Rejection};
use super::EAGER_PRELOAD_ATTRIBUTE;
use crate::dom::Document;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkReport {
  pub href: Option<String>,
  /// Resolved target, fragment stripped.
  pub url: Option<String>,
  pub eligible: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub rejection: Option<Rejection>,
  /// Marked for eager preloading.
  pub eager: bool,
  pub delay_ms: u64,
  pub cache_ttl_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreloadPlan {
  pub location: String,
  pub settings: PreloadSettings,
  pub links: Vec<LinkReport>,
}

impl PreloadPlan {
  pub fn eligible(&self) -> impl Iterator<Item = &LinkReport> {
    self.links.iter().filter(|link| link.eligible)
  }
}

/// Evaluate every `<a>` in `document` the way the preload engine would at this moment. Eagerly
/// marked links are judged by the stricter eager rules.
pub fn plan_document(document: &Document) -> PreloadPlan {
  let links = document
    .elements_by_tag_name("a")
    .into_iter()
    .map(|link| {
      let eager = document.has_attribute(link, EAGER_PRELOAD_ATTRIBUTE);
      let verdict = if eager {
        check_eager_preloadable(document, link)
      } else {
        check_preloadable(document, link)
      };
      LinkReport {
        href: document.get_attribute(link, "href"),
        url: document.location_for_link(link).map(String::from),
        eligible: verdict.is_ok(),
        rejection: verdict.err(),
        eager,
        delay_ms: link_delay(document, link).as_millis() as u64,
        cache_ttl_ms: link_cache_ttl(document, link).as_millis() as u64,
      }
    })
    .collect();

  PreloadPlan {
    location: document.location().to_string(),
    settings: PreloadSettings::read(document),
    links,
  }
}
