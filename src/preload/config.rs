//! Document-level preload settings and per-link overrides
//!
//! Settings come from `<meta name="..." content="...">` tags and are re-read on every decision,
//! so a page that flips a meta tag at runtime changes behavior immediately. Missing or malformed
//! values fall back to defaults; nothing here fails.
//!
//! Precedence for timing values: link attribute, then document setting, then default.

use super::{CACHE_TIME_ATTRIBUTE, DELAY_ATTRIBUTE};
use crate::dom::{Document, NodeId};
use crate::event::EventType;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

pub const ENABLED_KEY: &str = "predictive-preload-enabled";
pub const CACHE_TIME_KEY: &str = "predictive-preload-cache-time";
pub const DELAY_KEY: &str = "predictive-preload-delay";
pub const TRIGGER_EVENT_KEY: &str = "predictive-preload-trigger-event";

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_millis(10_000);
pub const DEFAULT_DELAY: Duration = Duration::ZERO;

/// Source of named document-level settings.
pub trait ConfigReader {
  fn config_value(&self, key: &str) -> Option<&str>;
}

impl ConfigReader for Document {
  fn config_value(&self, key: &str) -> Option<&str> {
    self.meta_content(key)
  }
}

impl ConfigReader for HashMap<String, String> {
  fn config_value(&self, key: &str) -> Option<&str> {
    self.get(key).map(String::as_str)
  }
}

/// Which pointer input starts a predictive preload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerEvent {
  #[default]
  MouseOver,
  MouseDown,
}

impl TriggerEvent {
  pub fn parse(value: &str) -> Option<Self> {
    match value.trim() {
      "mouseover" => Some(TriggerEvent::MouseOver),
      "mousedown" => Some(TriggerEvent::MouseDown),
      _ => None,
    }
  }

  /// The pointer event actually listened for. Hover maps to `mouseenter` so moving between a
  /// link's own children does not retrigger.
  pub fn event_type(self) -> EventType {
    match self {
      TriggerEvent::MouseOver => EventType::MouseEnter,
      TriggerEvent::MouseDown => EventType::MouseDown,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      TriggerEvent::MouseOver => "mouseover",
      TriggerEvent::MouseDown => "mousedown",
    }
  }
}

fn parse_millis(value: &str) -> Option<Duration> {
  value.trim().parse::<u64>().ok().map(Duration::from_millis)
}

fn positive_millis(value: &str) -> Option<Duration> {
  parse_millis(value).filter(|d| !d.is_zero())
}

pub fn predictive_preload_enabled(reader: &(impl ConfigReader + ?Sized)) -> bool {
  reader.config_value(ENABLED_KEY).map(str::trim) == Some("true")
}

/// Document-level cache lifetime. Zero or unparseable values use the default.
pub fn cache_ttl(reader: &(impl ConfigReader + ?Sized)) -> Duration {
  reader
    .config_value(CACHE_TIME_KEY)
    .and_then(positive_millis)
    .unwrap_or(DEFAULT_CACHE_TTL)
}

pub fn predictive_preload_delay(reader: &(impl ConfigReader + ?Sized)) -> Duration {
  reader
    .config_value(DELAY_KEY)
    .and_then(parse_millis)
    .unwrap_or(DEFAULT_DELAY)
}

pub fn trigger_event(reader: &(impl ConfigReader + ?Sized)) -> TriggerEvent {
  reader
    .config_value(TRIGGER_EVENT_KEY)
    .and_then(TriggerEvent::parse)
    .unwrap_or_default()
}

/// Cache lifetime for one link.
pub fn link_cache_ttl(document: &Document, link: NodeId) -> Duration {
  document
    .get_attribute_ref(link, CACHE_TIME_ATTRIBUTE)
    .and_then(positive_millis)
    .unwrap_or_else(|| cache_ttl(document))
}

/// Hover delay for one link. An explicit `0` on the link means "immediately".
pub fn link_delay(document: &Document, link: NodeId) -> Duration {
  document
    .get_attribute_ref(link, DELAY_ATTRIBUTE)
    .and_then(parse_millis)
    .unwrap_or_else(|| predictive_preload_delay(document))
}

/// Snapshot of the document-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreloadSettings {
  pub predictive_enabled: bool,
  pub trigger_event: TriggerEvent,
  pub cache_ttl_ms: u64,
  pub delay_ms: u64,
}

impl PreloadSettings {
  pub fn read(reader: &(impl ConfigReader + ?Sized)) -> Self {
    Self {
      predictive_enabled: predictive_preload_enabled(reader),
      trigger_event: trigger_event(reader),
      cache_ttl_ms: cache_ttl(reader).as_millis() as u64,
      delay_ms: predictive_preload_delay(reader).as_millis() as u64,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::dom::parse_html;

  fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect()
  }

  #[test]
  fn defaults_when_unset() {
    let settings = PreloadSettings::read(&HashMap::<String, String>::new());
    assert_eq!(
      settings,
      PreloadSettings {
        predictive_enabled: false,
        trigger_event: TriggerEvent::MouseOver,
        cache_ttl_ms: 10_000,
        delay_ms: 0,
      }
    );
  }

  #[test]
  fn enabled_requires_exact_true() {
    assert!(predictive_preload_enabled(&map(&[(ENABLED_KEY, "true")])));
    assert!(!predictive_preload_enabled(&map(&[(ENABLED_KEY, "false")])));
    assert!(!predictive_preload_enabled(&map(&[(ENABLED_KEY, "yes")])));
  }

  #[test]
  fn malformed_values_fall_back() {
    let reader = map(&[
      (CACHE_TIME_KEY, "soon"),
      (DELAY_KEY, "-5"),
      (TRIGGER_EVENT_KEY, "click"),
    ]);
    assert_eq!(cache_ttl(&reader), DEFAULT_CACHE_TTL);
    assert_eq!(predictive_preload_delay(&reader), DEFAULT_DELAY);
    assert_eq!(trigger_event(&reader), TriggerEvent::MouseOver);
  }

  #[test]
  fn zero_cache_time_uses_default() {
    assert_eq!(cache_ttl(&map(&[(CACHE_TIME_KEY, "0")])), DEFAULT_CACHE_TTL);
    assert_eq!(cache_ttl(&map(&[(CACHE_TIME_KEY, "1")])), Duration::from_millis(1));
  }

  #[test]
  fn trigger_event_maps_to_pointer_events() {
    let reader = map(&[(TRIGGER_EVENT_KEY, "mousedown")]);
    assert_eq!(trigger_event(&reader), TriggerEvent::MouseDown);
    assert_eq!(TriggerEvent::MouseDown.event_type(), EventType::MouseDown);
    assert_eq!(TriggerEvent::MouseOver.event_type(), EventType::MouseEnter);
  }

  #[test]
  fn link_overrides_take_precedence_over_document() {
    let document = parse_html(
      r#"<html><head>
        <meta name="predictive-preload-cache-time" content="500">
        <meta name="predictive-preload-delay" content="200">
      </head><body>
        <a id="plain" href="/a">a</a>
        <a id="override" href="/b" data-predictive-preload-cache-time="50" data-predictive-preload-delay="0">b</a>
        <a id="bogus" href="/c" data-predictive-preload-cache-time="x" data-predictive-preload-delay="y">c</a>
      </body></html>"#,
      "https://example.com/",
    )
    .unwrap();
    let plain = document.element_by_id("plain").unwrap();
    let over = document.element_by_id("override").unwrap();
    let bogus = document.element_by_id("bogus").unwrap();

    assert_eq!(link_cache_ttl(&document, plain), Duration::from_millis(500));
    assert_eq!(link_delay(&document, plain), Duration::from_millis(200));
    assert_eq!(link_cache_ttl(&document, over), Duration::from_millis(50));
    assert_eq!(link_delay(&document, over), Duration::ZERO);
    assert_eq!(link_cache_ttl(&document, bogus), Duration::from_millis(500));
    assert_eq!(link_delay(&document, bogus), Duration::from_millis(200));
  }

  #[test]
  fn document_without_meta_uses_defaults_for_links() {
    let document = parse_html(r#"<a id="a" href="/a">a</a>"#, "https://example.com/").unwrap();
    let link = document.element_by_id("a").unwrap();
    assert_eq!(link_cache_ttl(&document, link), DEFAULT_CACHE_TTL);
    assert_eq!(link_delay(&document, link), DEFAULT_DELAY);
  }
}
