//! Tree mutation observation
//!
//! Records are queued as the page mutates the document and handed to observer callbacks at the
//! next microtask checkpoint, never synchronously from inside the mutation.

use crate::dom::{Document, NodeId};
use crate::page::Page;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MutationObserverId(u64);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationObserverInit {
  pub attributes: bool,
  /// Restrict attribute records to these names. Implies `attributes`.
  pub attribute_filter: Option<Vec<String>>,
  pub child_list: bool,
  pub subtree: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
  Attributes {
    target: NodeId,
    attribute_name: String,
    old_value: Option<String>,
  },
  ChildList {
    target: NodeId,
    added_nodes: Vec<NodeId>,
  },
}

impl MutationRecord {
  pub fn target(&self) -> NodeId {
    match self {
      MutationRecord::Attributes { target, .. } | MutationRecord::ChildList { target, .. } => *target,
    }
  }
}

pub type MutationCallback = Rc<dyn Fn(&mut Page, Vec<MutationRecord>)>;

struct Registration {
  id: MutationObserverId,
  target: NodeId,
  init: MutationObserverInit,
  callback: MutationCallback,
  pending: Vec<MutationRecord>,
}

impl Registration {
  fn wants(&self, document: &Document, record: &MutationRecord) -> bool {
    let in_scope = record.target() == self.target
      || (self.init.subtree && document.is_inclusive_ancestor(self.target, record.target()));
    if !in_scope {
      return false;
    }

    match record {
      MutationRecord::Attributes { attribute_name, .. } => match &self.init.attribute_filter {
        Some(filter) => filter
          .iter()
          .any(|name| name.eq_ignore_ascii_case(attribute_name)),
        None => self.init.attributes,
      },
      MutationRecord::ChildList { .. } => self.init.child_list,
    }
  }
}

#[derive(Default)]
pub struct MutationObservers {
  next_id: u64,
  registrations: Vec<Registration>,
}

impl MutationObservers {
  pub fn observe(
    &mut self,
    target: NodeId,
    init: MutationObserverInit,
    callback: MutationCallback,
  ) -> MutationObserverId {
    self.next_id += 1;
    let id = MutationObserverId(self.next_id);
    self.registrations.push(Registration {
      id,
      target,
      init,
      callback,
      pending: Vec::new(),
    });
    id
  }

  /// Stop observing; records not yet delivered are dropped.
  pub fn disconnect(&mut self, id: MutationObserverId) -> bool {
    let before = self.registrations.len();
    self.registrations.retain(|r| r.id != id);
    self.registrations.len() != before
  }

  pub fn is_observing(&self, id: MutationObserverId) -> bool {
    self.registrations.iter().any(|r| r.id == id)
  }

  pub fn len(&self) -> usize {
    self.registrations.len()
  }

  pub fn is_empty(&self) -> bool {
    self.registrations.is_empty()
  }

  pub fn queue(&mut self, document: &Document, record: MutationRecord) {
    for registration in &mut self.registrations {
      if registration.wants(document, &record) {
        registration.pending.push(record.clone());
      }
    }
  }

  pub fn has_pending(&self) -> bool {
    self.registrations.iter().any(|r| !r.pending.is_empty())
  }

  pub(crate) fn take_pending(&mut self) -> Vec<(MutationObserverId, MutationCallback, Vec<MutationRecord>)> {
    self
      .registrations
      .iter_mut()
      .filter(|r| !r.pending.is_empty())
      .map(|r| (r.id, Rc::clone(&r.callback), std::mem::take(&mut r.pending)))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::dom::parse_html;

  fn noop() -> MutationCallback {
    Rc::new(|_: &mut Page, _: Vec<MutationRecord>| {})
  }

  #[test]
  fn attribute_filter_limits_records() {
    let document = parse_html(r#"<a id="link" href="/x">x</a>"#, "https://example.com/").unwrap();
    let link = document.element_by_id("link").unwrap();
    let mut observers = MutationObservers::default();
    observers.observe(
      document.body(),
      MutationObserverInit {
        attribute_filter: Some(vec!["data-preload".to_string()]),
        subtree: true,
        ..Default::default()
      },
      noop(),
    );

    observers.queue(
      &document,
      MutationRecord::Attributes {
        target: link,
        attribute_name: "class".to_string(),
        old_value: None,
      },
    );
    assert!(!observers.has_pending());

    observers.queue(
      &document,
      MutationRecord::Attributes {
        target: link,
        attribute_name: "data-preload".to_string(),
        old_value: None,
      },
    );
    let pending = observers.take_pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].2.len(), 1);
    assert!(!observers.has_pending());
  }

  #[test]
  fn without_subtree_only_target_is_observed() {
    let document = parse_html(r#"<div id="d"><a id="link" href="/x">x</a></div>"#, "https://example.com/").unwrap();
    let div = document.element_by_id("d").unwrap();
    let link = document.element_by_id("link").unwrap();
    let mut observers = MutationObservers::default();
    observers.observe(
      div,
      MutationObserverInit {
        attributes: true,
        child_list: true,
        ..Default::default()
      },
      noop(),
    );
    observers.queue(
      &document,
      MutationRecord::Attributes {
        target: link,
        attribute_name: "href".to_string(),
        old_value: Some("/x".to_string()),
      },
    );
    assert!(!observers.has_pending());
    observers.queue(
      &document,
      MutationRecord::ChildList {
        target: div,
        added_nodes: vec![link],
      },
    );
    assert!(observers.has_pending());
  }

  #[test]
  fn disconnect_drops_pending_records() {
    let document = parse_html("<p id=p>x</p>", "https://example.com/").unwrap();
    let p = document.element_by_id("p").unwrap();
    let mut observers = MutationObservers::default();
    let id = observers.observe(
      p,
      MutationObserverInit {
        attributes: true,
        ..Default::default()
      },
      noop(),
    );
    observers.queue(
      &document,
      MutationRecord::Attributes {
        target: p,
        attribute_name: "class".to_string(),
        old_value: None,
      },
    );
    assert!(observers.disconnect(id));
    assert!(!observers.is_observing(id));
    assert!(observers.take_pending().is_empty());
  }
}
