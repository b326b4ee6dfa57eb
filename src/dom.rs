//! Document tree
//!
//! An arena-backed element tree with parent links, so that links can look up their ancestors
//! (`closest`), and so the host can mutate attributes and append nodes while observers watch.
//! Documents are usually produced by [`parse_html`], which runs html5ever and converts the
//! resulting `RcDom` into the arena.

use crate::error::{Error, ParseError, Result};
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::ParseOpts;
use markup5ever_rcdom::Handle;
use markup5ever_rcdom::NodeData;
use markup5ever_rcdom::RcDom;
use std::io;
use url::Url;

/// Index of a node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
  pub fn index(self) -> usize {
    self.0
  }
}

/// Document loading state, mirroring `document.readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
  Loading,
  Interactive,
  Complete,
}

#[derive(Debug, Clone)]
pub enum DomNodeType {
  Document,
  Element {
    tag_name: String,
    attributes: Vec<(String, String)>,
  },
  Text {
    content: String,
  },
}

#[derive(Debug, Clone)]
struct DomNode {
  node_type: DomNodeType,
  parent: Option<NodeId>,
  children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Document {
  nodes: Vec<DomNode>,
  location: Url,
  ready_state: ReadyState,
}

/// Parse an HTML string into a [`Document`] located at `location`.
///
/// The returned document is still [`ReadyState::Loading`]; the host marks it interactive once it
/// is ready to run observers.
pub fn parse_html(html: &str, location: &str) -> Result<Document> {
  let location = parse_location(location)?;
  let opts = ParseOpts {
    tree_builder: TreeBuilderOpts {
      scripting_enabled: false,
      ..Default::default()
    },
    ..Default::default()
  };

  let mut reader = io::Cursor::new(html.as_bytes());
  let dom = parse_document(RcDom::default(), opts)
    .from_utf8()
    .read_from(&mut reader)
    .map_err(|e| {
      Error::Parse(ParseError::InvalidHtml {
        message: format!("Failed to parse HTML: {}", e),
      })
    })?;

  let mut document = Document::empty(location);
  let root = document.root();
  for child in dom.document.children.borrow().iter() {
    convert_handle(&mut document, root, child);
  }
  Ok(document)
}

fn parse_location(location: &str) -> Result<Url> {
  Url::parse(location).map_err(|e| {
    Error::Parse(ParseError::InvalidUrl {
      url: location.to_string(),
      reason: e.to_string(),
    })
  })
}

fn convert_handle(document: &mut Document, parent: NodeId, handle: &Handle) {
  let id = match &handle.data {
    NodeData::Element { name, attrs, .. } => {
      let attributes = attrs
        .borrow()
        .iter()
        .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
        .collect();
      document.create_element(&name.local, attributes)
    }
    NodeData::Text { contents } => document.create_text(&contents.borrow()),
    _ => return,
  };
  document.append_child(parent, id);

  for child in handle.children.borrow().iter() {
    convert_handle(document, id, child);
  }
}

impl Document {
  /// Create a document containing only the document node.
  pub fn empty(location: Url) -> Self {
    Self {
      nodes: vec![DomNode {
        node_type: DomNodeType::Document,
        parent: None,
        children: Vec::new(),
      }],
      location,
      ready_state: ReadyState::Loading,
    }
  }

  pub fn root(&self) -> NodeId {
    NodeId(0)
  }

  pub fn location(&self) -> &Url {
    &self.location
  }

  pub fn ready_state(&self) -> ReadyState {
    self.ready_state
  }

  pub fn set_ready_state(&mut self, state: ReadyState) {
    self.ready_state = state;
  }

  pub fn node_type(&self, id: NodeId) -> Option<&DomNodeType> {
    self.nodes.get(id.0).map(|node| &node.node_type)
  }

  pub fn is_element(&self, id: NodeId) -> bool {
    matches!(self.node_type(id), Some(DomNodeType::Element { .. }))
  }

  /// Lowercase tag name of an element node.
  pub fn tag_name(&self, id: NodeId) -> Option<&str> {
    match self.node_type(id) {
      Some(DomNodeType::Element { tag_name, .. }) => Some(tag_name),
      _ => None,
    }
  }

  pub fn has_tag(&self, id: NodeId, tag: &str) -> bool {
    self
      .tag_name(id)
      .is_some_and(|name| name.eq_ignore_ascii_case(tag))
  }

  pub fn get_attribute_ref(&self, id: NodeId, name: &str) -> Option<&str> {
    match self.node_type(id) {
      Some(DomNodeType::Element { attributes, .. }) => attributes
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str()),
      _ => None,
    }
  }

  pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<String> {
    self.get_attribute_ref(id, name).map(|v| v.to_string())
  }

  pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
    self.get_attribute_ref(id, name).is_some()
  }

  pub fn text_content(&self, id: NodeId) -> String {
    let mut out = String::new();
    for node in self.descendants(id) {
      if let Some(DomNodeType::Text { content }) = self.node_type(node) {
        out.push_str(content);
      }
    }
    out
  }

  pub fn parent(&self, id: NodeId) -> Option<NodeId> {
    self.nodes.get(id.0).and_then(|node| node.parent)
  }

  pub fn children(&self, id: NodeId) -> &[NodeId] {
    self
      .nodes
      .get(id.0)
      .map(|node| node.children.as_slice())
      .unwrap_or(&[])
  }

  /// Iterate `id` and then each of its ancestors up to the document node.
  pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
    Ancestors {
      document: self,
      next: self.nodes.get(id.0).map(|_| id),
    }
  }

  /// Whether `ancestor` is `node` or one of its ancestors.
  pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
    self.ancestors(node).any(|id| id == ancestor)
  }

  /// Whether the node is attached to the document tree.
  pub fn is_connected(&self, id: NodeId) -> bool {
    self.ancestors(id).last() == Some(self.root())
  }

  /// Nearest inclusive ancestor element matching `predicate`.
  pub fn closest<F>(&self, id: NodeId, mut predicate: F) -> Option<NodeId>
  where
    F: FnMut(&Document, NodeId) -> bool,
  {
    self
      .ancestors(id)
      .find(|&node| self.is_element(node) && predicate(self, node))
  }

  /// Nearest inclusive ancestor element carrying `attribute`.
  pub fn closest_with_attribute(&self, id: NodeId, attribute: &str) -> Option<NodeId> {
    self.closest(id, |doc, node| doc.has_attribute(node, attribute))
  }

  /// Pre-order traversal of `id` and all of its descendants.
  pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![id];
    while let Some(node) = stack.pop() {
      out.push(node);
      stack.extend(self.children(node).iter().rev().copied());
    }
    out
  }

  /// Every element at or below `id` carrying `attribute`, in document order.
  pub fn elements_with_attribute(&self, id: NodeId, attribute: &str) -> Vec<NodeId> {
    self
      .descendants(id)
      .into_iter()
      .filter(|&node| self.has_attribute(node, attribute))
      .collect()
  }

  pub fn elements_by_tag_name(&self, tag: &str) -> Vec<NodeId> {
    self
      .descendants(self.root())
      .into_iter()
      .filter(|&node| self.has_tag(node, tag))
      .collect()
  }

  pub fn element_by_id(&self, element_id: &str) -> Option<NodeId> {
    self
      .descendants(self.root())
      .into_iter()
      .find(|&node| self.get_attribute_ref(node, "id") == Some(element_id))
  }

  /// The `<body>` element, falling back to the document node for fragments.
  pub fn body(&self) -> NodeId {
    self
      .elements_by_tag_name("body")
      .into_iter()
      .next()
      .unwrap_or_else(|| self.root())
  }

  /// Content of the first `<meta name="...">` whose name matches.
  pub fn meta_content(&self, name: &str) -> Option<&str> {
    self
      .elements_by_tag_name("meta")
      .into_iter()
      .find(|&meta| self.get_attribute_ref(meta, "name") == Some(name))
      .and_then(|meta| self.get_attribute_ref(meta, "content"))
  }

  /// Base URL for resolving relative references: the first `<base href>` resolved against the
  /// location, otherwise the location itself.
  pub fn base_url(&self) -> Url {
    self
      .elements_by_tag_name("base")
      .into_iter()
      .find_map(|base| self.get_attribute_ref(base, "href"))
      .and_then(|href| self.location.join(href.trim()).ok())
      .unwrap_or_else(|| self.location.clone())
  }

  /// Resolve `href` against the document base URL with the fragment removed.
  pub fn resolve_url(&self, href: &str) -> Option<Url> {
    let href = href.trim();
    let mut url = self.base_url().join(href).ok()?;
    url.set_fragment(None);
    Some(url)
  }

  /// Absolute, fragment-free target of a link element, if its `href` resolves.
  pub fn location_for_link(&self, link: NodeId) -> Option<Url> {
    let href = self.get_attribute_ref(link, "href")?;
    self.resolve_url(href)
  }

  pub fn create_element(&mut self, tag_name: &str, attributes: Vec<(String, String)>) -> NodeId {
    self.push_node(DomNodeType::Element {
      tag_name: tag_name.to_ascii_lowercase(),
      attributes,
    })
  }

  pub fn create_text(&mut self, content: &str) -> NodeId {
    self.push_node(DomNodeType::Text {
      content: content.to_string(),
    })
  }

  fn push_node(&mut self, node_type: DomNodeType) -> NodeId {
    let id = NodeId(self.nodes.len());
    self.nodes.push(DomNode {
      node_type,
      parent: None,
      children: Vec::new(),
    });
    id
  }

  /// Append `child` to `parent`, detaching it from any previous parent.
  ///
  /// Returns `false` (and leaves the tree untouched) when the insertion would create a cycle or
  /// either node is unknown.
  pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
    if parent.0 >= self.nodes.len()
      || child.0 >= self.nodes.len()
      || self.is_inclusive_ancestor(child, parent)
    {
      return false;
    }
    if let Some(old_parent) = self.nodes[child.0].parent {
      self.nodes[old_parent.0].children.retain(|&c| c != child);
    }
    self.nodes[child.0].parent = Some(parent);
    self.nodes[parent.0].children.push(child);
    true
  }

  /// Set an attribute, returning the previous value.
  pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Option<String> {
    let Some(DomNodeType::Element { attributes, .. }) =
      self.nodes.get_mut(id.0).map(|node| &mut node.node_type)
    else {
      return None;
    };
    if let Some((_, existing)) = attributes
      .iter_mut()
      .find(|(k, _)| k.eq_ignore_ascii_case(name))
    {
      return Some(std::mem::replace(existing, value.to_string()));
    }
    attributes.push((name.to_ascii_lowercase(), value.to_string()));
    None
  }

  /// Remove an attribute, returning its previous value.
  pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
    let Some(DomNodeType::Element { attributes, .. }) =
      self.nodes.get_mut(id.0).map(|node| &mut node.node_type)
    else {
      return None;
    };
    let index = attributes
      .iter()
      .position(|(k, _)| k.eq_ignore_ascii_case(name))?;
    Some(attributes.remove(index).1)
  }
}

pub struct Ancestors<'a> {
  document: &'a Document,
  next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
  type Item = NodeId;

  fn next(&mut self) -> Option<NodeId> {
    let current = self.next?;
    self.next = self.document.parent(current);
    Some(current)
  }
}
