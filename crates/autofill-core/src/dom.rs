//! Document abstraction the discovery and fill logic run against.
//!
//! The host page is a live tree owned by someone else. Everything here only
//! needs a handful of capabilities from it: walk elements in document order,
//! read attributes and text, write a control's value and dispatch events.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Opaque handle to an element. Valid until the document mutates its own tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Synthetic events the fill logic dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomEvent {
    Input,
    Change,
    Click,
    #[serde(rename = "dblclick")]
    DoubleClick,
}

impl DomEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomEvent::Input => "input",
            DomEvent::Change => "change",
            DomEvent::Click => "click",
            DomEvent::DoubleClick => "dblclick",
        }
    }
}

/// Read/write access to a page.
pub trait Document {
    /// Root of the visible content.
    fn body(&self) -> NodeId;

    /// Lowercase tag name.
    fn tag(&self, node: NodeId) -> &str;

    fn attr(&self, node: NodeId, name: &str) -> Option<&str>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// All attached elements below `node` in document order, `node` excluded.
    fn descendants(&self, node: NodeId) -> Vec<NodeId>;

    /// Concatenated text of the node and its attached descendants.
    fn text_content(&self, node: NodeId) -> String;

    fn element_by_id(&self, id: &str) -> Option<NodeId>;

    /// Current value of a form control, `None` for non-controls.
    fn value(&self, node: NodeId) -> Option<&str>;

    /// Set a control's value through the element's own setter, bypassing any
    /// framework-level interception.
    fn set_native_value(&mut self, node: NodeId, value: &str) -> Result<()>;

    /// Dispatch a bubbling event at `node`.
    fn dispatch(&mut self, node: NodeId, event: DomEvent) -> Result<()>;

    /// The `<label for=id>` whose text describes the control with this id.
    fn label_for(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.body())
            .into_iter()
            .find(|&n| self.tag(n) == "label" && self.attr(n, "for") == Some(id))
    }
}

/// Whether `node`'s tag is one of `tags`.
pub fn has_tag<D: Document + ?Sized>(doc: &D, node: NodeId, tags: &[&str]) -> bool {
    let tag = doc.tag(node);
    tags.iter().any(|t| *t == tag)
}

/// Elements below `scope` whose tag is one of `tags`, in document order.
pub fn select<D: Document + ?Sized>(doc: &D, scope: NodeId, tags: &[&str]) -> Vec<NodeId> {
    doc.descendants(scope)
        .into_iter()
        .filter(|&n| has_tag(doc, n, tags))
        .collect()
}

/// Nearest inclusive ancestor with one of `tags`.
pub fn closest<D: Document + ?Sized>(doc: &D, node: NodeId, tags: &[&str]) -> Option<NodeId> {
    let mut current = Some(node);
    while let Some(n) = current {
        if has_tag(doc, n, tags) {
            return Some(n);
        }
        current = doc.parent(n);
    }
    None
}

/// Write `value` into a control and notify listeners the way a user edit would.
pub fn fill_field<D: Document + ?Sized>(doc: &mut D, node: NodeId, value: &str) -> Result<()> {
    doc.set_native_value(node, value)?;
    doc.dispatch(node, DomEvent::Input)?;
    doc.dispatch(node, DomEvent::Change)?;
    Ok(())
}

/// Any keyword occurs in `text`. Empty text never matches.
pub fn text_matches(text: &str, keywords: &[String]) -> bool {
    !text.is_empty() && keywords.iter().any(|k| text.contains(k.as_str()))
}
