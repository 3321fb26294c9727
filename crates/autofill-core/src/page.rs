//! In-memory page used by the CLI, the panel and the tests.
//!
//! A page is loaded from a JSON snapshot of nested elements:
//!
//! ```json
//! { "tag": "body", "children": [
//!     { "tag": "h2", "text": "Situation Image" },
//!     { "tag": "textarea", "attrs": { "placeholder": "Situation" } }
//! ] }
//! ```
//!
//! Elements marked `"hidden": true` are not attached to the tree until an
//! element whose `data-reveals` attribute names their `id` is clicked or
//! double-clicked. This mirrors hosts that only mount an input once its
//! edit affordance is used.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::dom::{DomEvent, Document, NodeId};
use crate::error::{AutofillError, Result};

const CONTROL_TAGS: &[&str] = &["input", "textarea"];

/// Serialisable element description, also usable as a builder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct El {
    pub tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<El>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl El {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_lowercase(),
            ..Self::default()
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn child(mut self, child: El) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = El>) -> Self {
        self.children.extend(children);
        self
    }
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    attrs: BTreeMap<String, String>,
    text: String,
    value: Option<String>,
    hidden: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// One dispatched event, kept in dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRecord {
    pub node: NodeId,
    pub event: DomEvent,
}

/// Arena-backed element tree implementing [`Document`].
#[derive(Debug, Clone)]
pub struct Page {
    nodes: Vec<Node>,
    root: NodeId,
    events: Vec<EventRecord>,
}

impl Page {
    pub fn build(root: El) -> Self {
        let mut page = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            events: Vec::new(),
        };
        page.root = page.insert(root, None);
        page
    }

    fn insert(&mut self, el: El, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let is_control = CONTROL_TAGS.contains(&el.tag.as_str());
        self.nodes.push(Node {
            value: el.value.or_else(|| is_control.then(String::new)),
            tag: el.tag,
            attrs: el.attrs,
            text: el.text,
            hidden: el.hidden,
            parent,
            children: Vec::new(),
        });
        for child in el.children {
            let child_id = self.insert(child, Some(id));
            self.nodes[id.0].children.push(child_id);
        }
        id
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let root: El = serde_json::from_str(json)
            .map_err(|e| AutofillError::Page(format!("Invalid page snapshot: {e}")))?;
        Ok(Self::build(root))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AutofillError::Page(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&contents)
    }

    /// Current state of the tree, including written values and revealed nodes.
    pub fn snapshot(&self) -> El {
        self.snapshot_node(self.root)
    }

    fn snapshot_node(&self, id: NodeId) -> El {
        let node = &self.nodes[id.0];
        El {
            tag: node.tag.clone(),
            attrs: node.attrs.clone(),
            text: node.text.clone(),
            value: node.value.clone(),
            hidden: node.hidden,
            children: node
                .children
                .iter()
                .map(|&c| self.snapshot_node(c))
                .collect(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    pub fn events_for(&self, node: NodeId) -> Vec<DomEvent> {
        self.events
            .iter()
            .filter(|r| r.node == node)
            .map(|r| r.event)
            .collect()
    }

    fn is_attached(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if self.nodes[n.0].hidden {
                return false;
            }
            current = self.nodes[n.0].parent;
        }
        true
    }

    fn check(&self, node: NodeId) -> Result<&Node> {
        let entry = self
            .nodes
            .get(node.0)
            .ok_or_else(|| AutofillError::Dom(format!("Unknown node {node}")))?;
        if !self.is_attached(node) {
            return Err(AutofillError::Dom(format!("Node {node} is not attached")));
        }
        Ok(entry)
    }

    fn reveal(&mut self, target_id: &str) {
        let target = self
            .nodes
            .iter()
            .position(|n| n.attrs.get("id").map(String::as_str) == Some(target_id));
        if let Some(index) = target {
            debug!(id = target_id, "Revealing hidden element");
            self.nodes[index].hidden = false;
        }
    }

    fn collect_descendants(&self, node: NodeId, out: &mut Vec<NodeId>) {
        for &child in &self.nodes[node.0].children {
            if self.nodes[child.0].hidden {
                continue;
            }
            out.push(child);
            self.collect_descendants(child, out);
        }
    }
}

impl Document for Page {
    fn body(&self) -> NodeId {
        self.root
    }

    fn tag(&self, node: NodeId) -> &str {
        &self.nodes[node.0].tag
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes[node.0].attrs.get(name).map(String::as_str)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_descendants(node, &mut out);
        out
    }

    fn text_content(&self, node: NodeId) -> String {
        let mut text = self.nodes[node.0].text.clone();
        for &child in &self.nodes[node.0].children {
            if !self.nodes[child.0].hidden {
                text.push_str(&self.text_content(child));
            }
        }
        text
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        std::iter::once(self.root)
            .chain(self.descendants(self.root))
            .find(|&n| self.attr(n, "id") == Some(id))
    }

    fn value(&self, node: NodeId) -> Option<&str> {
        self.nodes[node.0].value.as_deref()
    }

    fn set_native_value(&mut self, node: NodeId, value: &str) -> Result<()> {
        let entry = self.check(node)?;
        if !CONTROL_TAGS.contains(&entry.tag.as_str()) {
            return Err(AutofillError::Dom(format!(
                "<{}> {node} is not a form control",
                entry.tag
            )));
        }
        self.nodes[node.0].value = Some(value.to_string());
        Ok(())
    }

    fn dispatch(&mut self, node: NodeId, event: DomEvent) -> Result<()> {
        let entry = self.check(node)?;
        let reveals = match event {
            DomEvent::Click | DomEvent::DoubleClick => entry.attrs.get("data-reveals").cloned(),
            _ => None,
        };
        self.events.push(EventRecord { node, event });
        if let Some(target) = reveals {
            self.reveal(&target);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card_with_hidden_title() -> Page {
        Page::build(
            El::new("body").child(
                El::new("div")
                    .child(El::new("button").attr("data-reveals", "t").text("Edit"))
                    .child(El::new("input").id("t").hidden())
                    .child(El::new("span").text("after")),
            ),
        )
    }

    #[test]
    fn hidden_elements_are_not_attached() {
        let page = card_with_hidden_title();
        assert!(page.element_by_id("t").is_none());
        let tags: Vec<_> = page
            .descendants(page.body())
            .into_iter()
            .map(|n| page.tag(n).to_string())
            .collect();
        assert_eq!(tags, vec!["div", "button", "span"]);
    }

    #[test]
    fn clicking_a_reveal_trigger_attaches_the_target() {
        let mut page = card_with_hidden_title();
        let button = page.descendants(page.body())[1];

        page.dispatch(button, DomEvent::Click).unwrap();

        let input = page.element_by_id("t").unwrap();
        assert_eq!(page.value(input), Some(""));
        assert_eq!(page.events_for(button), vec![DomEvent::Click]);
    }

    #[test]
    fn text_content_concatenates_in_document_order() {
        let page = Page::build(
            El::new("body")
                .text("a")
                .child(El::new("span").text("b").child(El::new("b").text("c")))
                .child(El::new("span").text("d").hidden())
                .child(El::new("span").text("e")),
        );
        assert_eq!(page.text_content(page.body()), "abce");
    }

    #[test]
    fn writing_to_a_non_control_fails() {
        let mut page = Page::build(El::new("body").child(El::new("div").id("d")));
        let div = page.element_by_id("d").unwrap();
        let err = page.set_native_value(div, "x").unwrap_err();
        assert!(matches!(err, AutofillError::Dom(_)));
        assert_eq!(page.value(div), None);
    }

    #[test]
    fn snapshot_reflects_written_values() {
        let mut page = Page::from_json(
            r#"{ "tag": "body", "children": [
                { "tag": "textarea", "attrs": { "id": "s", "placeholder": "Situation" } }
            ] }"#,
        )
        .unwrap();
        let field = page.element_by_id("s").unwrap();
        page.set_native_value(field, "rain at dusk").unwrap();

        let snapshot = page.snapshot();
        assert_eq!(snapshot.children[0].value.as_deref(), Some("rain at dusk"));
        assert_eq!(
            snapshot.children[0].attrs.get("placeholder").map(String::as_str),
            Some("Situation")
        );
    }

    #[test]
    fn malformed_snapshot_is_a_page_error() {
        let err = Page::from_json("{ \"tag\": ").unwrap_err();
        assert!(matches!(err, AutofillError::Page(_)));
    }
}
