//! Field discovery: finds the situation image section, its cards, and the
//! title / situation / hint controls inside each card.
//!
//! Nothing on the host page carries a stable machine-readable marker, so every
//! lookup here is a keyword heuristic over attributes and visible text. Misses
//! are never errors; callers get `None` or an empty list and fall back.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::config::{AutofillConfig, LabelConfig};
use crate::dom::{closest, has_tag, select, text_matches, DomEvent, Document, NodeId};
use crate::error::Result;
use crate::limits::infer_max_length;

/// Tags a writable text control can have.
pub const FIELD_TAGS: &[&str] = &["input", "textarea"];

const SCOPE_CANDIDATE_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "div", "span"];
const CARD_FALLBACK_TAGS: &[&str] = &["section", "article", "li", "div"];
const TITLE_DISPLAY_TAGS: &[&str] = &["h1", "h2", "h3"];
const TITLE_DISPLAY_MAX_CHARS: usize = 80;

static DELETE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(삭제|지우기|remove|delete|trash|bin)").expect("valid delete pattern")
});

static EDIT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(수정|편집|edit|pencil|pen|rename|제목|title)").expect("valid edit pattern")
});

/// Role a control plays inside a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Title,
    Situation,
    Hint,
}

impl FieldKind {
    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::Title => "title",
            FieldKind::Situation => "situation",
            FieldKind::Hint => "hint",
        }
    }

    /// Capacity used when the page exposes no limit for this kind of field.
    pub fn fallback_capacity(&self, config: &AutofillConfig) -> usize {
        match self {
            FieldKind::Title => config.limits.title_fallback,
            FieldKind::Situation | FieldKind::Hint => config.limits.situation_fallback,
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A writable control scheduled to receive text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldTarget {
    pub kind: FieldKind,
    pub node: NodeId,
    pub card: NodeId,
}

/// What discovery found inside one card, for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct CardReport {
    pub card: NodeId,
    pub title: Option<FieldReport>,
    pub situation: Option<FieldReport>,
    pub hint: Option<FieldReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldReport {
    pub node: NodeId,
    pub capacity: usize,
    pub value: String,
}

/// Root of the situation image section, or the body when no heading matches.
#[instrument(skip_all)]
pub fn locate_scope<D: Document + ?Sized>(doc: &D, labels: &LabelConfig) -> NodeId {
    let body = doc.body();
    for node in select(doc, body, SCOPE_CANDIDATE_TAGS) {
        let text = doc.text_content(node);
        if text_matches(text.trim(), &labels.section) {
            let root = closest(doc, node, &["section"])
                .or_else(|| closest(doc, node, &["div"]))
                .unwrap_or(body);
            debug!(heading = %node, scope = %root, "Located section scope");
            return root;
        }
    }
    debug!("No section heading matched, scoping to body");
    body
}

/// Controls below `scope` with one of `tags` whose placeholder, aria-label,
/// name, id or associated label text contains a keyword.
pub fn locate_fields<D: Document + ?Sized>(
    doc: &D,
    scope: NodeId,
    keywords: &[String],
    tags: &[&str],
) -> Vec<NodeId> {
    select(doc, scope, tags)
        .into_iter()
        .filter(|&node| field_matches(doc, node, keywords))
        .collect()
}

fn field_matches<D: Document + ?Sized>(doc: &D, node: NodeId, keywords: &[String]) -> bool {
    let attr = |name: &str| doc.attr(node, name).unwrap_or("");
    if ["placeholder", "aria-label", "name", "id"]
        .iter()
        .any(|name| text_matches(attr(name), keywords))
    {
        return true;
    }
    let id = attr("id");
    if id.is_empty() {
        return false;
    }
    doc.label_for(id)
        .map(|label| text_matches(&doc.text_content(label), keywords))
        .unwrap_or(false)
}

/// The card a situation field belongs to.
///
/// Walks up to `depth` inclusive ancestors looking for card marker text, then
/// falls back to the nearest container, then the immediate parent.
pub fn locate_card<D: Document + ?Sized>(
    doc: &D,
    field: NodeId,
    labels: &LabelConfig,
    depth: usize,
) -> Option<NodeId> {
    let mut current = Some(field);
    for _ in 0..depth {
        let Some(node) = current else { break };
        if text_matches(&doc.text_content(node), &labels.card_markers) {
            return Some(node);
        }
        current = doc.parent(node);
    }
    doc.parent(field)
        .and_then(|parent| closest(doc, parent, CARD_FALLBACK_TAGS))
        .or_else(|| doc.parent(field))
}

/// Distinct cards in document order, one per situation field.
#[instrument(skip_all)]
pub fn collect_cards<D: Document + ?Sized>(doc: &D, config: &AutofillConfig) -> Vec<NodeId> {
    let scope = locate_scope(doc, &config.labels);
    let situation_fields = locate_fields(doc, scope, &config.labels.situation, FIELD_TAGS);

    let mut seen = HashSet::new();
    let mut cards = Vec::new();
    for field in situation_fields {
        if let Some(card) = locate_card(
            doc,
            field,
            &config.labels,
            config.limits.card_search_depth,
        ) {
            if seen.insert(card) {
                cards.push(card);
            }
        }
    }
    debug!(count = cards.len(), "Collected cards");
    cards
}

/// First title-labeled control in the card, else the first plain text input.
pub fn find_title_field<D: Document + ?Sized>(
    doc: &D,
    card: NodeId,
    labels: &LabelConfig,
) -> Option<NodeId> {
    locate_fields(doc, card, &labels.title, FIELD_TAGS)
        .into_iter()
        .next()
        .or_else(|| {
            select(doc, card, &["input"])
                .into_iter()
                .find(|&n| matches!(doc.attr(n, "type"), None | Some("text")))
        })
}

pub fn find_situation_field<D: Document + ?Sized>(
    doc: &D,
    card: NodeId,
    labels: &LabelConfig,
) -> Option<NodeId> {
    locate_fields(doc, card, &labels.situation, FIELD_TAGS)
        .into_iter()
        .next()
}

pub fn find_hint_field<D: Document + ?Sized>(
    doc: &D,
    card: NodeId,
    labels: &LabelConfig,
) -> Option<NodeId> {
    locate_fields(doc, card, &labels.hint, FIELD_TAGS)
        .into_iter()
        .next()
}

fn button_attributes<D: Document + ?Sized>(doc: &D, button: NodeId) -> String {
    let attr = |name: &str| doc.attr(button, name).unwrap_or("");
    let data = format!(
        "{} {} {}",
        attr("data-icon"),
        attr("data-testid"),
        attr("class")
    );
    format!("{} {} {}", attr("aria-label"), attr("title"), data.trim())
}

fn svg_title<D: Document + ?Sized>(doc: &D, button: NodeId) -> String {
    doc.descendants(button)
        .into_iter()
        .find(|&n| {
            doc.tag(n) == "title"
                && doc
                    .parent(n)
                    .and_then(|p| closest(doc, p, &["svg"]))
                    .is_some()
        })
        .map(|n| doc.text_content(n))
        .unwrap_or_default()
}

fn is_edit_affordance(description: &str) -> bool {
    !DELETE_PATTERN.is_match(description) && EDIT_PATTERN.is_match(description)
}

/// Button in the card that opens the title editor.
///
/// Text, aria-label, title and data attributes are tried first; a second pass
/// also reads the `<title>` of an embedded icon. Anything that also looks like
/// a delete control is skipped.
pub fn locate_edit_button<D: Document + ?Sized>(doc: &D, card: NodeId) -> Option<NodeId> {
    let buttons = select(doc, card, &["button"]);

    let by_label = buttons.iter().copied().find(|&button| {
        let text = doc.text_content(button);
        let combined = format!("{} {}", text.trim(), button_attributes(doc, button));
        is_edit_affordance(combined.trim())
    });
    if by_label.is_some() {
        return by_label;
    }

    buttons.into_iter().find(|&button| {
        let combined = format!(
            "{} {}",
            button_attributes(doc, button),
            svg_title(doc, button)
        );
        is_edit_affordance(combined.trim())
    })
}

/// Short visible title text that opens an editor on double-click.
pub fn locate_title_display<D: Document + ?Sized>(doc: &D, card: NodeId) -> Option<NodeId> {
    doc.descendants(card).into_iter().find(|&node| {
        let candidate = doc.attr(node, "contenteditable").is_some()
            || doc
                .attr(node, "class")
                .map(|c| c.contains("title"))
                .unwrap_or(false)
            || has_tag(doc, node, TITLE_DISPLAY_TAGS);
        if !candidate {
            return false;
        }
        let len = doc.text_content(node).trim().chars().count();
        len > 0 && len < TITLE_DISPLAY_MAX_CHARS
    })
}

/// Try to reveal the card's title input. Returns whether an affordance was used.
pub async fn open_title_editor<D: Document + ?Sized>(
    doc: &mut D,
    card: NodeId,
    delay: Duration,
) -> Result<bool> {
    let trigger = if let Some(button) = locate_edit_button(doc, card) {
        debug!(card = %card, button = %button, "Clicking title edit button");
        doc.dispatch(button, DomEvent::Click)?;
        true
    } else if let Some(title_display) = locate_title_display(doc, card) {
        debug!(card = %card, display = %title_display, "Double-clicking title display");
        doc.dispatch(title_display, DomEvent::DoubleClick)?;
        true
    } else {
        debug!(card = %card, "No title editor affordance");
        false
    };

    if trigger && !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    Ok(trigger)
}

/// Describe the fields of every card without touching the page.
pub fn inspect_cards<D: Document + ?Sized>(doc: &D, config: &AutofillConfig) -> Vec<CardReport> {
    let report = |card: NodeId, node: Option<NodeId>, kind: FieldKind| {
        node.map(|node| FieldReport {
            node,
            capacity: infer_max_length(
                doc,
                node,
                Some(card),
                kind.fallback_capacity(config),
                &config.limits,
            ),
            value: doc.value(node).unwrap_or("").to_string(),
        })
    };

    collect_cards(doc, config)
        .into_iter()
        .map(|card| CardReport {
            card,
            title: report(
                card,
                find_title_field(doc, card, &config.labels),
                FieldKind::Title,
            ),
            situation: report(
                card,
                find_situation_field(doc, card, &config.labels),
                FieldKind::Situation,
            ),
            hint: report(
                card,
                find_hint_field(doc, card, &config.labels),
                FieldKind::Hint,
            ),
        })
        .collect()
}
