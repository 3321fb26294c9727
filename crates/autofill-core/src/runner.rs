//! One autofill run: classify the prompt, discover cards, write the fields.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::AutofillConfig;
use crate::discovery::{
    collect_cards, find_hint_field, find_situation_field, find_title_field, open_title_editor,
    FieldKind, FieldTarget,
};
use crate::dom::{fill_field, Document, NodeId};
use crate::error::Result;
use crate::limits::infer_max_length;
use crate::payload::{parse_prompt, ListItem, Payload};
use crate::segment::{CutKind, Distributor};
use crate::settings::Settings;

/// How loudly an outcome should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// What a run achieved, as reported to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Disabled,
    EmptyPrompt,
    NoFields,
    /// List mode: cards written, and records that had no card to go to.
    ListFilled { cards: usize, unused_items: usize },
    /// Single mode: every character was placed.
    Filled { fields: usize },
    /// Single mode: fields ran out before the text did.
    Leftover { fields: usize, leftover: String },
    /// Targets existed but none received text.
    NothingFillable,
}

impl Outcome {
    pub fn severity(&self) -> Severity {
        match self {
            Outcome::ListFilled { unused_items, .. } if *unused_items > 0 => Severity::Warning,
            Outcome::Filled { .. } | Outcome::ListFilled { .. } => Severity::Info,
            _ => Severity::Warning,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Disabled => write!(f, "Autofill is disabled."),
            Outcome::EmptyPrompt => {
                write!(f, "Please enter a prompt in the autofill panel first.")
            }
            Outcome::NoFields => write!(
                f,
                "No matching fields found. You may need to adjust the label keywords."
            ),
            Outcome::ListFilled {
                cards,
                unused_items: 0,
            } => write!(f, "Autofill done: {cards} items."),
            Outcome::ListFilled {
                cards,
                unused_items,
            } => write!(
                f,
                "Autofill done: {cards} items. {unused_items} more items had no card; add more images."
            ),
            Outcome::Filled { fields } => write!(f, "Autofill done: {fields} fields."),
            Outcome::Leftover { leftover, .. } => write!(
                f,
                "All fields are filled but {} characters of text remain. Add more images/fields.",
                leftover.chars().count()
            ),
            Outcome::NothingFillable => write!(f, "Could not find any field to fill."),
        }
    }
}

/// One value written during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldWrite {
    pub kind: FieldKind,
    pub node: NodeId,
    pub card: NodeId,
    pub text: String,
    /// Set in single mode: the rule that ended this chunk.
    pub cut: Option<CutKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub outcome: Outcome,
    pub writes: Vec<FieldWrite>,
}

impl From<Outcome> for RunReport {
    fn from(outcome: Outcome) -> Self {
        Self {
            outcome,
            writes: Vec::new(),
        }
    }
}

/// Run autofill against `doc` with the given settings.
#[instrument(skip_all, fields(enabled = settings.enabled))]
pub async fn run_autofill<D: Document + ?Sized>(
    doc: &mut D,
    settings: &Settings,
    config: &AutofillConfig,
) -> Result<RunReport> {
    if !settings.enabled {
        return Ok(Outcome::Disabled.into());
    }

    let payload = parse_prompt(&settings.prompt);
    if payload == Payload::Empty {
        return Ok(Outcome::EmptyPrompt.into());
    }

    let cards = collect_cards(doc, config);
    if cards.is_empty() {
        warn!("No cards found on the page");
        return Ok(Outcome::NoFields.into());
    }

    let targets = prepare_targets(doc, &cards, config).await?;
    debug!(cards = cards.len(), targets = targets.len(), "Prepared targets");

    match payload {
        Payload::Empty => Ok(Outcome::EmptyPrompt.into()),
        Payload::List { items } => fill_list(doc, &cards, &items, config),
        Payload::Single { text } => fill_single(doc, &text, &targets, config),
    }
}

/// Title and situation controls of every card, in card order. Opens the
/// title editor where the title input is not mounted yet, and clears hints.
async fn prepare_targets<D: Document + ?Sized>(
    doc: &mut D,
    cards: &[NodeId],
    config: &AutofillConfig,
) -> Result<Vec<FieldTarget>> {
    let labels = &config.labels;
    let mut targets = Vec::new();

    for &card in cards {
        let mut title = find_title_field(doc, card, labels);
        if title.is_none() {
            open_title_editor(doc, card, config.timing.reveal_delay()).await?;
            title = find_title_field(doc, card, labels);
            if title.is_none() {
                debug!(card = %card, "Card has no title field");
            }
        }
        let situation = find_situation_field(doc, card, labels);

        if let Some(node) = title {
            targets.push(FieldTarget {
                kind: FieldKind::Title,
                node,
                card,
            });
        }
        if let Some(node) = situation {
            targets.push(FieldTarget {
                kind: FieldKind::Situation,
                node,
                card,
            });
        }
        if let Some(hint) = find_hint_field(doc, card, labels) {
            fill_field(doc, hint, "")?;
        }
    }

    Ok(targets)
}

fn fill_list<D: Document + ?Sized>(
    doc: &mut D,
    cards: &[NodeId],
    items: &[Value],
    config: &AutofillConfig,
) -> Result<RunReport> {
    let limit = cards
        .len()
        .min(items.len())
        .min(config.limits.max_list_items);
    let unused_items = items.len() - limit;
    if unused_items > 0 {
        warn!(
            items = items.len(),
            applied = limit,
            "List has more items than cards"
        );
    }

    let mut writes = Vec::new();
    let mut filled_cards = 0;
    for (&card, value) in cards.iter().zip(items).take(limit) {
        let item = ListItem::from_value(value);
        let before = writes.len();

        let pairs = [
            (
                FieldKind::Title,
                find_title_field(doc, card, &config.labels),
                item.title,
            ),
            (
                FieldKind::Situation,
                find_situation_field(doc, card, &config.labels),
                item.situation,
            ),
        ];
        for (kind, node, text) in pairs {
            let (Some(node), Some(text)) = (node, text) else {
                continue;
            };
            fill_field(doc, node, &text)?;
            info!(card = %card, %kind, chars = text.chars().count(), "Filled field from list item");
            writes.push(FieldWrite {
                kind,
                node,
                card,
                text,
                cut: None,
            });
        }

        if writes.len() > before {
            filled_cards += 1;
        }
    }

    Ok(RunReport {
        outcome: Outcome::ListFilled {
            cards: filled_cards,
            unused_items,
        },
        writes,
    })
}

fn fill_single<D: Document + ?Sized>(
    doc: &mut D,
    text: &str,
    targets: &[FieldTarget],
    config: &AutofillConfig,
) -> Result<RunReport> {
    let mut distributor = Distributor::new(text);
    let mut writes = Vec::new();

    for target in targets {
        if distributor.is_exhausted() {
            break;
        }
        let capacity = infer_max_length(
            doc,
            target.node,
            Some(target.card),
            target.kind.fallback_capacity(config),
            &config.limits,
        );
        let Some(chunk) = distributor.next_chunk(capacity) else {
            break;
        };
        if chunk.text.is_empty() {
            continue;
        }

        fill_field(doc, target.node, &chunk.text)?;
        info!(
            card = %target.card,
            kind = %target.kind,
            capacity,
            chars = chunk.text.chars().count(),
            cut = ?chunk.kind,
            "Filled field"
        );
        writes.push(FieldWrite {
            kind: target.kind,
            node: target.node,
            card: target.card,
            text: chunk.text,
            cut: Some(chunk.kind),
        });
    }

    let leftover = distributor.into_leftover();
    let outcome = if !leftover.is_empty() {
        warn!(chars = leftover.chars().count(), "Text left after filling every field");
        Outcome::Leftover {
            fields: writes.len(),
            leftover,
        }
    } else if !writes.is_empty() {
        Outcome::Filled {
            fields: writes.len(),
        }
    } else {
        Outcome::NothingFillable
    };

    Ok(RunReport { outcome, writes })
}
