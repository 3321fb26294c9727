//! Classification of the pasted prompt.

use serde::Serialize;
use serde_json::Value;

/// Keys read, in order, for the text of a single JSON object prompt.
const SINGLE_TEXT_KEYS: &[&str] = &["final_prompt", "prompt", "text"];
/// Keys read, in order, for a list item's title.
const ITEM_TITLE_KEYS: &[&str] = &["title", "name", "prompt"];
/// Keys read, in order, for a list item's situation.
const ITEM_SITUATION_KEYS: &[&str] = &["situation", "prompt", "text"];

/// Parsed form of the user's prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Payload {
    Empty,
    /// One text streamed across every discovered field.
    Single { text: String },
    /// One record per card, applied positionally.
    List { items: Vec<Value> },
}

/// Title and situation text of one list record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListItem {
    pub title: Option<String>,
    pub situation: Option<String>,
}

impl ListItem {
    /// Read a record. Non-object records yield no text.
    pub fn from_value(value: &Value) -> Self {
        Self {
            title: first_text(value, ITEM_TITLE_KEYS),
            situation: first_text(value, ITEM_SITUATION_KEYS),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.situation.is_none()
    }
}

/// First key holding a non-empty string or a number, rendered as text.
fn first_text(value: &Value, keys: &[&str]) -> Option<String> {
    let object = value.as_object()?;
    keys.iter().find_map(|key| match object.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Classify raw prompt input. Never fails: anything that is not a usable
/// JSON array or object is treated as literal text.
pub fn parse_prompt(raw: &str) -> Payload {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Payload::Empty;
    }
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return Payload::Single {
            text: trimmed.to_string(),
        };
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Array(items)) => Payload::List { items },
        Ok(value) => Payload::Single {
            text: first_text(&value, SINGLE_TEXT_KEYS).unwrap_or_else(|| trimmed.to_string()),
        },
        Err(e) => {
            tracing::debug!("Prompt looks like JSON but does not parse ({e}), using it as text");
            Payload::Single {
                text: trimmed.to_string(),
            }
        }
    }
}
