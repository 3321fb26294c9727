//! Effective capacity of a field.
//!
//! The host page does not consistently expose a machine-readable limit, so
//! several sources are consulted in order: the declared `maxlength`, a counter
//! linked through `aria-describedby`, a `0 / N` counter anywhere in the card,
//! and finally a per-kind fallback.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::config::LimitConfig;
use crate::dom::{select, Document, NodeId};

static DESCRIBED_COUNTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\s*([0-9]+)").expect("valid counter pattern"));

static EMPTY_CARD_COUNTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"0\s*/\s*([0-9]{1,3})").expect("valid counter pattern"));

/// Where an inferred capacity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitSource {
    Declared,
    DescribedBy,
    CardCounter,
    Fallback,
}

/// Parse the leading integer of an attribute value, ignoring what follows.
fn parse_leading_int(raw: &str) -> Option<usize> {
    let digits: String = raw
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn declared_limit<D: Document + ?Sized>(
    doc: &D,
    field: NodeId,
    limits: &LimitConfig,
) -> Option<usize> {
    let raw = doc
        .attr(field, "maxlength")
        .or_else(|| doc.attr(field, "maxLength"))?;
    parse_leading_int(raw).filter(|&n| n > 0 && n < limits.declared_limit_ceiling)
}

fn described_by_limit<D: Document + ?Sized>(doc: &D, field: NodeId) -> Option<usize> {
    let id = doc.attr(field, "aria-describedby")?;
    let counter = doc.element_by_id(id)?;
    let text = doc.text_content(counter);
    let caps = DESCRIBED_COUNTER.captures(&text)?;
    caps[1].parse().ok()
}

fn card_counter_limit<D: Document + ?Sized>(doc: &D, card: NodeId) -> Option<usize> {
    select(doc, card, &["span", "div"])
        .into_iter()
        .find_map(|node| {
            let text = doc.text_content(node);
            EMPTY_CARD_COUNTER
                .captures(&text)
                .and_then(|caps| caps[1].parse().ok())
        })
}

/// Capacity of `field` along with the source it was read from.
pub fn infer_limit<D: Document + ?Sized>(
    doc: &D,
    field: NodeId,
    card: Option<NodeId>,
    fallback: usize,
    limits: &LimitConfig,
) -> (usize, LimitSource) {
    if let Some(n) = declared_limit(doc, field, limits) {
        return (n, LimitSource::Declared);
    }
    if let Some(n) = described_by_limit(doc, field) {
        return (n, LimitSource::DescribedBy);
    }
    if let Some(n) = card.and_then(|card| card_counter_limit(doc, card)) {
        return (n, LimitSource::CardCounter);
    }
    (fallback, LimitSource::Fallback)
}

/// Effective capacity of `field`, in characters.
pub fn infer_max_length<D: Document + ?Sized>(
    doc: &D,
    field: NodeId,
    card: Option<NodeId>,
    fallback: usize,
    limits: &LimitConfig,
) -> usize {
    let (capacity, source) = infer_limit(doc, field, card, fallback, limits);
    debug!(field = %field, capacity, ?source, "Inferred field capacity");
    capacity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{El, Page};

    fn limits() -> LimitConfig {
        LimitConfig::default()
    }

    fn infer(page: &Page, fallback: usize) -> (usize, LimitSource) {
        let field = page.element_by_id("f").unwrap();
        let card = page.element_by_id("card");
        infer_limit(page, field, card, fallback, &limits())
    }

    #[test]
    fn declared_maxlength_wins() {
        let page = Page::build(
            El::new("body").child(
                El::new("div")
                    .id("card")
                    .child(El::new("input").id("f").attr("maxlength", "30"))
                    .child(El::new("span").text("0 / 99")),
            ),
        );
        assert_eq!(infer(&page, 20), (30, LimitSource::Declared));
    }

    #[test]
    fn declared_maxlength_accepts_trailing_garbage() {
        let page = Page::build(El::new("body").child(El::new("input").id("f").attr("maxlength", "25px")));
        assert_eq!(infer(&page, 20), (25, LimitSource::Declared));
    }

    #[test]
    fn out_of_range_declarations_are_ignored() {
        for raw in ["0", "-1", "10000", "abc", ""] {
            let page = Page::build(El::new("body").child(El::new("input").id("f").attr("maxlength", raw)));
            assert_eq!(infer(&page, 20), (20, LimitSource::Fallback), "maxlength={raw:?}");
        }
    }

    #[test]
    fn described_by_counter_is_second() {
        let page = Page::build(
            El::new("body")
                .child(El::new("textarea").id("f").attr("aria-describedby", "count"))
                .child(El::new("p").id("count").text("12 / 120")),
        );
        assert_eq!(infer(&page, 50), (120, LimitSource::DescribedBy));
    }

    #[test]
    fn card_counter_is_third() {
        let page = Page::build(
            El::new("body").child(
                El::new("div")
                    .id("card")
                    .child(El::new("textarea").id("f").attr("aria-describedby", "missing"))
                    .child(El::new("span").text("Characters"))
                    .child(El::new("span").text("0 / 40")),
            ),
        );
        assert_eq!(infer(&page, 50), (40, LimitSource::CardCounter));
    }

    #[test]
    fn card_counter_only_matches_empty_counters() {
        let page = Page::build(
            El::new("body").child(
                El::new("div")
                    .id("card")
                    .child(El::new("textarea").id("f"))
                    .child(El::new("span").text("7 / 40")),
            ),
        );
        assert_eq!(infer(&page, 50), (50, LimitSource::Fallback));
    }

    #[test]
    fn no_card_means_fallback() {
        let page = Page::build(
            El::new("body")
                .child(El::new("input").id("f"))
                .child(El::new("span").text("0 / 10")),
        );
        assert_eq!(infer(&page, 20), (20, LimitSource::Fallback));
    }
}
