//! Text distribution: carves one long text into chunks that fit a sequence of
//! fields.
//!
//! Lengths are counted in `char`s. When the remaining text does not fit the
//! next field, a cut point is chosen by an ordered list of rules, each a pure
//! function of the [`Window`]. The first rule that yields a non-empty chunk
//! wins; if none does, the text is hard-cut at the capacity.
//!
//! Delimiter cuts drop the delimiter and trim whitespace on both sides. A
//! delimiter inside a closed pair of double quotes is never a cut candidate,
//! so a quoted string is never split by a delimiter cut. Quotes pair up left
//! to right; an unmatched quote hides nothing.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Plain delimiters: ASCII comma, fullwidth comma, ideographic comma.
pub const DELIMITERS: [char; 3] = [',', '，', '、'];

const QUOTE: char = '"';

static TOKEN_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,，、]\s*[0-9]+\s*=").expect("valid boundary pattern"));

static TRAILING_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+\s*$").expect("valid digits pattern"));

/// View of the text at one cut decision.
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    /// Everything not yet assigned.
    pub text: &'a str,
    /// The first `max_chars` characters of `text`.
    pub slice: &'a str,
    /// `text` after `slice`, untrimmed.
    pub remainder: &'a str,
}

impl<'a> Window<'a> {
    pub fn new(text: &'a str, max_chars: usize) -> Self {
        let end = text
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(text.len());
        Self {
            text,
            slice: &text[..end],
            remainder: &text[end..],
        }
    }
}

/// Byte offset into [`Window::text`] where the chunk ends, and the delimiter
/// found there (dropped from both sides).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cut {
    pub at: usize,
    pub delimiter: Option<char>,
}

pub type CutRule = fn(&Window<'_>) -> Option<Cut>;

/// How a chunk was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CutKind {
    /// Remaining text fit entirely.
    Whole,
    /// Before a `, N=` token.
    StructuredBoundary,
    /// Before a number whose `=` starts the remainder.
    DigitEquals,
    /// Before an unterminated quoted string.
    UnbalancedQuote,
    /// At the last delimiter with content after it.
    PlainDelimiter,
    /// Exactly at capacity.
    HardCut,
}

/// Rules in the order they are tried.
pub const CUT_RULES: &[(CutKind, CutRule)] = &[
    (CutKind::StructuredBoundary, structured_boundary),
    (CutKind::DigitEquals, digit_equals),
    (CutKind::UnbalancedQuote, unbalanced_quote),
    (CutKind::PlainDelimiter, plain_delimiter),
];

fn quotes_balanced(s: &str) -> bool {
    s.matches(QUOTE).count() % 2 == 0
}

/// Byte ranges between closed quote pairs in `text`.
fn quoted_spans(text: &str) -> Vec<(usize, usize)> {
    let quotes: Vec<usize> = text.match_indices(QUOTE).map(|(i, _)| i).collect();
    quotes.chunks_exact(2).map(|pair| (pair[0], pair[1])).collect()
}

fn is_quoted(spans: &[(usize, usize)], at: usize) -> bool {
    spans.iter().any(|&(open, close)| open < at && at < close)
}

/// Last delimiter in `text[..end]` outside every closed quote pair of `text`.
fn last_free_delimiter(text: &str, end: usize) -> Option<(usize, char)> {
    let spans = quoted_spans(text);
    text[..end]
        .char_indices()
        .rev()
        .find(|&(i, c)| DELIMITERS.contains(&c) && !is_quoted(&spans, i))
}

fn delimiter_cut(text: &str, end: usize) -> Option<Cut> {
    last_free_delimiter(text, end).map(|(at, c)| Cut {
        at,
        delimiter: Some(c),
    })
}

/// Rightmost `, N=` boundary starting inside the slice.
pub fn structured_boundary(w: &Window<'_>) -> Option<Cut> {
    let spans = quoted_spans(w.text);
    let mut found = None;
    for m in TOKEN_BOUNDARY.find_iter(w.text) {
        if m.start() >= w.slice.len() {
            break;
        }
        if is_quoted(&spans, m.start()) {
            continue;
        }
        found = w.text[m.start()..].chars().next().map(|c| Cut {
            at: m.start(),
            delimiter: Some(c),
        });
    }
    found
}

/// The slice ends in a number and the remainder continues with `=`: the
/// number is the key of the next token, so cut before it.
pub fn digit_equals(w: &Window<'_>) -> Option<Cut> {
    if TRAILING_DIGITS.is_match(w.slice) && w.remainder.trim_start().starts_with('=') {
        delimiter_cut(w.text, w.slice.len())
    } else {
        None
    }
}

/// The slice opens a quote it does not close: cut at the last delimiter
/// before that quote, else at the last free delimiter in the slice, else
/// right before the quote.
pub fn unbalanced_quote(w: &Window<'_>) -> Option<Cut> {
    if quotes_balanced(w.slice) {
        return None;
    }
    let opening = w.slice.rfind(QUOTE)?;
    delimiter_cut(w.text, opening)
        .or_else(|| delimiter_cut(w.text, w.slice.len()))
        .or(Some(Cut {
            at: opening,
            delimiter: None,
        }))
}

/// Last delimiter in the slice, if the slice has content after it.
pub fn plain_delimiter(w: &Window<'_>) -> Option<Cut> {
    let (at, c) = last_free_delimiter(w.text, w.slice.len())?;
    if w.slice[at + c.len_utf8()..].trim().is_empty() {
        return None;
    }
    Some(Cut {
        at,
        delimiter: Some(c),
    })
}

/// One piece of text destined for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub text: String,
    pub kind: CutKind,
    /// Delimiter removed between this chunk and the rest.
    pub dropped: Option<char>,
}

fn apply(text: &str, cut: Cut) -> (&str, &str) {
    let chunk = text[..cut.at].trim_end();
    let rest_start = cut.at + cut.delimiter.map(char::len_utf8).unwrap_or(0);
    (chunk, text[rest_start..].trim_start())
}

/// Split off the longest acceptable prefix of `text` that fits `max_chars`.
/// Returns the chunk and the unconsumed rest.
pub fn split_chunk(text: &str, max_chars: usize) -> (Chunk, String) {
    if text.chars().count() <= max_chars {
        let chunk = Chunk {
            text: text.to_string(),
            kind: CutKind::Whole,
            dropped: None,
        };
        return (chunk, String::new());
    }

    let window = Window::new(text, max_chars);
    for (kind, rule) in CUT_RULES {
        let Some(cut) = rule(&window) else { continue };
        let (chunk, rest) = apply(text, cut);
        if !chunk.is_empty() {
            let chunk = Chunk {
                text: chunk.to_string(),
                kind: *kind,
                dropped: cut.delimiter,
            };
            return (chunk, rest.to_string());
        }
    }

    let chunk = Chunk {
        text: window.slice.to_string(),
        kind: CutKind::HardCut,
        dropped: None,
    };
    (chunk, window.remainder.to_string())
}

/// Remaining text of a distribution in progress.
#[derive(Debug, Clone)]
pub struct Distributor {
    remaining: String,
}

impl Distributor {
    pub fn new(text: &str) -> Self {
        Self {
            remaining: text.to_string(),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining.is_empty()
    }

    pub fn remaining(&self) -> &str {
        &self.remaining
    }

    /// Carve the next chunk for a field of `max_chars`. `None` once nothing
    /// is left. The chunk may be empty when the capacity is zero.
    pub fn next_chunk(&mut self, max_chars: usize) -> Option<Chunk> {
        if self.is_exhausted() {
            return None;
        }
        let (chunk, rest) = split_chunk(&self.remaining, max_chars);
        self.remaining = rest;
        Some(chunk)
    }

    pub fn into_leftover(self) -> String {
        self.remaining
    }
}

/// A chunk and the index of the capacity it was cut for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub target: usize,
    pub chunk: Chunk,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segmentation {
    pub assignments: Vec<Assignment>,
    pub leftover: String,
}

/// Distribute `text` over targets with the given capacities, in order.
pub fn segment_text(text: &str, capacities: &[usize]) -> Segmentation {
    let mut distributor = Distributor::new(text);
    let mut assignments = Vec::new();
    for (target, &capacity) in capacities.iter().enumerate() {
        let Some(chunk) = distributor.next_chunk(capacity) else {
            break;
        };
        if !chunk.text.is_empty() {
            assignments.push(Assignment { target, chunk });
        }
    }
    Segmentation {
        assignments,
        leftover: distributor.into_leftover(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(text: &str, max: usize) -> (String, String, CutKind) {
        let (chunk, rest) = split_chunk(text, max);
        (chunk.text, rest, chunk.kind)
    }

    fn rebuild(seg: &Segmentation) -> String {
        let mut out = String::new();
        for a in &seg.assignments {
            out.push_str(&a.chunk.text);
            if let Some(d) = a.chunk.dropped {
                out.push(d);
            }
        }
        out.push_str(&seg.leftover);
        out
    }

    #[test]
    fn fitting_text_is_taken_whole() {
        assert_eq!(
            split("a=1, b=2", 20),
            ("a=1, b=2".to_string(), String::new(), CutKind::Whole)
        );
        assert_eq!(split("", 5), (String::new(), String::new(), CutKind::Whole));
    }

    #[test]
    fn capacity_counts_characters_not_bytes() {
        let text = "비 오는 거리";
        assert_eq!(split(text, 7).2, CutKind::Whole);
        let (chunk, rest, kind) = split("가나다라마바", 4);
        assert_eq!((chunk.as_str(), rest.as_str(), kind), ("가나다라", "마바", CutKind::HardCut));
    }

    #[test]
    fn scenario_key_value_list_cuts_before_the_next_pair() {
        let (chunk, rest, _) = split("a=1, b=2, c=3", 6);
        assert_eq!(chunk, "a=1");
        assert_eq!(rest, "b=2, c=3");
    }

    #[test]
    fn structured_boundary_keeps_index_value_tokens_together() {
        let w = Window::new("1=rain, 2=neon sign, 3=crowd", 14);
        assert_eq!(w.slice, "1=rain, 2=neon");
        let cut = structured_boundary(&w).unwrap();
        assert_eq!(cut, Cut { at: 6, delimiter: Some(',') });

        let (chunk, rest, kind) = split("1=rain, 2=neon sign, 3=crowd", 14);
        assert_eq!(chunk, "1=rain");
        assert_eq!(rest, "2=neon sign, 3=crowd");
        assert_eq!(kind, CutKind::StructuredBoundary);
    }

    #[test]
    fn structured_boundary_uses_rightmost_boundary_below_capacity() {
        let text = "1=a、2=b、3=c、4=d";
        let (chunk, rest, kind) = split(text, 9);
        assert_eq!(kind, CutKind::StructuredBoundary);
        assert_eq!(chunk, "1=a、2=b");
        assert_eq!(rest, "3=c、4=d");
    }

    #[test]
    fn structured_boundary_ignores_boundaries_at_or_past_capacity() {
        // the only boundary starts exactly at the capacity
        let w = Window::new("1=abcd, 2=x", 6);
        assert_eq!(structured_boundary(&w), None);
    }

    #[test]
    fn digit_equals_rewinds_past_a_stranded_key() {
        let w = Window::new("rain, neon 12 = sign", 13);
        assert_eq!(w.slice, "rain, neon 12");
        assert_eq!(digit_equals(&w), Some(Cut { at: 4, delimiter: Some(',') }));

        let (chunk, rest, kind) = split("rain, neon 12 = sign", 13);
        assert_eq!((chunk.as_str(), rest.as_str()), ("rain", "neon 12 = sign"));
        assert_eq!(kind, CutKind::DigitEquals);
    }

    #[test]
    fn digit_equals_needs_equals_after_the_digits() {
        let w = Window::new("rain, neon 12 signs", 13);
        assert_eq!(digit_equals(&w), None);
    }

    #[test]
    fn scenario_quoted_string_is_never_split() {
        let text = r#"She said "hello, world" now"#;
        let (chunk, rest, kind) = split(text, 15);
        assert_eq!(kind, CutKind::UnbalancedQuote);
        assert_eq!(chunk, "She said");
        assert_eq!(rest, r#""hello, world" now"#);

        // the comma inside the quotes is not a cut candidate
        let (chunk, rest, kind) = split(&rest, 15);
        assert_eq!(kind, CutKind::HardCut);
        assert_eq!(chunk, r#""hello, world" "#);
        assert_eq!(rest, "now");
    }

    #[test]
    fn unbalanced_quote_prefers_a_delimiter_before_the_quote() {
        let w = Window::new(r#"dusk, alley "wet, neon" glow"#, 18);
        assert_eq!(unbalanced_quote(&w), Some(Cut { at: 4, delimiter: Some(',') }));
    }

    #[test]
    fn unbalanced_quote_at_start_falls_through() {
        let w = Window::new(r#""one, two, three" and more"#, 8);
        assert_eq!(unbalanced_quote(&w), Some(Cut { at: 0, delimiter: None }));
        // empty chunk, so the chain moves on and ends in a hard cut
        let (chunk, _, kind) = split(r#""one, two, three" and more"#, 8);
        assert_eq!(kind, CutKind::HardCut);
        assert_eq!(chunk, r#""one, tw"#);
    }

    #[test]
    fn stray_quote_does_not_hide_later_delimiters() {
        let text = r#"27" monitor, desk lamp, keyboard, mouse, webcam"#;
        let seg = segment_text(text, &[14, 14, 14, 14]);
        let chunks: Vec<_> = seg
            .assignments
            .iter()
            .map(|a| (a.chunk.text.as_str(), a.chunk.kind))
            .collect();
        assert_eq!(
            chunks,
            vec![
                (r#"27" monitor"#, CutKind::UnbalancedQuote),
                ("desk lamp", CutKind::PlainDelimiter),
                ("keyboard", CutKind::PlainDelimiter),
                ("mouse, webcam", CutKind::Whole),
            ]
        );
        assert!(seg.leftover.is_empty());
    }

    #[test]
    fn unmatched_opening_quote_cuts_at_a_delimiter_after_it() {
        let (chunk, rest, kind) = split(r#"" screen, big, bright, colorful"#, 15);
        assert_eq!(kind, CutKind::UnbalancedQuote);
        assert_eq!(chunk, r#"" screen, big"#);
        assert_eq!(rest, "bright, colorful");
    }

    #[test]
    fn quote_split_by_a_hard_cut_does_not_block_later_cuts() {
        let text = r#""abcdefghijkl, mn", op, qr"#;
        let seg = segment_text(text, &[10, 10, 10, 10]);
        let chunks: Vec<_> = seg
            .assignments
            .iter()
            .map(|a| (a.chunk.text.as_str(), a.chunk.kind))
            .collect();
        assert_eq!(
            chunks,
            vec![
                (r#""abcdefghi"#, CutKind::HardCut),
                ("jkl", CutKind::UnbalancedQuote),
                (r#"mn", op"#, CutKind::UnbalancedQuote),
                ("qr", CutKind::Whole),
            ]
        );
    }

    #[test]
    fn closed_quote_pairs_still_hide_their_delimiters() {
        let w = Window::new(r#"say "a, b", then 5" more"#, 24);
        let spans = quoted_spans(w.text);
        assert_eq!(spans, vec![(4, 9)]);
        assert_eq!(last_free_delimiter(w.text, 9), None);
        assert_eq!(last_free_delimiter(w.text, w.slice.len()), Some((10, ',')));
    }

    #[test]
    fn plain_delimiter_requires_content_after_it() {
        let w = Window::new("rainy street, neon", 14);
        assert_eq!(w.slice, "rainy street, ");
        assert_eq!(plain_delimiter(&w), None);

        let w = Window::new("rainy street, neon", 16);
        assert_eq!(plain_delimiter(&w), Some(Cut { at: 12, delimiter: Some(',') }));
    }

    #[test]
    fn trailing_delimiter_without_content_hard_cuts() {
        let (chunk, rest, kind) = split("rainy street, neon", 14);
        assert_eq!(kind, CutKind::HardCut);
        assert_eq!(chunk, "rainy street, ");
        assert_eq!(rest, "neon");
    }

    #[test]
    fn fullwidth_delimiters_are_dropped() {
        let (chunk, rest) = split_chunk("비，바람，구름", 6);
        assert_eq!(chunk.text, "비，바람");
        assert_eq!(chunk.dropped, Some('，'));
        assert_eq!(rest, "구름");
    }

    #[test]
    fn scenario_no_delimiters_hard_cuts_at_capacity() {
        let text: String = ('a'..='z').cycle().take(200).collect();
        let seg = segment_text(&text, &[50, 50, 50]);
        assert_eq!(seg.assignments.len(), 3);
        for (i, a) in seg.assignments.iter().enumerate() {
            assert_eq!(a.target, i);
            assert_eq!(a.chunk.kind, CutKind::HardCut);
            assert_eq!(a.chunk.text, text[i * 50..(i + 1) * 50]);
        }
        assert_eq!(seg.leftover, text[150..]);
    }

    #[test]
    fn segmentation_stops_when_text_runs_out() {
        let seg = segment_text("1=a, 2=b", &[4, 4, 4, 4]);
        let chunks: Vec<_> = seg.assignments.iter().map(|a| a.chunk.text.as_str()).collect();
        assert_eq!(chunks, vec!["1=a", "2=b"]);
        assert!(seg.leftover.is_empty());
    }

    #[test]
    fn zero_capacity_targets_are_skipped() {
        let seg = segment_text("abc", &[0, 5]);
        assert_eq!(seg.assignments.len(), 1);
        assert_eq!(seg.assignments[0].target, 1);
        assert_eq!(seg.assignments[0].chunk.text, "abc");
    }

    #[test]
    fn chunks_never_exceed_capacity_and_rebuild_the_input() {
        let inputs = [
            "1=a,2=bb,3=ccc,4=dddd,5=eeeee,6=ffffff",
            "alpha,beta,gamma,delta,epsilon,zeta,eta,theta",
            r#"x="a,b",y="c,d",z=e,w="long,quoted,value""#,
            "비，바람，구름、안개,눈,12=서리,13=이슬",
            "nodelimitersatallinthisprettylongstring",
        ];
        let capacities = [[4usize, 7, 5, 9, 3, 6, 8, 4], [10, 3, 12, 5, 5, 5, 5, 5]];
        for text in inputs {
            for caps in &capacities {
                let seg = segment_text(text, caps);
                for a in &seg.assignments {
                    assert!(
                        a.chunk.text.chars().count() <= caps[a.target],
                        "{text:?} chunk {:?} over {}",
                        a.chunk.text,
                        caps[a.target]
                    );
                }
                assert_eq!(rebuild(&seg), text, "caps {caps:?}");
            }
        }
    }

    #[test]
    fn delimiter_cuts_leave_quotes_balanced() {
        let text = r#"a="x,y",b="p,q,r",c="s",d="t,u""#;
        let seg = segment_text(text, &[9, 9, 9, 9, 9, 9]);
        for a in &seg.assignments {
            if a.chunk.kind != CutKind::HardCut && a.chunk.kind != CutKind::Whole {
                assert!(quotes_balanced(&a.chunk.text), "{:?}", a.chunk);
            }
        }
    }

    #[test]
    fn distributor_reports_leftover() {
        let mut d = Distributor::new("one, two, three");
        assert_eq!(d.next_chunk(6).unwrap().text, "one");
        assert_eq!(d.remaining(), "two, three");
        assert_eq!(d.next_chunk(6).unwrap().text, "two");
        assert_eq!(d.into_leftover(), "three");
    }
}
