//! Reasoning-leak detection and scrubbing for follow-up answers.
//!
//! Reasoning-tuned models sometimes emit their deliberation instead of (or
//! around) the final answer. The scrubber removes delimited reasoning spans,
//! then drops lines carrying known deliberation vocabulary, then runs a
//! broader line-level sweep. Detection is intentionally aggressive: a leaked
//! "let me think" is worse for the reader than a dropped filler line.

use regex::Regex;
use std::sync::LazyLock;

/// Phrases that only appear in leaked deliberation, never in a final answer.
const LEAK_VOCABULARY: [&str; 8] = [
    "let's think",
    "let us think",
    "not sure",
    "output requirements",
    "step by step",
    "chain of thought",
    "i need to figure out",
    "the user wants",
];

/// Lines that read as deliberation rather than answer content.
static LEAK_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(okay[,.\s]|ok[,.\s]|hmm|wait[,.\s]|let me |let's |i need to |i should |i'll start|first, i |so the user |the user (wants|is asking)|we need to |looking at the (context|question)|my final answer)",
    )
    .expect("leak line regex is valid")
});

static THINK_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<think>.*?</think>").expect("think span regex is valid")
});

/// Remove delimited reasoning spans, tolerating unbalanced tags.
fn strip_reasoning_spans(text: &str) -> String {
    let mut out = THINK_SPAN.replace_all(text, "").into_owned();
    // A closing tag without an opener: everything before it is deliberation.
    if let Some((_, tail)) = out.split_once("</think>") {
        out = tail.to_string();
    }
    // An opening tag never closed: everything after it is deliberation.
    if let Some((head, _)) = out.split_once("<think>") {
        out = head.to_string();
    }
    out.trim().to_string()
}

fn has_leak_vocabulary(text: &str) -> bool {
    let lower = text.to_lowercase();
    LEAK_VOCABULARY.iter().any(|phrase| lower.contains(phrase))
}

/// Scrub an answer of leaked deliberation. Returns the cleaned text, which
/// may be empty when the whole answer was deliberation; the caller supplies
/// the user-facing fallback for that case.
///
/// The broad line pattern only deletes lines once hard vocabulary evidence
/// confirms a leak; on its own it is too eager to delete from a legitimate
/// answer. Text that trips the pattern without vocabulary is left intact
/// here and handled by the caller's rewrite pass via [`looks_like_leak`].
pub fn sanitize_answer(text: &str) -> String {
    let mut cleaned = strip_reasoning_spans(text);

    if has_leak_vocabulary(&cleaned) {
        cleaned = cleaned
            .lines()
            .filter(|line| {
                let lower = line.to_lowercase();
                !LEAK_VOCABULARY.iter().any(|phrase| lower.contains(phrase))
            })
            .filter(|line| !LEAK_LINE.is_match(line))
            .collect::<Vec<_>>()
            .join("\n");
    }

    cleaned.trim().to_string()
}

/// Heuristic leak detector: known deliberation vocabulary anywhere, or at
/// least two lines matching the deliberation line pattern.
pub fn looks_like_leak(text: &str) -> bool {
    if has_leak_vocabulary(text) {
        return true;
    }
    text.lines().filter(|line| LEAK_LINE.is_match(line)).count() >= 2
}
