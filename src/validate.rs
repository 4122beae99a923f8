//! Response validation and normalization.
//!
//! Every stage's output passes through [`Validator`] before it can become a
//! [`SuggestionResult`]. Parsing is tolerant: a payload that is a
//! serialized map (JSON or a Python-style dict) is unwrapped, otherwise the
//! marker contract is parsed, and a best-line heuristic is the last resort.
//! Marker values that are themselves maps are unwrapped too. Whatever is
//! extracted must still be a plain, changed, non-boilerplate sentence
//! within the word budget, or the stage fails with
//! [`StageError::MalformedGenerationOutput`].

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::StageError;
use crate::models::{
    looks_structured, Confidence, Method, SuggestionRejected, SuggestionResult, WordBudget,
};
use crate::text::{normalized_words, split_sentences, word_overlap};
use crate::transform::TransformOutcome;

/// Nesting depth at which unwrapping gives up.
const MAX_UNWRAP_DEPTH: usize = 4;

const SUGGESTION_KEYS: &[&str] = &[
    "suggestion",
    "improved_sentence",
    "improved",
    "rewrite",
    "rewritten_sentence",
    "sentence",
    "text",
];
const EXPLANATION_KEYS: &[&str] = &["explanation", "reason", "rationale"];

/// Boilerplate that marks a chatty or evasive response.
pub const BANNED_PHRASES: &[&str] = &[
    "as an ai",
    "language model",
    "i hope this helps",
    "i'd be happy to",
    "i would be happy to",
    "feel free to",
    "let me know if",
    "in today's fast-paced",
    "delve into",
    "cannot assist",
    "here is the improved",
    "here's the improved",
];

static MARKER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[\s*#>\-]*(IMPROVED[_ ]SENTENCE|EXPLANATION)\s*\**\s*:\s*\**\s*(.*)$")
        .expect("static regex")
});

/// An `EXPLANATION:` marker that follows the suggestion on the same line.
static INLINE_EXPLANATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[\s*]*\bEXPLANATION\s*\**\s*:\s*\**").expect("static regex")
});

/// A short `Label:` lead-in such as `Revised:` or `**Original:**`.
static LEADING_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\s*#>\-]*[A-Za-z]+(?:[ _][A-Za-z]+)?\s*\**\s*:\s*\**\s*").expect("static regex")
});

/// `'key': 'value'` / `"key": "value"` / `'key': None` pairs in text that is
/// not valid JSON.
static LOOSE_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"['"](?P<key>[A-Za-z_]+)['"]\s*:\s*(?:'(?P<sq>(?:[^'\\]|\\.)*)'|"(?P<dq>(?:[^"\\]|\\.)*)"|(?P<bare>[^,}\]]+))"#,
    )
    .expect("static regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extraction {
    Markers,
    Unwrapped,
    Heuristic,
}

#[derive(Debug)]
struct Extracted {
    suggestion: String,
    explanation: String,
    via: Extraction,
}

/// Turns raw stage output into a [`SuggestionResult`] or a typed failure.
#[derive(Debug, Clone)]
pub struct Validator {
    slack: usize,
    banned: Vec<String>,
}

impl Validator {
    pub fn new(slack: usize) -> Self {
        Self {
            slack,
            banned: BANNED_PHRASES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn budget(&self, original: &str) -> WordBudget {
        WordBudget::new(original, self.slack)
    }

    pub fn normalize(
        &self,
        raw: &str,
        original: &str,
        method: Method,
        sources: Vec<String>,
    ) -> Result<SuggestionResult, StageError> {
        let text = strip_fences(raw);
        if text.trim().is_empty() {
            return Err(malformed("empty output"));
        }

        let budget = self.budget(original);
        let extracted = extract(&text, original, &budget)
            .ok_or_else(|| malformed("no suggestion could be extracted"))?;
        let suggestion = clean(&extracted.suggestion);
        let explanation = clean(&extracted.explanation);

        if suggestion.is_empty() {
            return Err(malformed("suggestion is empty"));
        }
        if let Some(phrase) = self.banned_phrase(&suggestion, &explanation) {
            return Err(malformed(&format!("boilerplate phrase \"{}\"", phrase)));
        }
        if normalized_words(&suggestion) == normalized_words(original) {
            return Err(malformed("suggestion repeats the original"));
        }

        let confidence = if extracted.via == Extraction::Markers && !explanation.is_empty() {
            Confidence::High
        } else {
            Confidence::Medium
        };
        SuggestionResult::try_new(&suggestion, &explanation, confidence, method, sources, &budget)
            .map_err(|e| match e {
                SuggestionRejected::OverBudget { words, limit } => {
                    malformed(&format!("{} words exceeds budget of {}", words, limit))
                }
                other => malformed(&other.to_string()),
            })
    }

    /// Result for a deterministic rewrite. A rewrite that did not apply, or
    /// that breaks the budget, becomes "no change, with guidance".
    pub fn from_transform(&self, outcome: &TransformOutcome, original: &str) -> SuggestionResult {
        let method = Method::DeterministicFallback;
        if outcome.applied() {
            match SuggestionResult::try_new(
                &outcome.text,
                &outcome.explanation,
                Confidence::Medium,
                method,
                Vec::new(),
                &self.budget(original),
            ) {
                Ok(result) => return result,
                Err(e) => tracing::debug!(error = %e, "deterministic rewrite rejected"),
            }
        }
        SuggestionResult::unchanged(original, &outcome.explanation, method)
    }

    fn banned_phrase(&self, suggestion: &str, explanation: &str) -> Option<&str> {
        let haystack = format!("{} {}", suggestion, explanation).to_lowercase();
        self.banned
            .iter()
            .find(|p| haystack.contains(p.as_str()))
            .map(String::as_str)
    }
}

fn malformed(reason: &str) -> StageError {
    StageError::MalformedGenerationOutput(reason.to_string())
}

fn strip_fences(raw: &str) -> String {
    raw.lines()
        .filter(|l| !l.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn extract(text: &str, original: &str, budget: &WordBudget) -> Option<Extracted> {
    let trimmed = text.trim();
    let unwrapped = |t: &str| {
        unwrap_structured(t, 0).map(|(suggestion, explanation)| Extracted {
            suggestion,
            explanation,
            via: Extraction::Unwrapped,
        })
    };
    if trimmed.starts_with(['{', '[']) {
        if let Some(found) = unwrapped(trimmed) {
            return Some(found);
        }
    }
    if let Some(found) = extract_markers(text) {
        return Some(found);
    }
    if looks_structured(trimmed) {
        if let Some(found) = unwrapped(trimmed) {
            return Some(found);
        }
    }
    extract_heuristic(text, original, budget)
}

fn extract_markers(text: &str) -> Option<Extracted> {
    let mut suggestion: Option<String> = None;
    let mut explanation = String::new();
    let mut awaiting_suggestion = false;

    for line in text.lines() {
        if let Some(caps) = MARKER_LINE.captures(line) {
            let label = caps.get(1).map_or("", |m| m.as_str()).to_lowercase();
            let value = caps.get(2).map_or("", |m| m.as_str()).trim().to_string();
            if label.starts_with("improved") {
                let (value, inline) = split_inline_explanation(&value);
                if let Some(inline) = inline {
                    explanation = inline;
                }
                awaiting_suggestion = value.is_empty();
                suggestion = Some(value);
            } else {
                awaiting_suggestion = false;
                explanation = value;
            }
        } else if awaiting_suggestion && !line.trim().is_empty() {
            suggestion = Some(line.trim().to_string());
            awaiting_suggestion = false;
        }
    }

    let suggestion = suggestion?;
    if looks_structured(&suggestion) {
        let (inner, inner_explanation) = unwrap_structured(&suggestion, 0)?;
        return Some(Extracted {
            suggestion: inner,
            explanation: if explanation.is_empty() {
                inner_explanation
            } else {
                explanation
            },
            via: Extraction::Unwrapped,
        });
    }
    Some(Extracted {
        suggestion,
        explanation,
        via: Extraction::Markers,
    })
}

/// `"You need access. EXPLANATION: Adds a subject."` splits into the
/// sentence and the explanation. Structured values are left whole.
fn split_inline_explanation(value: &str) -> (String, Option<String>) {
    if looks_structured(value) {
        return (value.to_string(), None);
    }
    match INLINE_EXPLANATION.find(value) {
        Some(m) => (
            value[..m.start()].trim().to_string(),
            Some(value[m.end()..].trim().to_string()),
        ),
        None => (value.to_string(), None),
    }
}

/// The de-labelled line most like the original, skipping lines that only
/// echo it; its first sentence if the whole line is over budget.
fn extract_heuristic(text: &str, original: &str, budget: &WordBudget) -> Option<Extracted> {
    let original_words = normalized_words(original);
    let best = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.ends_with(':') && !looks_structured(l))
        .map(clean)
        .filter(|l| !l.is_empty() && normalized_words(l) != original_words)
        .map(|l| (word_overlap(&l, original), l))
        .filter(|(score, _)| *score > 0.0)
        .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))?
        .1;
    let suggestion = if budget.allows(&best) {
        best
    } else {
        split_sentences(&best).into_iter().next()?
    };
    Some(Extracted {
        suggestion,
        explanation: String::new(),
        via: Extraction::Heuristic,
    })
}

/// Recover `(suggestion, explanation)` from a serialized map.
fn unwrap_structured(text: &str, depth: usize) -> Option<(String, String)> {
    if depth > MAX_UNWRAP_DEPTH {
        return None;
    }
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(value) => from_value(&value, depth),
        Err(_) => from_loose_pairs(text, depth),
    }
}

fn from_value(value: &Value, depth: usize) -> Option<(String, String)> {
    if depth > MAX_UNWRAP_DEPTH {
        return None;
    }
    match value {
        Value::Object(map) => {
            let explanation = EXPLANATION_KEYS
                .iter()
                .find_map(|k| map.get(*k))
                .map(coerce)
                .unwrap_or_default();
            let inner = SUGGESTION_KEYS.iter().find_map(|k| map.get(*k))?;
            let (suggestion, nested_explanation) = match inner {
                Value::Object(_) | Value::Array(_) => from_value(inner, depth + 1)?,
                other => {
                    let s = coerce(other);
                    if looks_structured(&s) {
                        unwrap_structured(&s, depth + 1)?
                    } else {
                        (s, String::new())
                    }
                }
            };
            let explanation = if explanation.is_empty() || looks_structured(&explanation) {
                nested_explanation
            } else {
                explanation
            };
            Some((suggestion, explanation))
        }
        Value::Array(items) => items.first().and_then(|v| from_value(v, depth + 1)),
        Value::String(s) if looks_structured(s) => unwrap_structured(s, depth + 1),
        Value::Null => None,
        other => Some((coerce(other), String::new())),
    }
}

fn from_loose_pairs(text: &str, depth: usize) -> Option<(String, String)> {
    let mut suggestion = None;
    let mut explanation = String::new();
    for caps in LOOSE_PAIR.captures_iter(text) {
        let key = caps.name("key").map_or("", |m| m.as_str()).to_lowercase();
        let value = if let Some(m) = caps.name("sq").or_else(|| caps.name("dq")) {
            unescape(m.as_str())
        } else {
            let bare = caps.name("bare").map_or("", |m| m.as_str()).trim();
            match bare {
                "None" | "null" => String::new(),
                other => other.to_string(),
            }
        };
        if suggestion.is_none() && SUGGESTION_KEYS.contains(&key.as_str()) {
            suggestion = Some(value);
        } else if explanation.is_empty() && EXPLANATION_KEYS.contains(&key.as_str()) {
            explanation = value;
        }
    }
    let suggestion = suggestion?;
    if looks_structured(&suggestion) {
        let (inner, inner_explanation) = unwrap_structured(&suggestion, depth + 1)?;
        let explanation = if explanation.is_empty() { inner_explanation } else { explanation };
        return Some((inner, explanation));
    }
    Some((suggestion, explanation))
}

/// Null becomes empty; numbers and booleans their literal text.
fn coerce(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn unescape(s: &str) -> String {
    s.replace("\\'", "'")
        .replace("\\\"", "\"")
        .replace("\\n", " ")
        .replace("\\\\", "\\")
}

/// Strip wrapping quotes, markdown emphasis and a leading label.
fn clean(text: &str) -> String {
    let s = text.trim();
    let s = match LEADING_LABEL.find(s) {
        Some(m) => &s[m.end()..],
        None => s,
    };
    let s = s.trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '*' | '“' | '”' | '‘' | '’') || c.is_whitespace());
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGINAL: &str = "Access to the IED on which the IE app is installed.";
    const REWRITE: &str = "You must have access to the IED on which the IE app is installed.";

    fn normalize(raw: &str) -> Result<SuggestionResult, StageError> {
        Validator::new(6).normalize(raw, ORIGINAL, Method::GenerativeRewrite, vec!["src".into()])
    }

    #[test]
    fn test_marker_contract_is_high_confidence() {
        let raw = format!("IMPROVED_SENTENCE: {}\nEXPLANATION: Adds the subject.", REWRITE);
        let r = normalize(&raw).unwrap();
        assert_eq!(r.suggestion(), REWRITE);
        assert_eq!(r.explanation(), "Adds the subject.");
        assert_eq!(r.confidence(), Confidence::High);
        assert!(r.success());
        assert_eq!(r.sources(), ["src".to_string()]);
    }

    #[test]
    fn test_markers_with_markdown_and_next_line_value() {
        let raw = format!("**IMPROVED_SENTENCE:**\n\"{}\"\n**EXPLANATION:** Active voice.", REWRITE);
        let r = normalize(&raw).unwrap();
        assert_eq!(r.suggestion(), REWRITE);
        assert_eq!(r.explanation(), "Active voice.");
    }

    #[test]
    fn test_python_dict_leak_is_unwrapped() {
        let raw = format!("{{'suggestion': '{}', 'explanation': 'It names who needs access.'}}", REWRITE);
        let r = normalize(&raw).unwrap();
        assert_eq!(r.suggestion(), REWRITE);
        assert_eq!(r.explanation(), "It names who needs access.");
        assert_eq!(r.confidence(), Confidence::Medium);
    }

    #[test]
    fn test_nested_json_in_marker_is_unwrapped() {
        let raw = format!(
            "IMPROVED_SENTENCE: {{\"suggestion\": {{\"suggestion\": \"{}\", \"explanation\": null}}}}\nEXPLANATION: ",
            REWRITE
        );
        let r = normalize(&raw).unwrap();
        assert_eq!(r.suggestion(), REWRITE);
        assert!(!looks_structured(r.suggestion()));
    }

    #[test]
    fn test_non_string_fields_coerced() {
        let raw = r#"{"suggestion": "You need 2 GB of free space for the IED app.", "explanation": 42}"#;
        let r = normalize(raw).unwrap();
        assert_eq!(r.explanation(), "42");
    }

    #[test]
    fn test_heuristic_best_line() {
        let raw = format!("Sure.\n{}\n", REWRITE);
        let r = normalize(&raw).unwrap();
        assert_eq!(r.suggestion(), REWRITE);
        assert_eq!(r.confidence(), Confidence::Medium);
    }

    #[test]
    fn test_rejections() {
        assert!(matches!(normalize("   "), Err(StageError::MalformedGenerationOutput(_))));
        let unchanged = format!("IMPROVED_SENTENCE: {}\nEXPLANATION: none", ORIGINAL);
        assert!(normalize(&unchanged).is_err());
        let banned = format!("IMPROVED_SENTENCE: {}\nEXPLANATION: As an AI, I rewrote it.", REWRITE);
        assert!(normalize(&banned).is_err());
        let long = format!(
            "IMPROVED_SENTENCE: {} It is installed on the IED by the administrator of the plant.\nEXPLANATION: x",
            REWRITE
        );
        assert!(normalize(&long).is_err());
        assert!(normalize("{'explanation': 'no suggestion key'}").is_err());
    }

    #[test]
    fn test_inline_explanation_is_split_off() {
        let raw = "IMPROVED_SENTENCE: You need access to the IED with the IE app. EXPLANATION: Adds a subject.";
        let r = normalize(raw).unwrap();
        assert_eq!(r.suggestion(), "You need access to the IED with the IE app.");
        assert_eq!(r.explanation(), "Adds a subject.");
        assert_eq!(r.confidence(), Confidence::High);

        let bold = format!("**IMPROVED_SENTENCE:** {} **Explanation:** Names the reader.", REWRITE);
        let r = normalize(&bold).unwrap();
        assert_eq!(r.suggestion(), REWRITE);
        assert_eq!(r.explanation(), "Names the reader.");
    }

    #[test]
    fn test_labelled_echo_of_original_is_skipped() {
        let raw = format!("Original: {}\nRevised: {}", ORIGINAL, REWRITE);
        let r = normalize(&raw).unwrap();
        assert_eq!(r.suggestion(), REWRITE);

        let echo_only = format!("Original: {}", ORIGINAL);
        assert!(matches!(
            normalize(&echo_only),
            Err(StageError::MalformedGenerationOutput(_))
        ));
        let labelled_marker = format!("IMPROVED_SENTENCE: Original: {}\nEXPLANATION: none", ORIGINAL);
        assert!(normalize(&labelled_marker).is_err());
    }

    #[test]
    fn test_clean_strips_leading_label() {
        assert_eq!(clean("**Revised:** \"Restart the service.\""), "Restart the service.");
        assert_eq!(clean("Improved sentence: Restart it."), "Restart it.");
        assert_eq!(clean("Restart it at 10:00."), "Restart it at 10:00.");
    }

    #[test]
    fn test_from_transform() {
        let v = Validator::new(6);
        let applied = TransformOutcome {
            text: REWRITE.to_string(),
            rule: Some("requirement_fragment".to_string()),
            explanation: "Active voice.".to_string(),
        };
        let r = v.from_transform(&applied, ORIGINAL);
        assert!(r.success());
        assert_eq!(r.method(), Method::DeterministicFallback);
        assert_eq!(r.confidence(), Confidence::Medium);

        let none = TransformOutcome {
            text: ORIGINAL.to_string(),
            rule: None,
            explanation: "Name the actor.".to_string(),
        };
        let r = v.from_transform(&none, ORIGINAL);
        assert!(!r.success());
        assert_eq!(r.suggestion(), ORIGINAL);
        assert_eq!(r.confidence(), Confidence::Low);
    }
}
