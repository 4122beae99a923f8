//! Long-sentence splitting.
//!
//! Every splitter returns `Some` only when both halves are complete
//! sentences: at least three words, terminal punctuation, a capitalized
//! start, and a finite verb in the first half. Otherwise the rule is
//! skipped and the next one is tried.

use std::sync::LazyLock;

use regex::Regex;

use crate::lexicon::{
    is_one_of, DETERMINERS, E_FINAL_VERBS, FINITE_MARKERS, IMPERATIVE_VERBS, INFINITIVE_GOVERNORS,
    PREPOSITIONS, PURPOSE_VERBS, SUBJECT_PRONOUNS, SUBORDINATORS,
};
use crate::text::{
    capitalize_first, ends_with_terminal, lowercase_first, split_terminal, with_period, word_count,
    word_spans,
};

use super::verbs::{base_from_ing, third_person};
use super::RuleContext;

/// Minimum words before a comma for the comma-clause split.
const LONG_CLAUSE_WORDS: usize = 8;
/// Minimum words before "to" for the purpose-clause split.
const PURPOSE_LEAD_WORDS: usize = 6;
const MIN_PART_WORDS: usize = 3;

static COORDINATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i),\s+(and|but|so|yet|or)\s+").expect("static regex"));

static PROVIDES_HOW_TO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?P<head>.+?\b(?:provides|contains|gives|includes|offers)\s+(?:information|details|instructions|guidance|an\s+overview))\s+(?:on|about)\s+how\s+to\s+(?P<rest>.+)$",
    )
    .expect("static regex")
});

static FROM_TO_THEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?P<head>.*?\bfrom\s+.+?\s+to\s+.+?),?\s+(?P<conj>and\s+then|then|which)\s+(?P<rest>.+)$",
    )
    .expect("static regex")
});

/// Rough finite-verb test: an auxiliary, an "-ed" form, a sentence-initial
/// imperative, or a third-person "-s" form after a non-determiner.
fn has_verb(clause: &str) -> bool {
    let words = word_spans(clause);
    words.iter().enumerate().any(|(i, &(_, w))| {
        let lower = w.to_lowercase();
        if is_one_of(&lower, FINITE_MARKERS) || (i == 0 && is_one_of(&lower, IMPERATIVE_VERBS)) {
            return true;
        }
        if i == 0 {
            return false;
        }
        let prev = words[i - 1].1;
        let after_det = is_one_of(prev, DETERMINERS) || is_one_of(prev, PREPOSITIONS);
        let ed = lower.len() > 4 && lower.ends_with("ed");
        let s_form = lower.len() > 3
            && lower.ends_with('s')
            && !lower.ends_with("ss")
            && !lower.ends_with("us")
            && !lower.ends_with("is");
        (ed || s_form) && !after_det
    })
}

fn looks_independent(clause: &str) -> bool {
    let words = word_spans(clause);
    let Some(&(_, first)) = words.first() else {
        return false;
    };
    let subject_start = is_one_of(first, SUBJECT_PRONOUNS)
        || is_one_of(first, DETERMINERS)
        || (first.chars().next().is_some_and(char::is_uppercase) && !is_one_of(first, SUBORDINATORS));
    words.len() >= MIN_PART_WORDS && subject_start && has_verb(&clause[words[1].0..])
}

/// Join two halves, or `None` if either half would not stand alone.
fn complete_pair(first: &str, second: &str) -> Option<String> {
    let first = with_period(first);
    let second = with_period(&capitalize_first(second.trim()));
    let complete = |s: &str| {
        word_count(s) >= MIN_PART_WORDS
            && ends_with_terminal(s)
            && s.chars().next().is_some_and(char::is_uppercase)
    };
    if !complete(&first) || !complete(&second) || !has_verb(split_terminal(&first).0) {
        return None;
    }
    Some(format!("{} {}", first, second))
}

/// (a) `", and|but|so|yet|or <independent clause>"`.
pub(super) fn split_coordinating(sentence: &str, _ctx: &RuleContext<'_>) -> Option<String> {
    for caps in COORDINATOR.captures_iter(sentence) {
        let (Some(whole), Some(conj)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let left = &sentence[..whole.start()];
        let right = &sentence[whole.end()..];
        if !looks_independent(right) {
            continue;
        }
        let lead = match conj.as_str().to_lowercase().as_str() {
            "but" | "yet" => "However, ",
            "so" => "As a result, ",
            "or" => "Otherwise, ",
            _ => "",
        };
        let right = if lead.is_empty() {
            right.to_string()
        } else {
            format!("{}{}", lead, right)
        };
        if let Some(joined) = complete_pair(left, &right) {
            return Some(joined);
        }
    }
    None
}

/// (b) A long first clause followed by a comma and either an independent
/// clause, a "which" clause, or a participial "-ing" clause.
pub(super) fn split_long_comma_clause(sentence: &str, _ctx: &RuleContext<'_>) -> Option<String> {
    let comma = sentence.find(',')?;
    let left = &sentence[..comma];
    let right = sentence[comma + 1..].trim_start();
    let left_words = word_spans(left);
    if left_words.len() < LONG_CLAUSE_WORDS || is_one_of(left_words[0].1, SUBORDINATORS) {
        return None;
    }

    let right_words = word_spans(right);
    let (&(_, first), rest_start) = (right_words.first()?, right_words.get(1).map(|w| w.0)?);
    let second = if first.eq_ignore_ascii_case("which") {
        format!("This {}", &right[rest_start..])
    } else if let Some(base) = first.to_lowercase().ends_with("ing").then(|| base_from_ing(first)).flatten() {
        format!("This {} {}", third_person(&base), &right[rest_start..])
    } else if looks_independent(right) {
        right.to_string()
    } else {
        return None;
    };
    complete_pair(left, &second)
}

/// (c) Purpose clause: `"<clause> to <verb> ..."`.
pub(super) fn split_infinitive_purpose(sentence: &str, _ctx: &RuleContext<'_>) -> Option<String> {
    let words = word_spans(sentence);
    for i in PURPOSE_LEAD_WORDS..words.len().saturating_sub(1) {
        let (to_start, to) = words[i];
        if !to.eq_ignore_ascii_case("to") {
            continue;
        }
        let prev = words[i - 1].1;
        let (verb_start, verb) = words[i + 1];
        if is_one_of(prev, INFINITIVE_GOVERNORS) {
            continue;
        }
        let lower = verb.to_lowercase();
        if !(is_one_of(&lower, PURPOSE_VERBS) || is_one_of(&lower, IMPERATIVE_VERBS) || is_one_of(&lower, E_FINAL_VERBS)) {
            continue;
        }
        let left = sentence[..to_start].trim_end().trim_end_matches(',');
        let right = &sentence[verb_start..];
        let imperative = is_one_of(words[0].1, IMPERATIVE_VERBS);
        let second = if imperative {
            format!("Doing so lets you {}", right)
        } else {
            let verb_end = verb_start + verb.len();
            format!("This {}{}", third_person(&lower), &sentence[verb_end..])
        };
        if let Some(joined) = complete_pair(left, &second) {
            return Some(joined);
        }
    }
    None
}

/// (d) Fixed phrasal patterns.
pub(super) fn split_phrasal(sentence: &str, _ctx: &RuleContext<'_>) -> Option<String> {
    let trimmed = sentence.trim();
    if let Some(caps) = PROVIDES_HOW_TO.captures(trimmed) {
        let (head, rest) = (caps.name("head")?.as_str(), caps.name("rest")?.as_str());
        if let Some(joined) = complete_pair(head, &format!("It explains how to {}", rest)) {
            return Some(joined);
        }
    }
    if let Some(caps) = FROM_TO_THEN.captures(trimmed) {
        let head = caps.name("head")?.as_str();
        let rest = caps.name("rest")?.as_str();
        let second = if caps.name("conj")?.as_str().eq_ignore_ascii_case("which") {
            format!("This {}", rest)
        } else if looks_independent(rest) {
            format!("Then {}", lowercase_first(rest))
        } else {
            format!("It then {}", rest)
        };
        return complete_pair(head, &second);
    }
    None
}
