//! Rule-based issue detection.
//!
//! Each issue kind has a pure matcher `fn(&str) -> Vec<Issue>`. Matchers
//! share nothing and never touch the retrieval or generation pipeline, so
//! detection works with every external service down.

use crate::lexicon::{
    is_one_of, ADJECTIVAL_PARTICIPLES, ARTICLE_EXCEPTIONS_A, ARTICLE_EXCEPTIONS_AN, BE_FORMS,
    DETERMINERS, IRREGULAR_VERBS, NON_VERB_WORDS, POSITION_SENSITIVE_ADVERBS, PREFERRED_TERMS,
    VAGUE_TERMS, VARIANT_GROUPS, WEAK_ADVERBS, WORDY_PHRASES,
};
use crate::models::{AdjacentContext, Issue, IssueKind};
use crate::text::{split_sentences, word_count, word_spans};

/// Sentences with at least this many words are flagged as long.
pub const LONG_SENTENCE_WORDS: usize = 25;

/// Run one rule.
pub fn detect(kind: IssueKind, sentence: &str) -> Vec<Issue> {
    match kind {
        IssueKind::PassiveVoice => detect_passive(sentence),
        IssueKind::LongSentence => detect_long(sentence),
        IssueKind::Adverb => detect_adverbs(sentence),
        IssueKind::VagueTerm => {
            detect_phrases(IssueKind::VagueTerm, sentence, VAGUE_TERMS.iter().copied())
        }
        IssueKind::Terminology => detect_phrases(
            IssueKind::Terminology,
            sentence,
            PREFERRED_TERMS.iter().map(|(from, _)| *from),
        ),
        IssueKind::Consistency => detect_consistency(sentence),
        IssueKind::Grammar => detect_grammar(sentence),
        IssueKind::Style => detect_phrases(
            IssueKind::Style,
            sentence,
            WORDY_PHRASES.iter().map(|(from, _)| *from),
        ),
    }
}

/// Run every rule, attaching `context` to each issue.
pub fn detect_all(sentence: &str, context: &AdjacentContext) -> Vec<Issue> {
    IssueKind::ALL
        .iter()
        .flat_map(|kind| detect(*kind, sentence))
        .map(|issue| issue.with_context(context.clone()))
        .collect()
}

/// Split `text` into sentences and detect issues in each, with the
/// neighbouring sentences as context.
pub fn scan_text(text: &str) -> Vec<Issue> {
    let sentences = split_sentences(text);
    sentences
        .iter()
        .enumerate()
        .flat_map(|(i, s)| detect_all(s, &AdjacentContext::from_sentences(&sentences, i)))
        .collect()
}

/// `true` for regular `-ed` participles and known irregular ones.
pub fn is_participle(word: &str) -> bool {
    let w = word.to_lowercase();
    if IRREGULAR_VERBS.iter().any(|(p, _, _)| *p == w) {
        return true;
    }
    w.len() >= 5 && w.ends_with("ed") && !w.ends_with("eed")
}

/// A "to be" + participle construction inside a sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassiveMatch {
    /// Word index of the be-form.
    pub be: usize,
    /// Word index of the adverb between the be-form and participle.
    pub adverb: Option<usize>,
    /// Word index of the participle.
    pub participle: usize,
}

/// Passive constructions as word indices into [`word_spans`] of `sentence`.
pub fn passive_matches(sentence: &str) -> Vec<PassiveMatch> {
    let words = word_spans(sentence);
    let mut found = Vec::new();
    for i in 0..words.len() {
        if !is_one_of(words[i].1, BE_FORMS) {
            continue;
        }
        let (adverb, candidate) = match words.get(i + 1) {
            Some((_, w)) if w.to_lowercase().ends_with("ly") && i + 2 < words.len() => (Some(i + 1), i + 2),
            Some(_) => (None, i + 1),
            None => continue,
        };
        let word = words[candidate].1;
        if !is_participle(word) {
            continue;
        }
        let followed_by_agent = words
            .get(candidate + 1)
            .is_some_and(|(_, w)| w.eq_ignore_ascii_case("by"));
        if is_one_of(word, ADJECTIVAL_PARTICIPLES) && !followed_by_agent {
            continue;
        }
        found.push(PassiveMatch {
            be: i,
            adverb,
            participle: candidate,
        });
    }
    found
}

fn detect_passive(sentence: &str) -> Vec<Issue> {
    let words = word_spans(sentence);
    passive_matches(sentence)
        .into_iter()
        .map(|m| {
            let start = words[m.be].0;
            let (p_start, p_word) = words[m.participle];
            Issue::new(IssueKind::PassiveVoice, sentence, start, p_start + p_word.len())
        })
        .collect()
}

fn detect_long(sentence: &str) -> Vec<Issue> {
    if word_count(sentence) >= LONG_SENTENCE_WORDS {
        vec![Issue::whole_sentence(IssueKind::LongSentence, sentence)]
    } else {
        Vec::new()
    }
}

fn detect_adverbs(sentence: &str) -> Vec<Issue> {
    let words = word_spans(sentence);
    let mut issues = Vec::new();
    for (i, &(start, word)) in words.iter().enumerate() {
        if is_one_of(word, WEAK_ADVERBS) {
            issues.push(Issue::new(IssueKind::Adverb, sentence, start, start + word.len()));
            continue;
        }
        if is_one_of(word, POSITION_SENSITIVE_ADVERBS) && misplaced_limiter(&words, i) {
            issues.push(Issue::new(IssueKind::Adverb, sentence, start, start + word.len()));
        }
    }
    issues
}

/// "only"/"just" directly before a verb that is followed by its object:
/// `can only access the logs`.
pub fn misplaced_limiter(words: &[(usize, &str)], i: usize) -> bool {
    // Sentence-initial "Just open ..." means "simply"; leave it.
    if i == 0 {
        return false;
    }
    let (Some((_, verb)), Some((_, object))) = (words.get(i + 1), words.get(i + 2)) else {
        return false;
    };
    if is_one_of(verb, NON_VERB_WORDS) || is_one_of(verb, DETERMINERS) {
        return false;
    }
    if verb.chars().next().is_some_and(char::is_uppercase) || verb.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }
    is_one_of(object, DETERMINERS)
}

/// Case-insensitive, word-bounded occurrences of `phrase` in `text`.
pub fn phrase_spans(text: &str, phrase: &str) -> Vec<(usize, usize)> {
    let hay = text.to_ascii_lowercase();
    let needle = phrase.to_ascii_lowercase();
    let mut spans = Vec::new();
    if needle.is_empty() {
        return spans;
    }
    let mut from = 0;
    while let Some(found) = hay[from..].find(&needle) {
        let start = from + found;
        let end = start + needle.len();
        let before_ok = hay[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = hay[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric() || needle.ends_with('.'));
        if before_ok && after_ok {
            spans.push((start, end));
        }
        from = start + needle.len().max(1);
        while from < hay.len() && !hay.is_char_boundary(from) {
            from += 1;
        }
    }
    spans
}

fn detect_phrases<'a>(
    kind: IssueKind,
    sentence: &str,
    phrases: impl Iterator<Item = &'a str>,
) -> Vec<Issue> {
    let mut spans: Vec<(usize, usize)> = phrases.flat_map(|p| phrase_spans(sentence, p)).collect();
    spans.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
    // Drop matches nested inside a longer one ("a lot of" vs "lots of").
    let mut kept: Vec<(usize, usize)> = Vec::new();
    for span in spans {
        if kept.last().is_some_and(|last| span.0 < last.1) {
            continue;
        }
        kept.push(span);
    }
    kept.into_iter()
        .map(|(s, e)| Issue::new(kind, sentence, s, e))
        .collect()
}

fn detect_consistency(sentence: &str) -> Vec<Issue> {
    let mut issues = Vec::new();
    for (canonical, variants) in VARIANT_GROUPS {
        let present: Vec<(&str, (usize, usize))> = variants
            .iter()
            .filter_map(|v| phrase_spans(sentence, v).first().map(|span| (*v, *span)))
            .collect();
        if present.len() < 2 {
            continue;
        }
        if let Some((_, (s, e))) = present.iter().find(|(v, _)| v != canonical) {
            issues.push(Issue::new(IssueKind::Consistency, sentence, *s, *e));
        }
    }
    issues
}

fn detect_grammar(sentence: &str) -> Vec<Issue> {
    let words = word_spans(sentence);
    let mut issues = Vec::new();

    for pair in words.windows(2) {
        let (s1, w1) = pair[0];
        let (s2, w2) = pair[1];
        let between = &sentence[s1 + w1.len()..s2];
        let repeated = w1.eq_ignore_ascii_case(w2)
            && w1.chars().all(char::is_alphabetic)
            && !matches!(w1.to_lowercase().as_str(), "that" | "had")
            && between.trim().is_empty();
        if repeated {
            issues.push(Issue::new(IssueKind::Grammar, sentence, s1, s2 + w2.len()));
            continue;
        }
        if between.trim().is_empty() && article_mismatch(w1, w2) {
            issues.push(Issue::new(IssueKind::Grammar, sentence, s1, s2 + w2.len()));
        }
    }
    issues
}

/// The article `"a"` or `"an"` does not fit the sound of `next`.
pub fn article_mismatch(article: &str, next: &str) -> bool {
    let article = article.to_lowercase();
    if article != "a" && article != "an" {
        return false;
    }
    // Acronyms are read letter by letter; skip them rather than guess.
    if next.len() > 1 && next.chars().all(|c| c.is_uppercase() || c.is_ascii_digit()) {
        return false;
    }
    let Some(first) = next.chars().next() else {
        return false;
    };
    if !first.is_alphabetic() {
        return false;
    }
    let wants_an = if is_one_of(next, ARTICLE_EXCEPTIONS_AN) {
        true
    } else if is_one_of(next, ARTICLE_EXCEPTIONS_A) {
        false
    } else {
        matches!(first.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u')
    };
    (article == "a") == wants_an
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(sentence: &str) -> Vec<IssueKind> {
        detect_all(sentence, &AdjacentContext::default())
            .into_iter()
            .map(|i| i.kind)
            .collect()
    }

    #[test]
    fn test_passive_in_relative_clause() {
        let s = "Access to the IED on which the IE app is installed.";
        let issues = detect(IssueKind::PassiveVoice, s);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].matched_text, "is installed");
    }

    #[test]
    fn test_passive_irregular_and_adverb() {
        let issues = detect(IssueKind::PassiveVoice, "The report was quickly written by the team.");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].matched_text, "was quickly written");
    }

    #[test]
    fn test_passive_skips_adjectival_and_active() {
        assert!(detect(IssueKind::PassiveVoice, "I am interested in the results.").is_empty());
        assert!(detect(IssueKind::PassiveVoice, "The team writes the report.").is_empty());
        assert!(detect(IssueKind::PassiveVoice, "The tank is red.").is_empty());
    }

    #[test]
    fn test_long_sentence_threshold() {
        let b = "This section provides information on how to transfer an IE app from the IE Hub to the IEM catalog of one or more IEM instances.";
        assert_eq!(detect(IssueKind::LongSentence, b).len(), 1);
        assert!(detect(IssueKind::LongSentence, "This section provides information.").is_empty());
    }

    #[test]
    fn test_adverbs() {
        let issues = detect(IssueKind::Adverb, "You can only access the logs, which is very useful.");
        let matched: Vec<&str> = issues.iter().map(|i| i.matched_text.as_str()).collect();
        assert_eq!(matched, vec!["only", "very"]);
        assert!(detect(IssueKind::Adverb, "Only the admin can edit it.").is_empty());
    }

    #[test]
    fn test_phrase_spans_word_bounded() {
        assert_eq!(phrase_spans("Some handsome things", "some"), vec![(0, 4)]);
        assert_eq!(phrase_spans("Tools, etc. are listed", "etc."), vec![(7, 11)]);
    }

    #[test]
    fn test_vague_terminology_style() {
        assert!(kinds("Various settings exist.").contains(&IssueKind::VagueTerm));
        assert!(kinds("Send an e-mail to support.").contains(&IssueKind::Terminology));
        assert!(kinds("Restart in order to apply changes.").contains(&IssueKind::Style));
    }

    #[test]
    fn test_consistency_mixed_variants() {
        let issues = detect(IssueKind::Consistency, "Check your email before the e-mail expires.");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].matched_text, "e-mail");
        assert!(detect(IssueKind::Consistency, "Check your email.").is_empty());
    }

    #[test]
    fn test_grammar_repeated_word_and_article() {
        let issues = detect(IssueKind::Grammar, "Open the the file and create a index.");
        let matched: Vec<&str> = issues.iter().map(|i| i.matched_text.as_str()).collect();
        assert_eq!(matched, vec!["the the", "a index"]);
        assert!(detect(IssueKind::Grammar, "Use a user account and an hour of time.").is_empty());
        assert!(detect(IssueKind::Grammar, "Install an IE app on a IED.").is_empty());
    }

    #[test]
    fn test_scan_text_attaches_context() {
        let issues = scan_text("The following requirement must be met:\n- Access to the IED on which the IE app is installed.");
        let passive = issues
            .iter()
            .find(|i| i.kind == IssueKind::PassiveVoice && i.sentence_text.starts_with("Access"))
            .expect("passive issue");
        assert_eq!(
            passive.adjacent_context.previous_sentence.as_deref(),
            Some("The following requirement must be met:")
        );
    }
}
