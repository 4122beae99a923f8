//! Deterministic rewrite library.
//!
//! Rewrites are an ordered, declarative table of [`RewriteRule`]s. For a
//! given issue kind the rules are tried by ascending priority and the first
//! one that produces a changed sentence wins. When nothing applies the
//! sentence is returned unchanged together with guidance text; a rule never
//! forces a low-quality rewrite.
//!
//! | Kind | Rules |
//! |------|-------|
//! | long-sentence | coordinating split, comma clause, purpose clause, phrasal patterns |
//! | passive-voice | requirement fragment, `by` agent, generic subject |
//! | adverb | limiter repositioning, weak adverb removal |
//! | style / vague-term / terminology / consistency | phrase substitution |
//! | grammar | repeated word, `a`/`an` agreement |
//!
//! Every rule is a pure function of the sentence and its [`RuleContext`];
//! the output is always plain text.

mod adverb;
mod passive;
mod phrase;
mod split;
mod verbs;

use std::sync::LazyLock;

use regex::{NoExpand, Regex};

use crate::lexicon::{PREFERRED_TERMS, VAGUE_REPLACEMENTS, VARIANT_GROUPS, WORDY_PHRASES};
use crate::models::{DocumentType, Issue, IssueKind};
use crate::text::{capitalize_first, ends_with_terminal, squash_whitespace, with_period};

pub use passive::SubjectPolicy;
pub use verbs::{base_form, third_person};

/// What a rule may look at besides the sentence itself.
pub struct RuleContext<'a> {
    pub issue: &'a Issue,
    pub policy: &'a SubjectPolicy,
    pub document_type: DocumentType,
}

type TransformFn = fn(&str, &RuleContext<'_>) -> Option<String>;

enum RuleAction {
    /// Case-insensitive substitution of every match.
    Pattern { regex: Regex, replacement: String },
    Transform(TransformFn),
}

/// One entry of the rewrite table.
pub struct RewriteRule {
    pub name: String,
    pub kind: IssueKind,
    pub priority: u16,
    pub explanation: String,
    action: RuleAction,
}

impl RewriteRule {
    fn transform(kind: IssueKind, priority: u16, name: &str, explanation: &str, f: TransformFn) -> Self {
        Self {
            name: name.to_string(),
            kind,
            priority,
            explanation: explanation.to_string(),
            action: RuleAction::Transform(f),
        }
    }

    /// A phrase substitution. An empty replacement deletes the phrase
    /// together with a trailing comma and whitespace.
    fn phrase(kind: IssueKind, priority: u16, phrase: &str, replacement: &str) -> Option<Self> {
        let escaped = regex::escape(phrase);
        let pattern = if replacement.is_empty() {
            format!(r"(?i)\b{}\b,?\s*", escaped)
        } else {
            format!(r"(?i)\b{}\b", escaped)
        };
        let regex = Regex::new(&pattern).ok()?;
        let explanation = if replacement.is_empty() {
            format!("Removed \"{}\", which adds words without meaning.", phrase)
        } else {
            format!("Replaced \"{}\" with \"{}\".", phrase, replacement)
        };
        Some(Self {
            name: format!("replace:{}", phrase),
            kind,
            priority,
            explanation,
            action: RuleAction::Pattern {
                regex,
                replacement: replacement.to_string(),
            },
        })
    }

    /// Apply the rule; `None` when it does not match.
    pub fn apply(&self, sentence: &str, ctx: &RuleContext<'_>) -> Option<String> {
        match &self.action {
            RuleAction::Pattern { regex, replacement } => regex
                .is_match(sentence)
                .then(|| regex.replace_all(sentence, NoExpand(replacement)).into_owned()),
            RuleAction::Transform(f) => f(sentence, ctx),
        }
    }
}

fn builtin_rules() -> Vec<RewriteRule> {
    use IssueKind::*;

    let mut rules = vec![
        RewriteRule::transform(
            LongSentence,
            10,
            "split_coordinating",
            "Split the sentence where a conjunction joins two complete clauses.",
            split::split_coordinating,
        ),
        RewriteRule::transform(
            LongSentence,
            20,
            "split_long_comma_clause",
            "Split the sentence after its long opening clause.",
            split::split_long_comma_clause,
        ),
        RewriteRule::transform(
            LongSentence,
            30,
            "split_infinitive_purpose",
            "Moved the purpose clause into its own sentence.",
            split::split_infinitive_purpose,
        ),
        RewriteRule::transform(
            LongSentence,
            40,
            "split_phrasal",
            "Split the sentence so each part carries one idea.",
            split::split_phrasal,
        ),
        RewriteRule::transform(
            PassiveVoice,
            10,
            "requirement_fragment",
            "Rewrote the requirement in active voice with an explicit subject.",
            passive::requirement_fragment,
        ),
        RewriteRule::transform(
            PassiveVoice,
            20,
            "by_agent",
            "Made the agent the subject of the sentence.",
            passive::by_agent,
        ),
        RewriteRule::transform(
            PassiveVoice,
            30,
            "generic_subject",
            "Rewrote the sentence in active voice so the actor is clear.",
            passive::generic_subject,
        ),
        RewriteRule::transform(
            Adverb,
            10,
            "reposition_limiter",
            "Moved the limiting adverb next to the phrase it restricts.",
            adverb::reposition_limiter,
        ),
        RewriteRule::transform(
            Adverb,
            20,
            "remove_weak",
            "Removed an intensifier that weakens the sentence.",
            adverb::remove_weak,
        ),
        RewriteRule::transform(
            Grammar,
            10,
            "collapse_repeated",
            "Removed a repeated word.",
            phrase::collapse_repeated,
        ),
        RewriteRule::transform(
            Grammar,
            20,
            "fix_articles",
            "Matched the article to the sound of the following word.",
            phrase::fix_articles,
        ),
    ];

    let substitutions = WORDY_PHRASES
        .iter()
        .map(|(p, r)| (Style, *p, *r))
        .chain(VAGUE_REPLACEMENTS.iter().map(|(p, r)| (VagueTerm, *p, *r)))
        .chain(PREFERRED_TERMS.iter().map(|(p, r)| (Terminology, *p, *r)))
        .chain(VARIANT_GROUPS.iter().flat_map(|(canonical, variants)| {
            variants
                .iter()
                .filter(move |v| *v != canonical)
                .map(move |v| (Consistency, *v, *canonical))
        }));
    // Table order is priority order within a kind.
    for (i, (kind, phrase, replacement)) in substitutions.enumerate() {
        let priority = 100 + i.min(u16::MAX as usize - 100) as u16;
        rules.extend(RewriteRule::phrase(kind, priority, phrase, replacement));
    }

    rules.sort_by_key(|r| (r.kind, r.priority));
    rules
}

static RULES: LazyLock<Vec<RewriteRule>> = LazyLock::new(builtin_rules);

/// Guidance for when no rule applies.
pub fn guidance(kind: IssueKind) -> &'static str {
    match kind {
        IssueKind::PassiveVoice => "Name who performs the action and make them the subject.",
        IssueKind::LongSentence => "Consider splitting this sentence so each part carries one idea.",
        IssueKind::Adverb => "Place the adverb next to the word it modifies, or remove it.",
        IssueKind::VagueTerm => "Replace the vague term with a specific quantity or example.",
        IssueKind::Terminology => "Use the preferred term from the style guide.",
        IssueKind::Consistency => "Use one spelling of the term throughout the document.",
        IssueKind::Grammar => "Check the highlighted words for agreement and repetition.",
        IssueKind::Style => "Use a shorter, more direct phrasing.",
    }
}

/// Result of a deterministic rewrite attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutcome {
    pub text: String,
    /// Name of the rule that fired, if any.
    pub rule: Option<String>,
    pub explanation: String,
}

impl TransformOutcome {
    fn unchanged(sentence: &str, kind: IssueKind) -> Self {
        Self {
            text: sentence.to_string(),
            rule: None,
            explanation: guidance(kind).to_string(),
        }
    }

    pub fn applied(&self) -> bool {
        self.rule.is_some()
    }
}

/// Runs the rewrite table for an issue under a subject policy.
#[derive(Debug, Clone, Default)]
pub struct Transformer {
    policy: SubjectPolicy,
}

impl Transformer {
    pub fn new(policy: SubjectPolicy) -> Self {
        Self { policy }
    }

    /// Rules for `kind` in the order they are tried.
    pub fn rules_for(kind: IssueKind) -> impl Iterator<Item = &'static RewriteRule> {
        RULES.iter().filter(move |r| r.kind == kind)
    }

    pub fn rewrite(&self, issue: &Issue, document_type: DocumentType) -> TransformOutcome {
        let sentence = issue.sentence_text.trim();
        if sentence.is_empty() {
            return TransformOutcome::unchanged(sentence, issue.kind);
        }
        let ctx = RuleContext {
            issue,
            policy: &self.policy,
            document_type,
        };
        for rule in Self::rules_for(issue.kind) {
            let Some(raw) = rule.apply(sentence, &ctx) else {
                continue;
            };
            let text = tidy(&raw, sentence);
            if text.is_empty() || text == sentence {
                continue;
            }
            tracing::debug!(rule = %rule.name, kind = %issue.kind, "rewrite rule applied");
            return TransformOutcome {
                text,
                rule: Some(rule.name.clone()),
                explanation: rule.explanation.clone(),
            };
        }
        TransformOutcome::unchanged(sentence, issue.kind)
    }

    /// Standalone entry point for callers that only have a label.
    pub fn rewrite_sentence(&self, kind: IssueKind, sentence: &str) -> TransformOutcome {
        self.rewrite(&Issue::whole_sentence(kind, sentence), DocumentType::General)
    }
}

/// Normalize spacing and capitalization after a substitution.
fn tidy(text: &str, original: &str) -> String {
    let mut out = squash_whitespace(text);
    for punct in [",", ".", ";", ":", "!", "?"] {
        out = out.replace(&format!(" {}", punct), punct);
    }
    while out.starts_with([',', ';', ':']) {
        out = out[1..].trim_start().to_string();
    }
    let out = capitalize_first(&out);
    if ends_with_terminal(original) && !out.is_empty() {
        with_period(&out)
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AdjacentContext;

    fn rewrite(kind: IssueKind, sentence: &str) -> TransformOutcome {
        Transformer::default().rewrite_sentence(kind, sentence)
    }

    #[test]
    fn test_rules_sorted_by_priority() {
        for kind in IssueKind::ALL {
            let priorities: Vec<u16> = Transformer::rules_for(kind).map(|r| r.priority).collect();
            let mut sorted = priorities.clone();
            sorted.sort();
            assert_eq!(priorities, sorted, "rules for {} out of order", kind);
        }
        assert!(Transformer::rules_for(IssueKind::Style).count() >= WORDY_PHRASES.len());
    }

    #[test]
    fn test_scenario_requirement_passive() {
        let issue = Issue::whole_sentence(
            IssueKind::PassiveVoice,
            "Access to the IED on which the IE app is installed.",
        )
        .with_context(AdjacentContext::new(Some("The following requirement must be met:"), None));
        let out = Transformer::default().rewrite(&issue, DocumentType::Technical);
        assert!(out.applied());
        assert_eq!(out.text, "You must have access to the IED on which the IE app is installed.");
    }

    #[test]
    fn test_scenario_phrasal_split() {
        let out = rewrite(
            IssueKind::LongSentence,
            "This section provides information on how to transfer an IE app from the IE Hub to the IEM catalog of one or more IEM instances.",
        );
        assert_eq!(out.rule.as_deref(), Some("split_phrasal"));
        assert_eq!(
            out.text,
            "This section provides information. It explains how to transfer an IE app from the IE Hub to the IEM catalog of one or more IEM instances."
        );
    }

    #[test]
    fn test_wordy_phrase_substitution() {
        let out = rewrite(IssueKind::Style, "Restart the service in order to apply the change.");
        assert_eq!(out.text, "Restart the service to apply the change.");

        let out = rewrite(IssueKind::Style, "Please note that the backup runs nightly.");
        assert_eq!(out.text, "The backup runs nightly.");
    }

    #[test]
    fn test_terminology_and_consistency() {
        let out = rewrite(IssueKind::Terminology, "Send an e-mail to the admin.");
        assert_eq!(out.text, "Send an email to the admin.");

        let out = rewrite(IssueKind::Consistency, "Enter the user name, then confirm the username.");
        assert_eq!(out.text, "Enter the username, then confirm the username.");
    }

    #[test]
    fn test_no_match_returns_guidance() {
        let sentence = "The dashboard shows the current status.";
        let out = rewrite(IssueKind::LongSentence, sentence);
        assert!(!out.applied());
        assert_eq!(out.text, sentence);
        assert_eq!(out.explanation, guidance(IssueKind::LongSentence));
    }

    #[test]
    fn test_empty_sentence_unchanged() {
        let out = rewrite(IssueKind::Grammar, "   ");
        assert!(!out.applied());
        assert!(out.text.is_empty());
    }

    #[test]
    fn test_tidy() {
        assert_eq!(tidy("the  file , now", "The file now."), "The file, now.");
        assert_eq!(tidy(", and more", "x"), "And more");
    }
}
