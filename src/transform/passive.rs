//! Passive → active rewrites.
//!
//! Three rules, in priority order:
//!
//! 1. **Requirement fragment.** A verbless list item after a requirement
//!    lead-in ("The following requirement must be met:") is really an
//!    object of "have": `"You must have access to ..."`.
//! 2. **By-agent.** `"<S> was <V-ed> by <A> <tail>"` → `"<A> <V-past> <S> <tail>"`.
//! 3. **Generic subject.** No agent: the subject comes from
//!    [`SubjectPolicy`], "you" in instructional context and
//!    "the system" otherwise.

use crate::config::TransformConfig;
use crate::detect::{passive_matches, PassiveMatch};
use crate::lexicon::{
    is_one_of, BE_FORMS, FINITE_MARKERS, IMPERATIVE_VERBS, MODALS, PREPOSITIONS, PRONOUN_CASES,
    RELATIVE_MARKERS, SUBJECT_PRONOUNS,
};
use crate::models::{DocumentType, Issue};
use crate::text::{capitalize_first, lowercase_first, normalized_words, word_spans};

use super::verbs::{base_form, past_tense, third_person};
use super::RuleContext;

/// Chooses the replacement subject for agentless passives.
#[derive(Debug, Clone)]
pub struct SubjectPolicy {
    pub default_subject: String,
    pub second_person_subject: String,
    pub instructional_markers: Vec<String>,
    pub prefer_second_person: bool,
}

impl Default for SubjectPolicy {
    fn default() -> Self {
        Self::from_config(&TransformConfig::default())
    }
}

impl SubjectPolicy {
    pub fn from_config(config: &TransformConfig) -> Self {
        Self {
            default_subject: config.default_subject.trim().to_string(),
            second_person_subject: config.second_person_subject.trim().to_string(),
            instructional_markers: config
                .instructional_markers
                .iter()
                .map(|m| m.to_lowercase())
                .collect(),
            prefer_second_person: config.prefer_second_person,
        }
    }

    fn has_marker(&self, sentence: &str) -> bool {
        normalized_words(sentence)
            .iter()
            .any(|w| self.instructional_markers.iter().any(|m| m == w))
    }

    /// Second-person context: forced by config, an instructional document,
    /// or a neighbouring sentence that is imperative, addresses the reader,
    /// or carries an instructional marker.
    pub fn is_instructional(&self, issue: &Issue, document_type: DocumentType) -> bool {
        if self.prefer_second_person || document_type == DocumentType::Instructional {
            return true;
        }
        issue.adjacent_context.sentences().any(|s| {
            let words = normalized_words(s);
            let imperative = words
                .first()
                .is_some_and(|w| IMPERATIVE_VERBS.contains(&w.as_str()));
            let addresses_reader = words.iter().any(|w| w == "you" || w == "your");
            imperative || addresses_reader || self.has_marker(s) || s.trim_end().ends_with(':')
        })
    }

    pub fn subject_for(&self, issue: &Issue, document_type: DocumentType) -> &str {
        if self.is_instructional(issue, document_type) {
            &self.second_person_subject
        } else {
            &self.default_subject
        }
    }

    /// The previous sentence introduces a list of requirements.
    fn is_requirement_lead_in(&self, issue: &Issue) -> bool {
        issue
            .adjacent_context
            .previous_sentence
            .as_deref()
            .is_some_and(|prev| prev.trim_end().ends_with(':') || self.has_marker(prev))
    }
}

pub(super) fn requirement_fragment(sentence: &str, ctx: &RuleContext<'_>) -> Option<String> {
    if !ctx.policy.is_requirement_lead_in(ctx.issue) {
        return None;
    }
    let words = word_spans(sentence);
    let relative = words
        .iter()
        .position(|(_, w)| is_one_of(w, RELATIVE_MARKERS))
        .unwrap_or(words.len());
    let head = &words[..relative];
    let first = head.first()?.1;
    if is_one_of(first, SUBJECT_PRONOUNS) || is_one_of(first, IMPERATIVE_VERBS) {
        return None;
    }
    if head
        .iter()
        .any(|(_, w)| is_one_of(w, FINITE_MARKERS) || is_one_of(w, BE_FORMS))
    {
        return None;
    }
    Some(format!(
        "{} must have {}",
        capitalize_first(&ctx.policy.second_person_subject),
        lowercase_first(sentence.trim())
    ))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum VerbShape {
    Modal(String),
    Perfect(String),
    Present,
    Past,
}

/// The clause around one passive match: subject text, verb shape, and the
/// byte offset where the active verb phrase would begin.
struct PassiveClause<'s> {
    subject: &'s str,
    shape: VerbShape,
    participle: &'s str,
    participle_end: usize,
}

fn clause<'s>(sentence: &'s str, words: &[(usize, &'s str)], m: PassiveMatch) -> Option<PassiveClause<'s>> {
    let be = words[m.be].1.to_lowercase();
    let previous = m.be.checked_sub(1).map(|i| words[i].1.to_lowercase());
    let (shape, verb_start) = match (be.as_str(), previous.as_deref()) {
        ("be", Some(modal)) if MODALS.contains(&modal) => (VerbShape::Modal(modal.to_string()), m.be - 1),
        ("been", Some(aux @ ("has" | "have" | "had"))) => (VerbShape::Perfect(aux.to_string()), m.be - 1),
        ("is" | "are" | "am", _) => (VerbShape::Present, m.be),
        ("was" | "were", _) => (VerbShape::Past, m.be),
        _ => return None,
    };
    let subject = sentence[..words[verb_start].0].trim();
    let subject_words = word_spans(subject);
    if subject_words.is_empty() || subject_words.len() > 10 {
        return None;
    }
    if subject_words
        .iter()
        .any(|(_, w)| is_one_of(w, RELATIVE_MARKERS))
    {
        return None;
    }
    // Mid-sentence clauses ("After X, the file is saved") are left alone.
    if subject.contains(',') {
        return None;
    }
    let (p_start, participle) = words[m.participle];
    Some(PassiveClause {
        subject,
        shape,
        participle,
        participle_end: p_start + participle.len(),
    })
}

fn is_plural(noun_phrase: &str) -> bool {
    let lower = noun_phrase.to_lowercase();
    let words = normalized_words(&lower);
    let Some(last) = words.last() else {
        return false;
    };
    if words.len() == 1 && matches!(last.as_str(), "i" | "we" | "they" | "you") {
        return true;
    }
    if words.iter().any(|w| w == "and") {
        return true;
    }
    last.ends_with('s') && !last.ends_with("ss") && !last.ends_with("us") && !last.ends_with("is")
}

fn conjugate(shape: &VerbShape, participle: &str, plural_subject: bool) -> String {
    let base = base_form(participle);
    match shape {
        VerbShape::Modal(modal) => format!("{} {}", modal, base),
        VerbShape::Perfect(aux) if aux == "had" => format!("had {}", participle.to_lowercase()),
        VerbShape::Perfect(_) => format!(
            "{} {}",
            if plural_subject { "have" } else { "has" },
            participle.to_lowercase()
        ),
        VerbShape::Present if plural_subject => base,
        VerbShape::Present => third_person(&base),
        VerbShape::Past => past_tense(participle),
    }
}

/// Subject pronoun → object pronoun; other noun phrases get a lowercase
/// first letter unless they start with a proper noun or acronym.
fn as_object(subject: &str) -> String {
    let lower = subject.to_lowercase();
    PRONOUN_CASES
        .iter()
        .find(|(subj, _)| *subj == lower)
        .map(|(_, obj)| obj.to_string())
        .unwrap_or_else(|| lowercase_first(subject))
}

/// Object pronoun → subject pronoun (`"by them"` → `"they"`).
fn as_subject(agent: &str) -> String {
    let lower = agent.to_lowercase();
    PRONOUN_CASES
        .iter()
        .find(|(_, obj)| *obj == lower)
        .map(|(subj, _)| subj.to_string())
        .unwrap_or_else(|| agent.to_string())
}

const AGENT_STOPS: &[&str] = &[
    "and", "or", "but", "when", "if", "because", "before", "after", "so", "while", "unless",
];

pub(super) fn by_agent(sentence: &str, _ctx: &RuleContext<'_>) -> Option<String> {
    let words = word_spans(sentence);
    for m in passive_matches(sentence) {
        let Some(by) = (m.participle + 1..words.len()).find(|&i| words[i].1.eq_ignore_ascii_case("by")) else {
            continue;
        };
        let Some(c) = clause(sentence, &words, m) else {
            continue;
        };

        let agent_start = words.get(by + 1)?.0;
        let mut agent_end_idx = by + 1;
        for i in by + 1..words.len() {
            let (start, w) = words[i];
            let gap = &sentence[words[i - 1].0 + words[i - 1].1.len()..start];
            let stops = i > by + 1
                && (gap.contains([',', ';', ':'])
                    || (is_one_of(w, PREPOSITIONS) && !w.eq_ignore_ascii_case("of"))
                    || is_one_of(w, RELATIVE_MARKERS)
                    || is_one_of(w, AGENT_STOPS));
            if stops {
                break;
            }
            agent_end_idx = i;
        }
        let agent_end = words[agent_end_idx].0 + words[agent_end_idx].1.len();
        let agent = as_subject(&sentence[agent_start..agent_end]);
        let middle = sentence[c.participle_end..words[by].0].trim();
        let tail = &sentence[agent_end..];

        let verb = conjugate(&c.shape, c.participle, is_plural(&agent));
        let mut out = format!("{} {} {}", capitalize_first(&agent), verb, as_object(c.subject));
        if !middle.is_empty() {
            out.push(' ');
            out.push_str(middle);
        }
        out.push_str(tail);
        return Some(out);
    }
    None
}

pub(super) fn generic_subject(sentence: &str, ctx: &RuleContext<'_>) -> Option<String> {
    let words = word_spans(sentence);
    let m = passive_matches(sentence).into_iter().next()?;
    let has_agent = (m.participle + 1..words.len()).any(|i| words[i].1.eq_ignore_ascii_case("by"));
    if has_agent {
        return None;
    }
    let c = clause(sentence, &words, m)?;
    let subject = ctx.policy.subject_for(ctx.issue, ctx.document_type);
    let verb = conjugate(&c.shape, c.participle, is_plural(subject));
    let rest = &sentence[c.participle_end..];
    Some(format!(
        "{} {} {}{}",
        capitalize_first(subject),
        verb,
        as_object(c.subject),
        rest
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AdjacentContext, IssueKind};

    fn ctx_for<'a>(issue: &'a Issue, policy: &'a SubjectPolicy, dt: DocumentType) -> RuleContext<'a> {
        RuleContext {
            issue,
            policy,
            document_type: dt,
        }
    }

    fn issue(sentence: &str, prev: Option<&str>, next: Option<&str>) -> Issue {
        Issue::whole_sentence(IssueKind::PassiveVoice, sentence).with_context(AdjacentContext::new(prev, next))
    }

    #[test]
    fn test_requirement_fragment() {
        let s = "Access to the IED on which the IE app is installed.";
        let i = issue(s, Some("The following requirement must be met:"), None);
        let policy = SubjectPolicy::default();
        let out = requirement_fragment(s, &ctx_for(&i, &policy, DocumentType::General));
        assert_eq!(
            out.as_deref(),
            Some("You must have access to the IED on which the IE app is installed.")
        );
    }

    #[test]
    fn test_requirement_fragment_needs_lead_in() {
        let s = "Access to the IED on which the IE app is installed.";
        let i = issue(s, Some("The app is popular."), None);
        let policy = SubjectPolicy::default();
        assert!(requirement_fragment(s, &ctx_for(&i, &policy, DocumentType::General)).is_none());
    }

    #[test]
    fn test_by_agent_past_and_present() {
        let policy = SubjectPolicy::default();
        let s = "The report was written by the team.";
        let i = issue(s, None, None);
        assert_eq!(
            by_agent(s, &ctx_for(&i, &policy, DocumentType::General)).as_deref(),
            Some("The team wrote the report.")
        );

        let s = "The file is validated by the server before upload.";
        let i = issue(s, None, None);
        assert_eq!(
            by_agent(s, &ctx_for(&i, &policy, DocumentType::General)).as_deref(),
            Some("The server validates the file before upload.")
        );
    }

    #[test]
    fn test_by_agent_modal_and_pronoun() {
        let policy = SubjectPolicy::default();
        let s = "The data must be reviewed by them.";
        let i = issue(s, None, None);
        assert_eq!(
            by_agent(s, &ctx_for(&i, &policy, DocumentType::General)).as_deref(),
            Some("They must review the data.")
        );
    }

    #[test]
    fn test_generic_subject_by_context() {
        let policy = SubjectPolicy::default();
        let s = "The IE app is installed on the IED.";

        let plain = issue(s, Some("The IED hosts several apps."), None);
        assert_eq!(
            generic_subject(s, &ctx_for(&plain, &policy, DocumentType::General)).as_deref(),
            Some("The system installs the IE app on the IED.")
        );

        let instructional = issue(s, Some("Open the IEM portal."), None);
        assert_eq!(
            generic_subject(s, &ctx_for(&instructional, &policy, DocumentType::General)).as_deref(),
            Some("You install the IE app on the IED.")
        );
    }

    #[test]
    fn test_generic_subject_modal() {
        let policy = SubjectPolicy::default();
        let s = "The configuration must be saved before restart.";
        let i = issue(s, None, None);
        assert_eq!(
            generic_subject(s, &ctx_for(&i, &policy, DocumentType::Instructional)).as_deref(),
            Some("You must save the configuration before restart.")
        );
    }

    #[test]
    fn test_generic_subject_bails_on_relative_clause() {
        let policy = SubjectPolicy::default();
        let s = "Access to the IED on which the IE app is installed.";
        let i = issue(s, None, None);
        assert!(generic_subject(s, &ctx_for(&i, &policy, DocumentType::General)).is_none());
    }

    #[test]
    fn test_prefer_second_person() {
        let policy = SubjectPolicy {
            prefer_second_person: true,
            ..SubjectPolicy::default()
        };
        let i = issue("Logs are stored daily.", None, None);
        assert_eq!(policy.subject_for(&i, DocumentType::Business), "you");
    }
}
