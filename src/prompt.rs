//! Issue-specific prompt templates.

use std::fmt::Write;

use crate::models::{IssueKind, RetrievalResult, SuggestionRequest, WritingGoal};
use crate::transform::TransformOutcome;

/// Adjacent sentences embedded in a prompt.
const MAX_ADJACENT: usize = 2;

fn instruction(kind: IssueKind) -> &'static str {
    match kind {
        IssueKind::PassiveVoice => {
            "Rewrite the sentence in active voice. Name the actor as the subject. Keep any requirement wording such as \"must\"."
        }
        IssueKind::LongSentence => {
            "Split the sentence into two or more shorter, complete sentences. Keep every fact."
        }
        IssueKind::Adverb => {
            "Place the adverb directly before the word it limits, or remove it if it adds nothing."
        }
        IssueKind::VagueTerm => "Replace the vague wording with precise, concrete wording.",
        IssueKind::Terminology => "Replace the flagged term with the preferred term from the style guide.",
        IssueKind::Consistency => "Use a single spelling of the flagged term.",
        IssueKind::Grammar => "Correct the grammar error and change nothing else.",
        IssueKind::Style => "Make the sentence more concise and direct without changing its meaning.",
    }
}

fn goal_hint(goal: WritingGoal) -> &'static str {
    match goal {
        WritingGoal::Clarity => "prefer plain words",
        WritingGoal::Conciseness => "use as few words as possible",
        WritingGoal::Formality => "keep a formal register",
        WritingGoal::Consistency => "match the terminology of the guidance",
    }
}

/// Build the prompt for one request.
///
/// `chunks` are labelled `[n] (source: ...)` in the order given; at most
/// `max_chunks` are included. A successful deterministic rewrite is
/// offered as a starting point.
pub fn build_prompt(
    request: &SuggestionRequest,
    chunks: &[RetrievalResult],
    max_chunks: usize,
    word_limit: usize,
    grounding: Option<&TransformOutcome>,
) -> String {
    let issue = &request.issue;
    let mut p = String::with_capacity(1024);

    let _ = writeln!(
        p,
        "You are an editor for {} documentation. Fix one {} issue in one sentence.",
        request.document_type.as_str(),
        issue.kind.label()
    );
    let _ = writeln!(p, "{}", instruction(issue.kind));
    if !request.writing_goals.is_empty() {
        let goals: Vec<&str> = request.writing_goals.iter().map(|g| goal_hint(*g)).collect();
        let _ = writeln!(p, "Writing goals: {}.", goals.join("; "));
    }

    let adjacent: Vec<&str> = issue.adjacent_context.sentences().take(MAX_ADJACENT).collect();
    if !adjacent.is_empty() {
        p.push_str("\nSurrounding text:\n");
        if let Some(prev) = &issue.adjacent_context.previous_sentence {
            let _ = writeln!(p, "Before: {}", prev);
        }
        if let Some(next) = &issue.adjacent_context.next_sentence {
            let _ = writeln!(p, "After: {}", next);
        }
    }

    if !chunks.is_empty() && max_chunks > 0 {
        p.push_str("\nStyle guidance:\n");
        for (i, hit) in chunks.iter().take(max_chunks).enumerate() {
            let _ = writeln!(p, "[{}] (source: {}) {}", i + 1, hit.chunk.citation(), hit.chunk.text.trim());
        }
    }

    let _ = writeln!(p, "\nSentence: {}", issue.sentence_text.trim());
    if !issue.matched_text.is_empty() && issue.matched_text != issue.sentence_text {
        let _ = writeln!(p, "Flagged text: \"{}\"", issue.matched_text);
    }
    if let Some(outcome) = grounding.filter(|o| o.applied()) {
        let _ = writeln!(p, "A rule-based rewrite you may improve on: {}", outcome.text);
    }

    let _ = write!(
        p,
        "\nRespond with exactly two lines and nothing else:\n\
         IMPROVED_SENTENCE: <the rewritten sentence, at most {} words>\n\
         EXPLANATION: <one short sentence saying what changed>\n",
        word_limit
    );
    p
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::models::{AdjacentContext, Issue, KnowledgeChunk};

    fn hit(id: &str, text: &str) -> RetrievalResult {
        RetrievalResult {
            chunk: Arc::new(KnowledgeChunk {
                id: id.to_string(),
                source_id: "style-guide.md".to_string(),
                section_title: "Voice".to_string(),
                chunk_index: 0,
                text: text.to_string(),
                token_count: 10,
                embedding: Vec::new(),
                tags: Vec::new(),
                document_type: Default::default(),
                content_hash: id.to_string(),
                ingested_at: 0,
            }),
            semantic_score: 0.0,
            lexical_score: 1.0,
            fused_score: 1.0,
        }
    }

    #[test]
    fn test_prompt_lists_writing_goals() {
        let issue = Issue::whole_sentence(IssueKind::Adverb, "It runs very quickly.");
        let request = SuggestionRequest::new(issue)
            .with_goals([WritingGoal::Conciseness, WritingGoal::Clarity]);
        let p = build_prompt(&request, &[], 4, 10, None);
        assert!(p.contains("Writing goals: prefer plain words; use as few words as possible."));

        let plain = build_prompt(&SuggestionRequest::new(request.issue.clone()), &[], 4, 10, None);
        assert!(!plain.contains("Writing goals"));
    }

    #[test]
    fn test_prompt_contains_contract_and_context() {
        let issue = Issue::whole_sentence(IssueKind::PassiveVoice, "The file is saved.")
            .with_context(AdjacentContext::new(Some("Open the editor."), Some("Close it.")));
        let request = SuggestionRequest::new(issue);
        let p = build_prompt(&request, &[hit("a", "Prefer active voice.")], 4, 10, None);

        assert!(p.contains("active voice"));
        assert!(p.contains("Before: Open the editor."));
        assert!(p.contains("After: Close it."));
        assert!(p.contains("[1] (source: style-guide.md › Voice) Prefer active voice."));
        assert!(p.contains("IMPROVED_SENTENCE:"));
        assert!(p.contains("EXPLANATION:"));
        assert!(p.contains("at most 10 words"));
    }

    #[test]
    fn test_prompt_caps_chunks() {
        let request = SuggestionRequest::new(Issue::whole_sentence(IssueKind::Style, "Text here."));
        let hits: Vec<_> = (0..6).map(|i| hit(&i.to_string(), "Be brief.")).collect();
        let p = build_prompt(&request, &hits, 3, 8, None);
        assert!(p.contains("[3]"));
        assert!(!p.contains("[4]"));
    }
}
