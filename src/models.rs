//! Core data models used throughout Prose Harness.
//!
//! These types represent the reference chunks, detected issues, requests,
//! and suggestion results that flow through the ingestion and suggestion
//! pipeline. Everything except [`KnowledgeChunk`] lives for a single
//! suggestion request.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::bail;
use serde::{Deserialize, Serialize};

use crate::text::word_count;

/// Category of a detected writing-quality problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    PassiveVoice,
    LongSentence,
    Adverb,
    VagueTerm,
    Terminology,
    Consistency,
    Grammar,
    Style,
}

impl IssueKind {
    pub const ALL: [IssueKind; 8] = [
        IssueKind::PassiveVoice,
        IssueKind::LongSentence,
        IssueKind::Adverb,
        IssueKind::VagueTerm,
        IssueKind::Terminology,
        IssueKind::Consistency,
        IssueKind::Grammar,
        IssueKind::Style,
    ];

    /// Stable kebab-case identifier, also used as a chunk tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::PassiveVoice => "passive-voice",
            IssueKind::LongSentence => "long-sentence",
            IssueKind::Adverb => "adverb",
            IssueKind::VagueTerm => "vague-term",
            IssueKind::Terminology => "terminology",
            IssueKind::Consistency => "consistency",
            IssueKind::Grammar => "grammar",
            IssueKind::Style => "style",
        }
    }

    /// Human-readable label for prompts and CLI output.
    pub fn label(&self) -> &'static str {
        match self {
            IssueKind::PassiveVoice => "passive voice",
            IssueKind::LongSentence => "long sentence",
            IssueKind::Adverb => "weak or misplaced adverb",
            IssueKind::VagueTerm => "vague term",
            IssueKind::Terminology => "non-preferred terminology",
            IssueKind::Consistency => "inconsistent term usage",
            IssueKind::Grammar => "grammar",
            IssueKind::Style => "wordy style",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let normalized = s.trim().to_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "passive-voice" | "passive" => Ok(IssueKind::PassiveVoice),
            "long-sentence" | "long" => Ok(IssueKind::LongSentence),
            "adverb" | "adverbs" => Ok(IssueKind::Adverb),
            "vague-term" | "vague" => Ok(IssueKind::VagueTerm),
            "terminology" => Ok(IssueKind::Terminology),
            "consistency" => Ok(IssueKind::Consistency),
            "grammar" => Ok(IssueKind::Grammar),
            "style" => Ok(IssueKind::Style),
            other => bail!(
                "Unknown issue kind: '{}'. Use one of: passive-voice, long-sentence, adverb, \
                 vague-term, terminology, consistency, grammar, style",
                other
            ),
        }
    }
}

/// Byte offsets of the flagged text within [`Issue::sentence_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Request-scoped neighbouring sentences of a flagged sentence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacentContext {
    pub previous_sentence: Option<String>,
    pub next_sentence: Option<String>,
}

impl AdjacentContext {
    pub fn new(previous: Option<&str>, next: Option<&str>) -> Self {
        let clean = |s: Option<&str>| {
            s.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            previous_sentence: clean(previous),
            next_sentence: clean(next),
        }
    }

    /// Build the context for `sentences[index]` from an already-split list.
    pub fn from_sentences(sentences: &[String], index: usize) -> Self {
        let previous = index
            .checked_sub(1)
            .and_then(|i| sentences.get(i))
            .map(String::as_str);
        let next = sentences.get(index + 1).map(String::as_str);
        Self::new(previous, next)
    }

    /// Present neighbours, previous first.
    pub fn sentences(&self) -> impl Iterator<Item = &str> {
        self.previous_sentence
            .iter()
            .chain(self.next_sentence.iter())
            .map(String::as_str)
    }
}

/// A detected, localized writing-quality problem in a sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub sentence_text: String,
    pub span: Span,
    pub matched_text: String,
    #[serde(default)]
    pub adjacent_context: AdjacentContext,
}

impl Issue {
    pub fn new(kind: IssueKind, sentence: &str, start: usize, end: usize) -> Self {
        let end = end.min(sentence.len());
        let start = start.min(end);
        Self {
            kind,
            sentence_text: sentence.to_string(),
            span: Span { start, end },
            matched_text: sentence.get(start..end).unwrap_or_default().to_string(),
            adjacent_context: AdjacentContext::default(),
        }
    }

    /// An issue covering the whole sentence, as supplied by a caller that
    /// only knows the label.
    pub fn whole_sentence(kind: IssueKind, sentence: &str) -> Self {
        Self::new(kind, sentence, 0, sentence.len())
    }

    pub fn with_context(mut self, context: AdjacentContext) -> Self {
        self.adjacent_context = context;
        self
    }
}

/// Kind of document the flagged sentence belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentType {
    #[default]
    General,
    Technical,
    Instructional,
    Academic,
    Business,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::General => "general",
            DocumentType::Technical => "technical",
            DocumentType::Instructional => "instructional",
            DocumentType::Academic => "academic",
            DocumentType::Business => "business",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "general" => Ok(DocumentType::General),
            "technical" | "tech" => Ok(DocumentType::Technical),
            "instructional" | "manual" | "howto" => Ok(DocumentType::Instructional),
            "academic" => Ok(DocumentType::Academic),
            "business" => Ok(DocumentType::Business),
            other => bail!(
                "Unknown document type: '{}'. Use general, technical, instructional, academic, or business.",
                other
            ),
        }
    }
}

/// What the author is optimizing for; passed through to the prompt.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum WritingGoal {
    Clarity,
    Conciseness,
    Formality,
    Consistency,
}

impl WritingGoal {
    pub fn as_str(&self) -> &'static str {
        match self {
            WritingGoal::Clarity => "clarity",
            WritingGoal::Conciseness => "conciseness",
            WritingGoal::Formality => "formality",
            WritingGoal::Consistency => "consistency",
        }
    }
}

/// One user action asking for a rewrite of one flagged sentence.
#[derive(Debug, Clone)]
pub struct SuggestionRequest {
    pub issue: Issue,
    pub document_type: DocumentType,
    pub writing_goals: BTreeSet<WritingGoal>,
    /// Full text of the document being edited, used for broader retrieval.
    pub document_content: String,
}

impl SuggestionRequest {
    pub fn new(issue: Issue) -> Self {
        Self {
            issue,
            document_type: DocumentType::default(),
            writing_goals: BTreeSet::new(),
            document_content: String::new(),
        }
    }

    pub fn with_document_type(mut self, document_type: DocumentType) -> Self {
        self.document_type = document_type;
        self
    }

    pub fn with_goals(mut self, goals: impl IntoIterator<Item = WritingGoal>) -> Self {
        self.writing_goals.extend(goals);
        self
    }

    pub fn with_document_content(mut self, content: impl Into<String>) -> Self {
        self.document_content = content.into();
        self
    }

    pub fn sentence(&self) -> &str {
        &self.issue.sentence_text
    }
}

/// Reference document supplied for ingestion (style guide, glossary, ...).
#[derive(Debug, Clone)]
pub struct ReferenceDocument {
    pub source_id: String,
    pub title: Option<String>,
    pub body: String,
    pub document_type: DocumentType,
    pub tags: Vec<String>,
    /// Unix seconds; used as the recency tie-breaker in retrieval.
    pub updated_at: i64,
}

impl ReferenceDocument {
    pub fn new(source_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            title: None,
            body: body.into(),
            document_type: DocumentType::General,
            tags: Vec::new(),
            updated_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// A bounded, metadata-tagged span of reference text. Immutable once indexed.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeChunk {
    pub id: String,
    pub source_id: String,
    pub section_title: String,
    pub chunk_index: i64,
    pub text: String,
    pub token_count: usize,
    /// Empty when the chunk was indexed without an embedding (lexical only).
    pub embedding: Vec<f32>,
    pub tags: Vec<String>,
    pub document_type: DocumentType,
    pub content_hash: String,
    pub ingested_at: i64,
}

impl KnowledgeChunk {
    /// Label used when citing the chunk in prompts and source lists.
    pub fn citation(&self) -> String {
        if self.section_title.is_empty() {
            self.source_id.clone()
        } else {
            format!("{} › {}", self.source_id, self.section_title)
        }
    }
}

/// One ranked retrieval hit. All scores are in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub chunk: Arc<KnowledgeChunk>,
    pub semantic_score: f64,
    pub lexical_score: f64,
    pub fused_score: f64,
}

/// Outcome of ingesting one reference document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub chunks_created: usize,
    pub chunks_skipped: usize,
}

impl std::ops::AddAssign for IngestReport {
    fn add_assign(&mut self, other: Self) {
        self.chunks_created += other.chunks_created;
        self.chunks_skipped += other.chunks_skipped;
    }
}

/// Confidence that a suggestion is an improvement. Ordered low → high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cascade stage that produced a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Method {
    DocumentSearch,
    ContextRetrieval,
    GenerativeRewrite,
    DeterministicFallback,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::DocumentSearch => "DOCUMENT_SEARCH",
            Method::ContextRetrieval => "CONTEXT_RETRIEVAL",
            Method::GenerativeRewrite => "GENERATIVE_REWRITE",
            Method::DeterministicFallback => "DETERMINISTIC_FALLBACK",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Word limit for a rewrite: the original's word count plus a fixed slack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordBudget {
    original_words: usize,
    slack: usize,
}

impl WordBudget {
    pub fn new(original: &str, slack: usize) -> Self {
        Self {
            original_words: word_count(original),
            slack,
        }
    }

    pub fn limit(&self) -> usize {
        self.original_words + self.slack
    }

    pub fn allows(&self, text: &str) -> bool {
        word_count(text) <= self.limit()
    }
}

/// Why a candidate suggestion could not become a [`SuggestionResult`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SuggestionRejected {
    #[error("suggestion is empty")]
    Empty,
    #[error("suggestion is a serialized structure")]
    Structured,
    #[error("suggestion has {words} words, budget is {limit}")]
    OverBudget { words: usize, limit: usize },
}

/// The structured suggestion returned to the rendering layer.
///
/// Fields are private: the only constructors check that `suggestion` is a
/// non-empty plain sentence within the [`WordBudget`], so every value of
/// this type satisfies those properties.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestionResult {
    suggestion: String,
    explanation: String,
    confidence: Confidence,
    method: Method,
    sources: Vec<String>,
    success: bool,
}

impl SuggestionResult {
    pub fn try_new(
        suggestion: &str,
        explanation: &str,
        confidence: Confidence,
        method: Method,
        sources: Vec<String>,
        budget: &WordBudget,
    ) -> Result<Self, SuggestionRejected> {
        let suggestion = suggestion.split_whitespace().collect::<Vec<_>>().join(" ");
        if suggestion.is_empty() {
            return Err(SuggestionRejected::Empty);
        }
        if looks_structured(&suggestion) {
            return Err(SuggestionRejected::Structured);
        }
        if !budget.allows(&suggestion) {
            return Err(SuggestionRejected::OverBudget {
                words: word_count(&suggestion),
                limit: budget.limit(),
            });
        }
        Ok(Self {
            suggestion,
            explanation: explanation.trim().to_string(),
            confidence,
            method,
            sources,
            success: true,
        })
    }

    /// "No change, with guidance text": the original sentence (or a
    /// placeholder when it is blank) and an unsuccessful flag.
    pub fn unchanged(original: &str, guidance: &str, method: Method) -> Self {
        let original = original.split_whitespace().collect::<Vec<_>>().join(" ");
        let suggestion = if original.is_empty() || looks_structured(&original) {
            NO_SENTENCE_PLACEHOLDER.to_string()
        } else {
            original
        };
        Self {
            suggestion,
            explanation: guidance.trim().to_string(),
            confidence: Confidence::Low,
            method,
            sources: Vec::new(),
            success: false,
        }
    }

    pub fn suggestion(&self) -> &str {
        &self.suggestion
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn confidence(&self) -> Confidence {
        self.confidence
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn success(&self) -> bool {
        self.success
    }
}

/// Returned instead of an empty suggestion when the caller sent no text.
pub const NO_SENTENCE_PLACEHOLDER: &str = "No sentence was provided.";

/// Heuristic check for a map or list that leaked into a string field.
pub fn looks_structured(text: &str) -> bool {
    let t = text.trim();
    let wrapped = (t.starts_with('{') && t.ends_with('}')) || (t.starts_with('[') && t.ends_with(']'));
    if wrapped {
        return true;
    }
    let lower = t.to_lowercase();
    ["\"suggestion\"", "'suggestion'", "\"explanation\"", "'explanation'"]
        .iter()
        .any(|key| lower.contains(key) && lower.contains(':'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_kind_roundtrip_str() {
        for kind in IssueKind::ALL {
            assert_eq!(kind.as_str().parse::<IssueKind>().unwrap(), kind);
        }
        assert_eq!("Passive_Voice".parse::<IssueKind>().unwrap(), IssueKind::PassiveVoice);
        assert!("nonsense".parse::<IssueKind>().is_err());
    }

    #[test]
    fn test_confidence_ordering() {
        assert!(Confidence::High > Confidence::Medium);
        assert!(Confidence::Medium > Confidence::Low);
    }

    #[test]
    fn test_adjacent_context_from_sentences() {
        let sentences: Vec<String> = ["One.", "Two.", "Three."].iter().map(|s| s.to_string()).collect();
        let first = AdjacentContext::from_sentences(&sentences, 0);
        assert_eq!(first.previous_sentence, None);
        assert_eq!(first.next_sentence.as_deref(), Some("Two."));
        let middle = AdjacentContext::from_sentences(&sentences, 1);
        assert_eq!(middle.previous_sentence.as_deref(), Some("One."));
        assert_eq!(middle.next_sentence.as_deref(), Some("Three."));
    }

    #[test]
    fn test_issue_span_clamped() {
        let issue = Issue::new(IssueKind::Style, "Short.", 2, 100);
        assert_eq!(issue.span.end, 6);
        assert_eq!(issue.matched_text, "ort.");
    }

    #[test]
    fn test_suggestion_rejects_empty_and_structured() {
        let budget = WordBudget::new("A short sentence here.", 6);
        assert_eq!(
            SuggestionResult::try_new("   ", "", Confidence::High, Method::GenerativeRewrite, vec![], &budget),
            Err(SuggestionRejected::Empty)
        );
        assert_eq!(
            SuggestionResult::try_new(
                "{\"suggestion\": \"x\"}",
                "",
                Confidence::High,
                Method::GenerativeRewrite,
                vec![],
                &budget
            ),
            Err(SuggestionRejected::Structured)
        );
    }

    #[test]
    fn test_suggestion_rejects_over_budget() {
        let budget = WordBudget::new("One two three.", 5);
        assert_eq!(budget.limit(), 8);
        let long = "one two three four five six seven eight nine.";
        let err = SuggestionResult::try_new(long, "", Confidence::High, Method::GenerativeRewrite, vec![], &budget)
            .unwrap_err();
        assert_eq!(err, SuggestionRejected::OverBudget { words: 9, limit: 8 });
    }

    #[test]
    fn test_unchanged_never_empty() {
        let result = SuggestionResult::unchanged("  ", "guidance", Method::DeterministicFallback);
        assert_eq!(result.suggestion(), NO_SENTENCE_PLACEHOLDER);
        assert!(!result.success());
        assert_eq!(result.confidence(), Confidence::Low);
    }

    #[test]
    fn test_method_serializes_screaming_snake() {
        let json = serde_json::to_string(&Method::DeterministicFallback).unwrap();
        assert_eq!(json, "\"DETERMINISTIC_FALLBACK\"");
    }
}
