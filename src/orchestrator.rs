//! Suggestion cascade.
//!
//! The orchestrator is an explicit state machine:
//!
//! ```text
//! DOCUMENT_SEARCH → CONTEXT_RETRIEVAL → GENERATIVE_REWRITE → DETERMINISTIC_FALLBACK → VALIDATED
//! ```
//!
//! Each stage returns a [`StageOutcome`]. A candidate result is accepted
//! when it is marked successful and its confidence meets the stage's
//! threshold; anything else is a modeled transition to the next state.
//! Stage failures are logged here and never reach the caller. The
//! deterministic stage has no threshold, so the machine always reaches
//! `VALIDATED` with a usable [`SuggestionResult`].

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::StageError;
use crate::generate::GenerativeRewriter;
use crate::models::{Confidence, DocumentType, Method, RetrievalResult, SuggestionRequest, SuggestionResult, WordBudget};
use crate::retrieve::{HybridRetriever, RetrievalFilters};
use crate::text::tokenize;
use crate::transform::{guidance, TransformOutcome, Transformer};
use crate::validate::Validator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeState {
    DocumentSearch,
    ContextRetrieval,
    GenerativeRewrite,
    DeterministicFallback,
    Validated,
}

impl CascadeState {
    pub fn for_method(method: Method) -> Self {
        match method {
            Method::DocumentSearch => CascadeState::DocumentSearch,
            Method::ContextRetrieval => CascadeState::ContextRetrieval,
            Method::GenerativeRewrite => CascadeState::GenerativeRewrite,
            Method::DeterministicFallback => CascadeState::DeterministicFallback,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CascadeState::DocumentSearch => "DOCUMENT_SEARCH",
            CascadeState::ContextRetrieval => "CONTEXT_RETRIEVAL",
            CascadeState::GenerativeRewrite => "GENERATIVE_REWRITE",
            CascadeState::DeterministicFallback => "DETERMINISTIC_FALLBACK",
            CascadeState::Validated => "VALIDATED",
        }
    }
}

impl fmt::Display for CascadeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a stage produced.
#[derive(Debug)]
pub enum StageOutcome {
    /// A validated result, still subject to the stage's threshold.
    Candidate(SuggestionResult),
    Advance(StageError),
}

/// Request-scoped state shared by the stages of one cascade run.
pub struct StageContext<'a> {
    pub request: &'a SuggestionRequest,
    pub budget: WordBudget,
    /// Deterministic rewrite, computed once and offered to every stage.
    pub grounding: TransformOutcome,
    /// Set after a service-level generation failure; later generative
    /// stages skip their call.
    pub generation_down: AtomicBool,
}

/// One cascade stage.
#[async_trait]
pub trait Stage: Send + Sync {
    fn method(&self) -> Method;

    /// `None` marks a terminal stage whose result is always accepted.
    fn min_confidence(&self) -> Option<Confidence>;

    async fn attempt(&self, ctx: &StageContext<'_>) -> StageOutcome;
}

/// Components the built-in stages share.
pub struct Pipeline {
    pub retriever: Arc<HybridRetriever>,
    pub rewriter: Arc<GenerativeRewriter>,
    pub validator: Validator,
    pub top_k: usize,
    pub max_chunks: usize,
}

impl Pipeline {
    /// Generate from `chunks` and validate the raw text.
    async fn generate(&self, ctx: &StageContext<'_>, chunks: &[RetrievalResult], method: Method) -> StageOutcome {
        if ctx.generation_down.load(Ordering::Relaxed) {
            return StageOutcome::Advance(StageError::GenerationUnreachable(
                "skipped after an earlier generation failure".to_string(),
            ));
        }
        let grounding = Some(&ctx.grounding);
        match self.rewriter.generate(ctx.request, chunks, &ctx.budget, grounding).await {
            Ok(raw) => {
                let sources = chunks
                    .iter()
                    .take(self.max_chunks)
                    .map(|r| r.chunk.id.clone())
                    .collect();
                match self.validator.normalize(&raw, ctx.request.sentence(), method, sources) {
                    Ok(result) => StageOutcome::Candidate(result),
                    Err(e) => StageOutcome::Advance(e),
                }
            }
            Err(e) => {
                if e.is_service_failure() {
                    ctx.generation_down.store(true, Ordering::Relaxed);
                }
                StageOutcome::Advance(e)
            }
        }
    }

    async fn retrieve(&self, query: &str, filters: &RetrievalFilters) -> Result<Vec<RetrievalResult>, StageError> {
        let hits = self.retriever.search(query, self.top_k, filters).await?;
        if hits.is_empty() {
            return Err(StageError::RetrievalUnavailable("no matching chunks".to_string()));
        }
        Ok(hits)
    }
}

/// Targeted search: the sentence plus the issue label, filtered to chunks
/// tagged with the issue kind.
pub struct DocumentSearchStage {
    pipeline: Arc<Pipeline>,
    threshold: Confidence,
}

#[async_trait]
impl Stage for DocumentSearchStage {
    fn method(&self) -> Method {
        Method::DocumentSearch
    }

    fn min_confidence(&self) -> Option<Confidence> {
        Some(self.threshold)
    }

    async fn attempt(&self, ctx: &StageContext<'_>) -> StageOutcome {
        let issue = &ctx.request.issue;
        let query = format!("{} {}", issue.sentence_text, issue.kind.label());
        let mut filters = RetrievalFilters::default().with_tag(issue.kind.as_str());
        if ctx.request.document_type != DocumentType::General {
            filters = filters.with_document_type(ctx.request.document_type);
        }
        match self.pipeline.retrieve(&query, &filters).await {
            Ok(hits) => self.pipeline.generate(ctx, &hits, self.method()).await,
            Err(e) => StageOutcome::Advance(e),
        }
    }
}

/// Broader search over the sentence, its neighbours and the document's
/// most frequent terms, without metadata filters.
pub struct ContextRetrievalStage {
    pipeline: Arc<Pipeline>,
    threshold: Confidence,
    document_terms: usize,
}

#[async_trait]
impl Stage for ContextRetrievalStage {
    fn method(&self) -> Method {
        Method::ContextRetrieval
    }

    fn min_confidence(&self) -> Option<Confidence> {
        Some(self.threshold)
    }

    async fn attempt(&self, ctx: &StageContext<'_>) -> StageOutcome {
        let query = context_query(ctx.request, self.document_terms);
        match self.pipeline.retrieve(&query, &RetrievalFilters::default()).await {
            Ok(hits) => self.pipeline.generate(ctx, &hits, self.method()).await,
            Err(e) => StageOutcome::Advance(e),
        }
    }
}

/// Generation from the sentence and its neighbours alone.
pub struct GenerativeStage {
    pipeline: Arc<Pipeline>,
    threshold: Confidence,
}

#[async_trait]
impl Stage for GenerativeStage {
    fn method(&self) -> Method {
        Method::GenerativeRewrite
    }

    fn min_confidence(&self) -> Option<Confidence> {
        Some(self.threshold)
    }

    async fn attempt(&self, ctx: &StageContext<'_>) -> StageOutcome {
        self.pipeline.generate(ctx, &[], self.method()).await
    }
}

/// The rule-based rewrite. Never advances.
pub struct DeterministicStage {
    validator: Validator,
}

impl DeterministicStage {
    pub fn new(validator: Validator) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl Stage for DeterministicStage {
    fn method(&self) -> Method {
        Method::DeterministicFallback
    }

    fn min_confidence(&self) -> Option<Confidence> {
        None
    }

    async fn attempt(&self, ctx: &StageContext<'_>) -> StageOutcome {
        StageOutcome::Candidate(self.validator.from_transform(&ctx.grounding, ctx.request.sentence()))
    }
}

fn context_query(request: &SuggestionRequest, document_terms: usize) -> String {
    let mut parts: Vec<&str> = vec![request.sentence()];
    parts.extend(request.issue.adjacent_context.sentences());

    let mut counts: HashMap<String, usize> = HashMap::new();
    for term in tokenize(&request.document_content) {
        *counts.entry(term).or_default() += 1;
    }
    let mut terms: Vec<(String, usize)> = counts.into_iter().collect();
    terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let top: Vec<String> = terms.into_iter().take(document_terms).map(|(t, _)| t).collect();

    let mut query = parts.join(" ");
    if !top.is_empty() {
        query.push(' ');
        query.push_str(&top.join(" "));
    }
    query
}

/// How one stage attempt ended.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Accepted,
    BelowThreshold(Confidence),
    Unsuccessful,
    Failed(StageError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageAttempt {
    pub state: CascadeState,
    pub outcome: AttemptOutcome,
    pub elapsed_ms: u64,
}

/// Final state, result, and the trail of attempts that led to it.
#[derive(Debug, Clone)]
pub struct CascadeReport {
    pub state: CascadeState,
    pub result: SuggestionResult,
    pub attempts: Vec<StageAttempt>,
}

pub struct Orchestrator {
    stages: Vec<Box<dyn Stage>>,
    transformer: Transformer,
    validator: Validator,
}

impl Orchestrator {
    /// The standard four-stage cascade.
    pub fn new(
        retriever: Arc<HybridRetriever>,
        rewriter: Arc<GenerativeRewriter>,
        transformer: Transformer,
        config: &Config,
    ) -> Self {
        let validator = Validator::new(config.generation.word_budget);
        let pipeline = Arc::new(Pipeline {
            retriever,
            rewriter,
            validator: validator.clone(),
            top_k: config.retrieval.effective_top_k(),
            max_chunks: config.generation.max_chunks,
        });
        let cascade = &config.cascade;
        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(DocumentSearchStage {
                pipeline: Arc::clone(&pipeline),
                threshold: cascade.document_search,
            }),
            Box::new(ContextRetrievalStage {
                pipeline: Arc::clone(&pipeline),
                threshold: cascade.context_retrieval,
                document_terms: config.retrieval.context_terms,
            }),
            Box::new(GenerativeStage {
                pipeline,
                threshold: cascade.generative_rewrite,
            }),
            Box::new(DeterministicStage::new(validator.clone())),
        ];
        Self::with_stages(stages, transformer, validator)
    }

    /// A cascade over arbitrary stages, tried in the given order.
    pub fn with_stages(stages: Vec<Box<dyn Stage>>, transformer: Transformer, validator: Validator) -> Self {
        Self {
            stages,
            transformer,
            validator,
        }
    }

    pub async fn suggest(&self, request: &SuggestionRequest) -> SuggestionResult {
        self.run(request).await.result
    }

    pub async fn run(&self, request: &SuggestionRequest) -> CascadeReport {
        let sentence = request.sentence();
        if sentence.trim().is_empty() {
            return CascadeReport {
                state: CascadeState::Validated,
                result: SuggestionResult::unchanged(sentence, guidance(request.issue.kind), Method::DeterministicFallback),
                attempts: Vec::new(),
            };
        }

        let ctx = StageContext {
            request,
            budget: self.validator.budget(sentence),
            grounding: self.transformer.rewrite(&request.issue, request.document_type),
            generation_down: AtomicBool::new(false),
        };

        let mut attempts = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            let state = CascadeState::for_method(stage.method());
            let started = Instant::now();
            tracing::debug!(stage = %state, kind = %request.issue.kind, "attempting stage");

            let outcome = stage.attempt(&ctx).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            let (result, outcome) = match outcome {
                StageOutcome::Candidate(result) => {
                    let accepted = match stage.min_confidence() {
                        None => true,
                        Some(min) => result.success() && result.confidence() >= min,
                    };
                    if accepted {
                        (Some(result), AttemptOutcome::Accepted)
                    } else if !result.success() {
                        (None, AttemptOutcome::Unsuccessful)
                    } else {
                        (None, AttemptOutcome::BelowThreshold(result.confidence()))
                    }
                }
                StageOutcome::Advance(e) => {
                    tracing::warn!(stage = %state, error = %e, elapsed_ms, "stage failed, advancing");
                    (None, AttemptOutcome::Failed(e))
                }
            };
            attempts.push(StageAttempt {
                state,
                outcome,
                elapsed_ms,
            });

            if let Some(result) = result {
                tracing::info!(
                    stage = %state,
                    method = %result.method(),
                    confidence = %result.confidence(),
                    success = result.success(),
                    elapsed_ms,
                    "suggestion accepted"
                );
                return CascadeReport {
                    state: CascadeState::Validated,
                    result,
                    attempts,
                };
            }
        }

        // Only reachable with a custom stage list lacking a terminal stage.
        let result = self.validator.from_transform(&ctx.grounding, sentence);
        CascadeReport {
            state: CascadeState::Validated,
            result,
            attempts,
        }
    }
}
