//! Hybrid retrieval over the current knowledge index snapshot.
//!
//! Lexical (BM25) and semantic (cosine) candidates are collected
//! independently, each min-max normalized to `[0, 1]`, and fused:
//!
//! ```text
//! fused = α · semantic + (1 − α) · lexical
//! ```
//!
//! When only one channel produced candidates the other gets zero weight, so
//! a lexical-only index still ranks by its lexical score. Results are
//! ordered by fused score descending, then `ingested_at` descending, then
//! chunk ID ascending, which makes ranking fully deterministic.
//!
//! [`HybridRetriever::retrieve`] never fails: an unbuilt or empty index, a
//! slow embedder, or a blown deadline all produce an empty list. Callers
//! that want the reason use [`HybridRetriever::search`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::RetrievalCache;
use crate::config::RetrievalConfig;
use crate::embedding::{embed_query, EmbeddingProvider};
use crate::error::StageError;
use crate::index::IndexHandle;
use crate::models::{DocumentType, KnowledgeChunk, RetrievalResult};

pub const MIN_TOP_K: usize = 3;
pub const MAX_TOP_K: usize = 6;

/// Optional metadata constraints. A default value matches every chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrievalFilters {
    /// Chunks of this type or of [`DocumentType::General`] pass.
    pub document_type: Option<DocumentType>,
    /// Case-insensitive substring of the chunk's section title.
    pub section: Option<String>,
    /// Every listed tag must be present.
    pub tags: Vec<String>,
}

impl RetrievalFilters {
    pub fn with_document_type(mut self, document_type: DocumentType) -> Self {
        self.document_type = Some(document_type);
        self
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn matches(&self, chunk: &KnowledgeChunk) -> bool {
        if let Some(dt) = self.document_type {
            if chunk.document_type != dt && chunk.document_type != DocumentType::General {
                return false;
            }
        }
        if let Some(ref section) = self.section {
            if !chunk
                .section_title
                .to_lowercase()
                .contains(&section.to_lowercase())
            {
                return false;
            }
        }
        self.tags.iter().all(|t| chunk.tags.iter().any(|ct| ct == t))
    }

    /// Stable string form used in cache keys.
    pub fn signature(&self) -> String {
        let mut tags = self.tags.clone();
        tags.sort();
        format!(
            "{}|{}|{}",
            self.document_type.map(|d| d.as_str()).unwrap_or("*"),
            self.section.as_deref().unwrap_or("*").to_lowercase(),
            tags.join(",")
        )
    }
}

pub struct HybridRetriever {
    index: Arc<IndexHandle>,
    embedder: Arc<dyn EmbeddingProvider>,
    alpha: f64,
    candidate_k: usize,
    timeout: Duration,
    cache: RetrievalCache,
}

impl HybridRetriever {
    pub fn new(
        index: Arc<IndexHandle>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            index,
            embedder,
            alpha: config.hybrid_alpha,
            candidate_k: config.candidate_k.max(1),
            timeout: Duration::from_millis(config.timeout_ms),
            cache: RetrievalCache::from_config(config),
        }
    }

    /// Ranked chunks for `query`, or an empty list on any failure.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        filters: &RetrievalFilters,
    ) -> Vec<RetrievalResult> {
        match self.search(query, top_k, filters).await {
            Ok(results) => results,
            Err(e) => {
                tracing::debug!(error = %e, "retrieval returned no results");
                Vec::new()
            }
        }
    }

    /// Like [`retrieve`](Self::retrieve) but reports why nothing came back.
    /// The whole call is bounded by the configured retrieval timeout.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        filters: &RetrievalFilters,
    ) -> Result<Vec<RetrievalResult>, StageError> {
        let start = Instant::now();
        match tokio::time::timeout(self.timeout, self.search_inner(query, top_k, filters)).await {
            Ok(result) => {
                if let Ok(ref hits) = result {
                    tracing::debug!(
                        results = hits.len(),
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "retrieval complete"
                    );
                }
                result
            }
            Err(_) => {
                tracing::warn!(timeout_ms = self.timeout.as_millis() as u64, "retrieval timed out");
                Err(StageError::RetrievalUnavailable(format!(
                    "retrieval timed out after {}ms",
                    self.timeout.as_millis()
                )))
            }
        }
    }

    async fn search_inner(
        &self,
        query: &str,
        top_k: usize,
        filters: &RetrievalFilters,
    ) -> Result<Vec<RetrievalResult>, StageError> {
        let snapshot = self.index.snapshot();
        if snapshot.generation() == 0 {
            return Err(StageError::ConfigurationMissing(
                "knowledge index was never built".to_string(),
            ));
        }
        if snapshot.is_empty() {
            return Err(StageError::RetrievalUnavailable(
                "knowledge index is empty".to_string(),
            ));
        }
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let top_k = top_k.clamp(MIN_TOP_K, MAX_TOP_K);
        let key = RetrievalCache::key(snapshot.generation(), top_k, &filters.signature(), query);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit.as_ref().clone());
        }

        let keep = |c: &KnowledgeChunk| filters.matches(c);

        let mut lexical = snapshot.lexical_scores(query, keep);
        sort_candidates(&mut lexical);
        lexical.truncate(self.candidate_k);

        let mut semantic = if snapshot.has_embeddings() {
            match embed_query(self.embedder.as_ref(), query).await {
                Ok(vec) => snapshot
                    .semantic_scores(&vec, keep)
                    .into_iter()
                    .filter(|(_, s)| *s > 0.0)
                    .collect(),
                Err(e) => {
                    tracing::debug!(error = %e, "query embedding failed, lexical only");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };
        sort_candidates(&mut semantic);
        semantic.truncate(self.candidate_k);

        let alpha = match (lexical.is_empty(), semantic.is_empty()) {
            (_, true) => 0.0,
            (true, false) => 1.0,
            (false, false) => self.alpha,
        };

        let lex_map: HashMap<usize, f64> = normalize_scores(&lexical).into_iter().collect();
        let sem_map: HashMap<usize, f64> = normalize_scores(&semantic).into_iter().collect();

        let mut positions: Vec<usize> = lex_map.keys().chain(sem_map.keys()).copied().collect();
        positions.sort_unstable();
        positions.dedup();

        let mut results: Vec<RetrievalResult> = positions
            .into_iter()
            .filter_map(|pos| {
                let chunk = snapshot.chunk(pos)?;
                let l = lex_map.get(&pos).copied().unwrap_or(0.0);
                let s = sem_map.get(&pos).copied().unwrap_or(0.0);
                Some(RetrievalResult {
                    chunk: Arc::clone(chunk),
                    semantic_score: s,
                    lexical_score: l,
                    fused_score: (alpha * s + (1.0 - alpha) * l).clamp(0.0, 1.0),
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.fused_score
                .partial_cmp(&a.fused_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.chunk.ingested_at.cmp(&a.chunk.ingested_at))
                .then(a.chunk.id.cmp(&b.chunk.id))
        });
        results.truncate(top_k);

        self.cache.insert(key, Arc::new(results.clone()));
        Ok(results)
    }
}

fn sort_candidates(candidates: &mut [(usize, f64)]) {
    candidates.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
}

/// Min-max normalize raw scores to `[0, 1]`. A single candidate, or a set
/// of equal scores, normalizes to 1.0.
fn normalize_scores(candidates: &[(usize, f64)]) -> Vec<(usize, f64)> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let s_min = candidates.iter().map(|c| c.1).fold(f64::INFINITY, f64::min);
    let s_max = candidates
        .iter()
        .map(|c| c.1)
        .fold(f64::NEG_INFINITY, f64::max);

    candidates
        .iter()
        .map(|&(pos, raw)| {
            let norm = if (s_max - s_min).abs() < f64::EPSILON {
                1.0
            } else {
                (raw - s_min) / (s_max - s_min)
            };
            (pos, norm)
        })
        .collect()
}
