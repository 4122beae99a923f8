//! In-memory knowledge index snapshots.
//!
//! A [`KnowledgeIndex`] is immutable once built: it owns the chunks, their
//! term statistics for BM25 lexical scoring, and their embedding vectors.
//! Re-ingestion never mutates a live index; it builds a successor with
//! [`KnowledgeIndex::with_additional`] and publishes it through
//! [`IndexHandle::swap`], so a request that already holds a snapshot keeps
//! reading a consistent index for its whole lifetime.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use crate::chunk::embedding_text;
use crate::embedding::cosine_similarity;
use crate::models::KnowledgeChunk;
use crate::text::tokenize;

const BM25_K1: f64 = 1.2;
const BM25_B: f64 = 0.75;

#[derive(Debug, Default)]
pub struct KnowledgeIndex {
    chunks: Vec<Arc<KnowledgeChunk>>,
    term_freqs: Vec<HashMap<String, u32>>,
    doc_lens: Vec<usize>,
    doc_freq: HashMap<String, usize>,
    avg_len: f64,
    hashes: HashSet<String>,
    generation: u64,
}

impl KnowledgeIndex {
    /// The index before anything was ever loaded. Generation 0.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot. Chunks whose content hash was already seen are dropped.
    pub fn build(chunks: Vec<Arc<KnowledgeChunk>>, generation: u64) -> Self {
        let mut index = Self {
            generation,
            ..Self::default()
        };
        for chunk in chunks {
            if !index.hashes.insert(chunk.content_hash.clone()) {
                continue;
            }
            let tokens = tokenize(&embedding_text(&chunk));
            let mut tf: HashMap<String, u32> = HashMap::new();
            for tok in tokens.iter() {
                *tf.entry(tok.clone()).or_default() += 1;
            }
            for term in tf.keys() {
                *index.doc_freq.entry(term.clone()).or_default() += 1;
            }
            index.doc_lens.push(tokens.len());
            index.term_freqs.push(tf);
            index.chunks.push(chunk);
        }
        let total: usize = index.doc_lens.iter().sum();
        index.avg_len = if index.chunks.is_empty() {
            0.0
        } else {
            total as f64 / index.chunks.len() as f64
        };
        index
    }

    /// A successor snapshot holding this index's chunks plus `new`.
    pub fn with_additional(&self, new: Vec<KnowledgeChunk>) -> Self {
        let mut all = self.chunks.clone();
        all.extend(new.into_iter().map(Arc::new));
        Self::build(all, self.generation + 1)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[Arc<KnowledgeChunk>] {
        &self.chunks
    }

    pub fn chunk(&self, position: usize) -> Option<&Arc<KnowledgeChunk>> {
        self.chunks.get(position)
    }

    pub fn contains_hash(&self, hash: &str) -> bool {
        self.hashes.contains(hash)
    }

    /// True when at least one chunk carries an embedding vector.
    pub fn has_embeddings(&self) -> bool {
        self.chunks.iter().any(|c| !c.embedding.is_empty())
    }

    /// Raw BM25 scores `(position, score)` for chunks sharing at least one
    /// query term and accepted by `keep`. Unsorted.
    pub fn lexical_scores<F>(&self, query: &str, keep: F) -> Vec<(usize, f64)>
    where
        F: Fn(&KnowledgeChunk) -> bool,
    {
        let mut terms = tokenize(query);
        terms.sort();
        terms.dedup();
        if terms.is_empty() || self.chunks.is_empty() {
            return Vec::new();
        }

        let n = self.chunks.len() as f64;
        let avg_len = self.avg_len.max(1.0);
        let mut scores = Vec::new();

        for (pos, chunk) in self.chunks.iter().enumerate() {
            if !keep(chunk) {
                continue;
            }
            let tf = &self.term_freqs[pos];
            let len = self.doc_lens[pos] as f64;
            let mut score = 0.0;
            for term in &terms {
                let Some(&freq) = tf.get(term) else {
                    continue;
                };
                let df = self.doc_freq.get(term).copied().unwrap_or(0) as f64;
                let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
                let freq = freq as f64;
                score += idf * (freq * (BM25_K1 + 1.0))
                    / (freq + BM25_K1 * (1.0 - BM25_B + BM25_B * len / avg_len));
            }
            if score > 0.0 {
                scores.push((pos, score));
            }
        }
        scores
    }

    /// Cosine similarity `(position, score)` for every embedded chunk of the
    /// query's dimensionality accepted by `keep`. Unsorted.
    pub fn semantic_scores<F>(&self, query_vec: &[f32], keep: F) -> Vec<(usize, f64)>
    where
        F: Fn(&KnowledgeChunk) -> bool,
    {
        if query_vec.is_empty() {
            return Vec::new();
        }
        self.chunks
            .iter()
            .enumerate()
            .filter(|(_, c)| c.embedding.len() == query_vec.len() && keep(c))
            .map(|(pos, c)| (pos, cosine_similarity(query_vec, &c.embedding) as f64))
            .collect()
    }
}

/// Shared pointer to the current snapshot.
///
/// Readers clone the inner `Arc` and release the lock immediately; a swap
/// replaces the pointer in one write.
#[derive(Debug)]
pub struct IndexHandle {
    current: RwLock<Arc<KnowledgeIndex>>,
}

impl IndexHandle {
    pub fn new(index: KnowledgeIndex) -> Self {
        Self {
            current: RwLock::new(Arc::new(index)),
        }
    }

    pub fn snapshot(&self) -> Arc<KnowledgeIndex> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    pub fn swap(&self, next: KnowledgeIndex) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(next);
    }
}

impl Default for IndexHandle {
    fn default() -> Self {
        Self::new(KnowledgeIndex::empty())
    }
}
