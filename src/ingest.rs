//! Knowledge ingestion.
//!
//! `document → chunk → dedup → embed → persist → snapshot swap`.
//!
//! Ingestion runs under a write lock so two ingestions never build
//! successors of the same snapshot; retrieval is never blocked by it and
//! only ever sees the old snapshot or the complete new one. Embedding
//! failures are non-fatal: the affected chunks are indexed without vectors
//! and remain reachable through lexical search.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Mutex;

use crate::chunk::{chunk_document, embedding_text};
use crate::config::{ChunkingConfig, EmbeddingConfig};
use crate::embedding::EmbeddingProvider;
use crate::index::IndexHandle;
use crate::models::{IngestReport, KnowledgeChunk, ReferenceDocument};
use crate::store::ChunkStore;

pub struct Ingestor {
    store: Arc<dyn ChunkStore>,
    index: Arc<IndexHandle>,
    embedder: Arc<dyn EmbeddingProvider>,
    chunking: ChunkingConfig,
    batch_size: usize,
    write_lock: Mutex<()>,
}

impl Ingestor {
    pub fn new(
        store: Arc<dyn ChunkStore>,
        index: Arc<IndexHandle>,
        embedder: Arc<dyn EmbeddingProvider>,
        chunking: ChunkingConfig,
        embedding: &EmbeddingConfig,
    ) -> Self {
        Self {
            store,
            index,
            embedder,
            chunking,
            batch_size: embedding.batch_size.max(1),
            write_lock: Mutex::new(()),
        }
    }

    /// Ingest one document. Chunks whose content is already indexed are
    /// counted as skipped.
    pub async fn ingest(&self, document: &ReferenceDocument) -> Result<IngestReport> {
        let _guard = self.write_lock.lock().await;

        let chunks = chunk_document(document, &self.chunking);
        if chunks.is_empty() {
            return Ok(IngestReport::default());
        }

        let snapshot = self.index.snapshot();
        let mut seen = HashSet::new();
        let total = chunks.len();
        let mut fresh: Vec<KnowledgeChunk> = chunks
            .into_iter()
            .filter(|c| !snapshot.contains_hash(&c.content_hash) && seen.insert(c.content_hash.clone()))
            .collect();
        let mut report = IngestReport {
            chunks_created: 0,
            chunks_skipped: total - fresh.len(),
        };
        if fresh.is_empty() {
            tracing::info!(source = %document.source_id, skipped = report.chunks_skipped, "document already indexed");
            return Ok(report);
        }

        self.embed(&mut fresh).await;

        let written = self.store.insert_chunks(&fresh).await?;
        report.chunks_created = fresh.len();
        if written < fresh.len() {
            tracing::debug!(written, chunks = fresh.len(), "store already held some chunks");
        }

        self.index.swap(snapshot.with_additional(fresh));
        tracing::info!(
            source = %document.source_id,
            created = report.chunks_created,
            skipped = report.chunks_skipped,
            generation = snapshot.generation() + 1,
            "document ingested"
        );
        Ok(report)
    }

    pub async fn ingest_all(&self, documents: &[ReferenceDocument]) -> Result<IngestReport> {
        let mut total = IngestReport::default();
        for doc in documents {
            total += self.ingest(doc).await?;
        }
        Ok(total)
    }

    /// Attach vectors in batches. A failed batch leaves its chunks lexical-only.
    async fn embed(&self, chunks: &mut [KnowledgeChunk]) {
        if self.embedder.dims() == 0 {
            return;
        }
        for batch in chunks.chunks_mut(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(embedding_text).collect();
            match self.embedder.embed(&texts).await {
                Ok(vectors) if vectors.len() == batch.len() => {
                    for (chunk, vector) in batch.iter_mut().zip(vectors) {
                        chunk.embedding = vector;
                    }
                }
                Ok(vectors) => tracing::warn!(
                    expected = batch.len(),
                    got = vectors.len(),
                    "embedding batch size mismatch, indexing lexical-only"
                ),
                Err(e) => tracing::warn!(
                    model = self.embedder.model_name(),
                    error = %e,
                    "embedding failed, indexing lexical-only"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{DisabledEmbedder, HashEmbedder};
    use crate::index::KnowledgeIndex;
    use crate::models::DocumentType;
    use crate::store::InMemoryStore;

    const GUIDE: &str = "# Voice\n\nPrefer the active voice in procedures. Passive sentences hide who acts.\n\n\
        # Length\n\nKeep sentences under twenty-five words. Split long sentences at conjunctions.\n";

    fn chunking() -> ChunkingConfig {
        ChunkingConfig {
            min_sentences: 1,
            max_sentences: 8,
            min_tokens: 1,
            max_tokens: 400,
        }
    }

    fn ingestor(embedder: Arc<dyn EmbeddingProvider>) -> (Ingestor, Arc<IndexHandle>, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let index = Arc::new(IndexHandle::new(KnowledgeIndex::build(Vec::new(), 1)));
        let ingestor = Ingestor::new(
            store.clone(),
            index.clone(),
            embedder,
            chunking(),
            &EmbeddingConfig::default(),
        );
        (ingestor, index, store)
    }

    #[tokio::test]
    async fn test_reingest_is_idempotent() {
        let (ingestor, index, store) = ingestor(Arc::new(HashEmbedder::new(64)));
        let mut doc = ReferenceDocument::new("guide.md", GUIDE);
        doc.document_type = DocumentType::Technical;

        let first = ingestor.ingest(&doc).await.unwrap();
        assert!(first.chunks_created >= 2);
        assert_eq!(first.chunks_skipped, 0);
        let generation = index.snapshot().generation();

        let second = ingestor.ingest(&doc).await.unwrap();
        assert_eq!(second.chunks_created, 0);
        assert_eq!(second.chunks_skipped, first.chunks_created);
        assert_eq!(index.snapshot().len(), first.chunks_created);
        assert_eq!(index.snapshot().generation(), generation, "no-op ingest must not swap");
        assert_eq!(store.load_chunks().await.unwrap().len(), first.chunks_created);
        assert!(index.snapshot().chunks().iter().all(|c| c.embedding.len() == 64));
    }

    #[tokio::test]
    async fn test_disabled_embedder_indexes_lexical_only() {
        let (ingestor, index, _) = ingestor(Arc::new(DisabledEmbedder));
        let report = ingestor.ingest(&ReferenceDocument::new("g.md", GUIDE)).await.unwrap();
        assert!(report.chunks_created > 0);
        assert!(!index.snapshot().has_embeddings());
    }

    #[tokio::test]
    async fn test_empty_document_reports_nothing() {
        let (ingestor, index, _) = ingestor(Arc::new(DisabledEmbedder));
        let report = ingestor.ingest(&ReferenceDocument::new("empty.md", "   ")).await.unwrap();
        assert_eq!(report, IngestReport::default());
        assert_eq!(index.snapshot().generation(), 1);
    }
}
