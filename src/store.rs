//! Knowledge chunk persistence.
//!
//! The in-memory [`KnowledgeIndex`](crate::index::KnowledgeIndex) is always
//! rebuilt from a [`ChunkStore`]; the store itself is only read at startup
//! and appended to by ingestion.

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, vec_to_blob};
use crate::models::{DocumentType, KnowledgeChunk};

#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Every persisted chunk, oldest first.
    async fn load_chunks(&self) -> Result<Vec<KnowledgeChunk>>;

    /// Persist chunks, ignoring any whose content hash is already stored.
    /// Returns the number actually written.
    async fn insert_chunks(&self, chunks: &[KnowledgeChunk]) -> Result<usize>;
}

/// SQLite-backed store over the `knowledge_chunks` table.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChunkStore for SqliteStore {
    async fn load_chunks(&self) -> Result<Vec<KnowledgeChunk>> {
        let rows = sqlx::query(
            "SELECT id, source_id, section_title, chunk_index, text, token_count, document_type, \
             content_hash, tags_json, embedding, ingested_at \
             FROM knowledge_chunks ORDER BY ingested_at ASC, source_id ASC, chunk_index ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let chunks = rows
            .iter()
            .map(|row| {
                let tags_json: String = row.get("tags_json");
                let document_type: String = row.get("document_type");
                let embedding: Option<Vec<u8>> = row.get("embedding");
                let token_count: i64 = row.get("token_count");
                KnowledgeChunk {
                    id: row.get("id"),
                    source_id: row.get("source_id"),
                    section_title: row.get("section_title"),
                    chunk_index: row.get("chunk_index"),
                    text: row.get("text"),
                    token_count: token_count.max(0) as usize,
                    embedding: embedding.as_deref().map(blob_to_vec).unwrap_or_default(),
                    tags: serde_json::from_str(&tags_json).unwrap_or_default(),
                    document_type: document_type.parse().unwrap_or(DocumentType::General),
                    content_hash: row.get("content_hash"),
                    ingested_at: row.get("ingested_at"),
                }
            })
            .collect();
        Ok(chunks)
    }

    async fn insert_chunks(&self, chunks: &[KnowledgeChunk]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0usize;

        for chunk in chunks {
            let embedding = (!chunk.embedding.is_empty()).then(|| vec_to_blob(&chunk.embedding));
            let result = sqlx::query(
                r#"
                INSERT INTO knowledge_chunks
                    (id, source_id, section_title, chunk_index, text, token_count, document_type,
                     content_hash, tags_json, embedding, ingested_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(content_hash) DO NOTHING
                "#,
            )
            .bind(&chunk.id)
            .bind(&chunk.source_id)
            .bind(&chunk.section_title)
            .bind(chunk.chunk_index)
            .bind(&chunk.text)
            .bind(chunk.token_count as i64)
            .bind(chunk.document_type.as_str())
            .bind(&chunk.content_hash)
            .bind(serde_json::to_string(&chunk.tags)?)
            .bind(embedding)
            .bind(chunk.ingested_at)
            .execute(&mut *tx)
            .await?;
            written += result.rows_affected() as usize;
        }

        tx.commit().await?;
        Ok(written)
    }
}

/// Store for tests and library embedding without a database.
#[derive(Default)]
pub struct InMemoryStore {
    chunks: Mutex<Vec<KnowledgeChunk>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChunkStore for InMemoryStore {
    async fn load_chunks(&self) -> Result<Vec<KnowledgeChunk>> {
        let guard = self.chunks.lock().unwrap_or_else(|p| p.into_inner());
        Ok(guard.clone())
    }

    async fn insert_chunks(&self, chunks: &[KnowledgeChunk]) -> Result<usize> {
        let mut guard = self.chunks.lock().unwrap_or_else(|p| p.into_inner());
        let mut written = 0;
        for chunk in chunks {
            if guard.iter().any(|c| c.content_hash == chunk.content_hash) {
                continue;
            }
            guard.push(chunk.clone());
            written += 1;
        }
        Ok(written)
    }
}
