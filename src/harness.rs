//! Top-level wiring: one [`ProseHarness`] owns the index, the ingestor and
//! the cascade, and is what the CLI and library callers talk to.

use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::detect::scan_text;
use crate::embedding::create_embedder;
use crate::generate::GenerativeRewriter;
use crate::index::{IndexHandle, KnowledgeIndex};
use crate::ingest::Ingestor;
use crate::llm::{create_client, InferenceClient};
use crate::models::{IngestReport, Issue, ReferenceDocument, RetrievalResult, SuggestionRequest, SuggestionResult};
use crate::orchestrator::{CascadeReport, Orchestrator};
use crate::retrieve::{HybridRetriever, RetrievalFilters};
use crate::store::{ChunkStore, InMemoryStore, SqliteStore};
use crate::transform::{SubjectPolicy, Transformer};
use crate::{db, migrate};

pub struct ProseHarness {
    index: Arc<IndexHandle>,
    retriever: Arc<HybridRetriever>,
    ingestor: Ingestor,
    orchestrator: Orchestrator,
}

impl ProseHarness {
    /// Load every stored chunk into the first index snapshot.
    pub async fn new(config: &Config, store: Arc<dyn ChunkStore>, client: Arc<dyn InferenceClient>) -> Result<Self> {
        let chunks = store.load_chunks().await?;
        let loaded = chunks.len();
        let index = KnowledgeIndex::build(chunks.into_iter().map(Arc::new).collect(), 1);
        tracing::debug!(chunks = loaded, indexed = index.len(), "knowledge index loaded");
        Self::assemble(config, store, client, index)
    }

    /// SQLite-backed harness at `[db] path`, schema created if needed.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply(&pool).await?;
        let client = create_client(&config.generation)?;
        Self::new(config, Arc::new(SqliteStore::new(pool)), client).await
    }

    /// Harness over an empty in-memory store.
    pub async fn in_memory(config: &Config, client: Arc<dyn InferenceClient>) -> Result<Self> {
        Self::new(config, Arc::new(InMemoryStore::new()), client).await
    }

    /// Harness whose index was never built: retrieval reports
    /// `ConfigurationMissing` until something is ingested.
    pub fn offline(config: &Config, client: Arc<dyn InferenceClient>) -> Result<Self> {
        Self::assemble(config, Arc::new(InMemoryStore::new()), client, KnowledgeIndex::empty())
    }

    fn assemble(
        config: &Config,
        store: Arc<dyn ChunkStore>,
        client: Arc<dyn InferenceClient>,
        index: KnowledgeIndex,
    ) -> Result<Self> {
        let index = Arc::new(IndexHandle::new(index));
        let embedder = create_embedder(&config.embedding)?;
        let retriever = Arc::new(HybridRetriever::new(
            Arc::clone(&index),
            Arc::clone(&embedder),
            &config.retrieval,
        ));
        let ingestor = Ingestor::new(
            store,
            Arc::clone(&index),
            embedder,
            config.chunking.clone(),
            &config.embedding,
        );
        let rewriter = Arc::new(GenerativeRewriter::new(client, &config.generation));
        let transformer = Transformer::new(SubjectPolicy::from_config(&config.transform));
        let orchestrator = Orchestrator::new(Arc::clone(&retriever), rewriter, transformer, config);
        Ok(Self {
            index,
            retriever,
            ingestor,
            orchestrator,
        })
    }

    pub async fn ingest(&self, document: &ReferenceDocument) -> Result<IngestReport> {
        self.ingestor.ingest(document).await
    }

    pub async fn ingest_all(&self, documents: &[ReferenceDocument]) -> Result<IngestReport> {
        self.ingestor.ingest_all(documents).await
    }

    /// Detect issues in free text, each with its neighbouring sentences.
    pub fn check(&self, text: &str) -> Vec<Issue> {
        scan_text(text)
    }

    pub async fn retrieve(&self, query: &str, top_k: usize, filters: &RetrievalFilters) -> Vec<RetrievalResult> {
        self.retriever.retrieve(query, top_k, filters).await
    }

    pub async fn suggest(&self, request: &SuggestionRequest) -> SuggestionResult {
        self.orchestrator.suggest(request).await
    }

    pub async fn run(&self, request: &SuggestionRequest) -> CascadeReport {
        self.orchestrator.run(request).await
    }

    pub fn index(&self) -> Arc<KnowledgeIndex> {
        self.index.snapshot()
    }
}
