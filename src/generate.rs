use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::GenerationConfig;
use crate::error::StageError;
use crate::llm::{InferenceClient, InferenceRequest};
use crate::models::{RetrievalResult, SuggestionRequest, WordBudget};
use crate::prompt::build_prompt;
use crate::transform::TransformOutcome;

/// Builds the prompt for a request and makes one inference call.
pub struct GenerativeRewriter {
    client: Arc<dyn InferenceClient>,
    model: String,
    timeout: Duration,
    temperature: f32,
    max_chunks: usize,
}

impl GenerativeRewriter {
    pub fn new(client: Arc<dyn InferenceClient>, config: &GenerationConfig) -> Self {
        Self {
            client,
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            temperature: config.temperature,
            max_chunks: config.max_chunks,
        }
    }

    /// Raw model text, or the typed failure of the single attempt.
    pub async fn generate(
        &self,
        request: &SuggestionRequest,
        chunks: &[RetrievalResult],
        budget: &WordBudget,
        grounding: Option<&TransformOutcome>,
    ) -> Result<String, StageError> {
        let prompt = build_prompt(request, chunks, self.max_chunks, budget.limit(), grounding);
        let inference = InferenceRequest {
            prompt,
            model: self.model.clone(),
            timeout: self.timeout,
            temperature: self.temperature,
        };

        let started = Instant::now();
        // Bounded here as well, so no client can stall the cascade
        let result = match tokio::time::timeout(self.timeout, self.client.complete(&inference)).await {
            Ok(result) => result,
            Err(_) => Err(StageError::GenerationTimeout(self.timeout)),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(text) => tracing::debug!(
                client = self.client.name(),
                chunks = chunks.len().min(self.max_chunks),
                elapsed_ms,
                chars = text.len(),
                "generation returned"
            ),
            Err(e) => tracing::warn!(client = self.client.name(), elapsed_ms, error = %e, "generation failed"),
        }
        result
    }
}
