//! Local inference service client.
//!
//! The contract is deliberately small: a prompt, a model identifier and a
//! timeout go in; generated text or an explicit timeout/unreachable signal
//! comes out. Exactly one HTTP attempt is made per call.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::config::GenerationConfig;
use crate::error::StageError;

/// One completion request.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub prompt: String,
    pub model: String,
    pub timeout: Duration,
    pub temperature: f32,
}

#[async_trait]
pub trait InferenceClient: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, request: &InferenceRequest) -> Result<String, StageError>;
}

// ============ Ollama ============

/// Calls `POST {url}/api/generate` with `stream: false`.
pub struct OllamaClient {
    url: String,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(2))
            .build()?;
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl InferenceClient for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &InferenceRequest) -> Result<String, StageError> {
        let body = serde_json::json!({
            "model": request.model,
            "prompt": request.prompt,
            "stream": false,
            "options": { "temperature": request.temperature },
        });
        let endpoint = format!("{}/api/generate", self.url);

        let call = async {
            let response = self
                .client
                .post(&endpoint)
                .json(&body)
                .send()
                .await
                .map_err(|e| StageError::GenerationUnreachable(format!("{}: {}", endpoint, e)))?;
            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(StageError::GenerationUnreachable(format!(
                    "ollama returned {}: {}",
                    status, text
                )));
            }
            let json: serde_json::Value = response
                .json()
                .await
                .map_err(|e| StageError::MalformedGenerationOutput(e.to_string()))?;
            response_text(&json)
        };

        match tokio::time::timeout(request.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StageError::GenerationTimeout(request.timeout)),
        }
    }
}

/// The `response` field of an `/api/generate` reply. Anything but a string
/// means the service is not answering in the expected shape.
fn response_text(json: &serde_json::Value) -> Result<String, StageError> {
    match json.get("response") {
        Some(serde_json::Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(StageError::GenerationUnreachable(format!(
            "ollama response field is not text: {}",
            other
        ))),
        None => Err(StageError::MalformedGenerationOutput(
            "response field missing".to_string(),
        )),
    }
}

// ============ Disabled ============

/// Stands in when no generation service is configured.
pub struct DisabledClient;

#[async_trait]
impl InferenceClient for DisabledClient {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn complete(&self, _request: &InferenceRequest) -> Result<String, StageError> {
        Err(StageError::GenerationUnreachable(
            "generation is disabled (set [generation] provider)".to_string(),
        ))
    }
}

/// Select the client named by `[generation] provider`.
pub fn create_client(config: &GenerationConfig) -> Result<Arc<dyn InferenceClient>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledClient)),
        "ollama" => Ok(Arc::new(OllamaClient::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(timeout: Duration) -> InferenceRequest {
        InferenceRequest {
            prompt: "Rewrite this.".to_string(),
            model: "llama3.2".to_string(),
            timeout,
            temperature: 0.2,
        }
    }

    #[tokio::test]
    async fn test_disabled_client_is_unreachable() {
        let err = DisabledClient
            .complete(&request(Duration::from_secs(1)))
            .await
            .unwrap_err();
        assert!(err.is_service_failure());
    }

    #[tokio::test]
    async fn test_ollama_refused_connection_is_unreachable() {
        let config = GenerationConfig {
            provider: "ollama".to_string(),
            url: Some("http://127.0.0.1:9".to_string()),
            ..GenerationConfig::default()
        };
        let client = OllamaClient::new(&config).unwrap();
        let err = client.complete(&request(Duration::from_secs(5))).await.unwrap_err();
        assert!(
            matches!(err, StageError::GenerationUnreachable(_) | StageError::GenerationTimeout(_)),
            "unexpected error: {}",
            err
        );
    }

    #[test]
    fn test_response_text_requires_a_string() {
        let ok = serde_json::json!({ "response": "You must restart the service." });
        assert_eq!(response_text(&ok).unwrap(), "You must restart the service.");

        let nested = serde_json::json!({ "response": { "suggestion": "Restart it." } });
        let err = response_text(&nested).unwrap_err();
        assert!(err.is_service_failure());

        let missing = serde_json::json!({ "done": true });
        assert!(matches!(
            response_text(&missing),
            Err(StageError::MalformedGenerationOutput(_))
        ));
    }

    #[test]
    fn test_create_client_rejects_unknown() {
        let config = GenerationConfig {
            provider: "gpt-magic".to_string(),
            ..GenerationConfig::default()
        };
        assert!(create_client(&config).is_err());
        assert_eq!(create_client(&GenerationConfig::default()).unwrap().name(), "disabled");
    }
}
