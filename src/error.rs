//! Stage failure taxonomy.
//!
//! Every variant is non-fatal: the orchestrator logs it at the stage
//! boundary and advances the cascade. None of these ever reach the caller
//! of [`Orchestrator::suggest`](crate::orchestrator::Orchestrator::suggest).

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    /// The knowledge index is empty, unreachable, or returned nothing usable.
    #[error("retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error("generation timed out after {}ms", .0.as_millis())]
    GenerationTimeout(Duration),

    #[error("generation service unreachable: {0}")]
    GenerationUnreachable(String),

    /// The generated text failed validation.
    #[error("malformed generation output: {0}")]
    MalformedGenerationOutput(String),

    /// The knowledge index was never built.
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),
}

impl StageError {
    /// `ConfigurationMissing` is handled exactly like `RetrievalUnavailable`.
    pub fn is_retrieval(&self) -> bool {
        matches!(
            self,
            StageError::RetrievalUnavailable(_) | StageError::ConfigurationMissing(_)
        )
    }

    /// The inference service itself failed, rather than its output.
    pub fn is_service_failure(&self) -> bool {
        matches!(
            self,
            StageError::GenerationTimeout(_) | StageError::GenerationUnreachable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display_in_millis() {
        let e = StageError::GenerationTimeout(Duration::from_secs(12));
        assert_eq!(e.to_string(), "generation timed out after 12000ms");
    }

    #[test]
    fn test_configuration_missing_is_retrieval() {
        assert!(StageError::ConfigurationMissing("no index".into()).is_retrieval());
        assert!(StageError::RetrievalUnavailable("empty".into()).is_retrieval());
        assert!(!StageError::GenerationUnreachable("down".into()).is_retrieval());
    }

    #[test]
    fn test_service_failure_grouping() {
        assert!(StageError::GenerationUnreachable("refused".into()).is_service_failure());
        assert!(!StageError::MalformedGenerationOutput("junk".into()).is_service_failure());
    }
}
