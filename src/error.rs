//! Error types for doc-courier.

use std::time::Duration;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl ConfigError {
    /// One-line remedy printed at startup.
    pub fn hint(&self) -> String {
        match self {
            Self::MissingEnvVar(var) => format!("export {var}=..."),
            Self::InvalidValue { key, .. } => format!("fix or unset {key} and try again"),
        }
    }
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Provider {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Provider {provider} rejected the request: {reason}")]
    InvalidRequest { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

impl LlmError {
    /// Whether a retry of the same request could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RequestFailed { .. } | Self::RateLimited { .. } | Self::Timeout { .. }
        )
    }
}

/// Document store / user directory errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Document search failed: {reason}")]
    SearchFailed { reason: String },

    #[error("User lookup failed for {identity}: {reason}")]
    LookupFailed { identity: String, reason: String },
}

/// Pipeline-related errors.
///
/// Malformed model output never shows up here; only collaborator failures do.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{stage} failed: {source}")]
    Llm {
        stage: &'static str,
        #[source]
        source: LlmError,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl PipelineError {
    /// Attach the failing stage name to an LLM error.
    pub fn llm(stage: &'static str) -> impl FnOnce(LlmError) -> Self {
        move |source| Self::Llm { stage, source }
    }
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        let failed = LlmError::RequestFailed {
            provider: "anthropic".into(),
            reason: "connection reset".into(),
        };
        let auth = LlmError::AuthFailed {
            provider: "anthropic".into(),
        };
        let timeout = LlmError::Timeout {
            provider: "anthropic".into(),
            timeout: Duration::from_secs(1),
        };
        let rejected = LlmError::InvalidRequest {
            provider: "anthropic".into(),
            reason: "HTTP 404".into(),
        };
        assert!(failed.is_retryable());
        assert!(timeout.is_retryable());
        assert!(!auth.is_retryable());
        assert!(!rejected.is_retryable());
    }

    #[test]
    fn config_hint_names_the_variable() {
        let missing = ConfigError::MissingEnvVar("OPENAI_API_KEY".into());
        assert_eq!(missing.hint(), "export OPENAI_API_KEY=...");

        let invalid = ConfigError::InvalidValue {
            key: "PORT".into(),
            message: "invalid digit found in string".into(),
        };
        assert!(invalid.hint().contains("PORT"));
        assert!(!invalid.hint().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn pipeline_error_names_stage() {
        let err = PipelineError::llm("Security Check")(LlmError::AuthFailed {
            provider: "openai".into(),
        });
        assert_eq!(
            err.to_string(),
            "Security Check failed: Authentication failed for provider openai"
        );
    }
}
