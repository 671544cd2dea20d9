//! Configuration types.
//!
//! Everything comes from environment variables; only the API key for the
//! selected backend is required.

use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig, RetryConfig};
use crate::pipeline::PipelineConfig;

/// Default HTTP port when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 8000;

/// Service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Port the HTTP server binds on all interfaces.
    pub port: u16,
    pub llm: LlmConfig,
    pub pipeline: PipelineConfig,
}

impl ServiceConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = match get("DOC_COURIER_LLM_BACKEND").as_deref() {
            None | Some("anthropic") => LlmBackend::Anthropic,
            Some("openai") => LlmBackend::OpenAi,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "DOC_COURIER_LLM_BACKEND".into(),
                    message: format!("expected 'anthropic' or 'openai', got '{other}'"),
                });
            }
        };

        let key_var = backend.api_key_var();
        let api_key = get(key_var).ok_or_else(|| ConfigError::MissingEnvVar(key_var.into()))?;

        let model =
            get("DOC_COURIER_MODEL").unwrap_or_else(|| backend.default_model().to_string());
        let port = parse_or(&get, "PORT", DEFAULT_PORT)?;

        let defaults = PipelineConfig::default();
        let pipeline = PipelineConfig {
            max_tokens: parse_or(&get, "DOC_COURIER_MAX_TOKENS", defaults.max_tokens)?,
            reply_max_tokens: parse_or(
                &get,
                "DOC_COURIER_REPLY_MAX_TOKENS",
                defaults.reply_max_tokens,
            )?,
            enforce_clearance: parse_or(
                &get,
                "DOC_COURIER_ENFORCE_CLEARANCE",
                defaults.enforce_clearance,
            )?,
        };

        let retry_defaults = RetryConfig::default();
        let timeout_secs = parse_or(
            &get,
            "DOC_COURIER_LLM_TIMEOUT_SECS",
            retry_defaults.timeout.as_secs(),
        )?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "DOC_COURIER_LLM_TIMEOUT_SECS".into(),
                message: "must be at least 1 second".into(),
            });
        }
        let retry = RetryConfig {
            timeout: Duration::from_secs(timeout_secs),
            max_retries: parse_or(
                &get,
                "DOC_COURIER_LLM_MAX_RETRIES",
                retry_defaults.max_retries,
            )?,
            ..retry_defaults
        };

        Ok(Self {
            port,
            llm: LlmConfig {
                backend,
                api_key: secrecy::SecretString::from(api_key),
                model,
                retry,
            },
            pipeline,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}
