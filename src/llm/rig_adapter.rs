//! Bridges rig's `CompletionModel` to our `LlmProvider` trait.

use async_trait::async_trait;
use rig::completion::message::AssistantContent;
use rig::completion::{CompletionError, CompletionModel};
use rig::http_client;
use tracing::debug;

use crate::error::LlmError;
use crate::llm::provider::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider};

/// Adapter wrapping any rig completion model.
pub struct RigAdapter<M> {
    model: M,
    model_name: String,
}

impl<M> RigAdapter<M> {
    pub fn new(model: M, model_name: &str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
        }
    }
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let mut builder = self.model.completion_request(request.prompt());
        if let Some(preamble) = request.system_prompt() {
            builder = builder.preamble(preamble);
        }
        if let Some(temperature) = request.temperature {
            builder = builder.temperature(f64::from(temperature));
        }
        if let Some(max_tokens) = request.max_tokens {
            builder = builder.max_tokens(u64::from(max_tokens));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| map_completion_error(&self.model_name, e))?;

        let content = response
            .choice
            .iter()
            .filter_map(|c| match c {
                AssistantContent::Text(text) => Some(text.text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("");

        let input_tokens = u32::try_from(response.usage.input_tokens).unwrap_or(u32::MAX);
        let output_tokens = u32::try_from(response.usage.output_tokens).unwrap_or(u32::MAX);
        let finish_reason = finish_reason(request.max_tokens, output_tokens);
        debug!(
            model = %self.model_name,
            input_tokens,
            output_tokens,
            ?finish_reason,
            "Completion finished"
        );

        Ok(CompletionResponse {
            content,
            input_tokens,
            output_tokens,
            finish_reason,
        })
    }
}

/// rig does not surface the provider stop reason generically; a reply that
/// used the whole token budget is treated as cut off.
fn finish_reason(max_tokens: Option<u32>, output_tokens: u32) -> FinishReason {
    match max_tokens {
        Some(max) if output_tokens >= max => FinishReason::Length,
        _ => FinishReason::Stop,
    }
}

/// Classify a rig error so the retry layer only retries transient failures.
fn map_completion_error(provider: &str, error: CompletionError) -> LlmError {
    let provider = provider.to_string();
    match error {
        CompletionError::HttpError(http_client::Error::InvalidStatusCodeWithMessage(
            status,
            body,
        )) => from_status(provider, status.as_u16(), body),
        CompletionError::HttpError(http_client::Error::InvalidStatusCode(status)) => {
            from_status(provider, status.as_u16(), String::new())
        }
        CompletionError::HttpError(e) => LlmError::RequestFailed {
            provider,
            reason: e.to_string(),
        },
        CompletionError::JsonError(e) => LlmError::InvalidResponse {
            provider,
            reason: e.to_string(),
        },
        CompletionError::ResponseError(reason) => LlmError::InvalidResponse { provider, reason },
        CompletionError::ProviderError(body) => from_provider_body(provider, body),
        e @ (CompletionError::UrlError(_) | CompletionError::RequestError(_)) => {
            LlmError::InvalidRequest {
                provider,
                reason: e.to_string(),
            }
        }
    }
}

fn from_status(provider: String, status: u16, body: String) -> LlmError {
    match status {
        401 | 403 => LlmError::AuthFailed { provider },
        429 => LlmError::RateLimited {
            provider,
            retry_after: None,
        },
        400..=499 => LlmError::InvalidRequest {
            provider,
            reason: format!("HTTP {status}: {body}"),
        },
        _ => LlmError::RequestFailed {
            provider,
            reason: format!("HTTP {status}: {body}"),
        },
    }
}

/// Providers report some non-2xx replies only as the raw error body.
fn from_provider_body(provider: String, body: String) -> LlmError {
    let lower = body.to_lowercase();
    if ["authentication_error", "permission_error", "invalid_api_key", "invalid x-api-key"]
        .iter()
        .any(|marker| lower.contains(marker))
    {
        LlmError::AuthFailed { provider }
    } else if ["rate_limit", "rate limit"].iter().any(|marker| lower.contains(marker)) {
        LlmError::RateLimited {
            provider,
            retry_after: None,
        }
    } else {
        LlmError::RequestFailed {
            provider,
            reason: body,
        }
    }
}
