/*!
 * Provider implementations for different language-generation services.
 *
 * This module contains client implementations for various LLM providers:
 * - Ollama: Local LLM server
 * - OpenAI: OpenAI chat completions, also used for DeepSeek and LM Studio
 * - Anthropic: Anthropic messages API
 * - Mock: scripted provider for tests
 *
 * A provider is chosen once from configuration by [`from_config`] and used
 * through the object-safe [`Provider`] trait afterwards.
 */

use async_trait::async_trait;
use log::{error, warn};
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::app_config::{TranslationConfig, TranslationProvider};
use crate::errors::{ProviderError, TranslationError};

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;

/// Provider-agnostic completion request
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System prompt guiding the model
    pub system: String,
    /// User prompt carrying the payload
    pub prompt: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            temperature: 0.3,
            max_tokens: 4096,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Provider-agnostic completion response
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    /// Generated text
    pub text: String,
    /// Prompt tokens reported by the provider
    pub prompt_tokens: Option<u64>,
    /// Completion tokens reported by the provider
    pub completion_tokens: Option<u64>,
}

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably behind an `Arc<dyn Provider>`.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Complete a request using this provider
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Human readable provider name for logs
    fn name(&self) -> &str;
}

/// Retry settings shared by the HTTP providers
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first request
    pub max_retries: u32,
    /// Base backoff time in milliseconds, doubled on each retry
    pub backoff_base_ms: u64,
    /// Optional rate limit in requests per minute
    pub rate_limit: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base_ms: 1000,
            rate_limit: None,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let backoff_ms = self.backoff_base_ms.saturating_mul(1u64 << (attempt.saturating_sub(1)).min(16));
        let spacing_ms = self.rate_limit
            .filter(|rpm| *rpm > 0)
            .map(|rpm| 60_000 / rpm as u64)
            .unwrap_or(0);
        Duration::from_millis(backoff_ms.max(spacing_ms))
    }

    /// Run `operation`, retrying retryable errors with exponential backoff
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!("{} request failed: {} - attempt {}/{}", label, e, attempt, self.max_retries + 1);
                    tokio::time::sleep(self.delay_for_attempt(attempt)).await;
                }
                Err(e) => {
                    if attempt > 0 {
                        error!("{} request failed after {} attempts: {}", label, attempt + 1, e);
                    }
                    return Err(e);
                }
            }
        }
    }
}

/// Map a transport error to a provider error
pub(crate) fn error_from_reqwest(e: reqwest::Error) -> ProviderError {
    if e.is_connect() || e.is_timeout() {
        ProviderError::ConnectionError(e.to_string())
    } else if e.is_decode() {
        ProviderError::ParseError(e.to_string())
    } else {
        ProviderError::RequestFailed(e.to_string())
    }
}

/// Map a non-success HTTP response to a provider error
pub(crate) async fn error_from_response(response: reqwest::Response) -> ProviderError {
    let status = response.status();
    let message = response.text().await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());

    match status.as_u16() {
        401 | 403 => ProviderError::AuthenticationError(message),
        429 => ProviderError::RateLimitExceeded(message),
        code => ProviderError::ApiError { status_code: code, message },
    }
}

/// Validate an endpoint and return it without a trailing slash
///
/// Endpoints without a scheme are assumed to be plain HTTP.
pub fn normalize_endpoint(endpoint: &str) -> Result<String, TranslationError> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(TranslationError::InvalidConfig("Endpoint cannot be empty".to_string()));
    }

    let candidate = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    };

    let url = Url::parse(&candidate)
        .map_err(|e| TranslationError::InvalidConfig(format!("Invalid endpoint {}: {}", endpoint, e)))?;
    if url.host_str().is_none() {
        return Err(TranslationError::InvalidConfig(format!("Invalid host in endpoint: {}", endpoint)));
    }

    Ok(candidate.trim_end_matches('/').to_string())
}

/// Build the configured provider
pub fn from_config(config: &TranslationConfig) -> Result<Arc<dyn Provider>, TranslationError> {
    let endpoint = normalize_endpoint(&config.get_endpoint())?;
    let model = config.get_model();
    let timeout = Duration::from_secs(config.get_timeout_secs());
    let retry = RetryPolicy {
        max_retries: config.common.retry_count,
        backoff_base_ms: config.common.retry_backoff_ms,
        rate_limit: config.get_rate_limit(),
    };

    let provider: Arc<dyn Provider> = match config.provider {
        TranslationProvider::Ollama => Arc::new(ollama::Ollama::new(endpoint, model, timeout, retry)),
        TranslationProvider::Anthropic => Arc::new(anthropic::Anthropic::new(
            config.get_api_key(),
            endpoint,
            model,
            timeout,
            retry,
        )),
        TranslationProvider::OpenAI | TranslationProvider::DeepSeek | TranslationProvider::LMStudio => {
            // LM Studio often doesn't require an API key; use a default if empty
            let api_key = match (config.provider, config.get_api_key()) {
                (TranslationProvider::LMStudio, key) if key.is_empty() => "lm-studio".to_string(),
                (_, key) => key,
            };
            Arc::new(openai::OpenAI::new(
                config.provider.display_name(),
                api_key,
                endpoint,
                model,
                timeout,
                retry,
            ))
        }
    };

    Ok(provider)
}
