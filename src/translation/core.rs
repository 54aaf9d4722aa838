/*!
 * Core translation service implementation.
 *
 * This module contains the main TranslationService struct, the LLM-backed
 * implementation of [`TranslationBackend`]. It owns one provider chosen from
 * configuration, builds prompts, parses tagged batch responses and keeps
 * running token usage statistics.
 */

use async_trait::async_trait;
use log::debug;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::errors::TranslationError;
use crate::language_utils;
use crate::providers::{self, CompletionRequest, CompletionResponse, Provider};

use super::backend::TranslationBackend;
use super::formatting::LINE_BREAK_PLACEHOLDER;

/// Entry marker, tolerant to case, spacing and separator drift
static ENTRY_MARKER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<<\s*ENTRY[_\s]*(\d+)\s*>>").unwrap()
});

/// Closing marker of a batch response
static END_MARKER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<<\s*END\s*>>").unwrap()
});

/// Token usage statistics for tracking API consumption
#[derive(Debug, Clone)]
pub struct TokenUsageStats {
    /// Number of prompt tokens
    pub prompt_tokens: u64,

    /// Number of completion tokens
    pub completion_tokens: u64,

    /// Total number of tokens
    pub total_tokens: u64,

    /// Number of completed requests
    pub requests: u64,

    /// Start time of token tracking
    pub start_time: Instant,

    /// Total time spent on API requests
    pub api_duration: Duration,

    /// Provider name
    pub provider: String,

    /// Model name
    pub model: String,
}

impl Default for TokenUsageStats {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenUsageStats {
    /// Create a new empty token usage stats instance
    pub fn new() -> Self {
        Self::with_provider_info(String::new(), String::new())
    }

    /// Create new token usage stats with provider info
    pub fn with_provider_info(provider: String, model: String) -> Self {
        Self {
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            requests: 0,
            start_time: Instant::now(),
            api_duration: Duration::from_secs(0),
            provider,
            model,
        }
    }

    /// Add token usage numbers
    pub fn add_token_usage(&mut self, prompt_tokens: Option<u64>, completion_tokens: Option<u64>) {
        if let Some(pt) = prompt_tokens {
            self.prompt_tokens += pt;
            self.total_tokens += pt;
        }

        if let Some(ct) = completion_tokens {
            self.completion_tokens += ct;
            self.total_tokens += ct;
        }
    }

    /// Record one finished request
    pub fn record(&mut self, response: &CompletionResponse, duration: Duration) {
        self.add_token_usage(response.prompt_tokens, response.completion_tokens);
        self.api_duration += duration;
        self.requests += 1;
    }

    /// Calculate tokens per minute rate
    pub fn tokens_per_minute(&self) -> f64 {
        // Use the API duration for rate calculation, with fallback to elapsed time
        let duration_minutes = if self.api_duration.as_secs_f64() > 0.0 {
            self.api_duration.as_secs_f64() / 60.0
        } else {
            self.start_time.elapsed().as_secs_f64() / 60.0
        };

        if duration_minutes > 0.0 {
            self.total_tokens as f64 / duration_minutes
        } else {
            0.0
        }
    }

    /// Generate a summary of token usage
    pub fn summary(&self) -> String {
        let elapsed_minutes = self.start_time.elapsed().as_secs_f64() / 60.0;
        let api_minutes = self.api_duration.as_secs_f64() / 60.0;

        format!(
            "Token Usage Summary:\n\
             Provider: {}\n\
             Model: {}\n\
             Requests: {}\n\
             Prompt tokens: {}\n\
             Completion tokens: {}\n\
             Total tokens: {}\n\
             Elapsed time: {:.2} minutes\n\
             API request time: {:.2} minutes\n\
             Tokens per minute: {:.2}",
            self.provider,
            self.model,
            self.requests,
            self.prompt_tokens,
            self.completion_tokens,
            self.total_tokens,
            elapsed_minutes,
            api_minutes,
            self.tokens_per_minute()
        )
    }
}

/// Main translation service for subtitle translation
#[derive(Debug)]
pub struct TranslationService {
    /// Provider selected from configuration
    provider: Arc<dyn Provider>,

    /// System prompt with language names filled in
    system_prompt: String,

    /// Sampling temperature
    temperature: f32,

    /// Upper bound on generated tokens per request
    max_tokens: u32,

    /// Accumulated token usage
    usage: Mutex<TokenUsageStats>,
}

impl TranslationService {
    /// Create a new translation service with the provider named in `config`
    pub fn new(config: &Config) -> Result<Self, TranslationError> {
        let provider = providers::from_config(&config.translation)?;
        Ok(Self::with_provider(provider, config))
    }

    /// Create a translation service around an existing provider
    pub fn with_provider(provider: Arc<dyn Provider>, config: &Config) -> Self {
        let source = language_name(&config.source_language);
        let target = language_name(&config.target_language);
        let system_prompt = config.translation.common.system_prompt
            .replace("{source_language}", &source)
            .replace("{target_language}", &target);

        let usage = TokenUsageStats::with_provider_info(
            provider.name().to_string(),
            config.translation.get_model(),
        );

        Self {
            provider,
            system_prompt,
            temperature: config.translation.common.temperature,
            max_tokens: config.translation.common.max_tokens,
            usage: Mutex::new(usage),
        }
    }

    /// Name of the underlying provider
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Snapshot of the token usage so far
    pub fn token_usage(&self) -> TokenUsageStats {
        self.usage.lock().clone()
    }

    /// System prompt for a batch of `count` items, or a single item when `None`
    pub fn system_prompt(&self, count: Option<usize>, context: Option<&str>) -> String {
        let mut prompt = self.system_prompt.clone();
        prompt.push_str("\n\n");

        match count {
            Some(count) => prompt.push_str(&format!(
                "The input holds {count} entries, each introduced by a <<ENTRY_n>> marker, and ends with <<END>>. \
                 Reply with exactly {count} entries using the same markers in the same order, then <<END>>. \
                 Keep every {LINE_BREAK_PLACEHOLDER} placeholder where the line breaks belong. \
                 Do not add notes or explanations."
            )),
            None => prompt.push_str(&format!(
                "Reply with the translated text only. \
                 Keep every {LINE_BREAK_PLACEHOLDER} placeholder where the line breaks belong."
            )),
        }

        if let Some(title) = context.map(str::trim).filter(|c| !c.is_empty()) {
            prompt.push_str(&format!("\n\nTitle: {}", title));
        }

        prompt
    }

    /// Build the user prompt carrying the tagged batch items
    pub fn build_batch_prompt(items: &[String]) -> String {
        let mut prompt = String::new();
        for (idx, item) in items.iter().enumerate() {
            prompt.push_str(&format!("<<ENTRY_{}>>\n", idx));
            prompt.push_str(item);
            prompt.push('\n');
        }
        prompt.push_str("<<END>>");
        prompt
    }

    /// Split a tagged response into `expected` items
    ///
    /// Items are placed by the index in their marker, so reordered entries
    /// still land in the right slot. Duplicate or out-of-range indices are
    /// ignored and missing indices come back as empty strings. A response
    /// without any marker counts as the single item when one was expected.
    pub fn parse_batch_response(response: &str, expected: usize) -> Vec<String> {
        let body = strip_code_fence(response);
        let body = match END_MARKER_REGEX.find(body) {
            Some(end) => &body[..end.start()],
            None => body,
        };

        let markers: Vec<(usize, usize, Option<usize>)> = ENTRY_MARKER_REGEX
            .captures_iter(body)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let index = caps.get(1).and_then(|m| m.as_str().parse::<usize>().ok());
                Some((whole.start(), whole.end(), index))
            })
            .collect();

        if markers.is_empty() {
            let mut items = vec![String::new(); expected];
            if expected == 1 {
                items[0] = body.trim().to_string();
            }
            return items;
        }

        let mut slots: Vec<Option<String>> = vec![None; expected];
        for (pos, (_, content_start, index)) in markers.iter().enumerate() {
            let content_end = markers.get(pos + 1).map(|(start, _, _)| *start).unwrap_or(body.len());
            let Some(index) = *index else { continue };

            match slots.get_mut(index) {
                Some(slot) if slot.is_none() => {
                    *slot = Some(body[*content_start..content_end].trim().to_string());
                }
                Some(_) => debug!("Ignoring duplicate entry marker {}", index),
                None => debug!("Ignoring out-of-range entry marker {} (expected {})", index, expected),
            }
        }

        slots.into_iter().map(Option::unwrap_or_default).collect()
    }

    async fn complete(&self, system: String, prompt: String) -> Result<String, TranslationError> {
        let request = CompletionRequest::new(system, prompt)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens);

        let start_time = Instant::now();
        let response = self.provider.complete(request).await?;
        let duration = start_time.elapsed();
        debug!("{} response received in {:?}", self.provider.name(), duration);

        self.usage.lock().record(&response, duration);
        Ok(response.text)
    }
}

#[async_trait]
impl TranslationBackend for TranslationService {
    async fn translate_batch(&self, items: &[String], context: Option<&str>) -> Result<Vec<String>, TranslationError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let system = self.system_prompt(Some(items.len()), context);
        let response = self.complete(system, Self::build_batch_prompt(items)).await?;
        if response.trim().is_empty() {
            return Err(TranslationError::EmptyResponse);
        }

        Ok(Self::parse_batch_response(&response, items.len()))
    }

    async fn translate_one(&self, text: &str, context: Option<&str>) -> Result<String, TranslationError> {
        let system = self.system_prompt(None, context);
        let response = self.complete(system, text.to_string()).await?;

        // Models sometimes answer a single item in the batch format anyway
        let translated = Self::parse_batch_response(&response, 1)
            .into_iter()
            .next()
            .unwrap_or_default();

        if translated.is_empty() {
            return Err(TranslationError::EmptyResponse);
        }
        Ok(translated)
    }

    async fn check_availability(&self) -> Result<(), TranslationError> {
        self.provider
            .test_connection()
            .await
            .map_err(|e| TranslationError::BackendUnavailable(format!("{}: {}", self.provider.name(), e)))
    }
}

/// Full language name for prompts, falling back to the code itself
fn language_name(code: &str) -> String {
    language_utils::get_language_name(code).unwrap_or_else(|_| code.to_string())
}

/// Drop a surrounding Markdown code fence
fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let without_open = match trimmed.strip_prefix("```") {
        Some(rest) => rest.split_once('\n').map(|(_, body)| body).unwrap_or(""),
        None => trimmed,
    };
    without_open.trim_end().trim_end_matches("```")
}
