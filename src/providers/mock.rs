/*!
 * Mock provider implementations for testing.
 *
 * This module provides mock providers that simulate different behaviors:
 * - `MockProvider::working()` - Always succeeds with translated text
 * - `MockProvider::partial_markers()` - Returns batch responses with markers missing
 * - `MockProvider::intermittent(n)` - Fails every nth request
 * - `MockProvider::failing()` - Always fails with an error
 * - `MockProvider::truncated()` - Drops the last entry and the end marker
 * - `MockProvider::slow(ms)` - Answers like `working()` after a delay
 *
 * The working mock tags every payload line with `[TRANSLATED]` and keeps entry
 * markers intact, so a batch prompt comes back as a well-formed batch response.
 */

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::providers::{CompletionRequest, CompletionResponse, Provider};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper translation
    Working,
    /// Succeeds but returns malformed responses (missing markers)
    PartialMarkers,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Returns truncated responses (last entry and END marker missing)
    Truncated,
    /// Returns empty response
    Empty,
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
}

/// Mock provider for testing translation behavior
#[derive(Debug)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter for intermittent failures
    request_count: Arc<AtomicUsize>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&CompletionRequest) -> String>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            custom_response: None,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a partially working mock provider (missing markers)
    pub fn partial_markers() -> Self {
        Self::new(MockBehavior::PartialMarkers)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every: fail_every.max(1) })
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that returns truncated responses
    pub fn truncated() -> Self {
        Self::new(MockBehavior::Truncated)
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a mock that waits before answering
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&CompletionRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of requests received so far, shared between clones
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Tag each payload line of a prompt, keeping marker lines untouched
    pub fn translate_prompt(prompt: &str) -> String {
        prompt
            .lines()
            .map(|line| {
                let trimmed = line.trim();
                if trimmed.is_empty() || (trimmed.starts_with("<<") && trimmed.ends_with(">>")) {
                    line.to_string()
                } else {
                    format!("[TRANSLATED] {}", line)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Generate a properly formatted batch response with markers
    pub fn generate_batch_response(entries: &[&str]) -> String {
        let mut response = String::new();
        for (i, entry) in entries.iter().enumerate() {
            response.push_str(&format!("<<ENTRY_{}>>\n", i));
            response.push_str(&format!("[TRANSLATED] {}\n", entry));
        }
        response.push_str("<<END>>");
        response
    }

    /// Generate a response with the middle markers missing
    pub fn generate_partial_response(entries: &[&str]) -> String {
        let mut response = String::new();
        for (i, entry) in entries.iter().enumerate() {
            if i == 0 || i + 1 == entries.len() {
                response.push_str(&format!("<<ENTRY_{}>>\n", i));
            }
            response.push_str(&format!("[TRANSLATED] {}\n", entry));
        }
        response.push_str("<<END>>");
        response
    }

    fn usage(request: &CompletionRequest, text: String) -> CompletionResponse {
        CompletionResponse {
            prompt_tokens: Some(request.prompt.len() as u64),
            completion_tokens: Some((text.len() / 2) as u64),
            text,
        }
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            custom_response: self.custom_response,
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            MockBehavior::Working => {
                let text = match self.custom_response {
                    Some(generator) => generator(&request),
                    None => Self::translate_prompt(&request.prompt),
                };
                Ok(Self::usage(&request, text))
            }

            MockBehavior::PartialMarkers => {
                let text = "<<ENTRY_0>>\n[TRANSLATED] First part\nMissing markers in middle\n<<END>>".to_string();
                Ok(Self::usage(&request, text))
            }

            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    let text = Self::translate_prompt(&request.prompt);
                    Ok(Self::usage(&request, text))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::Truncated => {
                // Cut off before the last entry and the end marker
                let translated = Self::translate_prompt(&request.prompt);
                let body = translated.trim_end().trim_end_matches("<<END>>").trim_end();
                let text = match body.rfind("<<ENTRY_") {
                    Some(last) if last > 0 => body[..last].trim_end().to_string(),
                    Some(_) => body.to_string(),
                    None => format!("<<ENTRY_0>>\n{}", body),
                };
                Ok(Self::usage(&request, text))
            }

            MockBehavior::Empty => Ok(CompletionResponse {
                text: String::new(),
                prompt_tokens: Some(0),
                completion_tokens: Some(0),
            }),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                let text = Self::translate_prompt(&request.prompt);
                Ok(Self::usage(&request, text))
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ConnectionError("Simulated connection refused".to_string())),
            _ => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "Mock"
    }
}
