use async_trait::async_trait;

use crate::errors::TranslationError;

/// Capability the orchestrator needs from any translation backend
///
/// Implementations are chosen once at startup and shared read-only by every
/// batch task, hence the `Send + Sync` bound.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Translate `items` in one request
    ///
    /// On success the returned list should hold one entry per input item, in
    /// order. Callers still validate the length and content.
    async fn translate_batch(&self, items: &[String], context: Option<&str>) -> Result<Vec<String>, TranslationError>;

    /// Translate a single piece of text
    async fn translate_one(&self, text: &str, context: Option<&str>) -> Result<String, TranslationError>;

    /// Probe the backend before any work is scheduled
    async fn check_availability(&self) -> Result<(), TranslationError>;
}
