/*!
 * Batch translation processing.
 *
 * This module runs subtitle entries through a [`TranslationBackend`] in
 * fixed-size batches, with bounded concurrency, validation of every batch
 * answer and a sequential per-entry fallback for batches that fail.
 *
 * Each batch owns a disjoint `&mut` slice of the entry list, so concurrent
 * batches never touch the same entry and no locking is needed. Batches are
 * admitted in their original order and may finish in any order.
 */

use futures::future::{FutureExt, join_all};
use log::debug;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::app_config::BatchConfig;
use crate::errors::TranslationError;
use crate::subtitle_processor::SubtitleEntry;

use super::backend::TranslationBackend;
use super::formatting::{encode_line_breaks, restore_line_breaks};
use super::progress::ProgressLogger;

/// Settings for one orchestrator run
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    /// Maximum number of entries per batch request
    pub batch_size: usize,

    /// Maximum number of batches in flight
    pub concurrent_requests: usize,

    /// Pause between per-entry requests of a fallen-back batch
    pub fallback_delay: Duration,

    /// Optional context, such as the title, passed with every request
    pub context: Option<String>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from(&BatchConfig::default())
    }
}

impl From<&BatchConfig> for BatchOptions {
    fn from(config: &BatchConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            concurrent_requests: config.concurrent_requests,
            fallback_delay: Duration::from_millis(config.fallback_delay_ms),
            context: None,
        }
    }
}

impl BatchOptions {
    /// Attach context sent with every request
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        self.context = if context.trim().is_empty() { None } else { Some(context) };
        self
    }
}

/// Outcome counts of an orchestrator run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Number of batches processed
    pub batches: usize,

    /// Entries translated by a validated batch answer
    pub batch_translated: usize,

    /// Entries translated one by one after their batch failed
    pub fallback_translated: usize,

    /// Entries left with their source text
    pub kept_source: usize,
}

impl BatchReport {
    fn merge(mut self, other: BatchReport) -> Self {
        self.batches += other.batches;
        self.batch_translated += other.batch_translated;
        self.fallback_translated += other.fallback_translated;
        self.kept_source += other.kept_source;
        self
    }

    /// Number of entries this report accounts for
    pub fn entries(&self) -> usize {
        self.batch_translated + self.fallback_translated + self.kept_source
    }
}

/// Batch translator for processing subtitle entries in batches
pub struct BatchTranslator<'a> {
    /// The backend every request goes to
    backend: &'a dyn TranslationBackend,

    /// Receiver of progress events
    progress: &'a dyn ProgressLogger,

    /// Run settings
    options: BatchOptions,
}

impl<'a> BatchTranslator<'a> {
    /// Create a new batch translator
    pub fn new(backend: &'a dyn TranslationBackend, progress: &'a dyn ProgressLogger, options: BatchOptions) -> Self {
        Self {
            backend,
            progress,
            options,
        }
    }

    /// Translate every entry in place
    ///
    /// Every entry ends up with a translation, its source text being used
    /// where all attempts failed.
    pub async fn translate_entries(&self, entries: &mut [SubtitleEntry]) -> BatchReport {
        let batch_size = self.options.batch_size.max(1);
        let total_batches = entries.len().div_ceil(batch_size);
        if total_batches == 0 {
            return BatchReport::default();
        }

        // Create a semaphore to limit concurrent requests
        let semaphore = Semaphore::new(self.options.concurrent_requests.max(1));
        let completed = AtomicUsize::new(0);

        let tasks = entries
            .chunks_mut(batch_size)
            .enumerate()
            .map(|(batch_index, batch)| {
                let semaphore = &semaphore;
                let completed = &completed;

                async move {
                    // The semaphore is never closed, so acquiring only waits
                    let _permit = semaphore.acquire().await.ok();

                    let outcome = AssertUnwindSafe(self.translate_batch(batch_index, total_batches, &mut *batch))
                        .catch_unwind()
                        .await;

                    let report = match outcome {
                        Ok(report) => report,
                        Err(panic) => {
                            self.progress.error(&format!(
                                "Batch {}/{} aborted ({}), keeping source text",
                                batch_index + 1,
                                total_batches,
                                panic_message(&*panic)
                            ));
                            let kept = batch.iter_mut().map(|entry| entry.keep_source()).filter(|kept| *kept).count();
                            BatchReport { batches: 1, kept_source: kept, ..BatchReport::default() }
                        }
                    };

                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    self.progress.batch_progress(done, total_batches);
                    report
                }
            });

        join_all(tasks)
            .await
            .into_iter()
            .fold(BatchReport::default(), BatchReport::merge)
    }

    /// Translate one batch, falling back to single requests when needed
    async fn translate_batch(&self, batch_index: usize, total_batches: usize, batch: &mut [SubtitleEntry]) -> BatchReport {
        let mut report = BatchReport { batches: 1, ..BatchReport::default() };

        // Blank entries are never sent
        let mut pending = Vec::with_capacity(batch.len());
        for (idx, entry) in batch.iter_mut().enumerate() {
            if entry.source_text().trim().is_empty() {
                if entry.keep_source() {
                    report.kept_source += 1;
                }
            } else {
                pending.push(idx);
            }
        }
        if pending.is_empty() {
            return report;
        }

        let items: Vec<String> = pending
            .iter()
            .map(|&idx| encode_line_breaks(batch[idx].source_text()))
            .collect();
        let context = self.options.context.as_deref();

        debug!("Translating batch {}/{} ({} entries)", batch_index + 1, total_batches, items.len());

        let result = self
            .backend
            .translate_batch(&items, context)
            .await
            .and_then(|translated| validate_batch(translated, items.len()));

        match result {
            Ok(translated) => {
                for (&idx, text) in pending.iter().zip(translated) {
                    if batch[idx].set_translation(text) {
                        report.batch_translated += 1;
                    }
                }
            }
            Err(e) => {
                self.progress.warning(&format!(
                    "Batch {}/{} rejected ({}), translating {} entries individually",
                    batch_index + 1,
                    total_batches,
                    e,
                    pending.len()
                ));
                self.translate_individually(batch, &pending, &items, &mut report).await;
            }
        }

        report
    }

    /// Per-entry fallback, one request at a time
    async fn translate_individually(
        &self,
        batch: &mut [SubtitleEntry],
        pending: &[usize],
        items: &[String],
        report: &mut BatchReport,
    ) {
        let context = self.options.context.as_deref();

        for (attempt, (&idx, item)) in pending.iter().zip(items).enumerate() {
            if attempt > 0 && !self.options.fallback_delay.is_zero() {
                tokio::time::sleep(self.options.fallback_delay).await;
            }

            let entry = &mut batch[idx];
            let result = self
                .backend
                .translate_one(item, context)
                .await
                .map(|text| restore_line_breaks(&text))
                .and_then(|text| if text.is_empty() { Err(TranslationError::EmptyResponse) } else { Ok(text) });

            match result {
                Ok(text) => {
                    if entry.set_translation(text) {
                        report.fallback_translated += 1;
                    }
                }
                Err(e) => {
                    self.progress.error(&format!(
                        "Entry {} could not be translated ({}), keeping source text",
                        entry.seq_label(),
                        e
                    ));
                    if entry.keep_source() {
                        report.kept_source += 1;
                    }
                }
            }
        }
    }
}

/// Accept a batch answer only when every item is present and non-blank
///
/// Items are returned with their line breaks restored.
pub fn validate_batch(translated: Vec<String>, expected: usize) -> Result<Vec<String>, TranslationError> {
    if translated.len() != expected {
        return Err(TranslationError::BatchSizeMismatch {
            expected,
            actual: translated.len(),
        });
    }

    let restored: Vec<String> = translated.iter().map(|text| restore_line_breaks(text)).collect();
    let missing: Vec<usize> = restored
        .iter()
        .enumerate()
        .filter(|(_, text)| text.is_empty())
        .map(|(idx, _)| idx)
        .collect();

    if !missing.is_empty() {
        return Err(TranslationError::MissingItems(missing));
    }
    Ok(restored)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "task panicked".to_string()
    }
}
