/*!
 * Pipeline entry points.
 *
 * A run probes the backend, parses the track, translates every entry through
 * the batch orchestrator and serializes the result. The caller gets either a
 * complete track with the same number of entries or an upfront failure.
 */

use std::time::Instant;

use crate::errors::TranslationError;
use crate::subtitle_processor::{SubtitleCollection, SubtitleEntry, render_srt};

use super::backend::TranslationBackend;
use super::batch::{BatchOptions, BatchReport, BatchTranslator};
use super::progress::ProgressLogger;

/// Summary of a pipeline run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Number of entries parsed from the input
    pub entries: usize,

    /// Per-path counts from the orchestrator
    pub batch: BatchReport,
}

/// Translate a raw SRT track
///
/// Returns the translated track, or an empty string when the input holds no
/// subtitle blocks. Fails only when the backend is unavailable, in which case
/// no translation work is attempted.
pub async fn translate_track(
    raw: &str,
    backend: &dyn TranslationBackend,
    options: &BatchOptions,
    progress: &dyn ProgressLogger,
) -> Result<(String, PipelineReport), TranslationError> {
    ensure_available(backend, progress).await?;

    let mut entries = SubtitleCollection::parse_srt_string(raw);
    if entries.is_empty() {
        progress.warning("No subtitle entries found in input");
        return Ok((String::new(), PipelineReport::default()));
    }

    let report = run(&mut entries, backend, options, progress).await;
    Ok((render_srt(&entries), report))
}

/// Translate an already parsed collection in place
pub async fn translate_collection(
    collection: &mut SubtitleCollection,
    backend: &dyn TranslationBackend,
    options: &BatchOptions,
    progress: &dyn ProgressLogger,
) -> Result<PipelineReport, TranslationError> {
    ensure_available(backend, progress).await?;

    if collection.entries.is_empty() {
        progress.warning(&format!("No subtitle entries found in {}", collection.source_file.display()));
        return Ok(PipelineReport::default());
    }

    Ok(run(&mut collection.entries, backend, options, progress).await)
}

async fn ensure_available(backend: &dyn TranslationBackend, progress: &dyn ProgressLogger) -> Result<(), TranslationError> {
    if let Err(e) = backend.check_availability().await {
        progress.error(&format!("Translation backend is not available: {}", e));
        return Err(match e {
            TranslationError::BackendUnavailable(_) => e,
            other => TranslationError::BackendUnavailable(other.to_string()),
        });
    }
    Ok(())
}

async fn run(
    entries: &mut [SubtitleEntry],
    backend: &dyn TranslationBackend,
    options: &BatchOptions,
    progress: &dyn ProgressLogger,
) -> PipelineReport {
    let start_time = Instant::now();
    progress.info(&format!(
        "Translating {} entries in batches of {} ({} concurrent)",
        entries.len(),
        options.batch_size.max(1),
        options.concurrent_requests.max(1)
    ));

    let translator = BatchTranslator::new(backend, progress, options.clone());
    let batch = translator.translate_entries(entries).await;

    progress.success(&format!(
        "Translated {} entries in {:.1}s ({} by batch, {} individually, {} kept as source)",
        entries.len(),
        start_time.elapsed().as_secs_f64(),
        batch.batch_translated,
        batch.fallback_translated,
        batch.kept_source
    ));

    PipelineReport {
        entries: entries.len(),
        batch,
    }
}
