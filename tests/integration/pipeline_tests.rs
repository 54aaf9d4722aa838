/*!
 * End-to-end tests of the translation pipeline
 *
 * These cover the observable guarantees of a run: exact output shape, the
 * fallback path, completeness under failure and the upfront availability check.
 */

use std::time::Duration;

use subtrans::errors::TranslationError;
use subtrans::providers::mock::MockProvider;
use subtrans::subtitle_processor::{SubtitleCollection, render_srt};
use subtrans::translation::{BatchOptions, RecordingProgress, TranslationService, translate_track};
use subtrans::Config;

use crate::common::{self, mock_backends::*};

fn options(batch_size: usize, concurrent_requests: usize) -> BatchOptions {
    BatchOptions {
        batch_size,
        concurrent_requests,
        fallback_delay: Duration::ZERO,
        context: None,
    }
}

/// Test the two-entry scenario with an upper-casing backend
#[tokio::test]
async fn test_translate_track_withUppercaseBackend_shouldProduceExactOutput() {
    common::init_test_logging();
    let backend = UppercaseBackend::default();
    let progress = RecordingProgress::new();

    let (output, report) = translate_track(common::TWO_ENTRY_TRACK, &backend, &options(10, 4), &progress)
        .await
        .unwrap();

    assert_eq!(
        output,
        "1\n00:00:01,000 --> 00:00:02,000\nHELLO\n\n2\n00:00:02,500 --> 00:00:03,000\nWORLD"
    );
    assert_eq!(report.entries, 2);
    assert_eq!(report.batch.batch_translated, 2);
    assert_eq!(backend.calls.batches(), 1);
    assert_eq!(backend.calls.singles(), 0);
    assert_eq!(progress.count("success"), 1);
}

/// Test round-trip identity with a backend that changes nothing
#[tokio::test]
async fn test_translate_track_withNoopBackend_shouldReturnInputUnchanged() {
    let track = common::sample_track(23);
    let progress = RecordingProgress::new();

    let (output, _) = translate_track(&track, &NoopBackend, &options(4, 3), &progress)
        .await
        .unwrap();

    assert_eq!(output, track);
    assert_eq!(progress.count("warning"), 0);
}

/// Test that non-canonical input comes back in canonical form
#[tokio::test]
async fn test_translate_track_withCrlfAndBom_shouldMatchParsedRendering() {
    let raw = "\u{feff}1\r\n00:00:01,000 --> 00:00:02,000\r\nHello  \r\nthere\r\n\r\n\r\n2\r\n00:00:03,000 --> 00:00:04,000\r\nBye\r\n";
    let progress = RecordingProgress::new();

    let (output, _) = translate_track(raw, &NoopBackend, &options(10, 1), &progress).await.unwrap();

    assert_eq!(output, render_srt(&SubtitleCollection::parse_srt_string(raw)));
    assert_eq!(output, "1\n00:00:01,000 --> 00:00:02,000\nHello\nthere\n\n2\n00:00:03,000 --> 00:00:04,000\nBye");
}

/// Test fallback when every batch answer is one item short
#[tokio::test]
async fn test_translate_track_withOneFewerItem_shouldFallBackPerEntry() {
    let track = common::sample_track(7);
    let backend = OneFewerBackend::default();
    let progress = RecordingProgress::new();

    let (output, report) = translate_track(&track, &backend, &options(3, 2), &progress).await.unwrap();

    let entries = SubtitleCollection::parse_srt_string(&output);
    assert_eq!(entries.len(), 7);
    for (translated, original) in entries.iter().zip(SubtitleCollection::parse_srt_string(&track)) {
        assert_eq!(translated.source_text(), original.source_text().to_uppercase());
    }

    assert_eq!(report.batch.batches, 3);
    assert_eq!(report.batch.fallback_translated, 7);
    assert_eq!(backend.calls.batches(), 3);
    assert_eq!(backend.calls.singles(), 7);
    assert_eq!(progress.count("warning"), 3);
}

/// Test batch calls that always fail while single calls work
#[tokio::test]
async fn test_translate_track_withFailingBatches_shouldTranslateEverythingIndividually() {
    let track = common::sample_track(12);
    let backend = BatchFailingBackend::default();
    let progress = RecordingProgress::new();

    let (output, report) = translate_track(&track, &backend, &options(5, 4), &progress).await.unwrap();

    assert_eq!(output, render_uppercase(&track));
    assert_eq!(report.batch.fallback_translated, 12);
    assert_eq!(report.batch.kept_source, 0);
    assert_eq!(progress.count("warning"), 3);
    assert_eq!(progress.count("error"), 0);
}

/// Test completeness when nothing can be translated
#[tokio::test]
async fn test_translate_track_withEverythingFailing_shouldKeepEverySourceText() {
    let track = common::sample_track(9);
    let backend = FailingBackend::default();
    let progress = RecordingProgress::new();

    let (output, report) = translate_track(&track, &backend, &options(4, 2), &progress).await.unwrap();

    assert_eq!(output, track);
    assert_eq!(report.entries, 9);
    assert_eq!(report.batch.kept_source, 9);
    assert_eq!(progress.count("warning"), 3);
    assert_eq!(progress.count("error"), 9);
}

/// Test that an unavailable backend stops the run before any work
#[tokio::test]
async fn test_translate_track_withUnavailableBackend_shouldFailUpfront() {
    let backend = UnavailableBackend::default();
    let progress = RecordingProgress::new();

    let result = translate_track(common::TWO_ENTRY_TRACK, &backend, &options(10, 4), &progress).await;

    assert!(matches!(result, Err(TranslationError::BackendUnavailable(_))));
    assert_eq!(backend.calls.batches(), 0);
    assert_eq!(backend.calls.singles(), 0);
    assert_eq!(progress.count("error"), 1);
}

/// Test input without subtitle blocks
#[tokio::test]
async fn test_translate_track_withNoEntries_shouldReturnEmptyString() {
    let backend = UppercaseBackend::default();
    let progress = RecordingProgress::new();

    let (output, report) = translate_track("nothing to see here", &backend, &options(10, 4), &progress)
        .await
        .unwrap();

    assert!(output.is_empty());
    assert_eq!(report.entries, 0);
    assert_eq!(backend.calls.batches(), 0);
    assert_eq!(progress.count("warning"), 1);
}

/// Test that blank entries are kept and never sent
#[tokio::test]
async fn test_translate_track_withBlankEntry_shouldNotSendIt() {
    let raw = "1\n00:00:01,000 --> 00:00:02,000\n\n2\n00:00:03,000 --> 00:00:04,000\nHi";
    let backend = UppercaseBackend::default();
    let progress = RecordingProgress::new();

    let (output, report) = translate_track(raw, &backend, &options(1, 1), &progress).await.unwrap();

    assert_eq!(output, "1\n00:00:01,000 --> 00:00:02,000\n\n\n2\n00:00:03,000 --> 00:00:04,000\nHI");
    assert_eq!(report.batch.kept_source, 1);
    assert_eq!(backend.calls.batches(), 1);
}

/// Test that an unchanged answer counts as translated
#[tokio::test]
async fn test_translate_track_withEchoedItems_shouldAcceptThem() {
    let progress = RecordingProgress::new();

    let (_, report) = translate_track(common::TWO_ENTRY_TRACK, &NoopBackend, &options(10, 1), &progress)
        .await
        .unwrap();

    assert_eq!(report.batch.batch_translated, 2);
    assert_eq!(report.batch.fallback_translated, 0);
}

/// Test that the title reaches every request
#[tokio::test]
async fn test_translate_track_withTitle_shouldPassContext() {
    let backend = ContextRecordingBackend::default();
    let progress = RecordingProgress::new();
    let options = options(1, 2).with_context("Heat (1995)");

    translate_track(common::TWO_ENTRY_TRACK, &backend, &options, &progress).await.unwrap();

    let contexts = backend.contexts.lock().clone();
    assert_eq!(contexts.len(), 2);
    assert!(contexts.iter().all(|c| c.as_deref() == Some("Heat (1995)")));
}

/// Test the whole run through the LLM service and the mock provider
#[tokio::test]
async fn test_translate_track_withMockProvider_shouldTranslateThroughService() {
    let service = TranslationService::with_provider(std::sync::Arc::new(MockProvider::working()), &Config::default());
    let progress = RecordingProgress::new();
    let raw = "1\n00:00:01,000 --> 00:00:02,000\nHello\nthere\n\n2\n00:00:02,500 --> 00:00:03,000\nWorld";

    let (output, report) = translate_track(raw, &service, &options(10, 4), &progress).await.unwrap();

    assert_eq!(
        output,
        "1\n00:00:01,000 --> 00:00:02,000\n[TRANSLATED] Hello\nthere\n\n2\n00:00:02,500 --> 00:00:03,000\n[TRANSLATED] World"
    );
    assert_eq!(report.batch.batch_translated, 2);
}

/// Test answers that lose their last entry, recovered entry by entry
#[tokio::test]
async fn test_translate_track_withTruncatedProvider_shouldFallBackPerEntry() {
    let service = TranslationService::with_provider(std::sync::Arc::new(MockProvider::truncated()), &Config::default());
    let progress = RecordingProgress::new();

    let (output, report) = translate_track(common::TWO_ENTRY_TRACK, &service, &options(10, 4), &progress)
        .await
        .unwrap();

    assert_eq!(
        output,
        "1\n00:00:01,000 --> 00:00:02,000\n[TRANSLATED] Hello\n\n2\n00:00:02,500 --> 00:00:03,000\n[TRANSLATED] World"
    );
    assert_eq!(report.batch.batch_translated, 0);
    assert_eq!(report.batch.fallback_translated, 2);
    assert_eq!(progress.count("warning"), 1);
}

/// Test a provider failing every other request, one batch at a time
#[tokio::test]
async fn test_translate_track_withIntermittentProvider_shouldMixAllPaths() {
    let provider = MockProvider::intermittent(2);
    let requests = provider.clone();
    let service = TranslationService::with_provider(std::sync::Arc::new(provider), &Config::default());
    let progress = RecordingProgress::new();
    let track = common::sample_track(4);

    // Batch 1 succeeds, batch 2 fails, then its first entry succeeds and its second fails
    let (output, report) = translate_track(&track, &service, &options(2, 1), &progress).await.unwrap();

    let texts: Vec<String> = SubtitleCollection::parse_srt_string(&output)
        .iter()
        .map(|e| e.source_text().to_string())
        .collect();
    assert_eq!(
        texts,
        vec![
            "[TRANSLATED] Line 1",
            "[TRANSLATED] Line 2",
            "[TRANSLATED] <i>Line 3</i>\n- second line",
            "Line 4",
        ]
    );
    assert_eq!(report.batch.batch_translated, 2);
    assert_eq!(report.batch.fallback_translated, 1);
    assert_eq!(report.batch.kept_source, 1);
    assert_eq!(progress.count("warning"), 1);
    assert_eq!(progress.count("error"), 1);
    assert_eq!(requests.request_count(), 4);
}

/// Test a provider that cannot be reached
#[tokio::test]
async fn test_translate_track_withFailingProvider_shouldReportUnavailable() {
    let service = TranslationService::with_provider(std::sync::Arc::new(MockProvider::failing()), &Config::default());
    let progress = RecordingProgress::new();

    let result = translate_track(common::TWO_ENTRY_TRACK, &service, &options(10, 4), &progress).await;
    assert!(matches!(result, Err(TranslationError::BackendUnavailable(_))));
}

fn render_uppercase(track: &str) -> String {
    let mut entries = SubtitleCollection::parse_srt_string(track);
    for entry in entries.iter_mut() {
        let upper = entry.source_text().to_uppercase();
        entry.set_translation(upper);
    }
    render_srt(&entries)
}
