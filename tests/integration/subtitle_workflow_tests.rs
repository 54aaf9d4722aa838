/*!
 * File based workflow tests: read a track, translate it, write it back
 */

use anyhow::Result;
use std::fs;

use subtrans::subtitle_processor::SubtitleCollection;
use subtrans::translation::{BatchOptions, RecordingProgress, translate_collection};

use crate::common::{self, mock_backends::*};

/// Test the full file round trip with a working backend
#[tokio::test]
async fn test_translate_collection_withSrtFile_shouldWriteTranslatedFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "movie.srt", &common::sample_track(6))?;
    let output = temp_dir.path().join("out").join("movie.fr.srt");

    let mut collection = SubtitleCollection::from_file(&input, "en")?;
    let backend = UppercaseBackend::default();
    let progress = RecordingProgress::new();
    let options = BatchOptions { batch_size: 4, concurrent_requests: 2, ..BatchOptions::default() };

    let report = translate_collection(&mut collection, &backend, &options, &progress).await?;
    collection.write_to_srt(&output)?;

    assert_eq!(report.entries, 6);
    assert_eq!(report.batch.batches, 2);
    assert_eq!(collection.translated_count(), 6);

    let written = fs::read_to_string(&output)?;
    assert!(written.starts_with("1\n00:00:01,000 --> 00:00:01,500\nLINE 1\n\n"));
    assert!(written.contains("<I>LINE 3</I>\n- SECOND LINE"));
    assert!(written.ends_with('\n'));

    let reread = SubtitleCollection::from_file(&output, "fr")?;
    assert_eq!(reread.entries.len(), 6);
    assert_eq!(reread.entries[5].timespan(), "00:00:06,000 --> 00:00:06,500");
    Ok(())
}

/// Test a file written with Windows line endings and a byte order mark
#[tokio::test]
async fn test_from_file_withCrlfAndBom_shouldParseEntries() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = "\u{feff}1\r\n00:00:01,000 --> 00:00:02,000\r\nHello\r\n\r\n2\r\n00:00:02,500 --> 00:00:03,000\r\nWorld\r\n";
    let input = common::create_test_file(temp_dir.path(), "windows.srt", content)?;

    let collection = SubtitleCollection::from_file(&input, "en")?;

    assert_eq!(collection.to_srt_string(), common::TWO_ENTRY_TRACK);
    Ok(())
}

/// Test that invalid UTF-8 does not stop the run
#[tokio::test]
async fn test_from_file_withInvalidUtf8_shouldReplaceBytes() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = temp_dir.path().join("latin1.srt");
    fs::write(&input, b"1\n00:00:01,000 --> 00:00:02,000\nCaf\xe9\n")?;

    let collection = SubtitleCollection::from_file(&input, "fr")?;

    assert_eq!(collection.entries.len(), 1);
    assert_eq!(collection.entries[0].source_text(), "Caf\u{fffd}");
    Ok(())
}

/// Test that a missing input file is reported
#[test]
fn test_from_file_withMissingFile_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let result = SubtitleCollection::from_file(temp_dir.path().join("missing.srt"), "en");

    let message = format!("{:#}", result.unwrap_err());
    assert!(message.contains("Failed to read subtitle file"));
    Ok(())
}

/// Test that a file without subtitle blocks translates to nothing
#[tokio::test]
async fn test_translate_collection_withEmptyFile_shouldWarnAndWriteNothing() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "empty.srt", "")?;
    let output = temp_dir.path().join("empty.out.srt");

    let mut collection = SubtitleCollection::from_file(&input, "en")?;
    let backend = UppercaseBackend::default();
    let progress = RecordingProgress::new();

    let report = translate_collection(&mut collection, &backend, &BatchOptions::default(), &progress).await?;
    collection.write_to_srt(&output)?;

    assert_eq!(report.entries, 0);
    assert_eq!(progress.count("warning"), 1);
    assert_eq!(fs::read_to_string(&output)?, "");
    Ok(())
}

/// Test that an unavailable backend leaves the collection untouched
#[tokio::test]
async fn test_translate_collection_withUnavailableBackend_shouldNotTranslate() -> Result<()> {
    let mut collection = SubtitleCollection::new("inline.srt".into(), "en".to_string());
    collection.entries = SubtitleCollection::parse_srt_string(common::TWO_ENTRY_TRACK);
    let backend = UnavailableBackend::default();
    let progress = RecordingProgress::new();

    let result = translate_collection(&mut collection, &backend, &BatchOptions::default(), &progress).await;

    assert!(result.is_err());
    assert_eq!(collection.translated_count(), 0);
    Ok(())
}
