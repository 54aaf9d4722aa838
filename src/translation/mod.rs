/*!
 * Translation service for subtitle translation using AI providers.
 *
 * This module contains the core functionality for translating subtitles.
 * It is split into several submodules:
 *
 * - `backend`: The capability every translation backend implements
 * - `core`: LLM-backed translation service and response parsing
 * - `batch`: Batch orchestration with bounded concurrency and fallback
 * - `formatting`: Line-break placeholders for backend payloads
 * - `progress`: Progress event sinks
 * - `pipeline`: Entry points tying parsing, translation and output together
 */

// Re-export main types for easier usage
pub use self::backend::TranslationBackend;
pub use self::batch::{BatchOptions, BatchReport, BatchTranslator};
pub use self::core::{TokenUsageStats, TranslationService};
pub use self::pipeline::{PipelineReport, translate_collection, translate_track};
pub use self::progress::{LogEntry, LogProgress, ProgressLogger, RecordingProgress};

// Submodules
pub mod backend;
pub mod batch;
pub mod core;
pub mod formatting;
pub mod pipeline;
pub mod progress;
