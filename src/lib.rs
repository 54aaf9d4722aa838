/*!
 * # subtrans - SRT subtitle translation with AI backends
 *
 * A Rust library that translates SRT subtitle tracks through a language
 * model while keeping indices, timings and inline markup untouched.
 *
 * ## Features
 *
 * - Tolerant SRT parsing (BOM, mixed line endings, stray fragments)
 * - Fixed-size batches translated concurrently with a bounded width
 * - Validation of every batch answer with per-entry fallback
 * - Translate subtitles using various AI providers:
 *   - Ollama (local LLM)
 *   - OpenAI API, DeepSeek and LM Studio (OpenAI-compatible)
 *   - Anthropic API
 * - Every entry is always emitted, translated or with its source text
 * - ISO 639-1 and ISO 639-2 language code support
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `subtitle_processor`: SRT parsing, batching and serialization
 * - `translation`: Translation pipeline:
 *   - `translation::backend`: The backend capability
 *   - `translation::core`: LLM-backed translation service
 *   - `translation::batch`: Batch orchestration and fallback
 *   - `translation::pipeline`: Pipeline entry points
 *   - `translation::progress`: Progress reporting
 * - `language_utils`: ISO language code utilities
 * - `providers`: Client implementations for various LLM providers
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod errors;
pub mod language_utils;
pub mod providers;
pub mod subtitle_processor;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{ProviderError, TranslationError};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use subtitle_processor::{SubtitleCollection, SubtitleEntry};
pub use translation::{
    BatchOptions, BatchReport, PipelineReport, ProgressLogger, TranslationBackend, TranslationService,
    translate_collection, translate_track,
};
