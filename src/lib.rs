/*!
 * # rubyvtt - furigana for subtitles
 *
 * A Rust library that turns SRT-style subtitle cues into WebVTT documents
 * whose words carry ruby readings produced by a language model.
 *
 * ## Features
 *
 * - Lenient cue parsing (comma or dot milliseconds, stray numbering, BOM)
 * - Word segmentation and readings from various LLM providers:
 *   - OpenAI-compatible APIs (OpenAI, LM Studio)
 *   - Ollama (local LLM)
 *   - Anthropic API
 * - Bounded retries with cached raw responses
 * - Concurrent, cancellable annotation of whole timelines
 * - SQLite storage of cues per medium and language
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `timecode`: `HH:MM:SS.mmm` parsing and formatting
 * - `subtitle_processor`: Cue block parsing and validation
 * - `analysis`: Everything between a cue's text and its annotated text:
 *   - `analysis::prompt`: The segmentation instruction
 *   - `analysis::extractor`: Structured data out of free-form replies
 *   - `analysis::adapter`: Bounded-retry analyzer calls
 *   - `analysis::reconstruct`: Token alignment and ruby wrapping
 * - `timeline`: Concurrent annotation and WebVTT rendering
 * - `storage`: Where rendered documents are written
 * - `database`: SQLite persistence of imported cues
 * - `providers`: Client implementations for various LLM providers
 * - `app_config`: Configuration management
 * - `app_controller`: Import, export and annotate workflows
 * - `language_utils`: ISO language code utilities
 * - `file_utils`: File system operations
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
pub mod analysis;
pub mod app_config;
pub mod app_controller;
pub mod database;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod storage;
pub mod subtitle_processor;
pub mod timecode;
pub mod timeline;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::Controller;
pub use subtitle_processor::{Cue, SubtitleCollection};
pub use timeline::{render_document, RenderedCue, TimelineBuilder, TimelineReport};
pub use analysis::{AnalyzerAdapter, AnalysisResult};
pub use language_utils::{language_codes_match, normalize_language_code, get_language_name};
pub use errors::{AppError, AnalysisError, CueError, PipelineError, ProviderError};
