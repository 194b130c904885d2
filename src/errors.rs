/*!
 * Error types for the rubyvtt application.
 *
 * This module contains custom error types for the different stages of the
 * pipeline, using the thiserror crate for ergonomic error definitions.
 */

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

/// Errors that can occur while reading cues
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CueError {
    /// A timestamp did not match the timecode grammar
    #[error("Unparsable timecode: {0}")]
    TimecodeFormat(String),

    /// A block without a recognizable time-range line
    #[error("Malformed cue block: {block}")]
    MalformedCueBlock {
        /// First line of the offending block
        block: String,
    },

    /// A cue whose end does not come after its start
    #[error("Cue {index}: end time {end} must be greater than start time {start}")]
    CueOrderingViolation {
        index: usize,
        start: f64,
        end: f64,
    },

    /// A cue with no visible text
    #[error("Cue {index} has empty text")]
    EmptyCueText { index: usize },
}

/// Errors raised while turning cue text into annotated text
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The analyzer response contained no usable structured payload
    #[error("No structured data found in analyzer response")]
    NoStructuredData,

    /// A payload was found but could not be parsed, even leniently
    #[error("Malformed structured payload: {0}")]
    MalformedPayload(String),

    /// The payload parsed to something other than a list or a map
    #[error("Expected a sequence or a mapping, got {0}")]
    UnexpectedResultShape(String),

    /// The analyzer call itself failed
    #[error("Analyzer unavailable: {0}")]
    AnalyzerUnavailable(#[from] ProviderError),

    /// The analyzer call did not finish in time
    #[error("Analyzer timed out after {0:?}")]
    AnalyzerTimeout(Duration),

    /// Every attempt failed; this is terminal for the cue
    #[error("Analysis exhausted after {attempts} attempts: {last}")]
    AnalysisExhausted {
        /// Number of analyzer attempts made
        attempts: u32,
        /// The failure of the final attempt
        last: Box<AnalysisError>,
    },
}

impl AnalysisError {
    /// Short, stable name of the failure kind for reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoStructuredData => "no_structured_data",
            Self::MalformedPayload(_) => "malformed_payload",
            Self::UnexpectedResultShape(_) => "unexpected_result_shape",
            Self::AnalyzerUnavailable(_) => "analyzer_unavailable",
            Self::AnalyzerTimeout(_) => "analyzer_timeout",
            Self::AnalysisExhausted { .. } => "analysis_exhausted",
        }
    }
}

/// Errors that abort a whole timeline build
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The build was cancelled before all cues completed
    #[error("Timeline build cancelled")]
    Cancelled,

    /// The finished document could not be stored
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from cue parsing
    #[error("Cue error: {0}")]
    Cue(#[from] CueError),

    /// Error from analysis
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    /// Error from the timeline build
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
