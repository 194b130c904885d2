/*!
 * Linguistic annotation of cue text.
 *
 * The analyzer (an LLM behind a `Provider`) is asked to segment a cue into
 * words and give reading markup for each. Its free-form answer goes through:
 *
 * - `prompt`: the fixed instruction sent to the analyzer
 * - `extractor`: fenced JSON extraction with cleanup and a lenient fallback
 * - `adapter`: the bounded retry loop around the analyzer call
 * - `reconstruct`: aligning tokens back onto the raw text and wrapping them
 */

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::AnalysisError;

pub mod adapter;
pub mod extractor;
pub mod prompt;
pub mod reconstruct;

pub use self::adapter::{AnalyzerAdapter, MAX_RETRIES};
pub use self::extractor::{extract_structured, StructuredValue};
pub use self::prompt::{build_instruction, sentence_of};
pub use self::reconstruct::{annotate_text, reconstruct, Reconstruction, WordIndex};

/// One analyzed word
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WordInfo {
    /// Surface form as written in the input
    #[serde(default, deserialize_with = "null_as_default")]
    pub orthography: String,

    /// Ruby markup for the word, absent for kana-only words
    #[serde(default)]
    pub ruby_html: Option<String>,
}

impl WordInfo {
    pub fn new(orthography: impl Into<String>, ruby_html: Option<&str>) -> Self {
        Self {
            orthography: orthography.into(),
            ruby_html: ruby_html.map(str::to_string),
        }
    }

    /// Markup to emit for this word, if there is any
    pub fn annotation(&self) -> Option<&str> {
        self.ruby_html.as_deref().filter(|markup| !markup.trim().is_empty())
    }
}

/// Structured analyzer output for a single cue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Echo of the analyzed sentence
    #[serde(default)]
    pub input: Option<String>,

    /// Segmentation of the input, in order
    #[serde(default, rename = "wakachigaki", alias = "tokens", deserialize_with = "null_as_default")]
    pub tokens: Vec<String>,

    /// Per-word details
    #[serde(default, deserialize_with = "null_as_default")]
    pub words: Vec<WordInfo>,
}

impl AnalysisResult {
    /// Normalize an extracted value and read it as an analysis result
    pub fn from_structured(value: StructuredValue) -> Result<Self, AnalysisError> {
        let mapping = value.into_mapping()?;
        serde_json::from_value(Value::Object(mapping))
            .map_err(|e| AnalysisError::MalformedPayload(e.to_string()))
    }
}

/// Treat an explicit JSON `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
