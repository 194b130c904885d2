/*!
 * Structured-result extraction from free-form analyzer text.
 *
 * Analyzer answers are prose with JSON inside markdown fences, often with
 * invisible characters or trailing commas. Each fenced segment is cleaned and
 * parsed strictly; if that fails a lenient pass repairs common damage and
 * tries again. A segment that survives neither is an error for the whole
 * response so the adapter can ask again.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::errors::AnalysisError;

/// Fenced block, optional language tag, content captured non-greedily
static FENCE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n(.*?)```").unwrap()
});

/// Comma directly before a closing bracket or brace
static TRAILING_COMMA_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r",(\s*[}\]])").unwrap()
});

/// Which parser accepted a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    Strict,
    Lenient,
}

/// Extracted payload: either several candidates or a single keyed result
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredValue {
    Sequence(Vec<Value>),
    Mapping(Map<String, Value>),
}

impl StructuredValue {
    /// Classify a parsed value; scalars are not a usable shape
    pub fn from_value(value: Value) -> Result<Self, AnalysisError> {
        match value {
            Value::Array(items) => Ok(Self::Sequence(items)),
            Value::Object(map) => Ok(Self::Mapping(map)),
            other => Err(AnalysisError::UnexpectedResultShape(value_kind(&other).to_string())),
        }
    }

    /// Reduce to one mapping: a sequence yields its first element
    pub fn into_mapping(self) -> Result<Map<String, Value>, AnalysisError> {
        match self {
            Self::Mapping(map) => Ok(map),
            Self::Sequence(items) => match items.into_iter().next() {
                Some(first) => Self::from_value(first)?.into_mapping(),
                None => Err(AnalysisError::NoStructuredData),
            },
        }
    }
}

/// Extract and parse every structured payload in `text`.
///
/// A lone object comes back as `Mapping`; anything else as a `Sequence` with
/// one element per segment.
pub fn extract_structured(text: &str) -> Result<StructuredValue, AnalysisError> {
    let mut segments = fenced_segments(text);

    if segments.is_empty() {
        let trimmed = text.trim();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            debug!("No fenced block in analyzer response, parsing it whole");
            segments.push(trimmed.to_string());
        }
    }

    if segments.is_empty() {
        return Err(AnalysisError::NoStructuredData);
    }

    let mut values = Vec::with_capacity(segments.len());
    for segment in &segments {
        let (value, strategy) = parse_segment(segment)?;
        if strategy == ParseStrategy::Lenient {
            debug!("Segment accepted by lenient parser");
        }
        values.push(value);
    }

    if values.len() == 1 && values[0].is_object() {
        return StructuredValue::from_value(values.remove(0));
    }

    Ok(StructuredValue::Sequence(values))
}

/// Contents of every triple-backtick fence, trimmed
pub fn fenced_segments(text: &str) -> Vec<String> {
    FENCE_REGEX
        .captures_iter(text)
        .map(|caps| caps[1].trim().to_string())
        .collect()
}

/// Parse one segment, strictly first and then leniently
pub fn parse_segment(segment: &str) -> Result<(Value, ParseStrategy), AnalysisError> {
    let cleaned = clean_segment(segment);

    match serde_json::from_str::<Value>(&cleaned) {
        Ok(value) => Ok((value, ParseStrategy::Strict)),
        Err(strict_err) => {
            let repaired = lenient_repair(&cleaned);
            serde_json::from_str::<Value>(&repaired)
                .map(|value| (value, ParseStrategy::Lenient))
                .map_err(|lenient_err| {
                    AnalysisError::MalformedPayload(format!(
                        "strict: {}; lenient: {}",
                        strict_err, lenient_err
                    ))
                })
        }
    }
}

/// Cleanup applied before strict parsing
pub fn clean_segment(segment: &str) -> String {
    let visible: String = segment
        .replace("\r\n", "\n")
        .chars()
        .filter(|c| !is_invisible(*c))
        .collect();

    strip_trailing_commas(visible.trim())
}

/// Extra repairs for the compatibility pass
fn lenient_repair(cleaned: &str) -> String {
    let normalized: String = cleaned
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            _ => c,
        })
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .collect();

    strip_trailing_commas(outermost_span(&normalized))
}

/// Slice from the first opening bracket to the last closing one
fn outermost_span(text: &str) -> &str {
    let start = text.find(['{', '[']);
    let end = text.rfind(['}', ']']);

    match (start, end) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text,
    }
}

fn strip_trailing_commas(text: &str) -> String {
    TRAILING_COMMA_REGEX.replace_all(text, "$1").into_owned()
}

fn is_invisible(c: char) -> bool {
    matches!(c, '\u{200B}'..='\u{200D}' | '\u{2060}' | '\u{FEFF}')
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
