/*!
 * Token alignment and annotation markup.
 *
 * Analyzer tokens are located in the original cue text left to right. Text
 * between tokens is copied verbatim so punctuation and spacing the analyzer
 * dropped still reach the output. A token that cannot be found is emitted
 * anyway and recorded, which lets callers flag the cue as degraded.
 */

use std::collections::HashMap;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use super::{AnalysisResult, WordInfo};

/// VTT class spans, ruby wrappers and their readings
static MARKUP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<rt>.*?</rt>|<rp>.*?</rp>|</?ruby>|<c(?:\.[^>]*)?>|</c>").unwrap()
});

static READING_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<rt>(.*?)</rt>").unwrap());

/// Words grouped by surface form, in analyzer order
#[derive(Debug, Default)]
pub struct WordIndex {
    entries: HashMap<String, Vec<WordInfo>>,
}

impl WordIndex {
    pub fn build(words: &[WordInfo]) -> Self {
        let mut entries: HashMap<String, Vec<WordInfo>> = HashMap::new();
        for word in words {
            entries
                .entry(word.orthography.clone())
                .or_default()
                .push(word.clone());
        }
        Self { entries }
    }

    /// First entry recorded for `surface`
    pub fn lookup(&self, surface: &str) -> Option<&WordInfo> {
        self.entries.get(surface).and_then(|group| group.first())
    }

    /// Number of distinct surface forms
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Annotated text plus the tokens that could not be placed
#[derive(Debug, Clone, PartialEq)]
pub struct Reconstruction {
    pub text: String,
    pub unmatched_tokens: Vec<String>,
}

impl Reconstruction {
    /// Every token was found in order in the input
    pub fn is_exact(&self) -> bool {
        self.unmatched_tokens.is_empty()
    }
}

/// Stable 8-character label for a surface form
pub fn token_label(surface: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(surface.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..8].to_string()
}

/// Wrap a token in its class span, or return it unchanged when it has no reading
pub fn wrap_token(token: &str, index: &WordIndex) -> String {
    let Some(info) = index.lookup(token) else {
        return token.to_string();
    };

    match info.annotation().and_then(|markup| ruby_for(token, markup)) {
        Some(ruby) => format!("<c.w_{}>{}</c>", token_label(&info.orthography), ruby),
        None => token.to_string(),
    }
}

/// Markup whose base text is exactly `token`.
///
/// Analyzer markup is kept when its base text matches; otherwise the ruby is
/// rebuilt around the token from the `<rt>` readings. No readings, no markup.
fn ruby_for(token: &str, markup: &str) -> Option<String> {
    if strip_markup(markup) == token {
        return Some(markup.to_string());
    }

    let readings: String = READING_REGEX
        .captures_iter(markup)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .collect();

    if readings.is_empty() {
        debug!("Dropping markup '{}' for token '{}'", markup, token);
        return None;
    }

    Some(format!("<ruby>{}<rt>{}</rt></ruby>", token, readings))
}

/// Rebuild `input` with every token wrapped
pub fn reconstruct(input: &str, tokens: &[String], index: &WordIndex) -> Reconstruction {
    let mut text = String::with_capacity(input.len() * 2);
    let mut unmatched_tokens = Vec::new();
    let mut position = 0;

    for token in tokens.iter().filter(|t| !t.is_empty()) {
        match input[position..].find(token.as_str()) {
            Some(offset) => {
                let found = position + offset;
                text.push_str(&input[position..found]);
                text.push_str(&wrap_token(token, index));
                position = found + token.len();
            }
            None => {
                debug!("Token '{}' not found after byte {}", token, position);
                text.push_str(&wrap_token(token, index));
                unmatched_tokens.push(token.clone());
            }
        }
    }

    text.push_str(&input[position..]);

    Reconstruction {
        text,
        unmatched_tokens,
    }
}

/// Annotate cue text with an analysis result.
///
/// The cue's own text wins; the analyzer's echo of the input is only used
/// when the cue text is blank.
pub fn annotate_text(source_text: &str, result: &AnalysisResult) -> Reconstruction {
    let input = if source_text.trim().is_empty() {
        result.input.as_deref().unwrap_or_default()
    } else {
        source_text
    };

    let index = WordIndex::build(&result.words);
    reconstruct(input, &result.tokens, &index)
}

/// Remove annotation markup, keeping base text
pub fn strip_markup(text: &str) -> String {
    MARKUP_REGEX.replace_all(text, "").into_owned()
}
