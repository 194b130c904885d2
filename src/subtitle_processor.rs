use std::fmt;
use std::path::{Path, PathBuf};
use regex::Regex;
use once_cell::sync::Lazy;
use anyhow::{Result, Context};
use log::{debug, warn};

use crate::errors::CueError;
use crate::file_utils::FileManager;
use crate::timecode::{format_timecode, parse_timecode};

// @module: Subtitle cue parsing and validation

// @const: Time-range line, either millisecond separator
static TIME_RANGE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2}:\d{2}:\d{2}(?:[.,]\d{1,3})?)\s*-->\s*(\d{1,2}:\d{2}:\d{2}(?:[.,]\d{1,3})?)").unwrap()
});

// @const: One or more blank lines between blocks
static BLOCK_SEPARATOR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n(?:[ \t]*\n)+").unwrap()
});

// @struct: Single timed cue
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    // @field: 1-based position in parse order
    pub index: usize,

    // @field: Start time in seconds
    pub start: f64,

    // @field: End time in seconds
    pub end: f64,

    // @field: Cue text, lines joined by '\n'
    pub text: String,
}

impl Cue {
    pub fn new(index: usize, start: f64, end: f64, text: impl Into<String>) -> Self {
        Cue {
            index,
            start,
            end,
            text: text.into(),
        }
    }

    // @validates: Time ordering and non-empty text
    pub fn validate(&self) -> Result<(), CueError> {
        if self.end <= self.start {
            return Err(CueError::CueOrderingViolation {
                index: self.index,
                start: self.start,
                end: self.end,
            });
        }

        if self.text.trim().is_empty() {
            return Err(CueError::EmptyCueText { index: self.index });
        }

        Ok(())
    }

    /// Length of the cue in seconds, never negative
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Whether the cue is on screen at `time` seconds
    pub fn is_active_at(&self, time: f64) -> bool {
        self.start <= time && time < self.end
    }

    /// The `start --> end` line in VTT form
    pub fn time_range(&self) -> String {
        format!("{} --> {}", format_timecode(self.start), format_timecode(self.end))
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.time_range())?;
        writeln!(f, "{}", self.text)
    }
}

/// Collection of cues read from one source
#[derive(Debug)]
pub struct SubtitleCollection {
    /// Source filename
    pub source_file: PathBuf,

    /// Validated cues in parse order
    pub cues: Vec<Cue>,
}

impl SubtitleCollection {
    /// Create an empty collection
    pub fn new(source_file: PathBuf) -> Self {
        SubtitleCollection {
            source_file,
            cues: Vec::new(),
        }
    }

    /// Read and parse an SRT file, dropping invalid cues
    pub fn from_srt_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = FileManager::read_to_string(path)
            .with_context(|| format!("Failed to read subtitle file: {}", path.display()))?;

        let mut collection = Self::from_srt_string(&content);
        collection.source_file = path.to_path_buf();
        debug!("Parsed {} cues from {}", collection.cues.len(), path.display());
        Ok(collection)
    }

    /// Parse SRT content, dropping invalid cues
    pub fn from_srt_string(content: &str) -> Self {
        let cues = Self::retain_valid(Self::parse_cue_blocks(content));
        SubtitleCollection {
            source_file: PathBuf::new(),
            cues,
        }
    }

    /// Split raw subtitle text into cues.
    ///
    /// Blocks are separated by blank lines. A purely numeric first line is
    /// dropped, the next line must be a time range, and the remaining lines
    /// form the text. Blocks without a time range are skipped. Cues are
    /// numbered from 1 in parse order whatever numbering the source used.
    pub fn parse_cue_blocks(content: &str) -> Vec<Cue> {
        let normalized = content
            .trim_start_matches('\u{feff}')
            .replace("\r\n", "\n")
            .replace('\r', "\n");

        let mut cues = Vec::new();

        for block in BLOCK_SEPARATOR_REGEX.split(&normalized) {
            let mut lines: Vec<&str> = block.lines().collect();

            // Leading and trailing blank lines are not part of the block
            while lines.first().is_some_and(|l| l.trim().is_empty()) {
                lines.remove(0);
            }
            if lines.is_empty() {
                continue;
            }

            let mut rest = lines.as_slice();
            if rest[0].trim().chars().all(|c| c.is_ascii_digit()) {
                rest = &rest[1..];
            }

            let Some((time_line, text_lines)) = rest.split_first() else {
                debug!("{}", CueError::MalformedCueBlock { block: lines[0].to_string() });
                continue;
            };

            let Some(caps) = TIME_RANGE_REGEX.captures(time_line) else {
                debug!("{}", CueError::MalformedCueBlock { block: time_line.to_string() });
                continue;
            };

            let range = parse_timecode(&caps[1]).and_then(|start| {
                parse_timecode(&caps[2]).map(|end| (start, end))
            });

            match range {
                Ok((start, end)) => {
                    cues.push(Cue::new(cues.len() + 1, start, end, text_lines.join("\n")));
                }
                Err(e) => {
                    warn!("Skipping block with bad time range '{}': {}", time_line.trim(), e);
                }
            }
        }

        cues
    }

    /// Drop cues that end before they start or have no text
    pub fn retain_valid(cues: Vec<Cue>) -> Vec<Cue> {
        let total = cues.len();
        let valid: Vec<Cue> = cues
            .into_iter()
            .filter(|cue| match cue.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!("Skipping invalid cue: {}", e);
                    false
                }
            })
            .collect();

        if valid.len() < total {
            warn!("Dropped {} of {} cues", total - valid.len(), total);
        }

        valid
    }

    /// Cues active at the given time
    pub fn cues_at(&self, time: f64) -> Vec<&Cue> {
        self.cues.iter().filter(|cue| cue.is_active_at(time)).collect()
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }
}

impl fmt::Display for SubtitleCollection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Subtitle Collection")?;
        writeln!(f, "Source: {:?}", self.source_file)?;
        writeln!(f, "Cues: {}", self.cues.len())?;
        Ok(())
    }
}
