/*!
 * Database entity models.
 *
 * These structures map directly to the `subtitles` table.
 */

use serde::{Deserialize, Serialize};

use crate::subtitle_processor::Cue;

/// One stored cue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleRecord {
    /// Row ID
    pub id: i64,
    /// Medium the cue belongs to
    pub medium_id: i64,
    /// Start time in seconds
    pub start_time: f64,
    /// End time in seconds
    pub end_time: f64,
    /// Language code
    pub lang: String,
    /// Cue text as imported
    pub subtitle_text: String,
    /// Position of the cue in its source file
    pub cue_index: i64,
    /// Raw analyzer response, if one was stored
    pub analysis: Option<String>,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// Last update timestamp (RFC 3339)
    pub updated_at: String,
}

impl SubtitleRecord {
    /// Build an unsaved record from a parsed cue
    pub fn from_cue(medium_id: i64, lang: &str, cue: &Cue) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: 0,
            medium_id,
            start_time: cue.start,
            end_time: cue.end,
            lang: lang.to_string(),
            subtitle_text: cue.text.clone(),
            cue_index: cue.index as i64,
            analysis: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// The stored cue in parser form
    pub fn to_cue(&self) -> Cue {
        Cue::new(
            self.cue_index.max(0) as usize,
            self.start_time,
            self.end_time,
            self.subtitle_text.clone(),
        )
    }

    pub fn is_active_at(&self, time: f64) -> bool {
        self.start_time <= time && time < self.end_time
    }
}
