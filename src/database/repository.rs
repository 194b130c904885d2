/*!
 * Repository layer for stored cues.
 *
 * Cues are grouped by `(medium_id, lang)`. Every read returns them in
 * timeline order: start time first, source position second.
 */

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::{params, Connection};
use std::path::Path;

use super::connection::DatabaseConnection;
use super::models::SubtitleRecord;
use crate::subtitle_processor::Cue;

const SELECT_COLUMNS: &str = "id, medium_id, start_time, end_time, lang, subtitle_text, \
     cue_index, analysis, created_at, updated_at";

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Open (or create) the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(DatabaseConnection::new(path)?))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    fn parse_row(row: &rusqlite::Row) -> rusqlite::Result<SubtitleRecord> {
        Ok(SubtitleRecord {
            id: row.get(0)?,
            medium_id: row.get(1)?,
            start_time: row.get(2)?,
            end_time: row.get(3)?,
            lang: row.get(4)?,
            subtitle_text: row.get(5)?,
            cue_index: row.get(6)?,
            analysis: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    // =========================================================================
    // Import
    // =========================================================================

    /// Store `cues` for a medium in one transaction and return how many were written.
    ///
    /// Cues with `end <= start` or blank text are skipped. With `replace`,
    /// the existing cues of `(medium_id, lang)` are deleted first; if any
    /// insert fails nothing changes.
    pub async fn import_cues(
        &self,
        medium_id: i64,
        lang: &str,
        cues: Vec<Cue>,
        replace: bool,
    ) -> Result<usize> {
        let lang = lang.to_string();

        self.db
            .transaction_async(move |tx| {
                if replace {
                    let removed = tx.execute(
                        "DELETE FROM subtitles WHERE medium_id = ?1 AND lang = ?2",
                        params![medium_id, lang],
                    )?;
                    debug!("Removed {} existing cues for medium {} ({})", removed, medium_id, lang);
                }

                let mut inserted = 0;
                let mut stmt = tx.prepare(
                    r#"
                    INSERT INTO subtitles (
                        medium_id, start_time, end_time, lang, subtitle_text,
                        cue_index, analysis, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    "#,
                )?;

                for cue in cues.iter().filter(|c| c.validate().is_ok()) {
                    let record = SubtitleRecord::from_cue(medium_id, &lang, cue);
                    stmt.execute(params![
                        record.medium_id,
                        record.start_time,
                        record.end_time,
                        record.lang,
                        record.subtitle_text,
                        record.cue_index,
                        record.analysis,
                        record.created_at,
                        record.updated_at,
                    ])
                    .with_context(|| format!("Failed to insert cue {}", cue.index))?;
                    inserted += 1;
                }

                info!("Stored {} cues for medium {} ({})", inserted, medium_id, lang);
                Ok(inserted)
            })
            .await
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// All cues of a medium in timeline order
    pub async fn list_cues(&self, medium_id: i64, lang: &str) -> Result<Vec<SubtitleRecord>> {
        let lang = lang.to_string();

        self.db
            .execute_async(move |conn| {
                let sql = format!(
                    "SELECT {} FROM subtitles WHERE medium_id = ?1 AND lang = ?2 \
                     ORDER BY start_time, cue_index",
                    SELECT_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![medium_id, lang], Self::parse_row)?;

                let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(records)
            })
            .await
    }

    /// Cues on screen at `time` seconds (`start_time <= t < end_time`)
    pub async fn cues_at(&self, medium_id: i64, lang: &str, time: f64) -> Result<Vec<SubtitleRecord>> {
        let lang = lang.to_string();

        self.db
            .execute_async(move |conn| {
                let sql = format!(
                    "SELECT {} FROM subtitles \
                     WHERE medium_id = ?1 AND lang = ?2 AND start_time <= ?3 AND end_time > ?3 \
                     ORDER BY start_time, cue_index",
                    SELECT_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![medium_id, lang, time], Self::parse_row)?;

                let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(records)
            })
            .await
    }

    /// Number of stored cues for a medium
    pub async fn count_cues(&self, medium_id: i64, lang: &str) -> Result<i64> {
        let lang = lang.to_string();

        self.db
            .execute_async(move |conn| Self::count_cues_sync(conn, medium_id, &lang))
            .await
    }

    fn count_cues_sync(conn: &Connection, medium_id: i64, lang: &str) -> Result<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM subtitles WHERE medium_id = ?1 AND lang = ?2",
            params![medium_id, lang],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // =========================================================================
    // Cached analyzer responses
    // =========================================================================

    /// Store raw analyzer responses keyed by row ID
    pub async fn save_analyses(&self, analyses: Vec<(i64, String)>) -> Result<usize> {
        if analyses.is_empty() {
            return Ok(0);
        }

        self.db
            .transaction_async(move |tx| {
                let now = chrono::Utc::now().to_rfc3339();
                let mut stmt = tx.prepare(
                    "UPDATE subtitles SET analysis = ?1, updated_at = ?2 WHERE id = ?3",
                )?;

                let mut updated = 0;
                for (id, raw) in &analyses {
                    updated += stmt.execute(params![raw, now, id])?;
                }
                debug!("Cached {} analyzer responses", updated);
                Ok(updated)
            })
            .await
    }

    /// Forget the cached response of a single cue
    pub async fn clear_analysis(&self, id: i64) -> Result<bool> {
        self.db
            .execute_async(move |conn| {
                let updated = conn.execute(
                    "UPDATE subtitles SET analysis = NULL, updated_at = ?1 WHERE id = ?2",
                    params![chrono::Utc::now().to_rfc3339(), id],
                )?;
                Ok(updated > 0)
            })
            .await
    }

    /// Forget every cached response of a medium
    pub async fn clear_medium_analyses(&self, medium_id: i64, lang: &str) -> Result<usize> {
        let lang = lang.to_string();

        self.db
            .execute_async(move |conn| {
                let updated = conn.execute(
                    "UPDATE subtitles SET analysis = NULL, updated_at = ?1 \
                     WHERE medium_id = ?2 AND lang = ?3 AND analysis IS NOT NULL",
                    params![chrono::Utc::now().to_rfc3339(), medium_id, lang],
                )?;
                Ok(updated)
            })
            .await
    }
}
