/*!
 * SQLite connection handling.
 *
 * One connection behind a mutex; async callers go through
 * `spawn_blocking` so the runtime never waits on disk.
 */

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use rusqlite::{Connection, Transaction};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::schema;

const DB_FILENAME: &str = "rubyvtt.db";
const DB_DIRNAME: &str = "rubyvtt";
const IN_MEMORY: &str = ":memory:";

/// Shared handle on the cue database
#[derive(Clone)]
pub struct DatabaseConnection {
    db_path: PathBuf,
    connection: Arc<Mutex<Connection>>,
}

impl DatabaseConnection {
    /// Open (or create) the database file, creating parent directories
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {}", parent.display()))?;
        }

        info!("Opening cue database at {}", db_path.display());
        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open database: {}", db_path.display()))?;

        Self::wrap(conn, db_path)
    }

    /// Throwaway database, used by tests
    pub fn new_in_memory() -> Result<Self> {
        debug!("Creating in-memory cue database");
        let conn = Connection::open_in_memory().context("Failed to create in-memory database")?;
        Self::wrap(conn, PathBuf::from(IN_MEMORY))
    }

    fn wrap(conn: Connection, db_path: PathBuf) -> Result<Self> {
        schema::initialize_schema(&conn)?;
        Ok(Self {
            db_path,
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// `<local data dir>/rubyvtt/rubyvtt.db`, or the working directory when
    /// the platform has no data directory
    pub fn default_database_path() -> PathBuf {
        dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DB_DIRNAME)
            .join(DB_FILENAME)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn lock(connection: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
        connection
            .lock()
            .map_err(|e| anyhow!("Failed to acquire database lock: {}", e))
    }

    /// Run `f` against the connection on the blocking pool
    pub async fn execute_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let connection = Arc::clone(&self.connection);

        tokio::task::spawn_blocking(move || f(&*Self::lock(&connection)?))
            .await
            .context("Database task panicked")?
    }

    /// Run `f` inside a transaction on the blocking pool.
    ///
    /// The transaction commits only when `f` succeeds; any error rolls back.
    pub async fn transaction_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let connection = Arc::clone(&self.connection);

        tokio::task::spawn_blocking(move || {
            let mut conn = Self::lock(&connection)?;
            let tx = conn.transaction()?;
            let value = f(&tx)?;
            tx.commit()?;
            Ok(value)
        })
        .await
        .context("Database transaction task panicked")?
    }

    /// Row counts and file size
    pub fn stats(&self) -> Result<DatabaseStats> {
        let conn = Self::lock(&self.connection)?;
        let (subtitle_count, medium_count, analyzed_count): (i64, i64, i64) = conn
            .query_row(
                "SELECT COUNT(*), COUNT(DISTINCT medium_id), COUNT(analysis) FROM subtitles",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .context("Failed to count subtitles")?;
        drop(conn);

        let file_size_bytes = if self.db_path.as_os_str() == IN_MEMORY {
            0
        } else {
            std::fs::metadata(&self.db_path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(DatabaseStats {
            subtitle_count,
            medium_count,
            analyzed_count,
            file_size_bytes,
        })
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    /// Stored cues across all media
    pub subtitle_count: i64,
    /// Distinct media
    pub medium_count: i64,
    /// Cues with a cached analyzer response
    pub analyzed_count: i64,
    pub file_size_bytes: u64,
}

impl std::fmt::Display for DatabaseStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Subtitles: {}, Media: {}, Analyzed: {}, Size: {} KB",
            self.subtitle_count,
            self.medium_count,
            self.analyzed_count,
            self.file_size_bytes / 1024
        )
    }
}
