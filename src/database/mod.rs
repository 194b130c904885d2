/*!
 * SQLite persistence for imported cues.
 *
 * Each row is one cue of one medium in one language, along with the raw
 * analyzer response once a cue has been annotated.
 */

pub mod schema;
pub mod connection;
pub mod repository;
pub mod models;

pub use connection::{DatabaseConnection, DatabaseStats};
pub use models::SubtitleRecord;
pub use repository::Repository;
