/*!
 * Tests for cue persistence
 */

use rubyvtt::database::{DatabaseConnection, Repository};
use rubyvtt::subtitle_processor::{Cue, SubtitleCollection};
use crate::common;

#[tokio::test]
async fn test_repository_onDisk_shouldPersistAcrossReopen() -> anyhow::Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let db_path = temp_dir.path().join("nested").join("cues.db");

    {
        let repo = Repository::open(&db_path)?;
        let cues = vec![Cue::new(1, 0.5, 1.5, "一"), Cue::new(2, 2.0, 3.0, "二")];
        assert_eq!(repo.import_cues(9, "ja", cues, false).await?, 2);
    }

    let reopened = Repository::open(&db_path)?;
    let records = reopened.list_cues(9, "ja").await?;
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].to_cue(), Cue::new(2, 2.0, 3.0, "二"));

    let stats = reopened.connection().stats()?;
    assert_eq!(stats.subtitle_count, 2);
    assert_eq!(stats.medium_count, 1);
    Ok(())
}

#[tokio::test]
async fn test_importCues_fromParsedFile_shouldKeepTimelineOrder() -> anyhow::Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_subtitle(temp_dir.path(), "episode.srt")?;
    let collection = SubtitleCollection::from_srt_file(&path)?;

    let repo = Repository::new_in_memory()?;
    repo.import_cues(1, "ja", collection.cues, true).await?;

    let records = repo.list_cues(1, "ja").await?;
    let starts: Vec<f64> = records.iter().map(|r| r.start_time).collect();
    assert_eq!(starts, vec![1.0, 5.0]);
    assert_eq!(records[0].cue_index, 2);
    Ok(())
}

#[tokio::test]
async fn test_cuesAt_withOverlappingCues_shouldReturnAllActive() -> anyhow::Result<()> {
    let repo = Repository::new_in_memory()?;
    let cues = vec![
        Cue::new(1, 0.0, 4.0, "長い"),
        Cue::new(2, 2.0, 3.0, "短い"),
    ];
    repo.import_cues(3, "ja", cues, false).await?;

    let active = repo.cues_at(3, "ja", 2.5).await?;
    assert_eq!(active.len(), 2);
    assert_eq!(active[0].subtitle_text, "長い");

    assert_eq!(repo.cues_at(3, "ja", 3.0).await?.len(), 1);
    Ok(())
}

#[test]
fn test_databaseConnection_defaultPath_shouldEndWithDatabaseName() {
    let path = DatabaseConnection::default_database_path();
    assert!(path.ends_with("rubyvtt/rubyvtt.db"));
}
