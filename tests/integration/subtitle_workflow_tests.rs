/*!
 * Integration tests for the import, export and annotate workflows
 */

use anyhow::Result;

use rubyvtt::app_config::Config;
use rubyvtt::app_controller::Controller;
use rubyvtt::providers::mock::MockProvider;
use rubyvtt::storage::{DocumentStore, FileStore};
use crate::common::{self, SAMPLE_SENTENCE};

fn keyed_provider() -> MockProvider {
    MockProvider::keyed(
        vec![
            (SAMPLE_SENTENCE, common::sample_reply()),
            ("本を読む", common::reading_reply()),
        ],
        "unexpected cue",
    )
}

#[tokio::test]
async fn test_export_withoutAnnotation_shouldWriteSortedPlainDocument() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "episode.srt")?;
    let output = temp_dir.path().join("out").join("episode.vtt");
    let provider = MockProvider::failing();
    let (controller, _repo) = common::test_controller(temp_dir.path(), &provider)?;

    controller.export(&input, Some(&output), false).await?;

    let document = std::fs::read_to_string(&output)?;
    assert!(document.starts_with("WEBVTT\n\nSTYLE\n"));
    let first = document.find(SAMPLE_SENTENCE).unwrap();
    let second = document.find("本を読む").unwrap();
    assert!(first < second, "cues should be in start-time order");
    assert!(!document.contains("逆"));
    assert_eq!(provider.request_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_export_withAnnotation_shouldAddRuby() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "episode.srt")?;
    let provider = keyed_provider();
    let (controller, _repo) = common::test_controller(temp_dir.path(), &provider)?;

    let document = String::from_utf8(controller.render_file(&input, true).await?)?;

    assert!(document.contains("<ruby>昨日<rt>きのう</rt></ruby>"));
    assert!(document.contains("<ruby>読む<rt>よむ</rt></ruby>"));
    assert_eq!(provider.request_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_export_withMissingInput_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let provider = MockProvider::failing();
    let (controller, _repo) = common::test_controller(temp_dir.path(), &provider)?;

    let result = controller
        .export(&temp_dir.path().join("missing.srt"), None, false)
        .await;

    assert!(result.is_err());
    Ok(())
}

#[tokio::test]
async fn test_import_shouldReportCountAndReplacement() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "episode.srt")?;
    let provider = MockProvider::failing();
    let (controller, repo) = common::test_controller(temp_dir.path(), &provider)?;

    let first = controller.import(&input, 42, None, false).await?;
    assert_eq!(first, "Imported 2 subtitles into medium_id=42 lang=ja");

    let second = controller.import(&input, 42, Some("jpn"), true).await?;
    assert_eq!(second, "Imported 2 subtitles into medium_id=42 lang=ja (replaced existing)");
    assert_eq!(repo.count_cues(42, "ja").await?, 2);
    Ok(())
}

#[tokio::test]
async fn test_import_withInvalidLanguage_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "episode.srt")?;
    let provider = MockProvider::failing();
    let (controller, repo) = common::test_controller(temp_dir.path(), &provider)?;

    assert!(controller.import(&input, 1, Some("klingonese"), false).await.is_err());
    assert_eq!(repo.count_cues(1, "ja").await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_annotateMedium_shouldWriteDocumentAndCacheResponses() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "episode.srt")?;
    let provider = keyed_provider();
    let (controller, repo) = common::test_controller(temp_dir.path(), &provider)?;
    controller.import(&input, 7, None, false).await?;

    let summary = controller.annotate_medium(7, None).await?;

    assert_eq!(summary.total, 2);
    assert_eq!(summary.annotated, 2);
    assert!(summary.failures.is_empty());
    assert_eq!(summary.path, temp_dir.path().join("out").join("7.ja.vtt"));
    let document = std::fs::read_to_string(&summary.path)?;
    assert!(document.contains("<c.w_"));
    assert!(repo.list_cues(7, "ja").await?.iter().all(|r| r.analysis.is_some()));

    // Second run is served from the stored responses
    let again = controller.annotate_medium(7, None).await?;
    assert_eq!(again.annotated, 2);
    assert_eq!(provider.request_count(), 2);
    assert_eq!(std::fs::read_to_string(&again.path)?, document);
    Ok(())
}

#[tokio::test]
async fn test_annotateMedium_withFailingAnalyzer_shouldFallBackAndReport() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "episode.srt")?;
    let provider = MockProvider::failing();
    let (controller, repo) = common::test_controller(temp_dir.path(), &provider)?;
    controller.import(&input, 8, None, false).await?;

    let store = FileStore::new(temp_dir.path().join("store"));
    let summary = controller.annotate_medium_into(8, None, &store).await?;

    assert_eq!(summary.failures.len(), 2);
    assert!(summary.failures.iter().all(|f| f.kind == "analysis_exhausted"));
    assert_eq!(summary.path, store.location("8.ja"));
    let document = std::fs::read_to_string(&summary.path)?;
    assert!(document.contains("本を読む"));
    assert!(repo.list_cues(8, "ja").await?.iter().all(|r| r.analysis.is_none()));
    Ok(())
}

#[tokio::test]
async fn test_annotateMedium_withUnusableCache_shouldClearIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "episode.srt")?;
    let provider = MockProvider::failing();
    let (controller, repo) = common::test_controller(temp_dir.path(), &provider)?;
    controller.import(&input, 9, None, false).await?;

    let records = repo.list_cues(9, "ja").await?;
    repo.save_analyses(vec![(records[0].id, "no json here".to_string())]).await?;

    let summary = controller.annotate_medium(9, None).await?;

    assert_eq!(summary.failures.len(), 2);
    assert!(repo.list_cues(9, "ja").await?.iter().all(|r| r.analysis.is_none()));
    Ok(())
}

#[tokio::test]
async fn test_annotateMedium_withNothingStored_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let provider = keyed_provider();
    let (controller, _repo) = common::test_controller(temp_dir.path(), &provider)?;

    assert!(controller.annotate_medium(99, None).await.is_err());
    assert_eq!(provider.request_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_cuesAt_shouldFindActiveCue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "episode.srt")?;
    let provider = MockProvider::failing();
    let (controller, _repo) = common::test_controller(temp_dir.path(), &provider)?;
    controller.import(&input, 5, None, false).await?;

    let active = controller.cues_at(5, None, 6.0).await?;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].subtitle_text, "本を読む");

    assert!(controller.cues_at(5, None, 4.5).await?.is_empty());
    assert!(controller.cues_at(5, None, -1.0).await.is_err());
    Ok(())
}

#[test]
fn test_controller_withInvalidConfig_shouldRefuse() {
    let mut config = Config::default();
    config.default_language = "??".to_string();
    assert!(Controller::with_config(config).is_err());
}
