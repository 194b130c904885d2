/*!
 * Common test utilities for the rubyvtt test suite
 */

use std::path::{Path, PathBuf};
use std::fs;
use std::sync::Arc;
use anyhow::Result;
use tempfile::TempDir;

use rubyvtt::app_config::Config;
use rubyvtt::app_controller::Controller;
use rubyvtt::database::Repository;
use rubyvtt::providers::mock::MockProvider;

/// The sentence used in the segmentation instruction
pub const SAMPLE_SENTENCE: &str = "昨日、彼が私に本をくれた。";

/// Its tokens, punctuation left out
pub const SAMPLE_TOKENS: [&str; 8] = ["昨日", "彼", "が", "私", "に", "本", "を", "くれた"];

/// Route library logs through the test harness (RUST_LOG=debug to see them)
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a sample subtitle file for testing
///
/// Cue 3 ends before it starts and is dropped by the parser.
pub fn create_test_subtitle(dir: &Path, filename: &str) -> Result<PathBuf> {
    let content = "\u{feff}1\r\n00:00:05,000 --> 00:00:07,500\r\n本を読む\r\n\r\n2\r\n00:00:01.000 --> 00:00:04.000\r\n昨日、彼が私に本をくれた。\r\n\r\n3\r\n00:00:09,000 --> 00:00:08,000\r\n逆\r\n";
    create_test_file(dir, filename, content)
}

/// Analyzer reply for the sample sentence
pub fn sample_reply() -> String {
    MockProvider::analysis_reply(
        SAMPLE_SENTENCE,
        &[
            ("昨日", "きのう"),
            ("彼", "かれ"),
            ("が", ""),
            ("私", "わたし"),
            ("に", ""),
            ("本", "ほん"),
            ("を", ""),
            ("くれた", ""),
        ],
    )
}

/// Analyzer reply for "本を読む"
pub fn reading_reply() -> String {
    MockProvider::analysis_reply("本を読む", &[("本", "ほん"), ("を", ""), ("読む", "よむ")])
}

/// Config suitable for tests: no backoff, output under `dir`
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.output_dir = dir.join("out");
    config.database_path = Some(dir.join("test.db"));
    config.analyzer.common.retry_backoff_ms = 0;
    config
}

/// Controller backed by `provider` and an in-memory database
pub fn test_controller(dir: &Path, provider: &MockProvider) -> Result<(Controller, Repository)> {
    init_logging();
    let repo = Repository::new_in_memory()?;
    let controller = Controller::with_config(test_config(dir))?
        .with_provider(Arc::new(provider.clone()))
        .with_repository(repo.clone());
    Ok((controller, repo))
}
