use anyhow::{Result, Context, anyhow};
use log::{info, warn, debug};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;

use crate::analysis::AnalyzerAdapter;
use crate::app_config::Config;
use crate::database::{Repository, SubtitleRecord};
use crate::errors::PipelineError;
use crate::file_utils::FileManager;
use crate::language_utils;
use crate::providers::{self, Provider};
use crate::storage::{DocumentStore, FileStore};
use crate::subtitle_processor::{Cue, SubtitleCollection};
use crate::timeline::{render_document, CueFailure, CueJob, CueStatus, RenderedCue, TimelineBuilder, TimelineReport};

// @module: Application controller for import, export and annotation

/// What an annotation run produced
#[derive(Debug, Clone)]
pub struct AnnotationSummary {
    /// Where the document was written
    pub path: PathBuf,
    /// Cues sent through the analyzer
    pub total: usize,
    /// Cues annotated with every token placed
    pub annotated: usize,
    /// Cues annotated with some tokens unplaced
    pub degraded: usize,
    /// Cues the analyzer gave up on
    pub failures: Vec<CueFailure>,
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Analyzer override; built from the config when absent
    provider: Option<Arc<dyn Provider>>,

    // @field: Repository override; opened from the config when absent
    repository: Option<Repository>,

    // @field: Flips to true when the user asks to stop
    cancel: watch::Receiver<bool>,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;

        // Nobody holds the sender: this controller is never cancelled
        let (_, cancel) = watch::channel(false);

        Ok(Self {
            config,
            provider: None,
            repository: None,
            cancel,
        })
    }

    /// Use `provider` instead of the one named in the config
    pub fn with_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Use `repository` instead of opening the configured database
    pub fn with_repository(mut self, repository: Repository) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Stop annotation runs when `cancel` turns true
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn repository(&self) -> Result<Repository> {
        match &self.repository {
            Some(repo) => Ok(repo.clone()),
            None => {
                let path = self.config.resolved_database_path();
                Repository::open(&path)
                    .with_context(|| format!("Failed to open database: {}", path.display()))
            }
        }
    }

    fn provider(&self) -> Result<Arc<dyn Provider>> {
        match &self.provider {
            Some(provider) => Ok(Arc::clone(provider)),
            None => providers::create_provider(&self.config.analyzer),
        }
    }

    fn resolve_language(&self, lang: Option<&str>) -> Result<String> {
        let lang = lang.unwrap_or(&self.config.default_language);
        language_utils::normalize_language_code(lang)
    }

    /// Timeline builder wired to the configured analyzer
    fn timeline_builder(&self, total: usize) -> Result<TimelineBuilder> {
        let analyzer = &self.config.analyzer;
        let adapter = AnalyzerAdapter::new(
            self.provider()?,
            Duration::from_secs(analyzer.get_timeout_secs()),
        )
        .with_backoff(Duration::from_millis(analyzer.common.retry_backoff_ms));

        info!(
            "Analyzer: {} - {}",
            analyzer.provider.display_name(),
            analyzer.get_model()
        );

        Ok(TimelineBuilder::new(adapter, analyzer.optimal_concurrent_requests())
            .fallback_to_plain_text(analyzer.common.fallback_to_plain_text)
            .with_progress(Self::progress_bar(total)))
    }

    fn progress_bar(total: usize) -> ProgressBar {
        let progress_bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} cues ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar.set_message("Annotating");
        progress_bar
    }

    async fn run_timeline(&self, jobs: Vec<CueJob>) -> Result<TimelineReport> {
        let start_time = std::time::Instant::now();
        let builder = self.timeline_builder(jobs.len())?;

        let report = builder.annotate(jobs, self.cancel.clone()).await?;

        info!(
            "Annotation finished in {}: {} annotated, {} degraded, {} failed",
            Self::format_duration(start_time.elapsed()),
            report.annotated_count(),
            report.degraded_count(),
            report.failures().len()
        );
        Ok(report)
    }

    // =========================================================================
    // export
    // =========================================================================

    /// Render a subtitle file as WebVTT, plain or annotated
    pub async fn render_file(&self, input: &Path, annotate: bool) -> Result<Vec<u8>> {
        let subtitles = SubtitleCollection::from_srt_file(input)?;
        debug!("{}", subtitles);

        if !annotate {
            let cues: Vec<RenderedCue> = subtitles.cues.iter().map(RenderedCue::plain).collect();
            return Ok(render_document(&cues));
        }

        let jobs = subtitles.cues.into_iter().map(CueJob::new).collect();
        let report = self.run_timeline(jobs).await?;
        Self::log_failures(&report.failures());
        Ok(report.render())
    }

    /// Export `input` to `output`, or to stdout when no output is given
    pub async fn export(&self, input: &Path, output: Option<&Path>, annotate: bool) -> Result<()> {
        if !FileManager::file_exists(input) {
            return Err(anyhow!("Input file does not exist: {}", input.display()));
        }

        let document = self.render_file(input, annotate).await?;

        match output {
            Some(path) => {
                FileManager::write_atomic(path, &document)?;
                info!("Success: {}", path.display());
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(&document).context("Failed to write to stdout")?;
                stdout.flush()?;
            }
        }

        Ok(())
    }

    // =========================================================================
    // import
    // =========================================================================

    /// Store the cues of `input` for a medium and return the summary line
    pub async fn import(
        &self,
        input: &Path,
        medium_id: i64,
        lang: Option<&str>,
        replace: bool,
    ) -> Result<String> {
        let lang = self.resolve_language(lang)?;
        let subtitles = SubtitleCollection::from_srt_file(input)?;

        let repo = self.repository()?;
        let count = repo.import_cues(medium_id, &lang, subtitles.cues, replace).await?;

        let mut message = format!(
            "Imported {} subtitles into medium_id={} lang={}",
            count, medium_id, lang
        );
        if replace {
            message.push_str(" (replaced existing)");
        }
        Ok(message)
    }

    // =========================================================================
    // annotate
    // =========================================================================

    /// Annotate the stored cues of a medium and write the document
    ///
    /// Cached analyzer responses are reused; new ones are saved back so the
    /// next run does not ask again.
    pub async fn annotate_medium(&self, medium_id: i64, lang: Option<&str>) -> Result<AnnotationSummary> {
        let store = FileStore::new(&self.config.output_dir);
        self.annotate_medium_into(medium_id, lang, &store).await
    }

    pub async fn annotate_medium_into(
        &self,
        medium_id: i64,
        lang: Option<&str>,
        store: &dyn DocumentStore,
    ) -> Result<AnnotationSummary> {
        let lang = self.resolve_language(lang)?;
        let repo = self.repository()?;

        let records = repo.list_cues(medium_id, &lang).await?;
        if records.is_empty() {
            return Err(anyhow!("No subtitles stored for medium_id={} lang={}", medium_id, lang));
        }

        let cached = records.iter().filter(|r| r.analysis.is_some()).count();
        info!(
            "Loaded {} cues for medium_id={} lang={} ({} with cached analysis)",
            records.len(), medium_id, lang, cached
        );

        // Timeline position doubles as the job index so duplicates stay distinct
        let jobs: Vec<CueJob> = records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let stored = record.to_cue();
                let cue = Cue::new(i + 1, stored.start, stored.end, stored.text);
                CueJob::with_cached(cue, record.analysis.clone())
            })
            .collect();

        let report = self.run_timeline(jobs).await?;

        let fresh = Self::fresh_responses(&records, &report);
        if !fresh.is_empty() {
            let saved = repo.save_analyses(fresh).await?;
            debug!("Saved {} new analyzer responses", saved);
        }

        for id in Self::stale_responses(&records, &report) {
            repo.clear_analysis(id).await?;
        }

        let identifier = format!("{}.{}", medium_id, lang);
        let path = store
            .write(&identifier, &report.render())
            .map_err(|e| PipelineError::Storage(e.to_string()))?;

        let failures = report.failures();
        Self::log_failures(&failures);

        Ok(AnnotationSummary {
            path,
            total: records.len(),
            annotated: report.annotated_count(),
            degraded: report.degraded_count(),
            failures,
        })
    }

    /// Responses that differ from what the database already holds
    fn fresh_responses(records: &[SubtitleRecord], report: &TimelineReport) -> Vec<(i64, String)> {
        report
            .outcomes
            .iter()
            .filter_map(|outcome| {
                let record = records.get(outcome.cue.index.checked_sub(1)?)?;
                let response = outcome.response.as_ref()?;
                if record.analysis.as_ref() == Some(response) {
                    None
                } else {
                    Some((record.id, response.clone()))
                }
            })
            .collect()
    }

    /// Rows whose cached response did not get their cue annotated
    fn stale_responses(records: &[SubtitleRecord], report: &TimelineReport) -> Vec<i64> {
        report
            .outcomes
            .iter()
            .filter(|outcome| matches!(outcome.status, CueStatus::Failed { .. }))
            .filter_map(|outcome| records.get(outcome.cue.index.checked_sub(1)?))
            .filter(|record| record.analysis.is_some())
            .map(|record| record.id)
            .collect()
    }

    fn log_failures(failures: &[CueFailure]) {
        for failure in failures {
            warn!("Cue {} not annotated ({}): {}", failure.index, failure.kind, failure.message);
        }
    }

    // =========================================================================
    // at
    // =========================================================================

    /// Stored cues on screen at `time` seconds
    pub async fn cues_at(&self, medium_id: i64, lang: Option<&str>, time: f64) -> Result<Vec<SubtitleRecord>> {
        if !time.is_finite() || time < 0.0 {
            return Err(anyhow!("Time must be a non-negative number of seconds, got {}", time));
        }
        let lang = self.resolve_language(lang)?;
        self.repository()?.cues_at(medium_id, &lang, time).await
    }

    /// Check that the configured analyzer answers
    pub async fn test_connection(&self) -> Result<()> {
        let provider = self.provider()?;
        provider
            .test_connection()
            .await
            .with_context(|| format!("Could not reach {}", provider.name()))?;
        info!("{} is reachable", provider.name());
        Ok(())
    }

    // Format duration in a human-readable format (HH:MM:SS)
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
