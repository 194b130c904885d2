/*!
 * Timeline assembly.
 *
 * Cues are annotated concurrently, each with its own response slot and
 * retry budget, then sorted and rendered into a WebVTT document. Rendering
 * is pure: the bytes go to a `DocumentStore`, never straight to disk.
 */

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use log::{debug, info, warn};
use tokio::sync::{watch, Semaphore};

use crate::analysis::AnalyzerAdapter;
use crate::errors::{AnalysisError, PipelineError};
use crate::subtitle_processor::Cue;
use crate::timecode::format_timecode;

/// Document preamble with the ruby sizing rules
pub const DOCUMENT_HEADER: &str = "WEBVTT\n\nSTYLE\n::cue(ruby) { font-size: 1em; }\n::cue(rt)   { font-size: 0.6em; }\n\n";

/// Anything with a start time and a cue index
pub trait Timed {
    fn start(&self) -> f64;
    fn index(&self) -> usize;
}

impl Timed for Cue {
    fn start(&self) -> f64 {
        self.start
    }

    fn index(&self) -> usize {
        self.index
    }
}

/// A cue ready for output
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedCue {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl RenderedCue {
    /// Render the cue's own text without annotation
    pub fn plain(cue: &Cue) -> Self {
        Self {
            index: cue.index,
            start: cue.start,
            end: cue.end,
            text: cue.text.clone(),
        }
    }

    pub fn with_text(cue: &Cue, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::plain(cue)
        }
    }
}

impl Timed for RenderedCue {
    fn start(&self) -> f64 {
        self.start
    }

    fn index(&self) -> usize {
        self.index
    }
}

/// Order by start time, equal starts by cue index
pub fn sort_cues<T: Timed>(cues: &mut [T]) {
    cues.sort_by(|a, b| {
        a.start()
            .total_cmp(&b.start())
            .then_with(|| a.index().cmp(&b.index()))
    });
}

/// Render cues as a WebVTT document
pub fn render_document(cues: &[RenderedCue]) -> Vec<u8> {
    let mut ordered = cues.to_vec();
    sort_cues(&mut ordered);

    let mut document = String::from(DOCUMENT_HEADER);
    for cue in &ordered {
        document.push_str(&format_timecode(cue.start));
        document.push_str(" --> ");
        document.push_str(&format_timecode(cue.end));
        document.push('\n');
        document.push_str(&cue.text);
        document.push_str("\n\n");
    }

    document.into_bytes()
}

/// One cue to annotate, with any raw response already on record
#[derive(Debug, Clone)]
pub struct CueJob {
    pub cue: Cue,
    pub cached: Option<String>,
}

impl CueJob {
    pub fn new(cue: Cue) -> Self {
        Self { cue, cached: None }
    }

    pub fn with_cached(cue: Cue, cached: Option<String>) -> Self {
        Self { cue, cached }
    }
}

/// How a cue came out of annotation
#[derive(Debug, Clone, PartialEq)]
pub enum CueStatus {
    /// Every token was placed
    Annotated,
    /// Annotated, but some tokens were not found in the text
    Degraded { unmatched_tokens: Vec<String> },
    /// Analysis gave up; `kind` names the failure
    Failed { kind: &'static str, message: String },
}

/// Result for a single cue
#[derive(Debug, Clone)]
pub struct CueOutcome {
    pub cue: Cue,
    pub status: CueStatus,
    /// Annotated text, absent when analysis failed
    pub annotated_text: Option<String>,
    /// Raw analyzer response the annotation came from
    pub response: Option<String>,
}

/// A cue that could not be annotated
#[derive(Debug, Clone, PartialEq)]
pub struct CueFailure {
    pub index: usize,
    pub kind: &'static str,
    pub message: String,
}

/// Everything a timeline build produced
#[derive(Debug, Clone)]
pub struct TimelineReport {
    /// Cues to render, in timeline order
    pub cues: Vec<RenderedCue>,
    /// Per-cue outcomes, by cue index
    pub outcomes: Vec<CueOutcome>,
}

impl TimelineReport {
    pub fn failures(&self) -> Vec<CueFailure> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match &outcome.status {
                CueStatus::Failed { kind, message } => Some(CueFailure {
                    index: outcome.cue.index,
                    kind,
                    message: message.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    pub fn degraded_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, CueStatus::Degraded { .. }))
            .count()
    }

    pub fn annotated_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, CueStatus::Annotated))
            .count()
    }

    pub fn render(&self) -> Vec<u8> {
        render_document(&self.cues)
    }
}

/// Annotates a set of cues with bounded concurrency
pub struct TimelineBuilder {
    adapter: AnalyzerAdapter,
    concurrency: usize,
    fallback_to_plain_text: bool,
    progress: Option<ProgressBar>,
}

impl TimelineBuilder {
    pub fn new(adapter: AnalyzerAdapter, concurrency: usize) -> Self {
        Self {
            adapter,
            concurrency: concurrency.max(1),
            fallback_to_plain_text: true,
            progress: None,
        }
    }

    /// Whether failed cues are rendered as plain text or left out
    pub fn fallback_to_plain_text(mut self, enabled: bool) -> Self {
        self.fallback_to_plain_text = enabled;
        self
    }

    /// Advance `progress` once per finished cue
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Annotate every job.
    ///
    /// A failed cue never stops the others. If `cancel` turns `true` before
    /// all cues finish, outstanding analyzer calls are dropped and the build
    /// returns `PipelineError::Cancelled` with nothing kept.
    pub async fn annotate(
        &self,
        jobs: Vec<CueJob>,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<TimelineReport, PipelineError> {
        if *cancel.borrow() {
            return Err(PipelineError::Cancelled);
        }

        let total = jobs.len();
        info!(
            "Annotating {} cues with {} ({} at a time)",
            total,
            self.adapter.provider_name(),
            self.concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        let mut pending = stream::iter(jobs)
            .map(|job| {
                let adapter = self.adapter.clone();
                let semaphore = Arc::clone(&semaphore);

                async move {
                    let _permit = semaphore.acquire_owned().await.ok();
                    process_job(&adapter, job).await
                }
            })
            .buffer_unordered(self.concurrency);

        let mut outcomes = Vec::with_capacity(total);
        let mut cancel_open = true;

        loop {
            tokio::select! {
                biased;

                changed = cancel.changed(), if cancel_open => {
                    match changed {
                        Ok(()) if *cancel.borrow() => {
                            warn!("Annotation cancelled with {}/{} cues done", outcomes.len(), total);
                            return Err(PipelineError::Cancelled);
                        }
                        Ok(()) => {}
                        // Sender gone: nobody can cancel any more
                        Err(_) => cancel_open = false,
                    }
                }

                next = pending.next() => match next {
                    Some(outcome) => {
                        if let Some(progress) = &self.progress {
                            progress.inc(1);
                        }
                        outcomes.push(outcome);
                    }
                    None => break,
                }
            }
        }

        outcomes.sort_by_key(|o: &CueOutcome| o.cue.index);
        Ok(self.assemble(outcomes))
    }

    fn assemble(&self, outcomes: Vec<CueOutcome>) -> TimelineReport {
        let mut cues: Vec<RenderedCue> = outcomes
            .iter()
            .filter_map(|outcome| match &outcome.annotated_text {
                Some(text) => Some(RenderedCue::with_text(&outcome.cue, text.clone())),
                None if self.fallback_to_plain_text => Some(RenderedCue::plain(&outcome.cue)),
                None => None,
            })
            .collect();
        sort_cues(&mut cues);

        let report = TimelineReport { cues, outcomes };
        let failed = report.failures().len();
        if failed > 0 {
            warn!(
                "{} cue(s) could not be annotated and were {}",
                failed,
                if self.fallback_to_plain_text { "kept as plain text" } else { "omitted" }
            );
        }
        debug!(
            "Annotated {} cues, {} degraded, {} failed",
            report.annotated_count(),
            report.degraded_count(),
            failed
        );
        report
    }
}

async fn process_job(adapter: &AnalyzerAdapter, job: CueJob) -> CueOutcome {
    let CueJob { cue, mut cached } = job;

    match adapter.annotate(&cue.text, &mut cached).await {
        Ok(reconstruction) => {
            let status = if reconstruction.is_exact() {
                CueStatus::Annotated
            } else {
                warn!(
                    "Cue {}: {} token(s) not found in text: {:?}",
                    cue.index,
                    reconstruction.unmatched_tokens.len(),
                    reconstruction.unmatched_tokens
                );
                CueStatus::Degraded {
                    unmatched_tokens: reconstruction.unmatched_tokens.clone(),
                }
            };

            CueOutcome {
                cue,
                status,
                annotated_text: Some(reconstruction.text),
                response: cached,
            }
        }
        Err(e) => failed_outcome(cue, e),
    }
}

fn failed_outcome(cue: Cue, e: AnalysisError) -> CueOutcome {
    warn!("Cue {} failed: {}", cue.index, e);
    CueOutcome {
        cue,
        status: CueStatus::Failed {
            kind: e.kind(),
            message: e.to_string(),
        },
        annotated_text: None,
        response: None,
    }
}
