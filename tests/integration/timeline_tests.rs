/*!
 * Integration tests for timeline annotation and rendering
 */

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use rubyvtt::analysis::AnalyzerAdapter;
use rubyvtt::providers::mock::MockProvider;
use rubyvtt::subtitle_processor::Cue;
use rubyvtt::timeline::{render_document, CueJob, CueStatus, RenderedCue, TimelineBuilder};
use crate::common::{self, SAMPLE_SENTENCE};

fn builder(provider: &MockProvider, concurrency: usize) -> TimelineBuilder {
    let adapter = AnalyzerAdapter::new(Arc::new(provider.clone()), Duration::from_secs(5));
    TimelineBuilder::new(adapter, concurrency)
}

fn never_cancelled() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

#[test]
fn test_renderDocument_withTwoCues_shouldProduceExactDocument() {
    let cues = vec![
        RenderedCue::plain(&Cue::new(2, 3.5, 4.0, "二")),
        RenderedCue::plain(&Cue::new(1, 0.0, 1.25, "一")),
    ];

    let document = String::from_utf8(render_document(&cues)).unwrap();

    assert_eq!(
        document,
        "WEBVTT\n\nSTYLE\n::cue(ruby) { font-size: 1em; }\n::cue(rt)   { font-size: 0.6em; }\n\n\
         00:00:00.000 --> 00:00:01.250\n一\n\n\
         00:00:03.500 --> 00:00:04.000\n二\n\n"
    );
}

#[tokio::test]
async fn test_annotate_withManyCues_shouldKeepTimelineOrder() {
    let provider = MockProvider::keyed(
        vec![
            (SAMPLE_SENTENCE, common::sample_reply()),
            ("本を読む", common::reading_reply()),
        ],
        "unused",
    );
    let jobs: Vec<CueJob> = (0..12)
        .map(|i| {
            let text = if i % 2 == 0 { SAMPLE_SENTENCE } else { "本を読む" };
            // Later indices start earlier
            let start = (12 - i) as f64;
            CueJob::new(Cue::new(i + 1, start, start + 0.5, text))
        })
        .collect();
    let (_tx, rx) = never_cancelled();

    let report = builder(&provider, 3).annotate(jobs, rx).await.unwrap();

    assert_eq!(report.annotated_count(), 12);
    assert_eq!(provider.request_count(), 12);
    let starts: Vec<f64> = report.cues.iter().map(|c| c.start).collect();
    let mut sorted = starts.clone();
    sorted.sort_by(f64::total_cmp);
    assert_eq!(starts, sorted);
    assert!(report.outcomes.iter().all(|o| o.response.is_some()));
}

#[tokio::test]
async fn test_annotate_withOneBadCue_shouldNotAffectSiblings() {
    let provider = MockProvider::keyed(
        vec![("本を読む", common::reading_reply())],
        "no structured data here",
    );
    let jobs = vec![
        CueJob::new(Cue::new(1, 0.0, 1.0, "本を読む")),
        CueJob::new(Cue::new(2, 1.0, 2.0, "わからない")),
    ];
    let (_tx, rx) = never_cancelled();

    let report = builder(&provider, 2).annotate(jobs, rx).await.unwrap();

    assert_eq!(report.annotated_count(), 1);
    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].index, 2);
    assert_eq!(failures[0].kind, "analysis_exhausted");
    // One call for the good cue, four for the bad one
    assert_eq!(provider.request_count(), 5);

    let document = String::from_utf8(report.render()).unwrap();
    assert!(document.contains("<ruby>本<rt>ほん</rt></ruby>"));
    assert!(document.contains("00:00:01.000 --> 00:00:02.000\nわからない\n"));
}

#[tokio::test]
async fn test_annotate_withCachedResponses_shouldNotCallAnalyzer() {
    let provider = MockProvider::failing();
    let jobs = vec![CueJob::with_cached(
        Cue::new(1, 0.0, 1.0, SAMPLE_SENTENCE),
        Some(common::sample_reply()),
    )];
    let (_tx, rx) = never_cancelled();

    let report = builder(&provider, 1).annotate(jobs, rx).await.unwrap();

    assert_eq!(provider.request_count(), 0);
    assert_eq!(report.outcomes[0].status, CueStatus::Annotated);
}

#[tokio::test]
async fn test_annotate_cancelledMidway_shouldReturnCancelled() {
    let provider = MockProvider::slow(Duration::from_secs(30), common::sample_reply());
    let jobs = (1..=4)
        .map(|i| CueJob::new(Cue::new(i, i as f64, i as f64 + 1.0, SAMPLE_SENTENCE)))
        .collect();
    let (tx, rx) = watch::channel(false);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = tx.send(true);
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        builder(&provider, 2).annotate(jobs, rx),
    )
    .await
    .expect("cancellation should stop the build promptly");

    assert!(matches!(result, Err(rubyvtt::errors::PipelineError::Cancelled)));
}
