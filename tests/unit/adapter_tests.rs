/*!
 * Tests for the bounded-retry analyzer adapter
 */

use std::sync::Arc;
use std::time::Duration;

use rubyvtt::analysis::{build_instruction, AnalyzerAdapter, MAX_RETRIES};
use rubyvtt::errors::AnalysisError;
use rubyvtt::providers::mock::MockProvider;
use crate::common::{self, SAMPLE_SENTENCE};

fn adapter(provider: &MockProvider) -> AnalyzerAdapter {
    AnalyzerAdapter::new(Arc::new(provider.clone()), Duration::from_secs(5))
}

#[tokio::test]
async fn test_analyze_withUnparsableReplies_shouldInvokeExactlyFourTimes() {
    let provider = MockProvider::with_reply("I'd rather not.");
    let mut slot = None;

    let err = adapter(&provider).analyze(SAMPLE_SENTENCE, &mut slot).await.unwrap_err();

    assert_eq!(provider.request_count(), (MAX_RETRIES + 1) as usize);
    assert_eq!(err.kind(), "analysis_exhausted");
    assert!(slot.is_none());
    match err {
        AnalysisError::AnalysisExhausted { attempts, last } => {
            assert_eq!(attempts, 4);
            assert!(matches!(*last, AnalysisError::NoStructuredData));
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }
}

#[tokio::test]
async fn test_analyze_shouldSendBuiltInstruction() {
    let provider = MockProvider::with_reply(common::sample_reply());

    adapter(&provider).analyze(SAMPLE_SENTENCE, &mut None).await.unwrap();

    assert_eq!(provider.prompts(), vec![build_instruction(SAMPLE_SENTENCE)]);
}

#[tokio::test]
async fn test_annotate_twiceWithSameSlot_shouldReuseResponse() {
    let provider = MockProvider::with_reply(common::sample_reply());
    let adapter = adapter(&provider);
    let mut slot = None;

    let first = adapter.annotate(SAMPLE_SENTENCE, &mut slot).await.unwrap();
    let second = adapter.annotate(SAMPLE_SENTENCE, &mut slot).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn test_analyze_withBackoff_shouldStillRecover() {
    let provider = MockProvider::scripted(vec!["nope".to_string(), common::sample_reply()]);
    let adapter = adapter(&provider).with_backoff(Duration::from_millis(5));

    let result = adapter.analyze(SAMPLE_SENTENCE, &mut None).await.unwrap();

    assert_eq!(result.tokens.len(), 8);
    assert_eq!(provider.request_count(), 2);
}
