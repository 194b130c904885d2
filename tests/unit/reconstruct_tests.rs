/*!
 * Tests for token alignment and ruby wrapping
 */

use rubyvtt::analysis::reconstruct::{strip_markup, token_label};
use rubyvtt::analysis::{annotate_text, extract_structured, reconstruct, AnalysisResult, WordIndex};
use crate::common::{self, SAMPLE_SENTENCE, SAMPLE_TOKENS};

fn sample_result() -> AnalysisResult {
    AnalysisResult::from_structured(extract_structured(&common::sample_reply()).unwrap()).unwrap()
}

#[test]
fn test_reconstruct_withSampleSentence_shouldPreserveText() {
    let result = sample_result();
    assert_eq!(result.tokens, SAMPLE_TOKENS.to_vec());

    let reconstruction = annotate_text(SAMPLE_SENTENCE, &result);

    assert!(reconstruction.is_exact());
    assert_eq!(strip_markup(&reconstruction.text), SAMPLE_SENTENCE);
}

#[test]
fn test_reconstruct_withEmptyIndex_shouldReturnInputUnchanged() {
    let tokens: Vec<String> = SAMPLE_TOKENS.iter().map(|t| t.to_string()).collect();

    let reconstruction = reconstruct(SAMPLE_SENTENCE, &tokens, &WordIndex::default());

    assert!(reconstruction.is_exact());
    assert_eq!(reconstruction.text, SAMPLE_SENTENCE);
}

#[test]
fn test_reconstruct_withSampleSentence_shouldLabelByFirstSurface() {
    let reconstruction = annotate_text(SAMPLE_SENTENCE, &sample_result());

    let expected = format!("<c.w_{}><ruby>昨日<rt>きのう</rt></ruby></c>、", token_label("昨日"));
    assert!(reconstruction.text.starts_with(&expected), "got {}", reconstruction.text);
    assert!(reconstruction.text.ends_with("くれた。"));
}

#[test]
fn test_tokenLabel_shouldBeStableHex() {
    let label = token_label("昨日");
    assert_eq!(label.len(), 8);
    assert!(label.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(label, token_label("昨日"));
    assert_ne!(label, token_label("今日"));
}

#[test]
fn test_reconstruct_withRepeatedToken_shouldMatchInOrder() {
    let result = AnalysisResult::from_structured(
        extract_structured(&rubyvtt::providers::mock::MockProvider::analysis_reply(
            "本と本",
            &[("本", "ほん"), ("と", ""), ("本", "ほん")],
        ))
        .unwrap(),
    )
    .unwrap();

    let reconstruction = annotate_text("本と本", &result);

    assert!(reconstruction.is_exact());
    assert_eq!(reconstruction.text.matches("<ruby>本<rt>ほん</rt></ruby>").count(), 2);
    assert_eq!(strip_markup(&reconstruction.text), "本と本");
}

#[test]
fn test_reconstruct_withTokenMissingFromText_shouldReportIt() {
    let tokens = vec!["猫".to_string(), "犬".to_string()];
    let reconstruction = reconstruct("猫が好き", &tokens, &WordIndex::default());

    assert_eq!(reconstruction.unmatched_tokens, vec!["犬"]);
    assert!(!reconstruction.is_exact());
}
