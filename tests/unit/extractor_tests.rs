/*!
 * Tests for structured data extraction from analyzer replies
 */

use rubyvtt::analysis::extractor::{parse_segment, ParseStrategy};
use rubyvtt::analysis::{extract_structured, AnalysisResult, StructuredValue};
use rubyvtt::errors::AnalysisError;

#[test]
fn test_extractStructured_withProseAroundFence_shouldReturnMapping() {
    let reply = "Sure! Here you go:\n```json\n{\"input\": \"本\", \"wakachigaki\": [\"本\"], \"words\": []}\n```\nAnything else?";

    let value = extract_structured(reply).unwrap();

    match value {
        StructuredValue::Mapping(map) => assert_eq!(map["input"], "本"),
        other => panic!("expected mapping, got {:?}", other),
    }
}

#[test]
fn test_extractStructured_withTwoFences_shouldReturnSequence() {
    let reply = "```json\n{\"a\": 1}\n```\nand\n```\n{\"b\": 2}\n```";

    match extract_structured(reply).unwrap() {
        StructuredValue::Sequence(items) => assert_eq!(items.len(), 2),
        other => panic!("expected sequence, got {:?}", other),
    }
}

#[test]
fn test_parseSegment_withTrailingCommas_shouldParseStrictly() {
    let (value, strategy) = parse_segment("{\"tokens\": [\"本\", \"を\",], }").unwrap();

    assert_eq!(strategy, ParseStrategy::Strict);
    assert_eq!(value["tokens"][1], "を");
}

#[test]
fn test_parseSegment_withSmartQuotes_shouldNeedLenientPass() {
    let (value, strategy) = parse_segment("{\u{201c}input\u{201d}: \u{201c}本\u{201d}}").unwrap();

    assert_eq!(strategy, ParseStrategy::Lenient);
    assert_eq!(value["input"], "本");
}

#[test]
fn test_extractStructured_withNoJson_shouldBeNoStructuredData() {
    assert!(matches!(
        extract_structured("I cannot help with that."),
        Err(AnalysisError::NoStructuredData)
    ));
}

#[test]
fn test_extractStructured_withScalarPayload_shouldBeUnexpectedShape() {
    assert!(matches!(
        extract_structured("```json\n\"just a string\"\n```"),
        Err(AnalysisError::UnexpectedResultShape(_))
    ));
}

#[test]
fn test_extractStructured_withBrokenPayload_shouldBeMalformed() {
    assert!(matches!(
        extract_structured("```json\n{\"input\": \n```"),
        Err(AnalysisError::MalformedPayload(_))
    ));
}

#[test]
fn test_analysisResult_fromSequence_shouldUseFirstCandidate() {
    let reply = "```json\n[{\"input\": \"一\", \"wakachigaki\": [\"一\"]}, {\"input\": \"二\"}]\n```";

    let result = AnalysisResult::from_structured(extract_structured(reply).unwrap()).unwrap();

    assert_eq!(result.input.as_deref(), Some("一"));
    assert_eq!(result.tokens, vec!["一"]);
    assert!(result.words.is_empty());
}
