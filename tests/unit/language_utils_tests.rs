/*!
 * Tests for ISO language code utilities
 */

use rubyvtt::language_utils::{
    get_language_name, language_codes_match, normalize_language_code, validate_language_code,
};

#[test]
fn test_validateLanguageCode_withKnownCodes_shouldAccept() {
    for code in ["ja", "jpn", "en", "eng", "fre", "fra", "zh", "chi"] {
        assert!(validate_language_code(code).is_ok(), "{} should be valid", code);
    }
}

#[test]
fn test_validateLanguageCode_withUnknownCodes_shouldReject() {
    for code in ["", "x", "xx", "xyz", "japanese"] {
        assert!(validate_language_code(code).is_err(), "{} should be invalid", code);
    }
}

#[test]
fn test_languageCodesMatch_acrossCodeForms_shouldMatch() {
    assert!(language_codes_match("ja", "jpn"));
    assert!(language_codes_match("fre", "fr"));
    assert!(!language_codes_match("ja", "en"));
    assert!(!language_codes_match("ja", "nope"));
}

#[test]
fn test_normalizeAndName_shouldAgree() {
    assert_eq!(normalize_language_code("JPN").unwrap(), "ja");
    assert_eq!(get_language_name("ja").unwrap(), "Japanese");
    assert!(get_language_name("zz").is_err());
}
