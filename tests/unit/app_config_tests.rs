/*!
 * Tests for application configuration functionality
 */

use rubyvtt::app_config::{AnalyzerProvider, Config, LogLevel, ProviderConfig};
use crate::common;

/// Test default configuration values
#[test]
fn test_defaultConfig_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.default_language, "ja");
    assert_eq!(config.analyzer.provider, AnalyzerProvider::OpenAI);
    assert_eq!(config.analyzer.available_providers.len(), 4);
    assert_eq!(config.analyzer.optimal_concurrent_requests(), 4);
    assert_eq!(config.analyzer.get_endpoint(), "https://api.openai.com/v1");
    assert!(config.analyzer.common.fallback_to_plain_text);
    assert_eq!(config.log_level, LogLevel::Info);
}

#[test]
fn test_configValidate_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.default_language = "xyz".to_string();
    assert!(config.validate().is_err());
    config.default_language = "jpn".to_string();
    assert!(config.validate().is_ok());

    config.analyzer.common.temperature = 3.0;
    assert!(config.validate().is_err());
    config.analyzer.common.temperature = 0.2;

    config.analyzer.active_provider_config_mut().concurrent_requests = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_analyzerValidate_withHostedProvider_shouldRequireApiKey() {
    let mut config = Config::default();
    assert!(config.analyzer.validate().is_err());

    config.analyzer.active_provider_config_mut().api_key = "sk-test".to_string();
    assert!(config.analyzer.validate().is_ok());

    config.analyzer.provider = AnalyzerProvider::Ollama;
    config.analyzer.active_provider_config_mut().api_key.clear();
    assert!(config.analyzer.validate().is_ok());
}

#[test]
fn test_activeProviderConfigMut_withMissingEntry_shouldAddDefaults() {
    let mut config = Config::default();
    config.analyzer.available_providers.clear();
    config.analyzer.provider = AnalyzerProvider::LMStudio;

    config.analyzer.active_provider_config_mut().model = "qwen".to_string();

    assert_eq!(config.analyzer.available_providers.len(), 1);
    assert_eq!(config.analyzer.get_model(), "qwen");
    assert_eq!(config.analyzer.get_endpoint(), "http://localhost:1234/v1");
    assert_eq!(config.analyzer.get_timeout_secs(), 120);
}

#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() -> anyhow::Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let (config, created) = Config::load_or_create(&path)?;
    assert!(created);
    assert!(path.exists());

    let (reloaded, created_again) = Config::load_or_create(&path)?;
    assert!(!created_again);
    assert_eq!(reloaded.default_language, config.default_language);
    Ok(())
}

#[test]
fn test_deserialize_withPartialJson_shouldFillDefaults() {
    let json = r#"{
        "analyzer": {
            "provider": "ollama",
            "available_providers": [{ "type": "ollama", "model": "gemma2" }],
            "common": { "fallback_to_plain_text": false }
        },
        "log_level": "debug"
    }"#;

    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.default_language, "ja");
    assert_eq!(config.analyzer.get_model(), "gemma2");
    assert_eq!(config.analyzer.get_endpoint(), "http://localhost:11434");
    assert!(!config.analyzer.common.fallback_to_plain_text);
    assert!((config.analyzer.common.temperature - 0.2).abs() < f32::EPSILON);
    assert_eq!(config.log_level, LogLevel::Debug);
}

#[test]
fn test_providerConfigNew_shouldUseProviderDefaults() {
    let anthropic = ProviderConfig::new(AnalyzerProvider::Anthropic);
    assert_eq!(anthropic.provider_type, "anthropic");
    assert_eq!(anthropic.timeout_secs, 60);
    assert!(anthropic.api_key.is_empty());

    assert_eq!("LMStudio".parse::<AnalyzerProvider>().unwrap(), AnalyzerProvider::LMStudio);
    assert!("gemini".parse::<AnalyzerProvider>().is_err());
}
