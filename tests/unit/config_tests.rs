/*!
 * Tests for configuration loading and provider resolution
 */

use std::str::FromStr;

use subalign::app_config::{LogLevel, ProviderKind};
use subalign::Config;

use crate::common::{create_temp_dir, create_test_file};

#[test]
fn test_loadOrCreate_withExistingFile_shouldKeepValuesAndFillDefaults() {
    let temp_dir = create_temp_dir().unwrap();
    let path = create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{
  "anchor_language": "Mandarin Chinese",
  "candidate_language": "Cantonese",
  "aligner": {"block_gap_ms": 5000},
  "oracle": {
    "provider": "openai",
    "available_providers": [{"type": "openai", "api_key": "sk-test"}]
  },
  "log_level": "debug"
}"#,
    )
    .unwrap();

    let config = Config::load_or_create(&path).unwrap();

    assert_eq!(config.aligner.block_gap_ms, 5000);
    assert_eq!(config.aligner.ambiguity_threshold, 0.33);
    assert_eq!(config.oracle.provider, ProviderKind::OpenAI);
    assert_eq!(config.log_level, LogLevel::Debug);
    let resolved = config.oracle.resolved_provider_config();
    assert_eq!(resolved.api_key, "sk-test");
    assert_eq!(resolved.endpoint, "https://api.openai.com/v1");
    assert!(config.validate().is_ok());
}

#[test]
fn test_loadOrCreate_withMalformedFile_shouldFail() {
    let temp_dir = create_temp_dir().unwrap();
    let path = create_test_file(temp_dir.path(), "conf.json", "{ not json").unwrap();

    assert!(Config::load_or_create(&path).is_err());
}

#[test]
fn test_activeProviderConfigMut_withMissingEntry_shouldCreateIt() {
    let mut config = Config::default();
    config.oracle.available_providers.clear();
    config.oracle.provider = ProviderKind::LMStudio;

    config.oracle.active_provider_config_mut().model = "qwen2.5-7b-instruct".to_string();

    assert_eq!(config.oracle.available_providers.len(), 1);
    assert_eq!(config.oracle.get_model(), "qwen2.5-7b-instruct");
    assert_eq!(config.oracle.get_endpoint(), "http://localhost:1234/v1");
}

#[test]
fn test_providerKind_fromStr_shouldIgnoreCase() {
    assert_eq!(ProviderKind::from_str("Anthropic").unwrap(), ProviderKind::Anthropic);
    assert_eq!(ProviderKind::from_str("lmstudio").unwrap(), ProviderKind::LMStudio);
    assert!(ProviderKind::from_str("gemini").is_err());
    assert!(!ProviderKind::Ollama.requires_api_key());
}
