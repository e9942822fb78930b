/*!
 * Alignment driven by the chat-model oracle over a mock provider
 */

use subalign::corpus::ProofTestCase;
use subalign::oracle::LlmOracle;
use subalign::providers::MockProvider;
use subalign::{Aligner, Config, Corpus, TestCase};

use subalign::alignment::stages::{ProofAnswer, ProofQuery};

use crate::common::{series, texts};

fn fast_config() -> Config {
    let mut config = Config::default();
    config.oracle.common.rate_limit_delay_ms = 0;
    config.oracle.common.retry_backoff_ms = 1;
    config.oracle.common.retry_count = 1;
    config
}

#[tokio::test]
async fn test_llmOracle_proofAnswer_shouldCorrectCandidate() {
    let provider = MockProvider::new();
    provider.push_response(
        "Here you go:\n```json\n{\"corrected_text\": \"好彩酒楼\", \"note\": \"走楼 is a mishearing\"}\n```",
    );
    let oracle = LlmOracle::new(Box::new(provider.clone()), &fast_config());

    let aligned = Aligner::default()
        .align(
            series(&[(0, 1000, "好运楼")]),
            series(&[(50, 950, "好彩走楼")]),
            &oracle,
        )
        .await
        .unwrap();

    assert_eq!(texts(&aligned), vec!["好彩酒楼"]);
    assert_eq!(provider.request_count(), 1);

    let request = &provider.requests()[0];
    assert!(request.system.as_deref().is_some_and(|s| s.contains("Cantonese")));
    let last = request.messages.last().unwrap();
    assert_eq!(last.role, "user");
    assert!(last.content.contains("好彩走楼"));
}

#[tokio::test]
async fn test_llmOracle_withFailingProvider_shouldKeepCandidateAfterRetries() {
    let provider = MockProvider::failing();
    let oracle = LlmOracle::new(Box::new(provider.clone()), &fast_config());

    let aligned = Aligner::default()
        .align(series(&[(0, 1000, "你好")]), series(&[(0, 1000, "你好")]), &oracle)
        .await
        .unwrap();

    assert_eq!(texts(&aligned), vec!["你好"]);
    assert_eq!(provider.request_count(), 2);
}

#[tokio::test]
async fn test_llmOracle_withInvalidAnswer_shouldRetryThenAccept() {
    let provider = MockProvider::new();
    // Changed text without a note breaks the proof invariant
    provider.push_response(r#"{"corrected_text": "拜拜", "note": ""}"#);
    provider.push_response(r#"{"corrected_text": "再见", "note": ""}"#);
    let oracle = LlmOracle::new(Box::new(provider.clone()), &fast_config());

    let aligned = Aligner::default()
        .align(series(&[(0, 1000, "再见")]), series(&[(0, 1000, "再见")]), &oracle)
        .await
        .unwrap();

    assert_eq!(texts(&aligned), vec!["再见"]);
    assert_eq!(provider.request_count(), 2);
}

#[tokio::test]
async fn test_llmOracle_withPromptExamples_shouldSendThemBeforeQuery() {
    let provider = MockProvider::new().with_fallback(r#"{"corrected_text": "你好", "note": ""}"#);
    let mut examples = Corpus::new();
    let example: ProofTestCase = TestCase::new(
        ProofQuery {
            anchor_text: "他说".to_string(),
            candidate_text: "佢话".to_string(),
        },
        ProofAnswer {
            corrected_text: "佢话".to_string(),
            note: String::new(),
        },
    )
    .verified()
    .for_prompt();
    examples.push(example);
    let oracle = LlmOracle::new(Box::new(provider.clone()), &fast_config()).with_examples(examples);

    Aligner::default()
        .align(series(&[(0, 1000, "你好")]), series(&[(0, 1000, "你好")]), &oracle)
        .await
        .unwrap();

    let messages = &provider.requests()[0].messages;
    let roles: Vec<&str> = messages.iter().map(|m| m.role.as_str()).collect();
    assert_eq!(roles, vec!["user", "assistant", "user"]);
    assert!(messages[0].content.contains("佢话"));
}
