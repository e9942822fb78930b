/*!
 * Oracle backed by a chat model.
 *
 * Every query is sent as a JSON object after the stage's system prompt and
 * a handful of few-shot examples taken from the corpus. The reply is parsed
 * back into the stage's answer type and checked against the stage invariant.
 * Failed, unparsable or invalid answers are retried with exponential backoff;
 * consecutive requests are spaced by the configured rate-limit delay.
 */

use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, warn};
use tokio::sync::Mutex;

use super::prompts::PromptTemplate;
use super::{to_literal, Oracle, OracleQuery};
use crate::alignment::stages::distribute::{DistributeAnswer, DistributeQuery};
use crate::alignment::stages::merge::{MergeAnswer, MergeQuery};
use crate::alignment::stages::proof::{ProofAnswer, ProofQuery};
use crate::alignment::stages::shift::{ShiftAnswer, ShiftQuery};
use crate::alignment::stages::translate::{TranslateAnswer, TranslateQuery};
use crate::app_config::{Config, OracleCommonConfig};
use crate::corpus::Corpus;
use crate::errors::{OracleError, ProviderError};
use crate::providers::{ChatMessage, ChatRequest, Provider};

pub struct LlmOracle {
    provider: Box<dyn Provider>,

    model: String,

    max_tokens: u32,

    anchor_language: String,

    candidate_language: String,

    settings: OracleCommonConfig,

    /// Few-shot examples
    examples: Corpus,

    /// Time of the last request, for rate limiting
    last_request: Mutex<Option<Instant>>,
}

impl LlmOracle {
    /// Oracle for the active provider of `config`
    pub fn new(provider: Box<dyn Provider>, config: &Config) -> Self {
        let provider_config = config.oracle.resolved_provider_config();
        Self {
            provider,
            model: provider_config.model,
            max_tokens: provider_config.max_tokens,
            anchor_language: config.anchor_language.clone(),
            candidate_language: config.candidate_language.clone(),
            settings: config.oracle.common.clone(),
            examples: Corpus::new(),
            last_request: Mutex::new(None),
        }
    }

    /// Use the prompt-marked cases of `corpus` as few-shot examples
    pub fn with_examples(mut self, corpus: Corpus) -> Self {
        self.examples = corpus;
        self
    }

    pub fn provider(&self) -> &dyn Provider {
        self.provider.as_ref()
    }

    /// Chat request for `query`: system prompt, examples, then the query
    fn build_request<Q: OracleQuery>(&self, query: &Q) -> ChatRequest {
        let system = PromptTemplate::for_stage(Q::STAGE).render(&self.anchor_language, &self.candidate_language);

        let mut messages = Vec::new();
        for case in self.examples.prompt_cases::<Q>().into_iter().take(self.settings.max_examples) {
            messages.push(ChatMessage::user(to_literal(&case.query)));
            messages.push(ChatMessage::assistant(to_literal(&case.answer)));
        }
        messages.push(ChatMessage::user(to_literal(query)));

        ChatRequest::new(self.model.clone(), messages)
            .system(system)
            .temperature(self.settings.temperature)
            .max_tokens(self.max_tokens)
    }

    /// Wait until the rate-limit delay since the previous request has passed
    async fn wait_for_rate_limit(&self) {
        let delay = Duration::from_millis(self.settings.rate_limit_delay_ms);
        let mut last_request = self.last_request.lock().await;
        if let Some(last) = *last_request {
            let elapsed = last.elapsed();
            if elapsed < delay {
                tokio::time::sleep(delay - elapsed).await;
            }
        }
        *last_request = Some(Instant::now());
    }

    async fn ask<Q: OracleQuery>(&self, query: &Q) -> Result<Q::Answer, OracleError> {
        let request = self.build_request(query);
        let mut last_error = None;

        for attempt in 0..=self.settings.retry_count {
            if attempt > 0 {
                let backoff = self.settings.retry_backoff_ms.saturating_mul(1u64 << (attempt - 1).min(16));
                debug!("Retrying {} query in {}ms (attempt {})", Q::STAGE, backoff, attempt + 1);
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }
            self.wait_for_rate_limit().await;

            let error = match self.provider.complete(request.clone()).await {
                Ok(response) => match parse_answer::<Q>(&response.text).and_then(|answer| {
                    query.verify(&answer)?;
                    Ok(answer)
                }) {
                    Ok(answer) => return Ok(answer),
                    Err(e) => e,
                },
                // Retrying cannot fix credentials
                Err(e @ ProviderError::AuthenticationError(_)) => return Err(e.into()),
                Err(e) => e.into(),
            };

            warn!("{} oracle attempt {} failed: {}", Q::STAGE, attempt + 1, error);
            last_error = Some(error);
        }

        Err(last_error.unwrap_or_else(|| OracleError::NoAnswer {
            stage: Q::STAGE.to_string(),
            query: to_literal(query),
        }))
    }
}

/// Parse a stage answer out of a model reply
fn parse_answer<Q: OracleQuery>(response: &str) -> Result<Q::Answer, OracleError> {
    let unparsable = |message: String| OracleError::Unparsable {
        stage: Q::STAGE.to_string(),
        message,
    };
    let json = extract_json(response).ok_or_else(|| unparsable(format!("no JSON object in reply: {}", response)))?;
    serde_json::from_str(json).map_err(|e| unparsable(e.to_string()))
}

/// Locate the JSON object in a reply that may be wrapped in prose or a code fence
fn extract_json(response: &str) -> Option<&str> {
    let trimmed = response.trim();

    if trimmed.starts_with('{') {
        return Some(trimmed);
    }

    if let Some(start) = trimmed.find("```json") {
        let body = &trimmed[start + 7..];
        if let Some(end) = body.find("```") {
            return Some(body[..end].trim());
        }
    }

    if let Some(start) = trimmed.find("```") {
        let body = &trimmed[start + 3..];
        if let Some(end) = body.find("```") {
            let json = body[..end].trim();
            if json.starts_with('{') {
                return Some(json);
            }
        }
    }

    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if end > start => Some(&trimmed[start..=end]),
        _ => None,
    }
}

#[async_trait]
impl Oracle for LlmOracle {
    async fn distribute(&self, query: &DistributeQuery) -> Result<DistributeAnswer, OracleError> {
        self.ask(query).await
    }

    async fn shift(&self, query: &ShiftQuery) -> Result<ShiftAnswer, OracleError> {
        self.ask(query).await
    }

    async fn merge(&self, query: &MergeQuery) -> Result<MergeAnswer, OracleError> {
        self.ask(query).await
    }

    async fn proof(&self, query: &ProofQuery) -> Result<ProofAnswer, OracleError> {
        self.ask(query).await
    }

    async fn translate(&self, query: &TranslateQuery) -> Result<TranslateAnswer, OracleError> {
        self.ask(query).await
    }
}
