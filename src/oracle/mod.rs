/*!
 * The oracle port: the external decision source consulted by every stage.
 *
 * The aligner only ever sees the `Oracle` trait. Implementations:
 * - `fixture`: replays answers recorded in a test case corpus
 * - `cache`: wraps another oracle, memoizing answers and recording new cases
 * - `llm`: asks a chat provider, with few-shot examples from the corpus
 * - `scripted`: queued answers and call counters for tests
 */

use std::fmt::{self, Debug};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::alignment::stages::distribute::{DistributeAnswer, DistributeQuery};
use crate::alignment::stages::merge::{MergeAnswer, MergeQuery};
use crate::alignment::stages::proof::{ProofAnswer, ProofQuery};
use crate::alignment::stages::shift::{ShiftAnswer, ShiftQuery};
use crate::alignment::stages::translate::{TranslateAnswer, TranslateQuery};
use crate::corpus::{Corpus, TestCase};
use crate::errors::OracleError;

pub mod cache;
pub mod fixture;
pub mod llm;
pub mod prompts;
pub mod scripted;

pub use cache::CachingOracle;
pub use fixture::FixtureOracle;
pub use llm::LlmOracle;
pub use scripted::ScriptedOracle;

/// The five refinement stages that consult the oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Distribute,
    Shift,
    Merge,
    Proof,
    Translate,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Distribute,
        Stage::Shift,
        Stage::Merge,
        Stage::Proof,
        Stage::Translate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Distribute => "distribute",
            Stage::Shift => "shift",
            Stage::Merge => "merge",
            Stage::Proof => "proof",
            Stage::Translate => "translate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A stage query with its answer type and the invariant linking them.
///
/// This is the generic seam shared by validation, persistence, caching and
/// the LLM oracle.
pub trait OracleQuery:
    Serialize + DeserializeOwned + Clone + Debug + PartialEq + Send + Sync + 'static
{
    type Answer: Serialize + DeserializeOwned + Clone + Debug + PartialEq + Send + Sync + 'static;

    const STAGE: Stage;

    /// Check the stage invariant; `Err` describes the violation
    fn check(&self, answer: &Self::Answer) -> Result<(), String>;

    /// This stage's test cases within a corpus
    fn cases(corpus: &Corpus) -> &[TestCase<Self, Self::Answer>];

    /// Mutable access to this stage's test cases within a corpus
    fn cases_mut(corpus: &mut Corpus) -> &mut Vec<TestCase<Self, Self::Answer>>;

    /// `check`, converted into an oracle error
    fn verify(&self, answer: &Self::Answer) -> Result<(), OracleError> {
        self.check(answer).map_err(|message| OracleError::ContractViolation {
            stage: Self::STAGE.to_string(),
            message,
        })
    }
}

/// External decision source, one method per stage.
///
/// Implementations must tolerate sequential reuse across blocks. Returned
/// answers are re-validated by the stages; an `Err` degrades that single
/// decision to the stage's fallback.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn distribute(&self, query: &DistributeQuery) -> Result<DistributeAnswer, OracleError>;

    async fn shift(&self, query: &ShiftQuery) -> Result<ShiftAnswer, OracleError>;

    async fn merge(&self, query: &MergeQuery) -> Result<MergeAnswer, OracleError>;

    async fn proof(&self, query: &ProofQuery) -> Result<ProofAnswer, OracleError>;

    async fn translate(&self, query: &TranslateQuery) -> Result<TranslateAnswer, OracleError>;
}

/// Literal JSON for log lines and corpus curation
pub(crate) fn to_literal<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("<unserializable: {}>", e))
}
