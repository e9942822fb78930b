/*!
 * Test case corpus.
 *
 * A test case is a literal query/answer pair plus curation metadata. The
 * corpus is the regression suite for the oracle contract and the source of
 * few-shot examples for the LLM oracle. Cases are persisted as pretty JSON,
 * one file per source block (see `store`).
 */

use serde::{Deserialize, Serialize};

use crate::alignment::stages::distribute::{DistributeAnswer, DistributeQuery};
use crate::alignment::stages::merge::{MergeAnswer, MergeQuery};
use crate::alignment::stages::proof::{ProofAnswer, ProofQuery};
use crate::alignment::stages::shift::{ShiftAnswer, ShiftQuery};
use crate::alignment::stages::translate::{TranslateAnswer, TranslateQuery};
use crate::errors::CorpusError;
use crate::oracle::OracleQuery;

pub mod store;

pub use store::CorpusStore;

/// Highest allowed difficulty rating
pub const MAX_DIFFICULTY: u8 = 3;

/// A literal query/answer example
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase<Q, A> {
    pub query: Q,
    pub answer: A,

    /// 0 (trivial) to 3 (hard)
    #[serde(default)]
    pub difficulty: u8,

    /// Reviewed by a human
    #[serde(default)]
    pub verified: bool,

    /// Include in few-shot context
    #[serde(default)]
    pub prompt: bool,
}

impl<Q: OracleQuery> TestCase<Q, Q::Answer> {
    /// New unverified case, excluded from prompts
    pub fn new(query: Q, answer: Q::Answer) -> Self {
        Self {
            query,
            answer,
            difficulty: 0,
            verified: false,
            prompt: false,
        }
    }

    pub fn with_difficulty(mut self, difficulty: u8) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn verified(mut self) -> Self {
        self.verified = true;
        self
    }

    pub fn for_prompt(mut self) -> Self {
        self.prompt = true;
        self
    }

    /// Difficulty range and the stage invariant
    pub fn validate(&self) -> Result<(), String> {
        if self.difficulty > MAX_DIFFICULTY {
            return Err(format!(
                "difficulty {} exceeds maximum {}",
                self.difficulty, MAX_DIFFICULTY
            ));
        }
        self.query.check(&self.answer)
    }
}

pub type DistributeTestCase = TestCase<DistributeQuery, DistributeAnswer>;
pub type ShiftTestCase = TestCase<ShiftQuery, ShiftAnswer>;
pub type MergeTestCase = TestCase<MergeQuery, MergeAnswer>;
pub type ProofTestCase = TestCase<ProofQuery, ProofAnswer>;
pub type TranslateTestCase = TestCase<TranslateQuery, TranslateAnswer>;

/// Test cases for all five stages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Corpus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub distribute: Vec<DistributeTestCase>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shift: Vec<ShiftTestCase>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub merge: Vec<MergeTestCase>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proof: Vec<ProofTestCase>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub translate: Vec<TranslateTestCase>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of cases
    pub fn len(&self) -> usize {
        self.distribute.len() + self.shift.len() + self.merge.len() + self.proof.len() + self.translate.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a case to its stage list
    pub fn push<Q: OracleQuery>(&mut self, case: TestCase<Q, Q::Answer>) {
        Q::cases_mut(self).push(case);
    }

    /// Append every case of `other`
    pub fn extend(&mut self, other: Corpus) {
        self.distribute.extend(other.distribute);
        self.shift.extend(other.shift);
        self.merge.extend(other.merge);
        self.proof.extend(other.proof);
        self.translate.extend(other.translate);
    }

    /// Recorded answer for an exact query
    pub fn answer_for<Q: OracleQuery>(&self, query: &Q) -> Option<&Q::Answer> {
        Q::cases(self)
            .iter()
            .find(|case| case.query == *query)
            .map(|case| &case.answer)
    }

    /// Cases marked for few-shot prompting
    pub fn prompt_cases<Q: OracleQuery>(&self) -> Vec<&TestCase<Q, Q::Answer>> {
        Q::cases(self).iter().filter(|case| case.prompt).collect()
    }

    /// Merge `incoming` cases into this corpus.
    ///
    /// A case whose query matches a verified case is ignored, so verified
    /// examples never change. A match against an unverified case replaces it;
    /// anything else is appended. Returns the number of cases added or replaced.
    pub fn merge_from(&mut self, incoming: Corpus) -> usize {
        merge_stage(&mut self.distribute, incoming.distribute)
            + merge_stage(&mut self.shift, incoming.shift)
            + merge_stage(&mut self.merge, incoming.merge)
            + merge_stage(&mut self.proof, incoming.proof)
            + merge_stage(&mut self.translate, incoming.translate)
    }

    /// Validate every case; all failures are reported
    pub fn validate(&self, block: &str) -> Vec<CorpusError> {
        let mut errors = Vec::new();
        validate_stage(&self.distribute, block, &mut errors);
        validate_stage(&self.shift, block, &mut errors);
        validate_stage(&self.merge, block, &mut errors);
        validate_stage(&self.proof, block, &mut errors);
        validate_stage(&self.translate, block, &mut errors);
        errors
    }
}

fn merge_stage<Q: OracleQuery>(
    existing: &mut Vec<TestCase<Q, Q::Answer>>,
    incoming: Vec<TestCase<Q, Q::Answer>>,
) -> usize {
    let mut changed = 0;
    for case in incoming {
        match existing.iter_mut().find(|e| e.query == case.query) {
            Some(current) if current.verified => {}
            Some(current) => {
                if *current != case {
                    *current = case;
                    changed += 1;
                }
            }
            None => {
                existing.push(case);
                changed += 1;
            }
        }
    }
    changed
}

fn validate_stage<Q: OracleQuery>(
    cases: &[TestCase<Q, Q::Answer>],
    block: &str,
    errors: &mut Vec<CorpusError>,
) {
    for (index, case) in cases.iter().enumerate() {
        if let Err(message) = case.validate() {
            errors.push(CorpusError::Invalid {
                block: block.to_string(),
                stage: Q::STAGE.to_string(),
                index,
                message,
            });
        }
    }
}

/// Cases recorded from one source block.
///
/// `cases` must stay nested: under `#[serde(flatten)]` the integer-keyed
/// translate maps no longer deserialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusFile {
    pub block: String,
    #[serde(default)]
    pub cases: Corpus,
}

impl CorpusFile {
    pub fn new(block: impl Into<String>, cases: Corpus) -> Self {
        Self {
            block: block.into(),
            cases,
        }
    }
}
