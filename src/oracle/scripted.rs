/*!
 * Scripted oracle for tests and benchmarks.
 *
 * Answers are queued per stage and handed out in order. When a queue is
 * empty the oracle falls back to a neutral default:
 * - distribute: everything to side 1
 * - shift: texts unchanged
 * - merge: plain concatenation
 * - proof: text unchanged, empty note
 * - translate: the anchor text of each missing line
 */

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{to_literal, Oracle, OracleQuery, Stage};
use crate::alignment::stages::distribute::{DistributeAnswer, DistributeQuery};
use crate::alignment::stages::merge::{MergeAnswer, MergeQuery};
use crate::alignment::stages::proof::{ProofAnswer, ProofQuery};
use crate::alignment::stages::shift::{ShiftAnswer, ShiftQuery};
use crate::alignment::stages::translate::{TranslateAnswer, TranslateQuery};
use crate::errors::OracleError;

/// Queued answers (`None` = fail) and every query received, for one stage
struct Script<Q: OracleQuery> {
    answers: VecDeque<Option<Q::Answer>>,
    queries: Vec<Q>,
}

impl<Q: OracleQuery> Default for Script<Q> {
    fn default() -> Self {
        Self {
            answers: VecDeque::new(),
            queries: Vec::new(),
        }
    }
}

impl<Q: OracleQuery> Script<Q> {
    fn answer(&mut self, query: &Q, default: impl FnOnce(&Q) -> Q::Answer) -> Result<Q::Answer, OracleError> {
        self.queries.push(query.clone());
        match self.answers.pop_front() {
            Some(Some(answer)) => Ok(answer),
            Some(None) => Err(OracleError::NoAnswer {
                stage: Q::STAGE.to_string(),
                query: to_literal(query),
            }),
            None => Ok(default(query)),
        }
    }
}

#[derive(Default)]
pub struct ScriptedOracle {
    distribute: Mutex<Script<DistributeQuery>>,
    shift: Mutex<Script<ShiftQuery>>,
    merge: Mutex<Script<MergeQuery>>,
    proof: Mutex<Script<ProofQuery>>,
    translate: Mutex<Script<TranslateQuery>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_distribute(&self, answer: DistributeAnswer) {
        self.distribute.lock().answers.push_back(Some(answer));
    }

    pub fn push_shift(&self, answer: ShiftAnswer) {
        self.shift.lock().answers.push_back(Some(answer));
    }

    pub fn push_merge(&self, answer: MergeAnswer) {
        self.merge.lock().answers.push_back(Some(answer));
    }

    pub fn push_proof(&self, answer: ProofAnswer) {
        self.proof.lock().answers.push_back(Some(answer));
    }

    pub fn push_translate(&self, answer: TranslateAnswer) {
        self.translate.lock().answers.push_back(Some(answer));
    }

    /// Queue a failure for the next query of `stage`
    pub fn push_failure(&self, stage: Stage) {
        match stage {
            Stage::Distribute => self.distribute.lock().answers.push_back(None),
            Stage::Shift => self.shift.lock().answers.push_back(None),
            Stage::Merge => self.merge.lock().answers.push_back(None),
            Stage::Proof => self.proof.lock().answers.push_back(None),
            Stage::Translate => self.translate.lock().answers.push_back(None),
        }
    }

    /// Number of queries received by `stage`
    pub fn calls(&self, stage: Stage) -> usize {
        match stage {
            Stage::Distribute => self.distribute.lock().queries.len(),
            Stage::Shift => self.shift.lock().queries.len(),
            Stage::Merge => self.merge.lock().queries.len(),
            Stage::Proof => self.proof.lock().queries.len(),
            Stage::Translate => self.translate.lock().queries.len(),
        }
    }

    pub fn distribute_queries(&self) -> Vec<DistributeQuery> {
        self.distribute.lock().queries.clone()
    }

    pub fn shift_queries(&self) -> Vec<ShiftQuery> {
        self.shift.lock().queries.clone()
    }

    pub fn merge_queries(&self) -> Vec<MergeQuery> {
        self.merge.lock().queries.clone()
    }

    pub fn proof_queries(&self) -> Vec<ProofQuery> {
        self.proof.lock().queries.clone()
    }

    pub fn translate_queries(&self) -> Vec<TranslateQuery> {
        self.translate.lock().queries.clone()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn distribute(&self, query: &DistributeQuery) -> Result<DistributeAnswer, OracleError> {
        self.distribute.lock().answer(query, DistributeAnswer::all_to_first)
    }

    async fn shift(&self, query: &ShiftQuery) -> Result<ShiftAnswer, OracleError> {
        self.shift.lock().answer(query, |q| ShiftAnswer {
            candidate_text_1_shifted: q.candidate_text_1.clone(),
            candidate_text_2_shifted: q.candidate_text_2.clone(),
        })
    }

    async fn merge(&self, query: &MergeQuery) -> Result<MergeAnswer, OracleError> {
        self.merge.lock().answer(query, |q| MergeAnswer {
            merged_text: q.naive_merge(),
        })
    }

    async fn proof(&self, query: &ProofQuery) -> Result<ProofAnswer, OracleError> {
        self.proof.lock().answer(query, |q| ProofAnswer {
            corrected_text: q.candidate_text.clone(),
            note: String::new(),
        })
    }

    async fn translate(&self, query: &TranslateQuery) -> Result<TranslateAnswer, OracleError> {
        self.translate.lock().answer(query, |q| TranslateAnswer {
            texts: q.missing.clone(),
        })
    }
}
