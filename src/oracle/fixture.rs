/*!
 * Oracle that replays answers recorded in a test case corpus.
 *
 * Queries must match a recorded query exactly; anything else yields
 * `OracleError::NoAnswer`, which the stages turn into their fallback.
 */

use async_trait::async_trait;
use log::debug;

use super::{to_literal, Oracle, OracleQuery};
use crate::alignment::stages::distribute::{DistributeAnswer, DistributeQuery};
use crate::alignment::stages::merge::{MergeAnswer, MergeQuery};
use crate::alignment::stages::proof::{ProofAnswer, ProofQuery};
use crate::alignment::stages::shift::{ShiftAnswer, ShiftQuery};
use crate::alignment::stages::translate::{TranslateAnswer, TranslateQuery};
use crate::corpus::{Corpus, CorpusStore};
use crate::errors::{CorpusError, OracleError};

#[derive(Debug, Clone, Default)]
pub struct FixtureOracle {
    corpus: Corpus,
}

impl FixtureOracle {
    pub fn new(corpus: Corpus) -> Self {
        Self { corpus }
    }

    /// Replay every case found under the store's root
    pub fn from_store(store: &CorpusStore) -> Result<Self, CorpusError> {
        Ok(Self::new(store.load_merged()?))
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    fn replay<Q: OracleQuery>(&self, query: &Q) -> Result<Q::Answer, OracleError> {
        match self.corpus.answer_for(query) {
            Some(answer) => {
                debug!("Replaying recorded {} answer", Q::STAGE);
                Ok(answer.clone())
            }
            None => Err(OracleError::NoAnswer {
                stage: Q::STAGE.to_string(),
                query: to_literal(query),
            }),
        }
    }
}

#[async_trait]
impl Oracle for FixtureOracle {
    async fn distribute(&self, query: &DistributeQuery) -> Result<DistributeAnswer, OracleError> {
        self.replay(query)
    }

    async fn shift(&self, query: &ShiftQuery) -> Result<ShiftAnswer, OracleError> {
        self.replay(query)
    }

    async fn merge(&self, query: &MergeQuery) -> Result<MergeAnswer, OracleError> {
        self.replay(query)
    }

    async fn proof(&self, query: &ProofQuery) -> Result<ProofAnswer, OracleError> {
        self.replay(query)
    }

    async fn translate(&self, query: &TranslateQuery) -> Result<TranslateAnswer, OracleError> {
        self.replay(query)
    }
}
