/*!
 * Answer caching around another oracle.
 *
 * Answers are keyed by a SHA-256 digest of the stage name and the literal
 * query JSON. Only answers that satisfy their stage invariant are cached.
 * With recording enabled, every fresh valid answer is also kept as an
 * unverified test case, grouped by the block that asked for it, so it can be
 * appended to that block's corpus file for review.
 */

use std::collections::{BTreeMap, HashMap};
use std::future::Future;

use async_trait::async_trait;
use log::debug;
use parking_lot::{Mutex, RwLock};
use sha2::{Digest, Sha256};

use super::{to_literal, Oracle, OracleQuery};
use crate::alignment::blocks::current_block;
use crate::alignment::stages::distribute::{DistributeAnswer, DistributeQuery};
use crate::alignment::stages::merge::{MergeAnswer, MergeQuery};
use crate::alignment::stages::proof::{ProofAnswer, ProofQuery};
use crate::alignment::stages::shift::{ShiftAnswer, ShiftQuery};
use crate::alignment::stages::translate::{TranslateAnswer, TranslateQuery};
use crate::corpus::{Corpus, TestCase};
use crate::errors::OracleError;

pub struct CachingOracle<O> {
    inner: O,

    /// Digest -> answer JSON
    cache: RwLock<HashMap<String, serde_json::Value>>,

    hits: RwLock<usize>,

    misses: RwLock<usize>,

    /// Fresh answers by block index, when recording is enabled.
    /// `None` holds answers given outside any block.
    recorded: Option<Mutex<BTreeMap<Option<usize>, Corpus>>>,
}

impl<O: Oracle> CachingOracle<O> {
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
            hits: RwLock::new(0),
            misses: RwLock::new(0),
            recorded: None,
        }
    }

    /// Keep every fresh valid answer as a new test case
    pub fn with_recording(mut self) -> Self {
        self.recorded = Some(Mutex::new(BTreeMap::new()));
        self
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }

    /// Hits, misses and hit rate
    pub fn stats(&self) -> (usize, usize, f64) {
        let hits = *self.hits.read();
        let misses = *self.misses.read();
        let total = hits + misses;

        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };

        (hits, misses, hit_rate)
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    /// Drain the cases recorded so far, from all blocks
    pub fn take_recorded(&self) -> Corpus {
        let mut all = Corpus::new();
        for (_, cases) in self.take_recorded_by_block() {
            all.extend(cases);
        }
        all
    }

    /// Drain the cases recorded so far, keyed by block index
    pub fn take_recorded_by_block(&self) -> BTreeMap<Option<usize>, Corpus> {
        match &self.recorded {
            Some(recorded) => std::mem::take(&mut *recorded.lock()),
            None => BTreeMap::new(),
        }
    }

    fn key<Q: OracleQuery>(query: &Q) -> String {
        let mut hasher = Sha256::new();
        hasher.update(Q::STAGE.name().as_bytes());
        hasher.update(b":");
        hasher.update(to_literal(query).as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn lookup<Q: OracleQuery>(&self, key: &str) -> Option<Q::Answer> {
        let cached = self
            .cache
            .read()
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok());

        match cached {
            Some(answer) => {
                *self.hits.write() += 1;
                debug!("Cache hit for {} query {}", Q::STAGE, &key[..12]);
                Some(answer)
            }
            None => {
                *self.misses.write() += 1;
                debug!("Cache miss for {} query {}", Q::STAGE, &key[..12]);
                None
            }
        }
    }

    fn store<Q: OracleQuery>(&self, key: String, query: &Q, answer: &Q::Answer) {
        if query.check(answer).is_err() {
            return;
        }
        if let Ok(value) = serde_json::to_value(answer) {
            self.cache.write().insert(key, value);
        }
        if let Some(recorded) = &self.recorded {
            recorded
                .lock()
                .entry(current_block())
                .or_default()
                .push(TestCase::new(query.clone(), answer.clone()));
        }
    }

    async fn through<Q, F>(&self, query: &Q, fresh: F) -> Result<Q::Answer, OracleError>
    where
        Q: OracleQuery,
        F: Future<Output = Result<Q::Answer, OracleError>> + Send,
    {
        let key = Self::key(query);
        if let Some(answer) = self.lookup::<Q>(&key) {
            return Ok(answer);
        }
        let answer = fresh.await?;
        self.store(key, query, &answer);
        Ok(answer)
    }
}

#[async_trait]
impl<O: Oracle> Oracle for CachingOracle<O> {
    async fn distribute(&self, query: &DistributeQuery) -> Result<DistributeAnswer, OracleError> {
        self.through(query, self.inner.distribute(query)).await
    }

    async fn shift(&self, query: &ShiftQuery) -> Result<ShiftAnswer, OracleError> {
        self.through(query, self.inner.shift(query)).await
    }

    async fn merge(&self, query: &MergeQuery) -> Result<MergeAnswer, OracleError> {
        self.through(query, self.inner.merge(query)).await
    }

    async fn proof(&self, query: &ProofQuery) -> Result<ProofAnswer, OracleError> {
        self.through(query, self.inner.proof(query)).await
    }

    async fn translate(&self, query: &TranslateQuery) -> Result<TranslateAnswer, OracleError> {
        self.through(query, self.inner.translate(query)).await
    }
}
