/*!
 * Translation stage: synthesize candidate text for anchors left without any.
 *
 * Runs at most one oracle query per alignment. The query lists every
 * resolved pair as context and every missing anchor index to fill.
 */

use std::collections::BTreeMap;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::alignment::state::Alignment;
use crate::alignment::sync_group::SyncGroup;
use crate::corpus::{Corpus, TestCase};
use crate::errors::AlignmentError;
use crate::oracle::{to_literal, Oracle, OracleQuery, Stage};
use crate::series::{Segment, Series};

/// A resolved anchor/candidate pair given as context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownPair {
    pub anchor_text: String,
    pub candidate_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateQuery {
    /// Number of anchors in the block
    pub size: usize,
    pub known: BTreeMap<usize, KnownPair>,
    /// Anchor text for each index still lacking candidate text
    pub missing: BTreeMap<usize, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateAnswer {
    pub texts: BTreeMap<usize, String>,
}

impl OracleQuery for TranslateQuery {
    type Answer = TranslateAnswer;

    const STAGE: Stage = Stage::Translate;

    fn check(&self, answer: &TranslateAnswer) -> Result<(), String> {
        if let Some(index) = self.missing.keys().find(|i| !answer.texts.contains_key(i)) {
            return Err(format!("no text for missing index {}", index));
        }
        if let Some(index) = answer.texts.keys().find(|i| !self.missing.contains_key(i)) {
            return Err(format!("text for index {} which was not requested", index));
        }
        Ok(())
    }

    fn cases(corpus: &Corpus) -> &[TestCase<Self, TranslateAnswer>] {
        &corpus.translate
    }

    fn cases_mut(corpus: &mut Corpus) -> &mut Vec<TestCase<Self, TranslateAnswer>> {
        &mut corpus.translate
    }
}

#[derive(Debug, Default)]
pub struct Translator;

impl Translator {
    pub fn new() -> Self {
        Self
    }

    /// Produce the final one-to-one candidate series in anchor order
    pub async fn run(&self, alignment: Alignment, oracle: &dyn Oracle) -> Result<Alignment, AlignmentError> {
        let groups = alignment.sync_groups();
        let mut known = BTreeMap::new();
        let mut missing = BTreeMap::new();

        for (position, group) in groups.iter().enumerate() {
            let anchor = match (group.anchor(), group.candidates.len()) {
                (Some(anchor), 0 | 1) => anchor,
                _ => {
                    return Err(alignment.structural(format!(
                        "cannot translate sync group {} with {} anchors and {} candidates",
                        position,
                        group.anchors.len(),
                        group.candidates.len()
                    )));
                }
            };
            let anchor_text = alignment.anchor()[anchor].text.clone();
            match group.candidates.first() {
                Some(&candidate) => {
                    known.insert(
                        anchor,
                        KnownPair {
                            anchor_text,
                            candidate_text: alignment.candidate()[candidate].text.clone(),
                        },
                    );
                }
                None => {
                    missing.insert(anchor, anchor_text);
                }
            }
        }

        if missing.is_empty() {
            debug!("Every anchor has candidate text; nothing to translate");
            return Ok(alignment);
        }

        let query = TranslateQuery {
            size: alignment.anchor().len(),
            known,
            missing,
        };
        let texts = Self::ask(&query, oracle).await;
        info!("Translated {} missing lines", query.missing.len());

        let mut segments = Vec::with_capacity(groups.len());
        let mut final_groups = Vec::with_capacity(groups.len());
        for group in &groups {
            let Some(anchor) = group.anchor() else {
                continue;
            };
            let timing = &alignment.anchor()[anchor];
            let segment = match group.candidates.first() {
                Some(&candidate) => alignment.candidate()[candidate].restamped(timing),
                None => Segment::new(
                    timing.start_ms,
                    timing.end_ms,
                    texts.get(&anchor).cloned().unwrap_or_default(),
                ),
            };
            final_groups.push(SyncGroup::single(anchor, vec![segments.len()]));
            segments.push(segment);
        }

        Ok(alignment.with_candidate(Series::new(segments), final_groups))
    }

    /// Ask the oracle; indices it does not answer get empty text
    async fn ask(query: &TranslateQuery, oracle: &dyn Oracle) -> BTreeMap<usize, String> {
        match oracle.translate(query).await {
            Ok(answer) => {
                if let Err(e) = query.verify(&answer) {
                    warn!(
                        "{}; unanswered lines stay empty. query={} answer={}",
                        e,
                        to_literal(query),
                        to_literal(&answer)
                    );
                }
                answer.texts
            }
            Err(e) => {
                warn!(
                    "Translate oracle failed ({}); missing lines stay empty. query={}",
                    e,
                    to_literal(query)
                );
                BTreeMap::new()
            }
        }
    }
}
