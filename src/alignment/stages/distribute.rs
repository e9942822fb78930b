/*!
 * Distribution stage.
 *
 * Resolves candidates whose timing does not decide which anchor they belong
 * to: their scaled overlap exceeds the ambiguity threshold on zero or two
 * anchor rows. Candidates with no overlap at all are dropped; candidates
 * straddling two anchors are handed to the oracle, which says how much of the
 * text belongs to each side.
 */

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::alignment::state::Alignment;
use crate::alignment::sync_group::{self, SyncGroup};
use crate::corpus::{Corpus, TestCase};
use crate::errors::AlignmentError;
use crate::oracle::{to_literal, Oracle, OracleQuery, Stage};
use crate::text_utils;

/// Where does text straddling two anchors belong?
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributeQuery {
    pub anchor_text_1: String,
    /// Candidate text already grouped with anchor 1
    pub candidate_prefix_1: String,
    pub anchor_text_2: String,
    /// Candidate text already grouped with anchor 2
    pub candidate_suffix_2: String,
    pub ambiguous_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributeAnswer {
    pub text_to_append_1: String,
    pub text_to_prepend_2: String,
}

impl DistributeAnswer {
    /// Everything on side 1; the documented fallback
    pub fn all_to_first(query: &DistributeQuery) -> Self {
        Self {
            text_to_append_1: query.ambiguous_text.clone(),
            text_to_prepend_2: String::new(),
        }
    }
}

impl OracleQuery for DistributeQuery {
    type Answer = DistributeAnswer;

    const STAGE: Stage = Stage::Distribute;

    fn check(&self, answer: &DistributeAnswer) -> Result<(), String> {
        if answer.text_to_append_1.is_empty() && answer.text_to_prepend_2.is_empty() {
            return Err("both sides are empty".to_string());
        }
        let rejoined = format!("{}{}", answer.text_to_append_1, answer.text_to_prepend_2);
        if rejoined != self.ambiguous_text {
            return Err(format!(
                "'{}' + '{}' does not reproduce '{}'",
                answer.text_to_append_1, answer.text_to_prepend_2, self.ambiguous_text
            ));
        }
        Ok(())
    }

    fn cases(corpus: &Corpus) -> &[TestCase<Self, DistributeAnswer>] {
        &corpus.distribute
    }

    fn cases_mut(corpus: &mut Corpus) -> &mut Vec<TestCase<Self, DistributeAnswer>> {
        &mut corpus.distribute
    }
}

pub struct Distributor {
    threshold: f64,
}

impl Distributor {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Lowest unsettled candidate whose above-threshold row count is not one
    pub fn next_pending(&self, alignment: &Alignment) -> Option<(usize, Vec<usize>)> {
        let overlap = alignment.overlap();
        (0..alignment.candidate().len())
            .filter(|&j| !alignment.is_settled(j))
            .map(|j| (j, overlap.rows_above(j, self.threshold)))
            .find(|(_, rows)| rows.len() != 1)
    }

    /// Distribute until no ambiguous candidate remains.
    ///
    /// Every iteration settles or removes one unsettled candidate, so the
    /// loop is bounded by the candidate count.
    pub async fn run(&self, mut alignment: Alignment, oracle: &dyn Oracle) -> Result<Alignment, AlignmentError> {
        while let Some((candidate, rows)) = self.next_pending(&alignment) {
            alignment = match rows.as_slice() {
                [] => {
                    info!(
                        "Dropping candidate {} with no anchor overlap: '{}'",
                        candidate,
                        text_utils::truncate_text(&alignment.candidate()[candidate].text, 30)
                    );
                    alignment.remove_candidate(candidate)?
                }
                [first, second] => {
                    self.resolve(alignment, candidate, *first, *second, oracle).await?
                }
                _ => {
                    return Err(AlignmentError::UnsupportedAmbiguity {
                        candidate,
                        rows,
                        dump: alignment.dump(),
                    });
                }
            };
        }
        Ok(alignment)
    }

    async fn resolve(
        &self,
        alignment: Alignment,
        candidate: usize,
        first_anchor: usize,
        second_anchor: usize,
        oracle: &dyn Oracle,
    ) -> Result<Alignment, AlignmentError> {
        let groups = alignment.sync_groups();
        let first = sync_group::group_of_anchor(&groups, first_anchor)
            .ok_or_else(|| alignment.structural(format!("anchor {} has no sync group", first_anchor)))?;
        let second = sync_group::group_of_anchor(&groups, second_anchor)
            .ok_or_else(|| alignment.structural(format!("anchor {} has no sync group", second_anchor)))?;

        let ambiguous_text = alignment.candidate()[candidate].text.clone();
        if ambiguous_text.is_empty() {
            debug!("Candidate {} has no text; placing it with anchor {}", candidate, first_anchor);
            let moved = sync_group::move_candidate(&groups, candidate, first);
            return Ok(alignment.with_sync_groups(moved).settling([candidate]));
        }

        let query = DistributeQuery {
            anchor_text_1: alignment.anchor_text(&groups[first]),
            candidate_prefix_1: Self::text_without(&alignment, &groups[first], candidate),
            anchor_text_2: alignment.anchor_text(&groups[second]),
            candidate_suffix_2: Self::text_without(&alignment, &groups[second], candidate),
            ambiguous_text,
        };
        let answer = Self::ask(&query, oracle).await;

        if answer.text_to_prepend_2.is_empty() {
            debug!("Candidate {} belongs entirely to anchor {}", candidate, first_anchor);
            let moved = sync_group::move_candidate(&groups, candidate, first);
            Ok(alignment.with_sync_groups(moved).settling([candidate]))
        } else if answer.text_to_append_1.is_empty() {
            debug!("Candidate {} belongs entirely to anchor {}", candidate, second_anchor);
            let moved = sync_group::move_candidate(&groups, candidate, second);
            Ok(alignment.with_sync_groups(moved).settling([candidate]))
        } else {
            let offset = text_utils::char_len(&answer.text_to_append_1);
            debug!(
                "Splitting candidate {} after {} characters between anchors {} and {}",
                candidate, offset, first_anchor, second_anchor
            );
            alignment.split_candidate(candidate, offset, first, second)
        }
    }

    /// Ask the oracle, falling back to "all on side 1" on failure
    async fn ask(query: &DistributeQuery, oracle: &dyn Oracle) -> DistributeAnswer {
        match oracle.distribute(query).await {
            Ok(answer) => match query.verify(&answer) {
                Ok(()) => answer,
                Err(e) => {
                    warn!(
                        "{}; assigning all text to side 1. query={} answer={}",
                        e,
                        to_literal(query),
                        to_literal(&answer)
                    );
                    DistributeAnswer::all_to_first(query)
                }
            },
            Err(e) => {
                warn!(
                    "Distribute oracle failed ({}); assigning all text to side 1. query={}",
                    e,
                    to_literal(query)
                );
                DistributeAnswer::all_to_first(query)
            }
        }
    }

    fn text_without(alignment: &Alignment, group: &SyncGroup, excluded: usize) -> String {
        let indices: Vec<usize> = group.candidates.iter().copied().filter(|&c| c != excluded).collect();
        alignment.candidate().concat_text(&indices)
    }
}
