/*!
 * Shifting stage.
 *
 * Moves candidate text across the boundary between adjacent sync groups when
 * the oracle says a sentence was cut in the wrong place. Whole segments move
 * by regrouping; a partial move splits a segment and ends the pass.
 */

use std::cmp::Ordering;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::StageOutcome;
use crate::alignment::state::Alignment;
use crate::alignment::sync_group::{self, SyncGroup};
use crate::corpus::{Corpus, TestCase};
use crate::errors::AlignmentError;
use crate::oracle::{to_literal, Oracle, OracleQuery, Stage};
use crate::text_utils;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftQuery {
    pub anchor_text_1: String,
    pub candidate_text_1: String,
    pub anchor_text_2: String,
    pub candidate_text_2: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftAnswer {
    pub candidate_text_1_shifted: String,
    pub candidate_text_2_shifted: String,
}

impl OracleQuery for ShiftQuery {
    type Answer = ShiftAnswer;

    const STAGE: Stage = Stage::Shift;

    fn check(&self, answer: &ShiftAnswer) -> Result<(), String> {
        let original = format!("{}{}", self.candidate_text_1, self.candidate_text_2);
        let shifted = format!(
            "{}{}",
            answer.candidate_text_1_shifted, answer.candidate_text_2_shifted
        );
        if original != shifted {
            return Err(format!("'{}' does not reproduce '{}'", shifted, original));
        }
        Ok(())
    }

    fn cases(corpus: &Corpus) -> &[TestCase<Self, ShiftAnswer>] {
        &corpus.shift
    }

    fn cases_mut(corpus: &mut Corpus) -> &mut Vec<TestCase<Self, ShiftAnswer>> {
        &mut corpus.shift
    }
}

/// Result of rebalancing one boundary
enum Rebalanced {
    /// Only whole segments moved
    Regrouped(Alignment),
    /// A segment was split
    Split(Alignment),
}

#[derive(Debug, Default)]
pub struct Shifter;

impl Shifter {
    pub fn new() -> Self {
        Self
    }

    /// One pass over every adjacent pair of groups.
    ///
    /// Returns `NeedsRestart` as soon as a segment is split; the rest of the
    /// pass is abandoned.
    pub async fn run(
        &self,
        mut alignment: Alignment,
        oracle: &dyn Oracle,
    ) -> Result<(Alignment, StageOutcome), AlignmentError> {
        let group_count = alignment.sync_groups().len();

        for first in 0..group_count.saturating_sub(1) {
            let groups = alignment.sync_groups();
            let second = first + 1;

            let query = ShiftQuery {
                anchor_text_1: alignment.anchor_text(&groups[first]),
                candidate_text_1: alignment.candidate_text(&groups[first]),
                anchor_text_2: alignment.anchor_text(&groups[second]),
                candidate_text_2: alignment.candidate_text(&groups[second]),
            };
            if query.candidate_text_1.is_empty() && query.candidate_text_2.is_empty() {
                continue;
            }

            let Some(answer) = Self::ask(&query, oracle).await else {
                continue;
            };

            let before = text_utils::char_len(&query.candidate_text_1);
            let after = text_utils::char_len(&answer.candidate_text_1_shifted);
            let rebalanced = match after.cmp(&before) {
                Ordering::Equal => continue,
                Ordering::Greater => {
                    debug!("Shifting {} characters from group {} to group {}", after - before, second, first);
                    Self::pull_forward(alignment, &groups, first, after - before)?
                }
                Ordering::Less => {
                    debug!("Shifting {} characters from group {} to group {}", before - after, first, second);
                    Self::push_back(alignment, &groups, first, before - after)?
                }
            };

            alignment = match rebalanced {
                Rebalanced::Regrouped(next) => next,
                Rebalanced::Split(next) => {
                    info!("Shift split a candidate between groups {} and {}; restarting", first, second);
                    return Ok((next, StageOutcome::NeedsRestart));
                }
            };
        }

        Ok((alignment, StageOutcome::Stable))
    }

    /// Ask the oracle; `None` means keep the boundary where it is
    async fn ask(query: &ShiftQuery, oracle: &dyn Oracle) -> Option<ShiftAnswer> {
        match oracle.shift(query).await {
            Ok(answer) => match query.verify(&answer) {
                Ok(()) => Some(answer),
                Err(e) => {
                    warn!(
                        "{}; keeping boundary. query={} answer={}",
                        e,
                        to_literal(query),
                        to_literal(&answer)
                    );
                    None
                }
            },
            Err(e) => {
                warn!("Shift oracle failed ({}); keeping boundary. query={}", e, to_literal(query));
                None
            }
        }
    }

    /// Move `count` leading characters of group `first + 1` into group `first`
    fn pull_forward(
        alignment: Alignment,
        groups: &[SyncGroup],
        first: usize,
        count: usize,
    ) -> Result<Rebalanced, AlignmentError> {
        let second = first + 1;
        let mut regrouped = groups.to_vec();
        let mut moved = Vec::new();
        let mut remaining = count;

        for &candidate in &groups[second].candidates {
            if remaining == 0 {
                break;
            }
            let length = text_utils::char_len(&alignment.candidate()[candidate].text);
            if length <= remaining {
                regrouped = sync_group::move_candidate(&regrouped, candidate, first);
                moved.push(candidate);
                remaining -= length;
            } else {
                let split = alignment
                    .with_sync_groups(regrouped)
                    .settling(moved)
                    .split_candidate(candidate, remaining, first, second)?;
                return Ok(Rebalanced::Split(split));
            }
        }

        if remaining > 0 {
            warn!("Group {} ran out of text with {} characters left to shift", second, remaining);
        }
        Ok(Rebalanced::Regrouped(alignment.with_sync_groups(regrouped).settling(moved)))
    }

    /// Move `count` trailing characters of group `first` into group `first + 1`
    fn push_back(
        alignment: Alignment,
        groups: &[SyncGroup],
        first: usize,
        count: usize,
    ) -> Result<Rebalanced, AlignmentError> {
        let second = first + 1;
        let mut regrouped = groups.to_vec();
        let mut moved = Vec::new();
        let mut remaining = count;

        for &candidate in groups[first].candidates.iter().rev() {
            if remaining == 0 {
                break;
            }
            let length = text_utils::char_len(&alignment.candidate()[candidate].text);
            if length <= remaining {
                regrouped = sync_group::move_candidate(&regrouped, candidate, second);
                moved.push(candidate);
                remaining -= length;
            } else {
                let split = alignment
                    .with_sync_groups(regrouped)
                    .settling(moved)
                    .split_candidate(candidate, length - remaining, first, second)?;
                return Ok(Rebalanced::Split(split));
            }
        }

        if remaining > 0 {
            warn!("Group {} ran out of text with {} characters left to shift", first, remaining);
        }
        Ok(Rebalanced::Regrouped(alignment.with_sync_groups(regrouped).settling(moved)))
    }
}
