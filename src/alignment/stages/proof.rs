/*!
 * Proofing stage: transcription fixes for every one-to-one group.
 */

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::alignment::state::Alignment;
use crate::corpus::{Corpus, TestCase};
use crate::errors::AlignmentError;
use crate::oracle::{to_literal, Oracle, OracleQuery, Stage};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofQuery {
    pub anchor_text: String,
    pub candidate_text: String,
}

/// An empty `corrected_text` asks for the candidate to be deleted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofAnswer {
    pub corrected_text: String,
    pub note: String,
}

impl OracleQuery for ProofQuery {
    type Answer = ProofAnswer;

    const STAGE: Stage = Stage::Proof;

    fn check(&self, answer: &ProofAnswer) -> Result<(), String> {
        let changed = answer.corrected_text != self.candidate_text;
        match (changed, answer.note.is_empty()) {
            (true, true) => Err("text was changed without a note".to_string()),
            (false, false) => Err(format!("note '{}' given for unchanged text", answer.note)),
            _ => Ok(()),
        }
    }

    fn cases(corpus: &Corpus) -> &[TestCase<Self, ProofAnswer>] {
        &corpus.proof
    }

    fn cases_mut(corpus: &mut Corpus) -> &mut Vec<TestCase<Self, ProofAnswer>> {
        &mut corpus.proof
    }
}

#[derive(Debug, Default)]
pub struct Proofer;

impl Proofer {
    pub fn new() -> Self {
        Self
    }

    pub async fn run(&self, mut alignment: Alignment, oracle: &dyn Oracle) -> Result<Alignment, AlignmentError> {
        let group_count = alignment.sync_groups().len();
        let mut corrected = 0;
        let mut deleted = 0;

        // Groups are re-read each step: a deletion renumbers later candidates
        for position in 0..group_count {
            let groups = alignment.sync_groups();
            let group = &groups[position];
            let (Some(_), [candidate]) = (group.anchor(), group.candidates.as_slice()) else {
                continue;
            };
            let candidate = *candidate;

            let query = ProofQuery {
                anchor_text: alignment.anchor_text(group),
                candidate_text: alignment.candidate()[candidate].text.clone(),
            };
            let Some(answer) = Self::ask(&query, oracle).await else {
                continue;
            };

            // An empty line left empty is unchanged, not deleted
            if answer.corrected_text.is_empty() && !query.candidate_text.is_empty() {
                info!(
                    "Deleting candidate {} ('{}'): {}",
                    candidate, query.candidate_text, answer.note
                );
                alignment = alignment.remove_candidate(candidate)?;
                deleted += 1;
            } else if answer.corrected_text != query.candidate_text {
                debug!(
                    "Corrected candidate {}: '{}' -> '{}' ({})",
                    candidate, query.candidate_text, answer.corrected_text, answer.note
                );
                alignment = alignment.with_candidate_text(candidate, answer.corrected_text)?;
                corrected += 1;
            }
        }

        info!("Proofing corrected {} and deleted {} candidates", corrected, deleted);
        Ok(alignment)
    }

    /// Ask the oracle; `None` keeps the original text
    async fn ask(query: &ProofQuery, oracle: &dyn Oracle) -> Option<ProofAnswer> {
        match oracle.proof(query).await {
            Ok(answer) => match query.verify(&answer) {
                Ok(()) => Some(answer),
                Err(e) => {
                    warn!(
                        "{}; keeping original text. query={} answer={}",
                        e,
                        to_literal(query),
                        to_literal(&answer)
                    );
                    None
                }
            },
            Err(e) => {
                warn!("Proof oracle failed ({}); keeping original text. query={}", e, to_literal(query));
                None
            }
        }
    }
}
