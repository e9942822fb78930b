/*!
 * The aligner: runs the five stages over one block.
 *
 * Distribution and shifting alternate until a shift pass completes without
 * splitting anything. Merging, proofing and translation then run once each,
 * leaving exactly one candidate per anchor in anchor order.
 */

use log::{debug, info};

use crate::app_config::AlignerConfig;
use crate::errors::AlignmentError;
use crate::oracle::Oracle;
use crate::series::Series;

use super::stages::{Distributor, Merger, Proofer, Shifter, StageOutcome, Translator};
use super::state::Alignment;
use super::sync_group::SyncGroup;

#[derive(Debug, Clone)]
pub struct Aligner {
    ambiguity_threshold: f64,
    max_iterations: usize,
}

impl Default for Aligner {
    fn default() -> Self {
        Self::new(&AlignerConfig::default())
    }
}

impl Aligner {
    pub fn new(config: &AlignerConfig) -> Self {
        Self {
            ambiguity_threshold: config.ambiguity_threshold,
            max_iterations: config.max_iterations,
        }
    }

    /// Align `candidate` onto `anchor`, returning one candidate line per anchor
    pub async fn align(
        &self,
        anchor: Series,
        candidate: Series,
        oracle: &dyn Oracle,
    ) -> Result<Series, AlignmentError> {
        info!(
            "Aligning {} candidate segments onto {} anchor segments",
            candidate.len(),
            anchor.len()
        );

        let alignment = self.converge(Alignment::new(anchor, candidate), oracle).await?;
        alignment.validate()?;

        let alignment = Merger::new().run(alignment, oracle).await?;
        let alignment = Proofer::new().run(alignment, oracle).await?;
        let alignment = Translator::new().run(alignment, oracle).await?;

        Self::check_one_to_one(&alignment)?;
        Ok(alignment.into_candidate())
    }

    /// Alternate distribution and shifting until a shift pass is stable
    async fn converge(&self, mut alignment: Alignment, oracle: &dyn Oracle) -> Result<Alignment, AlignmentError> {
        let distributor = Distributor::new(self.ambiguity_threshold);
        let shifter = Shifter::new();

        for iteration in 1..=self.max_iterations {
            alignment = distributor.run(alignment, oracle).await?;
            let (next, outcome) = shifter.run(alignment, oracle).await?;
            alignment = next;

            if outcome == StageOutcome::Stable {
                debug!("Distribution and shifting converged after {} iterations", iteration);
                return Ok(alignment);
            }
        }

        Err(AlignmentError::NotConverged {
            iterations: self.max_iterations,
            dump: alignment.dump(),
        })
    }

    fn check_one_to_one(alignment: &Alignment) -> Result<(), AlignmentError> {
        let groups = alignment.sync_groups();
        if alignment.candidate().len() != alignment.anchor().len() {
            return Err(alignment.structural(format!(
                "{} candidates remain for {} anchors",
                alignment.candidate().len(),
                alignment.anchor().len()
            )));
        }
        for (i, group) in groups.iter().enumerate() {
            if *group != SyncGroup::single(i, vec![i]) {
                return Err(alignment.structural(format!(
                    "sync group {} is {:?} -> {:?}, expected [{}] -> [{}]",
                    i, group.anchors, group.candidates, i, i
                )));
            }
        }
        Ok(())
    }
}
