/*!
 * The five oracle-driven refinement stages.
 *
 * Each stage owns its query/answer pair and the invariant linking them, and
 * consumes an `Alignment` by value to return the refined one.
 */

pub mod distribute;
pub mod merge;
pub mod proof;
pub mod shift;
pub mod translate;

pub use distribute::{DistributeAnswer, DistributeQuery, Distributor};
pub use merge::{MergeAnswer, MergeQuery, Merger};
pub use proof::{ProofAnswer, ProofQuery, Proofer};
pub use shift::{ShiftAnswer, ShiftQuery, Shifter};
pub use translate::{KnownPair, TranslateAnswer, TranslateQuery, Translator};

/// Result of one stage pass that may edit the candidate series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// No segment was split; the grouping is final for this stage
    Stable,
    /// A segment was split and the outer loop must run again
    NeedsRestart,
}
