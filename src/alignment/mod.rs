/*!
 * The alignment engine.
 *
 * - `overlap`: time-overlap matrix between anchor and candidate segments
 * - `sync_group`: partition of candidate indices onto anchors
 * - `state`: the immutable-by-value working state of one block
 * - `stages`: distribute, shift, merge, proof and translate
 * - `aligner`: the convergence loop over the stages
 * - `blocks`: block splitting and concurrent block execution
 */

pub mod aligner;
pub mod blocks;
pub mod overlap;
pub mod stages;
pub mod state;
pub mod sync_group;

pub use aligner::Aligner;
pub use blocks::{concatenate, current_block, split_into_blocks, Block, BlockAligner};
pub use overlap::OverlapMatrix;
pub use stages::StageOutcome;
pub use state::Alignment;
pub use sync_group::SyncGroup;
