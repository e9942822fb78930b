/*!
 * Block splitting and block-level execution.
 *
 * A long episode is cut into blocks at silent stretches of the anchor track
 * that no candidate segment crosses. Blocks are independent alignments; they
 * may run concurrently behind a semaphore, and their results are joined back
 * in block order regardless of completion order.
 */

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use log::{error, info};
use tokio::sync::Semaphore;

use crate::app_config::AlignerConfig;
use crate::errors::AlignmentError;
use crate::oracle::Oracle;
use crate::series::{Segment, Series};

use super::aligner::Aligner;

tokio::task_local! {
    static CURRENT_BLOCK: usize;
}

/// Index of the block whose alignment is being polled, if any
pub fn current_block() -> Option<usize> {
    CURRENT_BLOCK.try_with(|index| *index).ok()
}

/// A bounded span of anchor subtitles with the candidates that belong to it
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub index: usize,
    pub anchor: Series,
    pub candidate: Series,
}

impl Block {
    /// Name used for corpus files, e.g. `episode-01/block-003`
    pub fn name(&self, prefix: &str) -> String {
        format!("{}/block-{:03}", prefix, self.index)
    }
}

/// Cut both series into blocks at anchor gaps of at least `min_gap_ms`.
///
/// A gap is only used when no candidate overlaps anchors on both sides of
/// it. Candidates are assigned to the block containing their midpoint
/// relative to the gap's midpoint.
pub fn split_into_blocks(anchor: &Series, candidate: &Series, min_gap_ms: u64) -> Vec<Block> {
    let anchors = anchor.segments();
    if anchors.is_empty() {
        return vec![Block {
            index: 0,
            anchor: Series::default(),
            candidate: candidate.clone(),
        }];
    }

    // (first anchor index of the next block, gap midpoint)
    let mut cuts: Vec<(usize, u64)> = Vec::new();
    for i in 1..anchors.len() {
        let previous_end = anchors[..i].iter().map(|s| s.end_ms).max().unwrap_or(0);
        let next_start = anchors[i].start_ms;
        if next_start < previous_end || next_start - previous_end < min_gap_ms {
            continue;
        }
        let crossed = candidate
            .iter()
            .any(|c| c.start_ms < previous_end && c.end_ms > next_start);
        if !crossed {
            cuts.push((i, previous_end + (next_start - previous_end) / 2));
        }
    }

    let mut blocks = Vec::with_capacity(cuts.len() + 1);
    let mut anchor_start = 0;
    let mut candidates = candidate.iter().peekable();
    for index in 0..=cuts.len() {
        let (anchor_end, boundary) = match cuts.get(index) {
            Some(&(end, midpoint)) => (end, Some(midpoint)),
            None => (anchors.len(), None),
        };

        let mut block_candidates: Vec<Segment> = Vec::new();
        while let Some(next) = candidates.peek() {
            let belongs = boundary.is_none_or(|b| midpoint_ms(next) < b);
            if !belongs {
                break;
            }
            if let Some(segment) = candidates.next() {
                block_candidates.push(segment.clone());
            }
        }

        blocks.push(Block {
            index,
            anchor: Series::new(anchors[anchor_start..anchor_end].to_vec()),
            candidate: Series::new(block_candidates),
        });
        anchor_start = anchor_end;
    }

    info!("Split {} anchor segments into {} blocks", anchors.len(), blocks.len());
    blocks
}

fn midpoint_ms(segment: &Segment) -> u64 {
    segment.start_ms + segment.duration_ms() / 2
}

/// Runs blocks through an `Aligner` with bounded concurrency
pub struct BlockAligner {
    aligner: Aligner,
    max_concurrent_blocks: usize,
}

impl BlockAligner {
    pub fn new(config: &AlignerConfig) -> Self {
        Self {
            aligner: Aligner::new(config),
            max_concurrent_blocks: config.max_concurrent_blocks.max(1),
        }
    }

    /// Align every block; results are returned in block order.
    ///
    /// `progress_callback` receives `(completed, total)` after each block.
    pub async fn align_blocks(
        &self,
        blocks: Vec<Block>,
        oracle: &dyn Oracle,
        progress_callback: impl Fn(usize, usize) + Clone + Send,
    ) -> Vec<(usize, Result<Series, AlignmentError>)> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_blocks));
        let total_blocks = blocks.len();
        let processed_blocks = Arc::new(AtomicUsize::new(0));

        let mut results = stream::iter(blocks)
            .map(|block| {
                let semaphore = semaphore.clone();
                let processed_blocks = processed_blocks.clone();
                let progress_callback = progress_callback.clone();
                let index = block.index;

                // Oracle calls made for this block can see its index
                CURRENT_BLOCK.scope(index, async move {
                    let _permit = match semaphore.acquire().await {
                        Ok(permit) => Some(permit),
                        Err(e) => {
                            error!("Block admission gate closed: {}", e);
                            None
                        }
                    };

                    let start_time = Instant::now();
                    info!("Aligning block {} of {}", block.index + 1, total_blocks);
                    let result = self.aligner.align(block.anchor, block.candidate, oracle).await;

                    let current = processed_blocks.fetch_add(1, Ordering::SeqCst) + 1;
                    progress_callback(current, total_blocks);

                    match &result {
                        Ok(_) => info!("Block {} completed in {:?}", block.index + 1, start_time.elapsed()),
                        Err(e) => error!("Block {} failed: {}", block.index + 1, e),
                    }

                    (block.index, result)
                })
            })
            .buffer_unordered(self.max_concurrent_blocks)
            .collect::<Vec<_>>()
            .await;

        // Completion order is arbitrary; restore block order
        results.sort_by_key(|(index, _)| *index);
        results
    }
}

/// Join block results positionally, or report the first failed block
pub fn concatenate(results: Vec<(usize, Result<Series, AlignmentError>)>) -> Result<Series, AlignmentError> {
    let mut segments = Vec::new();
    for (index, result) in results {
        match result {
            Ok(series) => segments.extend(series.into_segments()),
            Err(source) => {
                return Err(AlignmentError::Block {
                    index,
                    source: Box::new(source),
                })
            }
        }
    }
    Ok(Series::new(segments))
}
