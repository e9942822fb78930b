/*!
 * Tests for the overlap model, sync groups, alignment state and blocks
 */

use subalign::alignment::sync_group::{derive_sync_groups, validate_sync_groups};
use subalign::alignment::{concatenate, split_into_blocks};
use subalign::app_config::AlignerConfig;
use subalign::oracle::ScriptedOracle;
use subalign::{Alignment, AlignmentError, BlockAligner, OverlapMatrix, Series, SyncGroup};

use crate::common::{series, texts};

#[test]
fn test_overlapMatrix_shouldScaleEachColumnByItsMaximum() {
    let anchor = series(&[(0, 1000, "甲"), (1000, 2000, "乙")]);
    let candidate = series(&[(500, 1500, "x"), (1200, 1800, "y"), (3000, 4000, "z")]);

    let overlap = OverlapMatrix::compute(&anchor, &candidate);

    assert_eq!((overlap.rows(), overlap.columns()), (2, 3));
    assert_eq!(overlap.overlap(0, 0), 500);
    assert_eq!(overlap.scaled(0, 0), 1.0);
    assert_eq!(overlap.scaled(1, 0), 1.0);
    assert_eq!(overlap.scaled(0, 1), 0.0);
    assert_eq!(overlap.scaled(1, 1), 1.0);
    assert_eq!(overlap.rows_above(0, 0.33), vec![0, 1]);
    assert!(overlap.rows_above(2, 0.33).is_empty());
}

#[test]
fn test_deriveSyncGroups_shouldBreakTiesTowardsLowerAnchor() {
    let anchor = series(&[(0, 1000, "甲"), (1000, 2000, "乙")]);
    let candidate = series(&[(500, 1500, "x"), (1200, 1800, "y")]);

    let groups = derive_sync_groups(&OverlapMatrix::compute(&anchor, &candidate));

    assert_eq!(groups, vec![SyncGroup::single(0, vec![0]), SyncGroup::single(1, vec![1])]);
    assert!(validate_sync_groups(&groups, 2, 2).is_ok());
}

#[test]
fn test_validateSyncGroups_shouldRejectBrokenPartitions() {
    let duplicated = vec![SyncGroup::single(0, vec![0]), SyncGroup::single(1, vec![0, 1])];
    let missing = vec![SyncGroup::single(0, vec![0]), SyncGroup::single(1, vec![])];
    let shared_anchor = vec![SyncGroup::new(vec![0, 1], vec![0, 1])];

    assert!(validate_sync_groups(&duplicated, 2, 2).is_err());
    assert!(validate_sync_groups(&missing, 2, 2).is_err());
    assert!(validate_sync_groups(&shared_anchor, 2, 2).is_err());
}

#[test]
fn test_alignment_splitThenRemove_shouldKeepGroupsConsistent() {
    let anchor = series(&[(0, 1000, "甲"), (1000, 2000, "乙")]);
    let candidate = series(&[(0, 300, "噪"), (500, 1500, "abcd")]);
    let alignment = Alignment::new(anchor, candidate);

    let split = alignment.split_candidate(1, 2, 0, 1).unwrap();
    assert_eq!(texts(split.candidate()), vec!["噪", "ab", "cd"]);
    assert!(split.is_settled(1) && split.is_settled(2));

    let removed = split.remove_candidate(0).unwrap();
    let groups = removed.sync_groups();
    assert_eq!(groups, vec![SyncGroup::single(0, vec![0]), SyncGroup::single(1, vec![1])]);
    assert!(removed.is_settled(0) && removed.is_settled(1));
    assert!(removed.validate().is_ok());
}

#[test]
fn test_alignment_structuralError_shouldCarryDump() {
    let alignment = Alignment::new(series(&[(0, 1000, "甲")]), series(&[(0, 1000, "a")]));

    match alignment.remove_candidate(5) {
        Err(AlignmentError::Structural { dump, .. }) => {
            assert!(dump.contains("Sync groups:"));
            assert!(dump.contains("Scaled overlap:"));
        }
        other => panic!("expected structural error, got {:?}", other.map(|a| a.dump())),
    }
}

#[test]
fn test_splitIntoBlocks_shouldOnlyCutUncrossedGaps() {
    let anchor = series(&[
        (0, 1000, "一"),
        (4000, 5000, "二"),
        (8000, 9000, "三"),
    ]);
    // The second gap is crossed by a long candidate
    let candidate = series(&[(0, 1000, "a"), (2600, 3000, "b"), (4000, 8500, "c")]);

    let blocks = split_into_blocks(&anchor, &candidate, 2000);

    assert_eq!(blocks.len(), 2);
    assert_eq!(texts(&blocks[0].anchor), vec!["一"]);
    assert_eq!(texts(&blocks[0].candidate), vec!["a"]);
    assert_eq!(texts(&blocks[1].anchor), vec!["二", "三"]);
    assert_eq!(texts(&blocks[1].candidate), vec!["b", "c"]);
    assert_eq!(blocks[1].name("ep01"), "ep01/block-001");
}

#[test]
fn test_splitIntoBlocks_withEmptyAnchor_shouldReturnSingleBlock() {
    let candidate = series(&[(0, 1000, "a")]);

    let blocks = split_into_blocks(&Series::default(), &candidate, 2000);

    assert_eq!(blocks.len(), 1);
    assert!(blocks[0].anchor.is_empty());
    assert_eq!(blocks[0].candidate, candidate);
}

#[tokio::test]
async fn test_blockAligner_withConcurrency_shouldReturnResultsInBlockOrder() {
    let anchor = series(&[(0, 1000, "一"), (5000, 6000, "二"), (10000, 11000, "三")]);
    let candidate = series(&[(0, 1000, "one"), (5000, 6000, "two"), (10000, 11000, "three")]);
    let config = AlignerConfig {
        max_concurrent_blocks: 3,
        ..AlignerConfig::default()
    };
    let blocks = split_into_blocks(&anchor, &candidate, config.block_gap_ms);
    let progress = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let seen = progress.clone();

    let results = BlockAligner::new(&config)
        .align_blocks(blocks, &ScriptedOracle::new(), move |done, total| {
            seen.lock().unwrap().push((done, total));
        })
        .await;

    let indices: Vec<usize> = results.iter().map(|(i, _)| *i).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert_eq!(texts(&concatenate(results).unwrap()), vec!["one", "two", "three"]);
    let mut reported = progress.lock().unwrap().clone();
    reported.sort();
    assert_eq!(reported, vec![(1, 3), (2, 3), (3, 3)]);
}

#[test]
fn test_concatenate_withFailedBlock_shouldReportItsIndex() {
    let results = vec![
        (0, Ok(series(&[(0, 1000, "one")]))),
        (
            1,
            Err(AlignmentError::NotConverged {
                iterations: 64,
                dump: String::new(),
            }),
        ),
    ];

    match concatenate(results) {
        Err(AlignmentError::Block { index, source }) => {
            assert_eq!(index, 1);
            assert!(matches!(*source, AlignmentError::NotConverged { .. }));
        }
        other => panic!("expected block failure, got {:?}", other),
    }
}
