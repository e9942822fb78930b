/*!
 * End-to-end alignment tests with a scripted oracle
 */

use std::collections::BTreeMap;

use subalign::alignment::stages::{DistributeAnswer, MergeAnswer, ProofAnswer, TranslateAnswer};
use subalign::app_config::AlignerConfig;
use subalign::oracle::ScriptedOracle;
use subalign::{Aligner, AlignmentError, Segment, Stage};

use crate::common::{init_test_logging, sample_anchor, sample_candidate, series, texts};

fn scripted_for_sample() -> ScriptedOracle {
    let oracle = ScriptedOracle::new();
    oracle.push_distribute(DistributeAnswer {
        text_to_append_1: "点解唔试下".to_string(),
        text_to_prepend_2: "好彩走楼斜对面".to_string(),
    });
    oracle.push_merge(MergeAnswer {
        merged_text: "你好，世界".to_string(),
    });
    oracle.push_proof(ProofAnswer {
        corrected_text: "点解唔试下".to_string(),
        note: String::new(),
    });
    oracle.push_proof(ProofAnswer {
        corrected_text: "好彩酒楼斜对面".to_string(),
        note: "走楼 is a mishearing of 酒楼".to_string(),
    });
    oracle.push_translate(TranslateAnswer {
        texts: BTreeMap::from([(3, "拜拜".to_string())]),
    });
    oracle
}

#[tokio::test]
async fn test_align_withEveryStage_shouldProduceOneLinePerAnchor() {
    init_test_logging();
    let oracle = scripted_for_sample();

    let aligned = Aligner::default()
        .align(sample_anchor(), sample_candidate(), &oracle)
        .await
        .unwrap();

    assert_eq!(
        aligned.segments(),
        &[
            Segment::new(0, 2000, "点解唔试下"),
            Segment::new(2000, 4000, "好彩酒楼斜对面"),
            Segment::new(4000, 6000, "你好，世界"),
            Segment::new(6000, 7000, "拜拜"),
        ]
    );
    assert_eq!(oracle.calls(Stage::Distribute), 1);
    assert_eq!(oracle.calls(Stage::Merge), 1);
    assert_eq!(oracle.calls(Stage::Proof), 3);
    assert_eq!(oracle.calls(Stage::Translate), 1);
}

#[tokio::test]
async fn test_align_shouldSendLiteralQueries() {
    let oracle = scripted_for_sample();

    Aligner::default()
        .align(sample_anchor(), sample_candidate(), &oracle)
        .await
        .unwrap();

    let distribute = &oracle.distribute_queries()[0];
    assert_eq!(distribute.anchor_text_1, "为什么不试试");
    assert_eq!(distribute.anchor_text_2, "好运楼对面");
    assert_eq!(distribute.candidate_prefix_1, "");
    assert_eq!(distribute.ambiguous_text, "点解唔试下好彩走楼斜对面");

    let merge = &oracle.merge_queries()[0];
    assert_eq!(merge.anchor_text, "你好，世界");
    assert_eq!(merge.candidate_texts, vec!["你好".to_string(), "世界".to_string()]);

    let translate = &oracle.translate_queries()[0];
    assert_eq!(translate.size, 4);
    assert_eq!(translate.known.len(), 3);
    assert_eq!(translate.known[&1].candidate_text, "好彩酒楼斜对面");
    assert_eq!(translate.missing, BTreeMap::from([(3, "再见".to_string())]));
}

#[tokio::test]
async fn test_align_withFailingOracle_shouldFallBackEverywhere() {
    init_test_logging();
    let oracle = ScriptedOracle::new();
    for stage in Stage::ALL {
        oracle.push_failure(stage);
    }

    let aligned = Aligner::default()
        .align(sample_anchor(), sample_candidate(), &oracle)
        .await
        .unwrap();

    // Distribution falls back to side 1, merge to concatenation, translation to empty text
    assert_eq!(
        texts(&aligned),
        vec!["点解唔试下好彩走楼斜对面", "", "你好世界", ""]
    );
    let timings: Vec<(u64, u64)> = aligned.iter().map(|s| (s.start_ms, s.end_ms)).collect();
    let anchor_timings: Vec<(u64, u64)> = sample_anchor().iter().map(|s| (s.start_ms, s.end_ms)).collect();
    assert_eq!(timings, anchor_timings);
}

#[tokio::test]
async fn test_align_withUnrelatedCandidates_shouldDropThem() {
    let anchor = series(&[(0, 1000, "一"), (1000, 2000, "二")]);
    let candidate = series(&[(0, 1000, "one"), (1000, 2000, "two"), (5000, 6000, "noise")]);
    let oracle = ScriptedOracle::new();

    let aligned = Aligner::default().align(anchor, candidate, &oracle).await.unwrap();

    assert_eq!(texts(&aligned), vec!["one", "two"]);
    assert_eq!(oracle.calls(Stage::Distribute), 0);
}

#[tokio::test]
async fn test_align_withThreeWayStraddle_shouldFailWithDump() {
    let anchor = series(&[(0, 1000, "一"), (1000, 2000, "二"), (2000, 3000, "三")]);
    let candidate = series(&[(0, 3000, "one two three")]);
    let config = AlignerConfig {
        ambiguity_threshold: 0.2,
        ..AlignerConfig::default()
    };

    let result = Aligner::new(&config)
        .align(anchor, candidate, &ScriptedOracle::new())
        .await;

    match result {
        Err(AlignmentError::UnsupportedAmbiguity { candidate, rows, dump }) => {
            assert_eq!(candidate, 0);
            assert_eq!(rows, vec![0, 1, 2]);
            assert!(!dump.is_empty());
        }
        other => panic!("expected unsupported ambiguity, got {:?}", other),
    }
}

#[tokio::test]
async fn test_align_coverage_everyAnchorGetsExactlyOneLine() {
    let anchor = series(&[
        (0, 1500, "第一句"),
        (1500, 3000, "第二句"),
        (3000, 4500, "第三句"),
        (4500, 6000, "第四句"),
        (6000, 7500, "第五句"),
    ]);
    let candidate = series(&[
        (100, 700, "第"),
        (700, 1400, "一句"),
        (2900, 3100, "短"),
        (3200, 4400, "第三句"),
        (4600, 7400, "第四句第五句"),
    ]);

    let aligned = Aligner::default()
        .align(anchor.clone(), candidate, &ScriptedOracle::new())
        .await
        .unwrap();

    assert_eq!(aligned.len(), anchor.len());
    for (line, anchor_line) in aligned.iter().zip(anchor.iter()) {
        assert_eq!((line.start_ms, line.end_ms), (anchor_line.start_ms, anchor_line.end_ms));
    }
}
