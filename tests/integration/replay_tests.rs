/*!
 * Recording answers into a corpus and replaying them
 */

use subalign::alignment::stages::{DistributeAnswer, MergeAnswer, ProofAnswer};
use subalign::oracle::{CachingOracle, FixtureOracle, ScriptedOracle};
use subalign::{Aligner, CorpusStore, OracleError, Stage};

use crate::common::{create_temp_dir, sample_anchor, sample_candidate};

fn recording_oracle() -> CachingOracle<ScriptedOracle> {
    let scripted = ScriptedOracle::new();
    scripted.push_distribute(DistributeAnswer {
        text_to_append_1: "点解唔试下".to_string(),
        text_to_prepend_2: "好彩走楼斜对面".to_string(),
    });
    scripted.push_merge(MergeAnswer {
        merged_text: "你好，世界".to_string(),
    });
    scripted.push_proof(ProofAnswer {
        corrected_text: "点解唔试下".to_string(),
        note: String::new(),
    });
    scripted.push_proof(ProofAnswer {
        corrected_text: "好彩酒楼斜对面".to_string(),
        note: "走楼 is a mishearing of 酒楼".to_string(),
    });
    CachingOracle::new(scripted).with_recording()
}

#[tokio::test]
async fn test_replay_ofRecordedRun_shouldReproduceOutput() {
    let temp_dir = create_temp_dir().unwrap();
    let store = CorpusStore::new(temp_dir.path());
    let recorder = recording_oracle();

    let recorded_output = Aligner::default()
        .align(sample_anchor(), sample_candidate(), &recorder)
        .await
        .unwrap();
    let recorded = recorder.take_recorded();
    assert_eq!(recorded.distribute.len(), 1);
    assert_eq!(recorded.merge.len(), 1);
    assert_eq!(recorded.translate.len(), 1);
    assert!(recorded.proof.iter().all(|case| !case.verified));

    store.append("sample", recorded).unwrap();
    let replay = FixtureOracle::from_store(&store).unwrap();
    let replayed_output = Aligner::default()
        .align(sample_anchor(), sample_candidate(), &replay)
        .await
        .unwrap();

    assert_eq!(replayed_output, recorded_output);
    assert!(store.validate_all().unwrap().is_empty());
}

#[tokio::test]
async fn test_replay_withUnknownQuery_shouldDegradeToFallbacks() {
    let replay = FixtureOracle::new(Default::default());

    let aligned = Aligner::default()
        .align(sample_anchor(), sample_candidate(), &replay)
        .await
        .unwrap();

    // No recorded answers: everything goes to side 1 and fragments are concatenated
    assert_eq!(aligned.len(), 4);
    assert_eq!(aligned[0].text, "点解唔试下好彩走楼斜对面");
    assert_eq!(aligned[2].text, "你好世界");
}

#[tokio::test]
async fn test_cachingOracle_withRepeatedRun_shouldServeFromCache() {
    let recorder = recording_oracle();

    let first = Aligner::default()
        .align(sample_anchor(), sample_candidate(), &recorder)
        .await
        .unwrap();
    let calls_after_first = recorder.inner().calls(Stage::Proof);
    let second = Aligner::default()
        .align(sample_anchor(), sample_candidate(), &recorder)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(recorder.inner().calls(Stage::Proof), calls_after_first);
    let (hits, _, _) = recorder.stats();
    assert!(hits > 0);
}

#[tokio::test]
async fn test_fixtureOracle_shouldReportMissingAnswer() {
    use subalign::alignment::stages::ProofQuery;
    use subalign::Oracle;

    let replay = FixtureOracle::new(Default::default());
    let result = replay
        .proof(&ProofQuery {
            anchor_text: "他说".to_string(),
            candidate_text: "佢话".to_string(),
        })
        .await;

    assert!(matches!(result, Err(OracleError::NoAnswer { .. })));
}
