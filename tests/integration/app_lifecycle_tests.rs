/*!
 * Full application lifecycle tests: SRT files in, aligned SRT out
 */

use subalign::alignment::stages::MergeAnswer;
use subalign::oracle::{CachingOracle, ScriptedOracle};
use subalign::{AppError, Config, Controller, CorpusStore, Segment, Series};

use crate::common::{create_temp_dir, create_test_file, SAMPLE_ANCHOR_SRT, SAMPLE_CANDIDATE_SRT};

fn expected_output() -> Vec<Segment> {
    vec![
        Segment::new(0, 2000, "点解唔试下"),
        Segment::new(2000, 4000, "好彩走楼斜对面"),
        Segment::new(10000, 12000, "你好，世界"),
    ]
}

/// Record a corpus for the sample files into `store`
async fn record_sample_corpus(store: &CorpusStore) {
    let controller = Controller::with_config(Config::default()).unwrap();
    let scripted = ScriptedOracle::new();
    scripted.push_merge(MergeAnswer {
        merged_text: "你好，世界".to_string(),
    });
    let recorder = CachingOracle::new(scripted).with_recording();

    let anchor = Series::from_srt(SAMPLE_ANCHOR_SRT).unwrap();
    let candidate = Series::from_srt(SAMPLE_CANDIDATE_SRT).unwrap();
    let aligned = controller
        .align_and_record(anchor, candidate, &recorder, store, "sample")
        .await
        .unwrap();
    assert_eq!(aligned.segments(), expected_output().as_slice());
}

fn replay_config(corpus_dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.corpus.directory = Some(corpus_dir.to_path_buf());
    config.corpus.replay_only = true;
    config
}

#[tokio::test]
async fn test_controllerRun_inReplayMode_shouldWriteAlignedSrt() {
    let corpus_dir = create_temp_dir().unwrap();
    let work_dir = create_temp_dir().unwrap();
    let store = CorpusStore::new(corpus_dir.path());
    record_sample_corpus(&store).await;

    let anchor_file = create_test_file(work_dir.path(), "zh.srt", SAMPLE_ANCHOR_SRT).unwrap();
    let candidate_file = create_test_file(work_dir.path(), "yue.srt", SAMPLE_CANDIDATE_SRT).unwrap();
    let output_file = work_dir.path().join("out").join("yue.aligned.srt");

    let controller = Controller::with_config(replay_config(corpus_dir.path())).unwrap();
    controller
        .run(&anchor_file, &candidate_file, &output_file, "sample", false)
        .await
        .unwrap();

    let written = Series::read_srt(&output_file).unwrap();
    assert_eq!(written.segments(), expected_output().as_slice());
}

#[tokio::test]
async fn test_alignAndRecord_ofTwoBlockSample_shouldWriteOneCorpusFilePerBlock() {
    let corpus_dir = create_temp_dir().unwrap();
    let store = CorpusStore::new(corpus_dir.path());
    record_sample_corpus(&store).await;

    let files = store.load_all().unwrap();
    let names: Vec<String> = files
        .iter()
        .map(|(path, _)| path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["sample_block-000.json", "sample_block-001.json"]);
    assert_eq!(files[0].1.block, "sample/block-000");
    assert_eq!(files[1].1.block, "sample/block-001");

    // The merge of the second block's fragments belongs to that block alone
    assert!(files[0].1.cases.merge.is_empty());
    assert_eq!(files[1].1.cases.merge.len(), 1);
    assert!(files.iter().all(|(_, file)| !file.cases.is_empty()));
}

#[tokio::test]
async fn test_controllerRun_withExistingOutput_shouldSkipUnlessForced() {
    let corpus_dir = create_temp_dir().unwrap();
    let work_dir = create_temp_dir().unwrap();
    let store = CorpusStore::new(corpus_dir.path());
    record_sample_corpus(&store).await;

    let anchor_file = create_test_file(work_dir.path(), "zh.srt", SAMPLE_ANCHOR_SRT).unwrap();
    let candidate_file = create_test_file(work_dir.path(), "yue.srt", SAMPLE_CANDIDATE_SRT).unwrap();
    let output_file = create_test_file(work_dir.path(), "out.srt", "keep me").unwrap();
    let controller = Controller::with_config(replay_config(corpus_dir.path())).unwrap();

    controller
        .run(&anchor_file, &candidate_file, &output_file, "sample", false)
        .await
        .unwrap();
    assert_eq!(std::fs::read_to_string(&output_file).unwrap(), "keep me");

    controller
        .run(&anchor_file, &candidate_file, &output_file, "sample", true)
        .await
        .unwrap();
    assert_eq!(Series::read_srt(&output_file).unwrap().len(), 3);
}

#[tokio::test]
async fn test_controllerRun_withMissingInput_shouldFail() {
    let corpus_dir = create_temp_dir().unwrap();
    let work_dir = create_temp_dir().unwrap();
    let controller = Controller::with_config(replay_config(corpus_dir.path())).unwrap();

    let result = controller
        .run(
            &work_dir.path().join("missing.srt"),
            &work_dir.path().join("missing-too.srt"),
            &work_dir.path().join("out.srt"),
            "sample",
            false,
        )
        .await;

    let error = result.unwrap_err();
    assert!(matches!(error.downcast_ref::<AppError>(), Some(AppError::File(_))));
}

#[test]
fn test_controllerWithConfig_withInvalidConfig_shouldFail() {
    let mut config = Config::default();
    config.corpus.replay_only = true;

    assert!(Controller::with_config(config).is_err());
}

#[tokio::test]
async fn test_checkCorpus_shouldCountInvalidCases() {
    let corpus_dir = create_temp_dir().unwrap();
    let store = CorpusStore::new(corpus_dir.path());
    record_sample_corpus(&store).await;
    assert_eq!(Controller::check_corpus(corpus_dir.path()).unwrap(), 0);

    create_test_file(
        corpus_dir.path(),
        "broken.json",
        r#"{
  "block": "broken",
  "cases": {
    "proof": [
      {
        "query": {"anchor_text": "他说", "candidate_text": "佢话"},
        "answer": {"corrected_text": "佢讲", "note": ""},
        "difficulty": 1
      },
      {
        "query": {"anchor_text": "他说", "candidate_text": "佢话"},
        "answer": {"corrected_text": "佢话", "note": ""},
        "difficulty": 9
      }
    ]
  }
}"#,
    )
    .unwrap();

    assert_eq!(Controller::check_corpus(corpus_dir.path()).unwrap(), 2);
}
