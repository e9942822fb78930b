/*!
 * Merging stage: one candidate line per group, punctuated like the anchor
 * and stamped with the anchor's timing.
 */

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::alignment::state::Alignment;
use crate::alignment::sync_group::SyncGroup;
use crate::corpus::{Corpus, TestCase};
use crate::errors::AlignmentError;
use crate::oracle::{to_literal, Oracle, OracleQuery, Stage};
use crate::series::{Segment, Series};
use crate::text_utils;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeQuery {
    pub anchor_text: String,
    pub candidate_texts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeAnswer {
    pub merged_text: String,
}

impl MergeQuery {
    /// Candidate texts joined as-is
    pub fn naive_merge(&self) -> String {
        text_utils::concat_texts(self.candidate_texts.iter().map(String::as_str))
    }
}

impl OracleQuery for MergeQuery {
    type Answer = MergeAnswer;

    const STAGE: Stage = Stage::Merge;

    fn check(&self, answer: &MergeAnswer) -> Result<(), String> {
        let expected = text_utils::strip_punctuation(&self.naive_merge());
        let actual = text_utils::strip_punctuation(&answer.merged_text);
        if expected != actual {
            return Err(format!(
                "content changed: expected '{}', got '{}'",
                expected, actual
            ));
        }
        Ok(())
    }

    fn cases(corpus: &Corpus) -> &[TestCase<Self, MergeAnswer>] {
        &corpus.merge
    }

    fn cases_mut(corpus: &mut Corpus) -> &mut Vec<TestCase<Self, MergeAnswer>> {
        &mut corpus.merge
    }
}

#[derive(Debug, Default)]
pub struct Merger;

impl Merger {
    pub fn new() -> Self {
        Self
    }

    /// Merge every group's candidates into at most one segment.
    ///
    /// Groups must each hold exactly one anchor. The output series is built
    /// in group order, so candidate indices follow anchor order afterwards.
    pub async fn run(&self, alignment: Alignment, oracle: &dyn Oracle) -> Result<Alignment, AlignmentError> {
        let groups = alignment.sync_groups();
        let mut segments = Vec::with_capacity(groups.len());
        let mut merged_groups = Vec::with_capacity(groups.len());
        let mut oracle_calls = 0;

        for (position, group) in groups.iter().enumerate() {
            let anchor = group.anchor().ok_or_else(|| {
                alignment.structural(format!(
                    "cannot merge sync group {} with {} anchors",
                    position,
                    group.anchors.len()
                ))
            })?;

            if group.candidates.is_empty() {
                merged_groups.push(SyncGroup::single(anchor, Vec::new()));
                continue;
            }

            let timing = &alignment.anchor()[anchor];
            let segment = match group.candidates.as_slice() {
                [only] if !text_utils::has_punctuation(&timing.text) => {
                    debug!("Group {} needs no merge; keeping candidate {} as-is", position, only);
                    alignment.candidate()[*only].restamped(timing)
                }
                _ => {
                    oracle_calls += 1;
                    let query = MergeQuery {
                        anchor_text: timing.text.clone(),
                        candidate_texts: group
                            .candidates
                            .iter()
                            .map(|&c| alignment.candidate()[c].text.clone())
                            .collect(),
                    };
                    Segment::new(timing.start_ms, timing.end_ms, Self::ask(&query, oracle).await)
                }
            };

            merged_groups.push(SyncGroup::single(anchor, vec![segments.len()]));
            segments.push(segment);
        }

        info!(
            "Merged {} groups into {} candidate lines ({} oracle calls)",
            groups.len(),
            segments.len(),
            oracle_calls
        );
        Ok(alignment.with_candidate(Series::new(segments), merged_groups))
    }

    /// Ask the oracle, falling back to plain concatenation
    async fn ask(query: &MergeQuery, oracle: &dyn Oracle) -> String {
        match oracle.merge(query).await {
            Ok(answer) => match query.verify(&answer) {
                Ok(()) => answer.merged_text,
                Err(e) => {
                    warn!(
                        "{}; using plain concatenation. query={} answer={}",
                        e,
                        to_literal(query),
                        to_literal(&answer)
                    );
                    query.naive_merge()
                }
            },
            Err(e) => {
                warn!("Merge oracle failed ({}); using plain concatenation. query={}", e, to_literal(query));
                query.naive_merge()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::ScriptedOracle;

    #[tokio::test]
    async fn test_run_withPunctuationFreeAnchor_shouldSkipOracle() {
        let anchor: Series = vec![Segment::new(1000, 3500, "就喺麦太快要临盆嘅时候")].into();
        let candidate: Series = vec![Segment::new(900, 3400, "就喺麦太快要临盆嘅时候")].into();
        let oracle = ScriptedOracle::new();

        let alignment = Merger::new()
            .run(Alignment::new(anchor, candidate), &oracle)
            .await
            .unwrap();

        assert_eq!(oracle.calls(Stage::Merge), 0);
        assert_eq!(
            alignment.candidate()[0],
            Segment::new(1000, 3500, "就喺麦太快要临盆嘅时候")
        );
    }

    #[tokio::test]
    async fn test_run_withSeveralCandidates_shouldUseOracleAnswer() {
        let anchor: Series = vec![Segment::new(0, 2000, "你好，世界")].into();
        let candidate: Series = vec![Segment::new(0, 900, "你好"), Segment::new(900, 2000, "世界")].into();
        let oracle = ScriptedOracle::new();
        oracle.push_merge(MergeAnswer {
            merged_text: "你好，世界".into(),
        });

        let alignment = Merger::new()
            .run(Alignment::new(anchor, candidate), &oracle)
            .await
            .unwrap();

        assert_eq!(alignment.candidate().len(), 1);
        assert_eq!(alignment.candidate()[0], Segment::new(0, 2000, "你好，世界"));
        assert_eq!(alignment.sync_groups(), vec![SyncGroup::single(0, vec![0])]);
    }

    #[tokio::test]
    async fn test_run_withChangedContent_shouldConcatenate() {
        let anchor: Series = vec![Segment::new(0, 2000, "你好，世界")].into();
        let candidate: Series = vec![Segment::new(0, 900, "你好"), Segment::new(900, 2000, "世界")].into();
        let oracle = ScriptedOracle::new();
        oracle.push_merge(MergeAnswer {
            merged_text: "你们好，世界".into(),
        });

        let alignment = Merger::new()
            .run(Alignment::new(anchor, candidate), &oracle)
            .await
            .unwrap();

        assert_eq!(alignment.candidate()[0].text, "你好世界");
    }

    #[tokio::test]
    async fn test_run_withEmptyGroup_shouldPassThrough() {
        let anchor: Series = vec![Segment::new(0, 1000, "甲"), Segment::new(5000, 6000, "乙")].into();
        let candidate: Series = vec![Segment::new(5000, 6000, "二")].into();
        let oracle = ScriptedOracle::new();

        let alignment = Merger::new()
            .run(Alignment::new(anchor, candidate), &oracle)
            .await
            .unwrap();

        assert_eq!(
            alignment.sync_groups(),
            vec![SyncGroup::single(0, vec![]), SyncGroup::single(1, vec![0])]
        );
        assert_eq!(alignment.candidate()[0], Segment::new(5000, 6000, "二"));
    }

    #[test]
    fn test_check_shouldAllowPunctuationChangesOnly() {
        let query = MergeQuery {
            anchor_text: "你好，世界".into(),
            candidate_texts: vec!["你好 ".into(), "世界".into()],
        };
        let good = MergeAnswer {
            merged_text: "你好，世界！".into(),
        };
        let bad = MergeAnswer {
            merged_text: "你好，地球".into(),
        };

        assert!(query.check(&good).is_ok());
        assert!(query.check(&bad).is_err());
    }
}
