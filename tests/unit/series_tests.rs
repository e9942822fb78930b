/*!
 * Tests for subtitle series parsing, writing and splitting
 */

use subalign::{AlignmentError, Segment, Series};

use crate::common::{create_temp_dir, series, texts};

#[test]
fn test_fromSrt_withMalformedEntries_shouldSkipThemAndSort() {
    let content = "\u{feff}2
00:00:05,000 --> 00:00:06,000
第二句

1
00:00:01,000 --> 00:00:02,500
第一句
多一行

3
00:00:09,000 --> 00:00:08,000
时间倒转

4
00:00:10,000 --> 00:00:11,000

";

    let parsed = Series::from_srt(content).unwrap();

    assert_eq!(
        parsed.segments(),
        &[
            Segment::new(1000, 2500, "第一句\n多一行"),
            Segment::new(5000, 6000, "第二句"),
        ]
    );
}

#[test]
fn test_writeSrt_thenRead_shouldPreserveSegments() {
    let temp_dir = create_temp_dir().unwrap();
    let path = temp_dir.path().join("nested").join("out.srt");
    let original = series(&[(0, 1500, "你好"), (3_723_004, 3_724_000, "再见")]);

    original.write_srt(&path).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    let reread = Series::read_srt(&path).unwrap();

    assert!(content.starts_with("1\n00:00:00,000 --> 00:00:01,500\n你好\n\n2\n01:02:03,004"));
    assert_eq!(reread, original);
}

#[test]
fn test_parseTimestamp_withInvalidComponents_shouldFail() {
    assert_eq!(Segment::parse_timestamp("01:02:03,004").unwrap(), 3_723_004);
    assert_eq!(Segment::parse_timestamp("00:00:01.250").unwrap(), 1250);
    assert!(Segment::parse_timestamp("00:61:00,000").is_err());
    assert!(Segment::parse_timestamp("00:00:00").is_err());
}

#[test]
fn test_splitAtChar_shouldDivideTimeProportionally() {
    let segment = Segment::new(1000, 3000, "点解唔试下好彩走楼斜对面");

    let (head, tail) = segment.split_at_char(5).unwrap();

    assert_eq!(head, Segment::new(1000, 1833, "点解唔试下"));
    assert_eq!(tail, Segment::new(1833, 3000, "好彩走楼斜对面"));
}

#[test]
fn test_splitAtChar_atEdges_shouldBeRejected() {
    let segment = Segment::new(0, 1000, "abc");

    assert!(matches!(
        segment.split_at_char(0),
        Err(AlignmentError::InvalidSplit { offset: 0, length: 3 })
    ));
    assert!(matches!(
        segment.split_at_char(3),
        Err(AlignmentError::InvalidSplit { offset: 3, length: 3 })
    ));
}

#[test]
fn test_replacingAndRemoving_shouldKeepOtherSegments() {
    let original = series(&[(0, 1000, "a"), (1000, 2000, "bc"), (2000, 3000, "d")]);

    let replaced = original.replacing(
        1,
        vec![Segment::new(1000, 1500, "b"), Segment::new(1500, 2000, "c")],
    );
    let removed = original.removing(0);

    assert_eq!(texts(&replaced), vec!["a", "b", "c", "d"]);
    assert_eq!(texts(&removed), vec!["bc", "d"]);
    assert_eq!(original.concat_text(&[0, 2]), "ad");
}

#[test]
fn test_seriesJson_shouldBeAPlainArray() {
    let original = series(&[(0, 1000, "你好")]);

    let json = serde_json::to_value(&original).unwrap();

    assert!(json.is_array());
    assert_eq!(json[0]["text"], "你好");
    assert_eq!(serde_json::from_value::<Series>(json).unwrap(), original);
}
