//! Integration tests for time frame chunking

use chrono::{TimeZone, Utc};
use reddit_data_collector::collector::TimeFrame;

fn frame(start_day: u32, end_day: u32) -> TimeFrame {
    TimeFrame::new(
        Utc.with_ymd_and_hms(2024, 6, start_day, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 6, end_day, 0, 0, 0).unwrap(),
    )
    .unwrap()
}

#[test]
fn test_ten_days_in_three_day_chunks_gives_3_3_3_1() {
    let chunks = frame(1, 11).split_into_chunks(3);
    let days: Vec<i64> = chunks
        .iter()
        .map(|c| c.frame.duration().num_days())
        .collect();
    assert_eq!(days, vec![3, 3, 3, 1]);
}

#[test]
fn test_union_covers_the_frame_without_gaps_or_overlap() {
    let whole = frame(1, 29);
    let chunks = whole.split_into_chunks(5);

    assert_eq!(chunks[0].frame.start, whole.start);
    assert_eq!(chunks.last().unwrap().frame.end, whole.end);
    for pair in chunks.windows(2) {
        assert_eq!(pair[0].frame.end, pair[1].frame.start);
    }

    let total: i64 = chunks.iter().map(|c| c.frame.duration().num_days()).sum();
    assert_eq!(total, whole.duration().num_days());
}

#[test]
fn test_indices_follow_chronological_order() {
    let chunks = frame(1, 20).split_into_chunks(4);
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.index, i);
    }
    for pair in chunks.windows(2) {
        assert!(pair[0].frame.start < pair[1].frame.start);
    }
}

#[test]
fn test_repeated_chunking_is_identical() {
    let whole = frame(3, 27);
    assert_eq!(whole.split_into_chunks(7), whole.split_into_chunks(7));
}

#[test]
fn test_invalid_ranges_are_rejected_up_front() {
    let start = Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    assert!(TimeFrame::new(start, end).is_err());
    assert!(TimeFrame::new(start, start).is_err());
    assert!(TimeFrame::from_strings("2024-06-10", "2024-06-01").is_err());
}

#[test]
fn test_from_strings_mixes_date_and_rfc3339_bounds() {
    let frame = TimeFrame::from_strings("2024-06-01", "2024-06-02T12:00:00Z").unwrap();
    assert_eq!(frame.duration().num_hours(), 36);
}
