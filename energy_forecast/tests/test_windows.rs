use chrono::{DateTime, Duration, TimeZone, Utc};
use energy_forecast::{GridCadence, MetricRow, WindowExtractor};
use pretty_assertions::assert_eq;

fn at(minute: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 1, 0, 0).unwrap() + Duration::minutes(minute)
}

fn rows(cell: &str, minutes: &[i64]) -> Vec<MetricRow> {
    minutes
        .iter()
        .map(|&m| MetricRow::new(cell, at(m)).with_value("prb_usage", 3.0))
        .collect()
}

fn extractor(min_minutes: i64) -> WindowExtractor {
    WindowExtractor::from_minutes(GridCadence::default(), min_minutes).unwrap()
}

#[test]
fn test_four_consecutive_ticks_make_an_hour() {
    let windows = extractor(60).extract(&rows("A", &[0, 15, 30, 45]));

    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].start, at(0));
    assert_eq!(windows[0].end, at(45));
    assert_eq!(windows[0].duration(GridCadence::default()), Duration::minutes(60));
}

#[test]
fn test_single_tick_is_too_short() {
    assert!(extractor(60).extract(&rows("A", &[0])).is_empty());
}

#[test]
fn test_gap_splits_groups() {
    let windows = extractor(30).extract(&rows("A", &[0, 15, 60, 75]));

    assert_eq!(windows.len(), 2);
    assert_eq!((windows[0].start, windows[0].end), (at(0), at(15)));
    assert_eq!((windows[1].start, windows[1].end), (at(60), at(75)));
}

#[test]
fn test_three_cells_at_half_hour_minimum() {
    let mut input = rows("A", &[0, 15, 30, 45]);
    input.extend(rows("B", &[0]));
    input.extend(rows("C", &[0, 15, 60, 75]));

    let windows = extractor(30).extract(&input);
    let summary: Vec<(&str, usize)> = windows
        .iter()
        .map(|w| (w.entity_id.as_str(), w.len()))
        .collect();

    assert_eq!(summary, vec![("A", 4), ("C", 2), ("C", 2)]);
}

#[test]
fn test_adjacent_windows_are_never_one_tick_apart() {
    let cadence = GridCadence::default();
    let windows = extractor(15).extract(&rows("A", &[0, 15, 45, 60, 75, 105, 150]));

    assert_eq!(windows.len(), 4);
    for pair in windows.windows(2) {
        assert!(!cadence.is_next(pair[0].end, pair[1].start));
    }
}

#[test]
fn test_minimum_duration_is_inclusive() {
    let three = rows("A", &[0, 15, 30]);
    assert!(extractor(60).extract(&three).is_empty());
    assert_eq!(extractor(45).extract(&three).len(), 1);
}

#[test]
fn test_zero_minimum_keeps_every_group() {
    let windows = extractor(0).extract(&rows("A", &[0, 30, 60]));
    assert_eq!(windows.len(), 3);
}

#[test]
fn test_windows_are_contiguous() {
    let cadence = GridCadence::default();
    let windows = extractor(30).extract(&rows("A", &[0, 15, 30, 90, 105, 120, 135, 300]));

    for window in &windows {
        for pair in window.rows.windows(2) {
            assert!(cadence.is_next(pair[0].timestamp, pair[1].timestamp));
        }
    }
    assert_eq!(windows.iter().map(|w| w.len()).collect::<Vec<_>>(), vec![3, 4]);
}

#[test]
fn test_cells_never_share_a_window() {
    let mut input = rows("B", &[0, 15, 30, 45]);
    input.extend(rows("A", &[30, 45, 0, 15]));

    let windows = extractor(60).extract(&input);

    assert_eq!(windows.len(), 2);
    assert_eq!(windows[0].entity_id, "A");
    assert_eq!(windows[1].entity_id, "B");
    assert!(windows[0].rows.iter().all(|r| r.entity_id == "A"));
    assert_eq!(windows[0].start, at(0));
}

#[test]
fn test_extraction_is_idempotent() {
    let ex = extractor(30);
    let first = ex.extract(&rows("A", &[0, 15, 45, 60, 75, 120]));
    let again = ex.extract(&WindowExtractor::flatten(&first));

    assert_eq!(first, again);
}

#[test]
fn test_group_ids_start_at_one() {
    let input = rows("A", &[0, 15, 45, 60]);
    let refs: Vec<&MetricRow> = input.iter().collect();

    assert_eq!(extractor(0).group_ids(&refs), vec![1, 1, 2, 2]);
}

#[test]
fn test_negative_minimum_is_rejected() {
    assert!(WindowExtractor::from_minutes(GridCadence::default(), -15).is_err());
}

#[test]
fn test_oversized_minimum_is_rejected() {
    assert!(WindowExtractor::from_minutes(GridCadence::default(), i64::MAX).is_err());
}

#[test]
fn test_empty_input() {
    assert!(extractor(60).extract(&[]).is_empty());
}
