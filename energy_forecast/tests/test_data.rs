use approx::assert_relative_eq;
use chrono::{TimeZone, Utc};
use energy_forecast::data::{ColumnNames, RawRecord};
use energy_forecast::{DataAligner, DataLoader, ForecastError, GridCadence, RawSource};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::io::Write;
use tempfile::NamedTempFile;

fn csv_file(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file
}

fn record(ts: &str, cell: &str, site: &str, metric: &str, value: Option<f64>) -> RawRecord {
    let mut values = BTreeMap::new();
    values.insert(metric.to_string(), value);
    RawRecord {
        timestamp: ts.to_string(),
        entity_id: cell.to_string(),
        secondary_id: site.to_string(),
        values,
    }
}

fn load_source(records: Vec<RawRecord>) -> RawSource {
    RawSource::from_records("load", vec!["prb_usage".to_string()], records)
}

fn user_source(records: Vec<RawRecord>) -> RawSource {
    RawSource::from_records("users", vec!["active_users".to_string()], records)
}

#[test]
fn test_load_csv_reads_metrics() {
    let file = csv_file(&[
        "Timestamp,cell_id,site_id,prb_usage",
        "2024-01-01 00:00:00,A,S1,12.5",
        "2024-01-01 00:15:00,A,S1,",
        "2024-01-01 00:30:00,B,S1,7",
    ]);

    let source = DataLoader::from_csv(file.path(), &ColumnNames::default()).unwrap();

    assert_eq!(source.len(), 3);
    assert_eq!(source.metric_names(), &["prb_usage".to_string()]);
    assert_eq!(source.records()[0].values["prb_usage"], Some(12.5));
    assert_eq!(source.records()[1].values["prb_usage"], None);
    assert_eq!(source.records()[2].entity_id, "B");
}

#[test]
fn test_load_csv_with_custom_columns() {
    let file = csv_file(&["time,cell,site,active_users", "2024-01-01 00:00:00,A,S1,3"]);
    let columns = ColumnNames {
        timestamp: "time".to_string(),
        entity: "cell".to_string(),
        secondary: "site".to_string(),
    };

    let source = DataLoader::from_csv(file.path(), &columns).unwrap();
    assert_eq!(source.len(), 1);
    assert_eq!(source.records()[0].secondary_id, "S1");
}

#[test]
fn test_missing_columns_are_fatal() {
    let file = csv_file(&["Timestamp,cell_id,prb_usage", "2024-01-01 00:00:00,A,12.5"]);

    let err = DataLoader::from_csv(file.path(), &ColumnNames::default()).unwrap_err();
    match &err {
        ForecastError::MissingColumns { columns, .. } => {
            assert_eq!(columns, &vec!["site_id".to_string()]);
        }
        other => panic!("expected MissingColumns, got {:?}", other),
    }
    assert!(err.is_fatal());
}

#[test]
fn test_source_without_metrics_is_rejected() {
    let file = csv_file(&["Timestamp,cell_id,site_id", "2024-01-01 00:00:00,A,S1"]);
    let result = DataLoader::from_csv(file.path(), &ColumnNames::default());
    assert!(matches!(result, Err(ForecastError::MissingColumns { .. })));
}

#[test]
fn test_align_averages_rows_on_one_tick() {
    let left = load_source(vec![
        record("2024-01-01 00:02:00", "A", "S1", "prb_usage", Some(10.0)),
        record("2024-01-01 00:07:00", "A", "S1", "prb_usage", Some(20.0)),
    ]);
    let right = user_source(vec![
        record("2024-01-01 00:02:00", "A", "S1", "active_users", Some(4.0)),
        record("2024-01-01 00:07:00", "A", "S1", "active_users", Some(6.0)),
    ]);

    let (table, report) = DataAligner::new(GridCadence::default()).align(&left, &right).unwrap();

    let rows = table.rows("A");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].timestamp, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    assert_relative_eq!(rows[0].value("prb_usage").unwrap(), 15.0);
    assert_relative_eq!(rows[0].value("active_users").unwrap(), 5.0);
    assert_eq!(report.joined_rows, 2);
    assert_eq!(report.aligned_rows, 1);
}

#[test]
fn test_align_rounds_ties_to_later_tick() {
    let left = load_source(vec![record("2024-01-01 00:07:30", "A", "S1", "prb_usage", Some(1.0))]);
    let right = user_source(vec![record("2024-01-01 00:07:30", "A", "S1", "active_users", Some(1.0))]);

    let (table, _) = DataAligner::new(GridCadence::default()).align(&left, &right).unwrap();
    assert_eq!(
        table.rows("A")[0].timestamp,
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 15, 0).unwrap()
    );
}

#[test]
fn test_align_is_an_inner_join() {
    let left = load_source(vec![
        record("2024-01-01 00:00:00", "A", "S1", "prb_usage", Some(1.0)),
        record("2024-01-01 00:15:00", "A", "S1", "prb_usage", Some(2.0)),
        record("2024-01-01 00:00:00", "B", "S1", "prb_usage", Some(3.0)),
    ]);
    let right = user_source(vec![
        record("2024-01-01 00:00:00", "A", "S1", "active_users", Some(1.0)),
        // Different site: no partner
        record("2024-01-01 00:00:00", "B", "S2", "active_users", Some(1.0)),
    ]);

    let (table, report) = DataAligner::new(GridCadence::default()).align(&left, &right).unwrap();

    assert_eq!(table.entities().collect::<Vec<_>>(), vec!["A"]);
    assert_eq!(table.len(), 1);
    assert_eq!(report.unmatched_left, 2);
    assert_eq!(report.unmatched_right, 1);
}

#[test]
fn test_duplicate_keys_pair_positionally() {
    let left = load_source(vec![
        record("2024-01-01 00:00:00", "A", "S1", "prb_usage", Some(10.0)),
        record("2024-01-01 00:00:00", "A", "S1", "prb_usage", Some(30.0)),
        record("2024-01-01 00:00:00", "A", "S1", "prb_usage", Some(50.0)),
    ]);
    let right = user_source(vec![
        record("2024-01-01 00:00:00", "A", "S1", "active_users", Some(2.0)),
        record("2024-01-01 00:00:00", "A", "S1", "active_users", Some(4.0)),
    ]);

    let (table, report) = DataAligner::new(GridCadence::default()).align(&left, &right).unwrap();

    assert_eq!(report.joined_rows, 2);
    assert_eq!(report.unmatched_left, 1);
    let row = &table.rows("A")[0];
    assert_relative_eq!(row.value("prb_usage").unwrap(), 20.0);
    assert_relative_eq!(row.value("active_users").unwrap(), 3.0);
}

#[test]
fn test_unparseable_timestamps_are_dropped() {
    let left = load_source(vec![
        record("not a time", "A", "S1", "prb_usage", Some(1.0)),
        record("2024-01-01T00:00:00Z", "A", "S1", "prb_usage", Some(2.0)),
    ]);
    let right = user_source(vec![record("2024-01-01 00:00:00", "A", "S1", "active_users", Some(1.0))]);

    let (table, report) = DataAligner::new(GridCadence::default()).align(&left, &right).unwrap();

    assert_eq!(report.unparseable["left"], 1);
    assert_eq!(report.unparseable["right"], 0);
    assert_eq!(table.len(), 1);
    assert_relative_eq!(table.rows("A")[0].value("prb_usage").unwrap(), 2.0);
}

#[test]
fn test_unparseable_counts_kept_for_same_named_sources() {
    let left = RawSource::from_records(
        "cells",
        vec!["prb_usage".to_string()],
        vec![
            record("bad", "A", "S1", "prb_usage", Some(1.0)),
            record("worse", "A", "S1", "prb_usage", Some(1.0)),
            record("2024-01-01 00:00:00", "A", "S1", "prb_usage", Some(2.0)),
        ],
    );
    let right = RawSource::from_records(
        "cells",
        vec!["active_users".to_string()],
        vec![
            record("nope", "A", "S1", "active_users", Some(1.0)),
            record("2024-01-01 00:00:00", "A", "S1", "active_users", Some(3.0)),
        ],
    );

    let (_, report) = DataAligner::new(GridCadence::default()).align(&left, &right).unwrap();

    assert_eq!(report.unparseable.len(), 2);
    assert_eq!(report.unparseable["left"], 2);
    assert_eq!(report.unparseable["right"], 1);
}

#[test]
fn test_missing_values_are_skipped_in_the_mean() {
    let left = load_source(vec![
        record("2024-01-01 00:01:00", "A", "S1", "prb_usage", None),
        record("2024-01-01 00:02:00", "A", "S1", "prb_usage", Some(8.0)),
    ]);
    let right = user_source(vec![
        record("2024-01-01 00:01:00", "A", "S1", "active_users", Some(1.0)),
        record("2024-01-01 00:02:00", "A", "S1", "active_users", Some(3.0)),
    ]);

    let (table, _) = DataAligner::new(GridCadence::default()).align(&left, &right).unwrap();
    let row = &table.rows("A")[0];
    assert_relative_eq!(row.value("prb_usage").unwrap(), 8.0);
    assert_relative_eq!(row.value("active_users").unwrap(), 2.0);
}

#[test]
fn test_shared_metric_names_are_rejected() {
    let left = load_source(vec![]);
    let right = RawSource::from_records("other", vec!["prb_usage".to_string()], vec![]);

    let err = DataAligner::new(GridCadence::default()).align(&left, &right).unwrap_err();
    assert!(err.is_fatal());
}

#[test]
fn test_empty_sources_align_to_empty_table() {
    let (table, report) = DataAligner::new(GridCadence::default())
        .align(&load_source(vec![]), &user_source(vec![]))
        .unwrap();
    assert!(table.is_empty());
    assert_eq!(report.joined_rows, 0);
    assert_eq!(table.metric_names().len(), 2);
}
