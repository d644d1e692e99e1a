//! Raw metric sources and their alignment onto the time grid

use crate::error::{ForecastError, Result};
use crate::grid::GridCadence;
use crate::utils::date_parser;
use chrono::{DateTime, Utc};
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, warn};

/// Header names of the key columns in each raw input file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    /// Raw timestamp column
    pub timestamp: String,
    /// Cell identifier column
    pub entity: String,
    /// Secondary identifier column, part of the join key
    pub secondary: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            timestamp: "Timestamp".to_string(),
            entity: "cell_id".to_string(),
            secondary: "site_id".to_string(),
        }
    }
}

/// One unparsed input row
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// Timestamp exactly as read
    pub timestamp: String,
    pub entity_id: String,
    pub secondary_id: String,
    /// Metric values keyed by column name; `None` for a missing value
    pub values: BTreeMap<String, Option<f64>>,
}

/// A raw per-cell metric table as read from one input file
#[derive(Debug, Clone)]
pub struct RawSource {
    name: String,
    metric_names: Vec<String>,
    records: Vec<RawRecord>,
}

impl RawSource {
    /// Build a source from in-memory records
    pub fn from_records(name: &str, metric_names: Vec<String>, records: Vec<RawRecord>) -> Self {
        Self {
            name: name.to_string(),
            metric_names,
            records,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metric_names(&self) -> &[String] {
        &self.metric_names
    }

    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Data loader for raw metric files
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a raw source from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P, columns: &ColumnNames) -> Result<RawSource> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(Some(1000))
            .has_header(true)
            .finish()?;

        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self::from_dataframe(&name, &df, columns)
    }

    /// Create a raw source from an existing DataFrame.
    ///
    /// Every column other than the three key columns is read as a metric.
    pub fn from_dataframe(name: &str, df: &DataFrame, columns: &ColumnNames) -> Result<RawSource> {
        let present: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|c| c.to_string())
            .collect();

        let required = [&columns.timestamp, &columns.entity, &columns.secondary];
        let mut missing: Vec<String> = required
            .iter()
            .filter(|c| !present.contains(c))
            .map(|c| c.to_string())
            .collect();

        let metric_names: Vec<String> = present
            .iter()
            .filter(|c| !required.contains(c))
            .cloned()
            .collect();
        if metric_names.is_empty() {
            missing.push("<metric value column>".to_string());
        }

        if !missing.is_empty() {
            return Err(ForecastError::MissingColumns {
                source_name: name.to_string(),
                columns: missing,
            });
        }

        let timestamps = Self::column_as_strings(df, &columns.timestamp)?;
        let entities = Self::column_as_strings(df, &columns.entity)?;
        let secondaries = Self::column_as_strings(df, &columns.secondary)?;
        let metric_columns = metric_names
            .iter()
            .map(|metric| Ok((metric.clone(), Self::column_as_f64(df, metric)?)))
            .collect::<Result<Vec<_>>>()?;

        let mut records = Vec::with_capacity(df.height());
        let mut without_id = 0usize;
        for row in 0..df.height() {
            let Some(entity_id) = entities[row].clone() else {
                without_id += 1;
                continue;
            };

            let values = metric_columns
                .iter()
                .map(|(metric, column)| (metric.clone(), column[row]))
                .collect();

            records.push(RawRecord {
                timestamp: timestamps[row].clone().unwrap_or_default(),
                entity_id,
                secondary_id: secondaries[row].clone().unwrap_or_default(),
                values,
            });
        }

        if without_id > 0 {
            warn!(source = name, rows = without_id, "dropped rows without a cell id");
        }
        debug!(source = name, rows = records.len(), metrics = ?metric_names, "loaded raw source");

        Ok(RawSource::from_records(name, metric_names, records))
    }

    fn column_as_strings(df: &DataFrame, column_name: &str) -> Result<Vec<Option<String>>> {
        let series = df.column(column_name)?.cast(&DataType::Utf8)?;
        let values = series
            .utf8()?
            .into_iter()
            .map(|value| value.map(|v| v.trim().to_string()))
            .collect();
        Ok(values)
    }

    /// Non-numeric cells become missing values
    fn column_as_f64(df: &DataFrame, column_name: &str) -> Result<Vec<Option<f64>>> {
        let series = df.column(column_name)?.cast(&DataType::Float64)?;
        Ok(series.f64()?.into_iter().collect())
    }
}

/// One row per (cell, timestamp) carrying every available metric
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRow {
    pub entity_id: String,
    pub timestamp: DateTime<Utc>,
    pub values: BTreeMap<String, f64>,
}

impl MetricRow {
    pub fn new(entity_id: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            timestamp,
            values: BTreeMap::new(),
        }
    }

    /// Builder-style metric setter
    pub fn with_value(mut self, metric: &str, value: f64) -> Self {
        self.values.insert(metric.to_string(), value);
        self
    }

    pub fn value(&self, metric: &str) -> Option<f64> {
        self.values.get(metric).copied()
    }
}

/// Aligned per-cell history on the grid, cells in id order and rows in time order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedTable {
    metric_names: Vec<String>,
    cells: BTreeMap<String, Vec<MetricRow>>,
}

impl AlignedTable {
    /// Build a table from rows in any order.
    ///
    /// Rows are grouped by cell and sorted by timestamp. Callers must not
    /// pass two rows with the same (cell, timestamp).
    pub fn from_rows(metric_names: Vec<String>, rows: Vec<MetricRow>) -> Self {
        let mut cells: BTreeMap<String, Vec<MetricRow>> = BTreeMap::new();
        for row in rows {
            cells.entry(row.entity_id.clone()).or_default().push(row);
        }
        for rows in cells.values_mut() {
            rows.sort_by_key(|row| row.timestamp);
        }
        Self {
            metric_names,
            cells,
        }
    }

    pub fn metric_names(&self) -> &[String] {
        &self.metric_names
    }

    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    /// Rows of one cell in time order
    pub fn rows(&self, entity_id: &str) -> &[MetricRow] {
        self.cells.get(entity_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All rows, cell-then-time order
    pub fn iter_rows(&self) -> impl Iterator<Item = &MetricRow> {
        self.cells.values().flatten()
    }

    /// Observed values of one metric for a cell, in time order
    pub fn history(&self, entity_id: &str, metric: &str) -> Vec<f64> {
        self.rows(entity_id)
            .iter()
            .filter_map(|row| row.value(metric))
            .collect()
    }

    /// Timestamp of the cell's last row carrying `metric`
    pub fn last_observed(&self, entity_id: &str, metric: &str) -> Option<DateTime<Utc>> {
        self.rows(entity_id)
            .iter()
            .rev()
            .find(|row| row.value(metric).is_some())
            .map(|row| row.timestamp)
    }

    /// Timestamp of the cell's last aligned row
    pub fn last_timestamp(&self, entity_id: &str) -> Option<DateTime<Utc>> {
        self.rows(entity_id).last().map(|row| row.timestamp)
    }

    pub fn len(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Row counts from one alignment pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlignmentReport {
    /// Rows dropped for an unparseable timestamp, keyed by side ("left" or "right")
    pub unparseable: BTreeMap<String, usize>,
    /// Rows of the left source without a counterpart in the right source
    pub unmatched_left: usize,
    /// Rows of the right source without a counterpart in the left source
    pub unmatched_right: usize,
    /// Rows produced by the inner join
    pub joined_rows: usize,
    /// Rows after rounding and averaging
    pub aligned_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct JoinKey {
    entity_id: String,
    secondary_id: String,
    timestamp: DateTime<Utc>,
}

struct ParsedRecord<'a> {
    key: JoinKey,
    values: &'a BTreeMap<String, Option<f64>>,
}

struct JoinedRecord {
    timestamp: DateTime<Utc>,
    values: Vec<(String, f64)>,
}

/// Merges two raw sources into one aligned table on a fixed grid
#[derive(Debug, Clone, Copy)]
pub struct DataAligner {
    cadence: GridCadence,
}

impl DataAligner {
    pub fn new(cadence: GridCadence) -> Self {
        Self { cadence }
    }

    pub fn cadence(&self) -> GridCadence {
        self.cadence
    }

    /// Parse, inner-join, round to the grid and average per (cell, tick).
    ///
    /// Duplicate join keys are paired in input order, so a key seen `a` times
    /// on the left and `b` times on the right yields `min(a, b)` joined rows.
    #[tracing::instrument(skip_all, fields(left = left.name(), right = right.name()))]
    pub fn align(
        &self,
        left: &RawSource,
        right: &RawSource,
    ) -> Result<(AlignedTable, AlignmentReport)> {
        let shared: Vec<&String> = left
            .metric_names()
            .iter()
            .filter(|m| right.metric_names().contains(m))
            .collect();
        if !shared.is_empty() {
            return Err(ForecastError::ValidationError(format!(
                "Metric columns {:?} appear in both '{}' and '{}'",
                shared,
                left.name(),
                right.name()
            )));
        }

        let mut report = AlignmentReport::default();
        let left_rows = Self::parse("left", left, &mut report);
        let right_rows = Self::parse("right", right, &mut report);

        let joined = Self::inner_join(&left_rows, &right_rows, &mut report);
        report.joined_rows = joined.values().map(Vec::len).sum();

        let cadence = self.cadence;
        let cells: BTreeMap<String, Vec<MetricRow>> = joined
            .into_par_iter()
            .map(|(entity_id, records)| {
                let rows = Self::average_on_grid(&entity_id, records, cadence);
                (entity_id, rows)
            })
            .collect();

        let metric_names: BTreeSet<String> = left
            .metric_names()
            .iter()
            .chain(right.metric_names())
            .cloned()
            .collect();

        let table = AlignedTable {
            metric_names: metric_names.into_iter().collect(),
            cells,
        };
        report.aligned_rows = table.len();

        info!(
            joined = report.joined_rows,
            aligned = report.aligned_rows,
            cells = table.cells.len(),
            unmatched_left = report.unmatched_left,
            unmatched_right = report.unmatched_right,
            "aligned raw sources"
        );

        Ok((table, report))
    }

    fn parse<'a>(
        side: &str,
        source: &'a RawSource,
        report: &mut AlignmentReport,
    ) -> Vec<ParsedRecord<'a>> {
        let mut dropped = 0usize;
        let parsed: Vec<ParsedRecord<'a>> = source
            .records()
            .iter()
            .filter_map(|record| match date_parser::parse_timestamp(&record.timestamp) {
                Some(timestamp) => Some(ParsedRecord {
                    key: JoinKey {
                        entity_id: record.entity_id.clone(),
                        secondary_id: record.secondary_id.clone(),
                        timestamp,
                    },
                    values: &record.values,
                }),
                None => {
                    dropped += 1;
                    None
                }
            })
            .collect();

        if dropped > 0 {
            warn!(side, source = source.name(), rows = dropped, "dropped rows with unparseable timestamps");
        }
        report.unparseable.insert(side.to_string(), dropped);
        parsed
    }

    /// Joined records grouped by cell
    fn inner_join(
        left: &[ParsedRecord<'_>],
        right: &[ParsedRecord<'_>],
        report: &mut AlignmentReport,
    ) -> BTreeMap<String, Vec<JoinedRecord>> {
        let mut right_by_key: HashMap<&JoinKey, Vec<&ParsedRecord<'_>>> = HashMap::new();
        for record in right {
            right_by_key.entry(&record.key).or_default().push(record);
        }

        let mut consumed: HashMap<&JoinKey, usize> = HashMap::new();
        let mut joined: BTreeMap<String, Vec<JoinedRecord>> = BTreeMap::new();
        let mut paired = 0usize;

        for record in left {
            let used = consumed.entry(&record.key).or_insert(0);
            let partner = right_by_key
                .get(&record.key)
                .and_then(|candidates| candidates.get(*used));

            let Some(partner) = partner else {
                report.unmatched_left += 1;
                continue;
            };
            *used += 1;
            paired += 1;

            let values = record
                .values
                .iter()
                .chain(partner.values.iter())
                .filter_map(|(metric, value)| match value {
                    Some(v) if v.is_finite() => Some((metric.clone(), *v)),
                    _ => None,
                })
                .collect();

            joined
                .entry(record.key.entity_id.clone())
                .or_default()
                .push(JoinedRecord {
                    timestamp: record.key.timestamp,
                    values,
                });
        }

        report.unmatched_right = right.len() - paired;
        joined
    }

    fn average_on_grid(
        entity_id: &str,
        records: Vec<JoinedRecord>,
        cadence: GridCadence,
    ) -> Vec<MetricRow> {
        let mut buckets: BTreeMap<DateTime<Utc>, BTreeMap<String, (f64, usize)>> = BTreeMap::new();
        for record in records {
            let bucket = buckets.entry(cadence.round(record.timestamp)).or_default();
            for (metric, value) in record.values {
                let slot = bucket.entry(metric).or_insert((0.0, 0));
                slot.0 += value;
                slot.1 += 1;
            }
        }

        buckets
            .into_iter()
            .map(|(timestamp, sums)| MetricRow {
                entity_id: entity_id.to_string(),
                timestamp,
                values: sums
                    .into_iter()
                    .map(|(metric, (sum, count))| (metric, sum / count as f64))
                    .collect(),
            })
            .collect()
    }
}
