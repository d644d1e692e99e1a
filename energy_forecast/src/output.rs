//! Result files: one forecast CSV per model, the window CSV and the run summary

use crate::data::{ColumnNames, MetricRow};
use crate::engine::ForecastTable;
use crate::error::Result;
use crate::modes::EnergySavingMode;
use crate::report::RunSummary;
use crate::utils::date_parser;
use crate::windows::Window;
use csv::Writer;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes run results under one output directory
#[derive(Debug, Clone)]
pub struct ResultWriter {
    output_dir: PathBuf,
    columns: ColumnNames,
}

impl ResultWriter {
    /// Create the writer, creating `output_dir` if needed
    pub fn new<P: AsRef<Path>>(output_dir: P, columns: ColumnNames) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir)?;
        Ok(Self {
            output_dir,
            columns,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `forecast_<model>.csv`: one row per (cell, timestamp), a column per metric
    pub fn write_forecast(&self, table: &ForecastTable) -> Result<PathBuf> {
        let path = self
            .output_dir
            .join(format!("forecast_{}.csv", table.model_name()));
        let rows = table.to_wide();
        let metrics = metric_columns(&rows);

        let mut wtr = Writer::from_path(&path)?;
        let mut header = vec![self.columns.timestamp.clone(), self.columns.entity.clone()];
        header.extend(metrics.iter().cloned());
        wtr.write_record(&header)?;

        for row in &rows {
            let mut record = vec![date_parser::format_timestamp(&row.timestamp), row.entity_id.clone()];
            record.extend(metric_values(row, &metrics));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;

        info!(model = table.model_name(), rows = rows.len(), path = %path.display(), "forecast written");
        Ok(path)
    }

    /// `energy_saving_<mode>.csv` with a 1-based `window_id` per window.
    ///
    /// Nothing is written when there are no windows.
    pub fn write_windows(&self, mode: EnergySavingMode, windows: &[Window]) -> Result<Option<PathBuf>> {
        if windows.is_empty() {
            info!(mode = %mode, "no windows, skipping window file");
            return Ok(None);
        }

        let path = self
            .output_dir
            .join(format!("energy_saving_{}.csv", mode.name()));
        let all_rows: Vec<MetricRow> = windows.iter().flat_map(|w| w.rows.iter().cloned()).collect();
        let metrics = metric_columns(&all_rows);

        let mut wtr = Writer::from_path(&path)?;
        let mut header = vec![
            self.columns.timestamp.clone(),
            self.columns.entity.clone(),
            "window_id".to_string(),
        ];
        header.extend(metrics.iter().cloned());
        wtr.write_record(&header)?;

        for (index, window) in windows.iter().enumerate() {
            for row in &window.rows {
                let mut record = vec![
                    date_parser::format_timestamp(&row.timestamp),
                    row.entity_id.clone(),
                    (index + 1).to_string(),
                ];
                record.extend(metric_values(row, &metrics));
                wtr.write_record(&record)?;
            }
        }
        wtr.flush()?;

        info!(mode = %mode, windows = windows.len(), path = %path.display(), "windows written");
        Ok(Some(path))
    }

    /// `run_summary.json`
    pub fn write_summary(&self, summary: &RunSummary) -> Result<PathBuf> {
        let path = self.output_dir.join("run_summary.json");
        let file = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(file, summary)?;
        Ok(path)
    }
}

fn metric_columns(rows: &[MetricRow]) -> Vec<String> {
    let names: BTreeSet<&String> = rows.iter().flat_map(|row| row.values.keys()).collect();
    names.into_iter().cloned().collect()
}

// Absent metrics become empty fields
fn metric_values<'a>(row: &'a MetricRow, metrics: &'a [String]) -> impl Iterator<Item = String> + 'a {
    metrics
        .iter()
        .map(move |metric| row.value(metric).map(|v| v.to_string()).unwrap_or_default())
}
