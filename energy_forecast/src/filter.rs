//! Selection of forecast rows that satisfy every threshold of a mode

use crate::data::MetricRow;
use crate::modes::{EnergySavingMode, MetricRange};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

/// Keeps rows whose metrics all lie in the selected mode's ranges
#[derive(Debug, Clone)]
pub struct ThresholdFilter {
    mode: EnergySavingMode,
    ranges: Vec<(&'static str, MetricRange)>,
}

impl ThresholdFilter {
    pub fn new(mode: EnergySavingMode) -> Self {
        Self {
            mode,
            ranges: mode.ranges(),
        }
    }

    pub fn mode(&self) -> EnergySavingMode {
        self.mode
    }

    /// A row qualifies only if every constrained metric is present and in
    /// range. Metrics the mode does not mention pass through.
    pub fn qualifies(&self, row: &MetricRow) -> bool {
        self.ranges.iter().all(|(metric, range)| {
            row.value(metric)
                .map(|value| range.contains(value))
                .unwrap_or(false)
        })
    }

    /// Qualifying rows in cell-then-time order
    #[tracing::instrument(skip_all, fields(mode = %self.mode))]
    pub fn apply(&self, rows: &[MetricRow]) -> Vec<MetricRow> {
        let mut by_cell: BTreeMap<&str, Vec<&MetricRow>> = BTreeMap::new();
        for row in rows {
            by_cell.entry(row.entity_id.as_str()).or_default().push(row);
        }

        let per_cell: Vec<Vec<MetricRow>> = by_cell
            .into_par_iter()
            .map(|(_, cell_rows)| {
                let mut kept: Vec<MetricRow> = cell_rows
                    .into_iter()
                    .filter(|row| self.qualifies(row))
                    .cloned()
                    .collect();
                kept.sort_by_key(|row| row.timestamp);
                kept
            })
            .collect();

        let kept: Vec<MetricRow> = per_cell.into_iter().flatten().collect();
        debug!(input = rows.len(), kept = kept.len(), "threshold filter applied");
        kept
    }
}
