//! Extraction of contiguous qualifying runs from filtered rows

use crate::data::MetricRow;
use crate::error::{ForecastError, Result};
use crate::grid::{GridCadence, MAX_MINUTES};
use chrono::{DateTime, Duration, Utc};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// A maximal run of consecutive grid ticks for one cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Window {
    pub entity_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub rows: Vec<MetricRow>,
}

impl Window {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Covered time: one cadence per row
    pub fn duration(&self, cadence: GridCadence) -> Duration {
        Duration::minutes(cadence.minutes() * self.rows.len() as i64)
    }
}

/// Groups filtered rows into contiguous runs and keeps the long enough ones
#[derive(Debug, Clone, Copy)]
pub struct WindowExtractor {
    cadence: GridCadence,
    min_duration: Duration,
}

impl WindowExtractor {
    pub fn new(cadence: GridCadence, min_duration: Duration) -> Result<Self> {
        if min_duration < Duration::zero() {
            return Err(ForecastError::InvalidParameter(format!(
                "Minimum window duration must not be negative, got {} minutes",
                min_duration.num_minutes()
            )));
        }
        Ok(Self {
            cadence,
            min_duration,
        })
    }

    pub fn from_minutes(cadence: GridCadence, min_minutes: i64) -> Result<Self> {
        if min_minutes > MAX_MINUTES {
            return Err(ForecastError::InvalidParameter(format!(
                "Minimum window duration must not exceed {} minutes, got {}",
                MAX_MINUTES, min_minutes
            )));
        }
        Self::new(cadence, Duration::minutes(min_minutes))
    }

    pub fn min_duration(&self) -> Duration {
        self.min_duration
    }

    /// Qualifying windows in cell-then-start order.
    ///
    /// Cells are processed in parallel; rows of one cell are walked in
    /// time order. The result does not depend on input order.
    #[tracing::instrument(skip_all, fields(min_minutes = self.min_duration.num_minutes()))]
    pub fn extract(&self, rows: &[MetricRow]) -> Vec<Window> {
        let mut by_cell: BTreeMap<&str, Vec<&MetricRow>> = BTreeMap::new();
        for row in rows {
            by_cell.entry(row.entity_id.as_str()).or_default().push(row);
        }

        let mut windows: Vec<Window> = by_cell
            .into_par_iter()
            .flat_map_iter(|(entity_id, mut cell_rows)| {
                cell_rows.sort_by_key(|row| row.timestamp);
                self.extract_cell(entity_id, &cell_rows)
            })
            .collect();

        windows.sort_by(|a, b| (&a.entity_id, a.start).cmp(&(&b.entity_id, b.start)));
        debug!(input = rows.len(), windows = windows.len(), "window extraction done");
        windows
    }

    /// Group id for each row of one cell's time-ordered rows.
    ///
    /// The first row opens group 1; every row not exactly one cadence after
    /// its predecessor opens the next group.
    pub fn group_ids(&self, rows: &[&MetricRow]) -> Vec<usize> {
        let mut group = 0;
        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                let contiguous =
                    i > 0 && self.cadence.is_next(rows[i - 1].timestamp, row.timestamp);
                if !contiguous {
                    group += 1;
                }
                group
            })
            .collect()
    }

    fn extract_cell(&self, entity_id: &str, rows: &[&MetricRow]) -> Vec<Window> {
        let ids = self.group_ids(rows);
        let mut groups: Vec<Vec<MetricRow>> = Vec::new();
        let mut current_id = 0;
        for (row, id) in rows.iter().zip(ids) {
            if id != current_id {
                groups.push(Vec::new());
                current_id = id;
            }
            if let Some(group) = groups.last_mut() {
                group.push((*row).clone());
            }
        }

        groups
            .into_iter()
            .filter(|group| self.is_long_enough(group.len()))
            .filter_map(|group| {
                let start = group.first()?.timestamp;
                let end = group.last()?.timestamp;
                Some(Window {
                    entity_id: entity_id.to_string(),
                    start,
                    end,
                    rows: group,
                })
            })
            .collect()
    }

    /// `count` rows cover `count * cadence`; the minimum is inclusive
    fn is_long_enough(&self, count: usize) -> bool {
        let covered = i128::from(self.cadence.minutes()) * 60_000 * count as i128;
        covered >= i128::from(self.min_duration.num_milliseconds())
    }

    /// Rows of all windows, cell-then-time order
    pub fn flatten(windows: &[Window]) -> Vec<MetricRow> {
        windows.iter().flat_map(|w| w.rows.iter().cloned()).collect()
    }
}
