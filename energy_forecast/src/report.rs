//! Run summary and the text timeline shown with `--visualize`

use crate::data::AlignmentReport;
use crate::engine::SkippedCombination;
use crate::grid::GridCadence;
use crate::metrics::ModelScore;
use crate::modes::EnergySavingMode;
use crate::utils::date_parser;
use crate::windows::Window;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// What one run did, written as `run_summary.json` and printed by the CLI
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub mode: EnergySavingMode,
    pub cadence_minutes: i64,
    pub min_window_minutes: i64,
    pub horizon_months: u32,
    /// Model whose forecast was filtered into windows
    pub window_model: String,
    pub alignment: AlignmentReport,
    pub model_scores: Vec<ModelScore>,
    /// Forecast rows per model
    pub forecast_rows: BTreeMap<String, usize>,
    pub skipped: Vec<SkippedCombination>,
    /// Forecast rows of the window model that passed the thresholds
    pub qualifying_rows: usize,
    pub windows: usize,
    pub rows_in_windows: usize,
    /// Files written by the run
    pub written: Vec<PathBuf>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Energy-saving mode: {}", self.mode)?;
        writeln!(
            f,
            "Grid: {} min cadence, {} month horizon, windows >= {} min",
            self.cadence_minutes, self.horizon_months, self.min_window_minutes
        )?;
        writeln!(
            f,
            "Aligned {} rows from {} joined ({} left / {} right unmatched)",
            self.alignment.aligned_rows,
            self.alignment.joined_rows,
            self.alignment.unmatched_left,
            self.alignment.unmatched_right
        )?;
        for (side, count) in &self.alignment.unparseable {
            if *count > 0 {
                writeln!(f, "  {} rows of the {} source had unparseable timestamps", count, side)?;
            }
        }

        writeln!(f, "Model fit quality:")?;
        for score in &self.model_scores {
            let rows = self.forecast_rows.get(&score.model_name).copied().unwrap_or(0);
            writeln!(f, "  {}  {} forecast rows", score, rows)?;
        }
        if !self.skipped.is_empty() {
            writeln!(f, "Skipped {} (cell, metric, model) combinations", self.skipped.len())?;
        }

        writeln!(
            f,
            "{} of the '{}' forecast rows qualify; {} windows cover {} rows",
            self.qualifying_rows, self.window_model, self.windows, self.rows_in_windows
        )?;
        for path in &self.written {
            writeln!(f, "Wrote {}", path.display())?;
        }
        Ok(())
    }
}

/// Render one line per cell marking the ticks covered by a window.
///
/// All lines share one time axis spanning the earliest window start to
/// the latest window end, squeezed into `width` columns.
pub fn render_timeline(windows: &[Window], cadence: GridCadence, width: usize) -> String {
    let width = width.max(1);
    let (Some(first), Some(last)) = (
        windows.iter().map(|w| w.start).min(),
        windows.iter().map(|w| w.end).max(),
    ) else {
        return "No energy-saving windows found\n".to_string();
    };

    let total_ticks = ((last - first).num_minutes() / cadence.minutes() + 1).max(1);
    let column = |ticks: i64| -> usize {
        ((ticks as f64 / total_ticks as f64) * width as f64).floor() as usize
    };

    let mut lanes: BTreeMap<&str, Vec<char>> = BTreeMap::new();
    for window in windows {
        let lane = lanes
            .entry(window.entity_id.as_str())
            .or_insert_with(|| vec!['.'; width]);
        let from = column((window.start - first).num_minutes() / cadence.minutes());
        let to = column((window.end - first).num_minutes() / cadence.minutes() + 1);
        // A window always marks at least one column
        for cell in lane.iter_mut().take(to.max(from + 1).min(width)).skip(from.min(width - 1)) {
            *cell = '#';
        }
    }

    let label_width = lanes.keys().map(|k| k.len()).max().unwrap_or(0);
    let mut out = format!(
        "{:label_width$}  {} .. {}\n",
        "",
        date_parser::format_timestamp(&first),
        date_parser::format_timestamp(&last),
        label_width = label_width
    );
    for (entity_id, lane) in lanes {
        let bar: String = lane.into_iter().collect();
        out.push_str(&format!(
            "{:label_width$} |{}|\n",
            entity_id,
            bar,
            label_width = label_width
        ));
    }
    out
}
