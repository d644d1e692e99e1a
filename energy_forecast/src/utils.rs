//! Utility functions for the energy_forecast crate

use crate::data::{RawRecord, RawSource};
use crate::error::{ForecastError, Result};
use crate::grid::GridCadence;
use chrono::{DateTime, Duration, Timelike, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::collections::BTreeMap;

/// Timestamp parsing for raw input rows
pub mod date_parser {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%d/%m/%Y %H:%M",
        "%m/%d/%Y %H:%M:%S",
    ];

    /// Parse a raw timestamp; naive values are taken as UTC.
    ///
    /// Returns `None` for anything unparseable so callers can drop the row.
    pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }

        for format in DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(Utc.from_utc_datetime(&naive));
            }
        }

        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| Utc.from_utc_datetime(&naive))
    }

    /// Format used for every timestamp written by this crate
    pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Create `horizon` timestamps following `last_timestamp` on the grid
pub fn future_timestamps(
    last_timestamp: DateTime<Utc>,
    horizon: usize,
    cadence: GridCadence,
) -> Vec<DateTime<Utc>> {
    (1..=horizon as i64)
        .map(|step| cadence.advance(last_timestamp, step))
        .collect()
}

/// Generate two reproducible raw sources with a daily load cycle per cell.
///
/// The first source carries `prb_usage` (percent), the second
/// `active_users`. Timestamps are jittered by up to a few seconds off the
/// grid so alignment has something to round.
///
/// # Arguments
/// * `start` - First grid instant of the history
/// * `cells` - Number of cells to generate
/// * `days` - Days of history per cell
/// * `cadence` - Sampling interval
/// * `seed` - Random seed
pub fn generate_synthetic_sources(
    start: DateTime<Utc>,
    cells: usize,
    days: usize,
    cadence: GridCadence,
    seed: u64,
) -> Result<(RawSource, RawSource)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 1.5)
        .map_err(|e| ForecastError::InvalidParameter(format!("Noise distribution: {}", e)))?;
    let ticks = cadence.ticks_in(Duration::days(days as i64));

    let mut load_records = Vec::with_capacity(cells * ticks);
    let mut user_records = Vec::with_capacity(cells * ticks);

    for cell in 0..cells {
        let cell_id = format!("CELL_{:03}", cell + 1);
        let site_id = format!("SITE_{:02}", cell / 3 + 1);
        let peak = 45.0 + 10.0 * cell as f64;

        for tick in 0..ticks {
            let jitter = Duration::seconds(rng.gen_range(-5..=5));
            let ts = cadence.advance(start, tick as i64) + jitter;
            let hour = ts.hour() as f64 + ts.minute() as f64 / 60.0;
            // Night trough around 04:00, evening peak around 20:00
            let cycle = 0.5 - 0.5 * ((hour - 4.0) / 24.0 * std::f64::consts::TAU).cos();
            let prb = (peak * cycle + 3.0 + noise.sample(&mut rng)).clamp(0.0, 100.0);
            let users = (prb * 0.8 + noise.sample(&mut rng)).max(0.0).round();
            let raw_ts = ts.format("%Y-%m-%d %H:%M:%S").to_string();

            load_records.push(record(&raw_ts, &cell_id, &site_id, "prb_usage", prb));
            user_records.push(record(&raw_ts, &cell_id, &site_id, "active_users", users));
        }
    }

    Ok((
        RawSource::from_records("cell_load", vec!["prb_usage".to_string()], load_records),
        RawSource::from_records("cell_users", vec!["active_users".to_string()], user_records),
    ))
}

fn record(ts: &str, cell_id: &str, site_id: &str, metric: &str, value: f64) -> RawRecord {
    let mut values = BTreeMap::new();
    values.insert(metric.to_string(), Some(value));
    RawRecord {
        timestamp: ts.to_string(),
        entity_id: cell_id.to_string(),
        secondary_id: site_id.to_string(),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::date_parser::parse_timestamp;
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_common_layouts() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 0).unwrap();
        assert_eq!(parse_timestamp("2024-05-06 07:08:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-06 07:08"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-06T07:08:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-06T09:08:00+02:00"), Some(expected));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_timestamp("not a time"), None);
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("2024-13-45 99:00:00"), None);
    }

    #[test]
    fn test_future_timestamps_follow_grid() {
        let cadence = GridCadence::from_minutes(15).unwrap();
        let last = Utc.with_ymd_and_hms(2024, 1, 1, 23, 45, 0).unwrap();
        let ts = future_timestamps(last, 3, cadence);

        assert_eq!(ts.len(), 3);
        assert_eq!(ts[0], Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
        assert_eq!(ts[2] - ts[1], Duration::minutes(15));
    }

    #[test]
    fn test_synthetic_sources_are_reproducible() {
        let cadence = GridCadence::default();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let (a1, b1) = generate_synthetic_sources(start, 2, 1, cadence, 7).unwrap();
        let (a2, _) = generate_synthetic_sources(start, 2, 1, cadence, 7).unwrap();

        assert_eq!(a1.len(), 2 * 96);
        assert_eq!(b1.len(), 2 * 96);
        assert_eq!(a1.records()[10], a2.records()[10]);
    }
}
