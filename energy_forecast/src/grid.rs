//! Fixed time grid shared by alignment, forecasting and window extraction

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Duration, Months, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest minute count a `chrono::Duration` can hold
pub const MAX_MINUTES: i64 = i64::MAX / 60_000;

/// Sampling interval of the grid.
///
/// Ticks are counted from the Unix epoch, so a 15 minute cadence puts ticks
/// at :00, :15, :30 and :45 of every hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct GridCadence {
    minutes: i64,
}

impl GridCadence {
    /// Create a cadence of `minutes` minutes
    pub fn from_minutes(minutes: i64) -> Result<Self> {
        if minutes <= 0 || minutes > MAX_MINUTES {
            return Err(ForecastError::InvalidParameter(format!(
                "Grid cadence must be between 1 and {} minutes, got {}",
                MAX_MINUTES, minutes
            )));
        }
        Ok(Self { minutes })
    }

    pub fn minutes(&self) -> i64 {
        self.minutes
    }

    pub fn duration(&self) -> Duration {
        Duration::minutes(self.minutes)
    }

    fn step_millis(&self) -> i64 {
        self.minutes * 60_000
    }

    fn from_millis(millis: i64, fallback: DateTime<Utc>) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).single().unwrap_or(fallback)
    }

    /// Round to the nearest tick. An instant exactly halfway between two
    /// ticks rounds up to the later one.
    pub fn round(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let millis = ts.timestamp_millis();
        let step = self.step_millis();
        let floor = millis.div_euclid(step) * step;
        let offset = millis - floor;
        let rounded = if offset >= step - offset {
            floor.saturating_add(step)
        } else {
            floor
        };
        Self::from_millis(rounded, ts)
    }

    /// Latest tick at or before `ts`
    pub fn floor(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let step = self.step_millis();
        Self::from_millis(ts.timestamp_millis().div_euclid(step) * step, ts)
    }

    pub fn is_aligned(&self, ts: DateTime<Utc>) -> bool {
        ts.timestamp_millis().rem_euclid(self.step_millis()) == 0
    }

    /// Move `steps` ticks forward (negative moves back)
    pub fn advance(&self, ts: DateTime<Utc>, steps: i64) -> DateTime<Utc> {
        ts + Duration::minutes(self.minutes * steps)
    }

    /// Whether `later` is exactly one tick after `earlier`
    pub fn is_next(&self, earlier: DateTime<Utc>, later: DateTime<Utc>) -> bool {
        later - earlier == self.duration()
    }

    /// Whole ticks that fit in `span`
    pub fn ticks_in(&self, span: Duration) -> usize {
        let ticks = span.num_milliseconds().div_euclid(self.step_millis());
        usize::try_from(ticks).unwrap_or(0)
    }

    /// Number of ticks covering `months` calendar months starting at `anchor`
    pub fn horizon_ticks(&self, anchor: DateTime<Utc>, months: u32) -> Result<usize> {
        let end = anchor
            .checked_add_months(Months::new(months))
            .ok_or_else(|| {
                ForecastError::InvalidParameter(format!(
                    "Horizon of {} months overflows from {}",
                    months, anchor
                ))
            })?;
        Ok(self.ticks_in(end - anchor))
    }
}

impl Default for GridCadence {
    fn default() -> Self {
        Self { minutes: 15 }
    }
}

impl TryFrom<i64> for GridCadence {
    type Error = ForecastError;

    fn try_from(minutes: i64) -> Result<Self> {
        Self::from_minutes(minutes)
    }
}

impl From<GridCadence> for i64 {
    fn from(cadence: GridCadence) -> Self {
        cadence.minutes
    }
}

impl fmt::Display for GridCadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}min", self.minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, s).unwrap()
    }

    #[test]
    fn test_round_to_nearest_tick() {
        let cadence = GridCadence::from_minutes(15).unwrap();

        assert_eq!(cadence.round(at(10, 7, 29)), at(10, 0, 0));
        assert_eq!(cadence.round(at(10, 8, 0)), at(10, 15, 0));
        assert_eq!(cadence.round(at(10, 52, 31)), at(11, 0, 0));
    }

    #[test]
    fn test_tie_rounds_to_later_tick() {
        let cadence = GridCadence::from_minutes(15).unwrap();
        assert_eq!(cadence.round(at(10, 7, 30)), at(10, 15, 0));
    }

    #[test]
    fn test_floor_and_alignment() {
        let cadence = GridCadence::from_minutes(15).unwrap();
        assert_eq!(cadence.floor(at(10, 14, 59)), at(10, 0, 0));
        assert!(cadence.is_aligned(at(10, 45, 0)));
        assert!(!cadence.is_aligned(at(10, 46, 0)));
    }

    #[test]
    fn test_horizon_ticks_for_one_month() {
        let cadence = GridCadence::from_minutes(15).unwrap();
        // March has 31 days of 96 ticks each
        assert_eq!(cadence.horizon_ticks(at(0, 0, 0), 1).unwrap(), 31 * 96);
    }

    #[test]
    fn test_cadence_bounded_by_duration_range() {
        assert!(GridCadence::from_minutes(i64::MAX).is_err());
        assert!(GridCadence::from_minutes(MAX_MINUTES + 1).is_err());

        let widest = GridCadence::from_minutes(MAX_MINUTES).unwrap();
        assert_eq!(widest.duration().num_minutes(), MAX_MINUTES);
        assert_eq!(widest.round(at(10, 0, 0)).timestamp_millis(), 0);
    }

    #[test]
    fn test_rejects_non_positive() {
        assert!(GridCadence::from_minutes(0).is_err());
        assert!(GridCadence::from_minutes(-15).is_err());
    }
}
