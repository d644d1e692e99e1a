//! Registry of energy-saving modes and their per-metric thresholds

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Physical resource block utilisation in percent
pub const PRB_USAGE: &str = "prb_usage";
/// Connected users with traffic
pub const ACTIVE_USERS: &str = "active_users";

/// Inclusive value range `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricRange {
    pub min: f64,
    pub max: f64,
}

impl MetricRange {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !(min <= max) {
            return Err(ForecastError::InvalidParameter(format!(
                "Range minimum {} exceeds maximum {}",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    /// Both bounds are inclusive; NaN is never contained
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Named energy-saving feature, each with the load profile it tolerates.
///
/// A metric without a range in a mode is not constrained by that mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergySavingMode {
    /// Switch off the power amplifier during empty OFDM symbols
    SymbolShutdown,
    /// Mute MIMO transmit branches
    ChannelShutdown,
    /// Take a capacity carrier off air
    CarrierShutdown,
    /// Put the whole cell to sleep
    DeepSleep,
}

impl EnergySavingMode {
    pub const ALL: [EnergySavingMode; 4] = [
        EnergySavingMode::SymbolShutdown,
        EnergySavingMode::ChannelShutdown,
        EnergySavingMode::CarrierShutdown,
        EnergySavingMode::DeepSleep,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EnergySavingMode::SymbolShutdown => "symbol_shutdown",
            EnergySavingMode::ChannelShutdown => "channel_shutdown",
            EnergySavingMode::CarrierShutdown => "carrier_shutdown",
            EnergySavingMode::DeepSleep => "deep_sleep",
        }
    }

    /// Per-metric inclusive ranges of this mode
    pub fn ranges(&self) -> Vec<(&'static str, MetricRange)> {
        let range = |min, max| MetricRange { min, max };
        match self {
            EnergySavingMode::SymbolShutdown => vec![
                (PRB_USAGE, range(0.0, 40.0)),
                (ACTIVE_USERS, range(0.0, 30.0)),
            ],
            EnergySavingMode::ChannelShutdown => vec![(PRB_USAGE, range(0.0, 25.0))],
            EnergySavingMode::CarrierShutdown => vec![
                (PRB_USAGE, range(0.0, 15.0)),
                (ACTIVE_USERS, range(0.0, 10.0)),
            ],
            EnergySavingMode::DeepSleep => vec![
                (PRB_USAGE, range(0.0, 5.0)),
                (ACTIVE_USERS, range(0.0, 2.0)),
            ],
        }
    }

    /// Range for one metric, `None` when the mode leaves it unconstrained
    pub fn range(&self, metric: &str) -> Option<MetricRange> {
        self.ranges()
            .into_iter()
            .find(|(name, _)| *name == metric)
            .map(|(_, range)| range)
    }

    fn known_names() -> String {
        Self::ALL
            .iter()
            .map(|mode| mode.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for EnergySavingMode {
    fn default() -> Self {
        EnergySavingMode::CarrierShutdown
    }
}

impl fmt::Display for EnergySavingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EnergySavingMode {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|mode| mode.name() == wanted)
            .ok_or_else(|| ForecastError::UnknownMode {
                name: s.to_string(),
                known: Self::known_names(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name() {
        for mode in EnergySavingMode::ALL {
            assert_eq!(mode.name().parse::<EnergySavingMode>().unwrap(), mode);
        }
        assert_eq!(
            "Deep-Sleep".parse::<EnergySavingMode>().unwrap(),
            EnergySavingMode::DeepSleep
        );
    }

    #[test]
    fn test_unknown_mode_lists_known() {
        let err = "turbo".parse::<EnergySavingMode>().unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("deep_sleep"));
    }

    #[test]
    fn test_range_is_inclusive() {
        let range = MetricRange::new(0.0, 15.0).unwrap();
        assert!(range.contains(0.0));
        assert!(range.contains(15.0));
        assert!(!range.contains(15.000001));
        assert!(!range.contains(f64::NAN));
        assert!(MetricRange::new(2.0, 1.0).is_err());
    }

    #[test]
    fn test_unconstrained_metric() {
        assert!(EnergySavingMode::ChannelShutdown.range(ACTIVE_USERS).is_none());
        assert!(EnergySavingMode::DeepSleep.range(ACTIVE_USERS).is_some());
    }
}
