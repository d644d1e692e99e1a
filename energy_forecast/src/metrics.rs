//! Fit quality records and their aggregation for reporting

use serde::Serialize;
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use std::fmt;

/// In-sample score of one (cell, metric, model) fit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitQuality {
    pub entity_id: String,
    pub metric_name: String,
    pub model_name: String,
    /// Coefficient of determination; NaN for a zero-variance history
    pub r_squared: f64,
}

impl FitQuality {
    /// Whether the score is defined
    pub fn is_defined(&self) -> bool {
        self.r_squared.is_finite()
    }
}

/// Aggregate fit quality of one model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelScore {
    pub model_name: String,
    /// Mean R² over defined scores, `None` if no score was defined
    pub mean_r_squared: Option<f64>,
    /// Fits with a defined score
    pub scored: usize,
    /// Fits whose history had zero variance
    pub undefined: usize,
}

impl fmt::Display for ModelScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mean_r_squared {
            Some(r2) => write!(f, "{:<18} mean R²: {:>8.4}", self.model_name, r2)?,
            None => write!(f, "{:<18} mean R²:      NaN", self.model_name)?,
        }
        write!(f, "  ({} scored, {} undefined)", self.scored, self.undefined)
    }
}

/// Average the defined scores of each model, models in name order
pub fn summarize_fit_quality(quality: &[FitQuality]) -> Vec<ModelScore> {
    let mut by_model: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for q in quality {
        by_model.entry(q.model_name.as_str()).or_default().push(q.r_squared);
    }

    by_model
        .into_iter()
        .map(|(model_name, scores)| {
            let defined: Vec<f64> = scores.iter().copied().filter(|s| s.is_finite()).collect();
            let mean_r_squared = if defined.is_empty() {
                None
            } else {
                Some(defined.iter().mean())
            };
            ModelScore {
                model_name: model_name.to_string(),
                mean_r_squared,
                scored: defined.len(),
                undefined: scores.len() - defined.len(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quality(model: &str, r2: f64) -> FitQuality {
        FitQuality {
            entity_id: "A".to_string(),
            metric_name: "prb_usage".to_string(),
            model_name: model.to_string(),
            r_squared: r2,
        }
    }

    #[test]
    fn test_nan_scores_are_counted_not_averaged() {
        let scores = summarize_fit_quality(&[
            quality("holt", 0.5),
            quality("holt", f64::NAN),
            quality("holt", 0.7),
            quality("linear_trend", f64::NAN),
        ]);

        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].model_name, "holt");
        assert!((scores[0].mean_r_squared.unwrap() - 0.6).abs() < 1e-12);
        assert_eq!(scores[0].scored, 2);
        assert_eq!(scores[0].undefined, 1);
        assert_eq!(scores[1].mean_r_squared, None);
        assert!(scores[1].to_string().contains("NaN"));
    }
}
