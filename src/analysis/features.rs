//! Linear trend fitting and scalar series features.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utils::{mean, variance};

/// Ordinary least squares fit of `y = intercept + slope * t` over the time index
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub n_observations: usize,
}

impl LinearFit {
    pub fn value_at(&self, t: f64) -> f64 {
        self.intercept + self.slope * t
    }
}

/// Fit a line through the finite points of `values`, using their position as `t`.
///
/// Needs at least two finite points.
pub fn fit_linear_trend(values: &[f64]) -> Result<LinearFit> {
    let points: Vec<(f64, f64)> = values
        .iter()
        .enumerate()
        .filter(|(_, y)| y.is_finite())
        .map(|(t, &y)| (t as f64, y))
        .collect();

    if points.len() < 2 {
        return Err(Error::InvalidConfiguration(format!(
            "linear trend needs at least 2 finite observations, got {}",
            points.len()
        )));
    }

    let n = points.len() as f64;
    let sum_t: f64 = points.iter().map(|(t, _)| t).sum();
    let sum_y: f64 = points.iter().map(|(_, y)| y).sum();
    let sum_t2: f64 = points.iter().map(|(t, _)| t * t).sum();
    let sum_ty: f64 = points.iter().map(|(t, y)| t * y).sum();

    let denominator = n * sum_t2 - sum_t * sum_t;
    let slope = (n * sum_ty - sum_t * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_t) / n;

    let mean_y = sum_y / n;
    let ss_tot: f64 = points.iter().map(|(_, y)| (y - mean_y).powi(2)).sum();
    let ss_res: f64 = points
        .iter()
        .map(|(t, y)| (y - (intercept + slope * t)).powi(2))
        .sum();

    let r_squared = if ss_tot > 1e-10 { 1.0 - ss_res / ss_tot } else { 1.0 };

    Ok(LinearFit {
        slope,
        intercept,
        r_squared,
        n_observations: points.len(),
    })
}

/// Scalar features consumed by the trend report
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TsFeatures {
    pub trend_strength: f64,
    pub linearity: f64,
}

/// Seam for a time-series feature library
pub trait FeatureExtractor {
    fn extract(&self, values: &[f64]) -> Result<TsFeatures>;
}

/// Built-in features.
///
/// - linearity: R² of the OLS fit over time
/// - trend strength: `max(0, 1 - var(y - trend) / var(y))` where the trend is a
///   centered 3-point moving average (2-point at the ends)
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicFeatures;

impl FeatureExtractor for BasicFeatures {
    fn extract(&self, values: &[f64]) -> Result<TsFeatures> {
        let fit = fit_linear_trend(values)?;
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();

        Ok(TsFeatures {
            trend_strength: trend_strength(&finite),
            linearity: fit.r_squared,
        })
    }
}

fn trend_strength(values: &[f64]) -> f64 {
    let total = match variance(values) {
        Some(v) if v > 1e-12 => v,
        _ => return 0.0,
    };

    let residuals: Vec<f64> = (0..values.len())
        .map(|i| {
            let lo = i.saturating_sub(1);
            let hi = (i + 2).min(values.len());
            let trend = mean(&values[lo..hi]).unwrap_or(values[i]);
            values[i] - trend
        })
        .collect();

    let remainder = variance(&residuals).unwrap_or(0.0);
    (1.0 - remainder / total).max(0.0)
}
