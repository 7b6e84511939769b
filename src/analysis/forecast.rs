use chrono::{Duration, NaiveDateTime};
use log::{debug, info};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::Path;

use crate::analysis::features::{fit_linear_trend, LinearFit};
use crate::data::frame::TimeSeriesFrame;
use crate::error::{Error, Result};
use crate::loss::{LossFunction, MAELoss, MSELoss};

/// A univariate model fitted over the time index of a series
pub trait ForecastModel {
    fn name(&self) -> &str;

    /// Fit on `values`; non-finite entries are missing observations
    fn fit(&mut self, values: &[f64]) -> Result<()>;

    /// In-sample predictions for `t = 0..n` of the fitted series
    fn fitted_values(&self) -> Result<Vec<f64>>;

    /// Out-of-sample predictions for the `steps` points following the fitted series
    fn predict(&self, steps: usize) -> Result<Vec<f64>>;
}

/// Straight line through the history by ordinary least squares
#[derive(Debug, Clone, Default)]
pub struct LinearTrendModel {
    fit: Option<LinearFit>,
    len: usize,
}

impl LinearTrendModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit_result(&self) -> Option<&LinearFit> {
        self.fit.as_ref()
    }
}

impl ForecastModel for LinearTrendModel {
    fn name(&self) -> &str {
        "linear trend"
    }

    fn fit(&mut self, values: &[f64]) -> Result<()> {
        self.fit = Some(fit_linear_trend(values)?);
        self.len = values.len();
        Ok(())
    }

    fn fitted_values(&self) -> Result<Vec<f64>> {
        let fit = self.fit.as_ref().ok_or(Error::NotFitted)?;
        Ok((0..self.len).map(|t| fit.value_at(t as f64)).collect())
    }

    fn predict(&self, steps: usize) -> Result<Vec<f64>> {
        let fit = self.fit.as_ref().ok_or(Error::NotFitted)?;
        Ok((self.len..self.len + steps).map(|t| fit.value_at(t as f64)).collect())
    }
}

/// Role of a row in a forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowLabel {
    /// History the model was fitted on
    Train,
    /// History left out by `pick_last`
    Unused,
    Forecast,
}

impl fmt::Display for RowLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RowLabel::Train => "train",
            RowLabel::Unused => "unused",
            RowLabel::Forecast => "forecast",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub date: NaiveDateTime,
    pub actual: Option<f64>,
    pub forecast: Option<f64>,
    pub label: RowLabel,
}

/// Error metrics over rows carrying both an actual and a fitted value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastMetrics {
    pub rmse: f64,
    pub mae: f64,
    pub points: usize,
}

/// Fitted history followed by extrapolated points
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub model_name: String,
    pub value_column: String,
    pub rows: Vec<ForecastRow>,
}

impl Forecast {
    pub fn future(&self) -> impl Iterator<Item = &ForecastRow> + '_ {
        self.rows.iter().filter(|row| row.label == RowLabel::Forecast)
    }

    pub fn evaluate(&self) -> Result<ForecastMetrics> {
        let pairs: Vec<(f64, f64)> = self
            .rows
            .iter()
            .filter_map(|row| match (row.forecast, row.actual) {
                (Some(p), Some(a)) if a.is_finite() => Some((p, a)),
                _ => None,
            })
            .collect();

        if pairs.is_empty() {
            return Err(Error::InvalidConfiguration(
                "forecast has no rows with both an actual and a fitted value".to_string(),
            ));
        }

        let predictions = Array2::from_shape_fn((pairs.len(), 1), |(i, _)| pairs[i].0);
        let targets = Array2::from_shape_fn((pairs.len(), 1), |(i, _)| pairs[i].1);

        Ok(ForecastMetrics {
            rmse: MSELoss.compute_loss(&predictions, &targets).sqrt(),
            mae: MAELoss.compute_loss(&predictions, &targets),
            points: pairs.len(),
        })
    }

    /// `Using {model} RMSE {rmse} and MAE {mae}`
    pub fn title(&self) -> Result<String> {
        let metrics = self.evaluate()?;
        Ok(format!("Using {} RMSE {} and MAE {}", self.model_name, metrics.rmse, metrics.mae))
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn to_csv_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut writer = csv::Writer::from_path(path)?;
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        info!("wrote {} forecast rows to {}", self.rows.len(), path.display());
        Ok(())
    }
}

/// Median gap between consecutive distinct dates; repeated timestamps are skipped
fn median_spacing(dates: &[NaiveDateTime]) -> Result<Duration> {
    let mut gaps: Vec<Duration> = dates
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|gap| *gap > Duration::zero())
        .collect();
    if gaps.is_empty() {
        return Err(Error::InvalidConfiguration(
            "at least two distinct dates are needed to extrapolate forecast dates".to_string(),
        ));
    }
    gaps.sort();
    Ok(gaps[gaps.len() / 2])
}

/// Fits a [`ForecastModel`] on one column of a dated series and extends it into the future.
pub struct Forecaster<M: ForecastModel = LinearTrendModel> {
    frame: TimeSeriesFrame,
    value_column: String,
    model: M,
    train_start: Option<usize>,
}

impl<M: ForecastModel> Forecaster<M> {
    pub fn new(frame: TimeSeriesFrame, value_column: &str, model: M) -> Result<Self> {
        frame.column(value_column)?;
        Ok(Forecaster {
            frame: frame.sorted_by_date(),
            value_column: value_column.to_string(),
            model,
            train_start: None,
        })
    }

    pub fn from_csv<P: AsRef<Path>>(path: P, date_column: &str, value_column: &str, model: M) -> Result<Self> {
        let frame = TimeSeriesFrame::read_csv(path, date_column, &[value_column])?;
        Self::new(frame, value_column, model)
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Fit on the whole history, or only on its last `pick_last` rows.
    ///
    /// Without `pick_last` every history row is labelled [`RowLabel::Train`]; rows
    /// are only [`RowLabel::Unused`] when they fall before the `pick_last` slice.
    pub fn fit(&mut self, pick_last: Option<usize>) -> Result<()> {
        let values = self.frame.column(&self.value_column)?;
        let len = values.len();
        let start = match pick_last {
            None => 0,
            Some(n) if n == 0 || n > len => {
                return Err(Error::InvalidConfiguration(format!(
                    "pick_last must be between 1 and {}, got {}",
                    len, n
                )))
            }
            Some(n) => len - n,
        };

        debug!(
            "fitting {} on {} of {} points of '{}'",
            self.model.name(),
            len - start,
            len,
            self.value_column
        );
        self.model.fit(&values[start..])?;
        self.train_start = Some(start);
        Ok(())
    }

    /// Fitted history plus `step` future points at the median observed date spacing
    pub fn predict(&self, step: usize) -> Result<Forecast> {
        let start = self.train_start.ok_or(Error::NotFitted)?;
        let values = self.frame.column(&self.value_column)?;
        let dates = self.frame.dates();

        let fitted = self.model.fitted_values()?;
        let future = self.model.predict(step)?;

        let mut rows = Vec::with_capacity(dates.len() + step);
        for (i, (&date, &value)) in dates.iter().zip(values).enumerate() {
            let actual = value.is_finite().then_some(value);
            let (forecast, label) = if i < start {
                (None, RowLabel::Unused)
            } else {
                (fitted.get(i - start).copied(), RowLabel::Train)
            };
            rows.push(ForecastRow { date, actual, forecast, label });
        }

        if step > 0 {
            let spacing = median_spacing(dates)?;
            let mut date = *dates.last().ok_or(Error::NotFitted)?;
            for value in future {
                date = date.checked_add_signed(spacing).ok_or_else(|| {
                    Error::InvalidConfiguration("forecast date is outside the calendar range".to_string())
                })?;
                rows.push(ForecastRow {
                    date,
                    actual: None,
                    forecast: Some(value),
                    label: RowLabel::Forecast,
                });
            }
        }

        Ok(Forecast {
            model_name: self.model.name().to_string(),
            value_column: self.value_column.clone(),
            rows,
        })
    }
}
