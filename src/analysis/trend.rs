use chrono::{Datelike, NaiveDate};
use log::debug;
use std::fmt;
use std::path::Path;

use crate::analysis::features::{fit_linear_trend, BasicFeatures, FeatureExtractor};
use crate::data::frame::TimeSeriesFrame;
use crate::error::{Error, Result};
use crate::utils::finite_mean;

/// Series analysed when no explicit list is given
pub const DEFAULT_SERIES: [&str; 3] = ["top 1", "top 2", "top 3"];

/// Number of trailing monthly points used by [`TrendAnalyzer::last_12m`]
pub const TRAILING_MONTHS: usize = 12;

/// Compounded growth per month, in percent: `((end / start)^(1 / months) - 1) * 100`
pub fn cumulative_monthly_growth_rate(start: f64, end: f64, months: usize) -> Result<f64> {
    if start == 0.0 {
        return Err(Error::InvalidConfiguration("growth rate needs a non-zero start value".to_string()));
    }
    if months == 0 {
        return Err(Error::InvalidConfiguration("growth rate needs at least one month".to_string()));
    }
    Ok(((end / start).powf(1.0 / months as f64) - 1.0) * 100.0)
}

/// Direction of a fitted slope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Flat,
    Downward,
    Upward,
}

impl TrendDirection {
    pub fn from_slope(slope: f64) -> Self {
        if slope > 0.0 {
            TrendDirection::Upward
        } else if slope < 0.0 {
            TrendDirection::Downward
        } else {
            TrendDirection::Flat
        }
    }

    pub fn verb(self) -> &'static str {
        match self {
            TrendDirection::Flat => "no trending",
            TrendDirection::Downward => "downward trending",
            TrendDirection::Upward => "upward trending",
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

fn month_key(date: NaiveDate) -> i32 {
    date.year() * 12 + date.month0() as i32
}

fn month_end(key: i32) -> Option<NaiveDate> {
    let year = key.div_euclid(12);
    let month = key.rem_euclid(12) as u32 + 1;
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

/// Calendar-month means of every column, labelled by month end.
///
/// Rows are sorted by date first. Months without any finite value are kept as
/// `NaN` so the monthly index has no gaps. Returns a new frame.
pub fn resample_monthly(frame: &TimeSeriesFrame) -> Result<TimeSeriesFrame> {
    let sorted = frame.sorted_by_date();
    let names = sorted.column_names().to_vec();

    let (first, last) = match (sorted.dates().first(), sorted.dates().last()) {
        (Some(first), Some(last)) => (month_key(first.date()), month_key(last.date())),
        _ => return TimeSeriesFrame::new(sorted.date_column(), Vec::new(), names.clone(), vec![Vec::new(); names.len()]),
    };
    let months = (last - first + 1) as usize;

    let mut buckets: Vec<Vec<Vec<f64>>> = vec![vec![Vec::new(); months]; names.len()];
    for (row, date) in sorted.dates().iter().enumerate() {
        let bucket = (month_key(date.date()) - first) as usize;
        for (col, name) in names.iter().enumerate() {
            buckets[col][bucket].push(sorted.column(name)?[row]);
        }
    }

    let dates = (first..=last)
        .map(|key| {
            month_end(key)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .ok_or_else(|| Error::InvalidConfiguration(format!("month index {} is out of the calendar range", key)))
        })
        .collect::<Result<Vec<_>>>()?;

    let columns = buckets
        .iter()
        .map(|column| column.iter().map(|values| finite_mean(values).unwrap_or(f64::NAN)).collect())
        .collect();

    TimeSeriesFrame::new(sorted.date_column(), dates, names, columns)
}

/// Summary of the trailing monthly trend of one series
#[derive(Debug, Clone, PartialEq)]
pub struct TrendReport {
    pub series: String,
    pub slope: f64,
    pub intercept: f64,
    pub trend_strength: f64,
    pub linearity: f64,
    pub direction: TrendDirection,
    /// CMGR between the first and last finite month, `None` when undefined
    pub growth_rate: Option<f64>,
    pub months: usize,
}

impl fmt::Display for TrendReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "the slope of the model for {} is {} and intercept {} and trend strength {} with linearity {}",
            self.series, self.slope, self.intercept, self.trend_strength, self.linearity
        )?;
        match self.growth_rate {
            Some(rate) => write!(
                f,
                "{} is {} with a cumulative monthly growth rate of {:.2}% over {} months",
                self.series, self.direction, rate, self.months
            ),
            None => write!(
                f,
                "{} is {}; cumulative monthly growth rate is undefined",
                self.series, self.direction
            ),
        }
    }
}

/// Trend and growth summaries over the last year of monthly data.
pub struct TrendAnalyzer<F: FeatureExtractor = BasicFeatures> {
    frame: TimeSeriesFrame,
    series_names: Vec<String>,
    extractor: F,
}

impl TrendAnalyzer<BasicFeatures> {
    /// Analyzer over already loaded data; every configured series must be present
    pub fn new(frame: TimeSeriesFrame, series_names: &[&str]) -> Result<Self> {
        for name in series_names {
            frame.column(name)?;
        }
        Ok(TrendAnalyzer {
            frame,
            series_names: series_names.iter().map(|s| s.to_string()).collect(),
            extractor: BasicFeatures,
        })
    }

    pub fn from_csv<P: AsRef<Path>>(path: P, date_column: &str, series_names: &[&str]) -> Result<Self> {
        let frame = TimeSeriesFrame::read_csv(path, date_column, series_names)?;
        Self::new(frame, series_names)
    }
}

impl<F: FeatureExtractor> TrendAnalyzer<F> {
    pub fn with_extractor<G: FeatureExtractor>(self, extractor: G) -> TrendAnalyzer<G> {
        TrendAnalyzer {
            frame: self.frame,
            series_names: self.series_names,
            extractor,
        }
    }

    pub fn series_names(&self) -> &[String] {
        &self.series_names
    }

    /// Sorted, month-resampled copy of the loaded data
    pub fn preprocessed(&self) -> Result<TimeSeriesFrame> {
        resample_monthly(&self.frame)
    }

    /// Trend report over the last 12 monthly points of `series`
    pub fn last_12m(&self, series: &str) -> Result<TrendReport> {
        if !self.series_names.iter().any(|s| s == series) {
            return Err(Error::UnknownSeriesName {
                name: series.to_string(),
                available: self.series_names.clone(),
            });
        }

        let monthly = self.preprocessed()?.tail(TRAILING_MONTHS);
        let values = monthly.column(series)?;
        debug!("{}: fitting trend over {} monthly points", series, values.len());

        let fit = fit_linear_trend(values)?;
        let features = self.extractor.extract(values)?;

        let finite: Vec<(usize, f64)> = values
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, v)| v.is_finite())
            .collect();
        let (growth_rate, months) = match (finite.first(), finite.last()) {
            (Some(&(i, start)), Some(&(j, end))) => {
                let rate = cumulative_monthly_growth_rate(start, end, j - i).ok().filter(|r| r.is_finite());
                (rate, j - i)
            },
            _ => (None, 0),
        };

        Ok(TrendReport {
            series: series.to_string(),
            slope: fit.slope,
            intercept: fit.intercept,
            trend_strength: features.trend_strength,
            linearity: features.linearity,
            direction: TrendDirection::from_slope(fit.slope),
            growth_rate,
            months,
        })
    }

    /// Reports for every configured series, in configuration order
    pub fn reports(&self) -> Result<Vec<TrendReport>> {
        self.series_names.iter().map(|name| self.last_12m(name)).collect()
    }
}
