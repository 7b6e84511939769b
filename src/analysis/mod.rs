pub mod features;
pub mod forecast;
pub mod trend;

pub use features::{fit_linear_trend, BasicFeatures, FeatureExtractor, LinearFit, TsFeatures};
pub use forecast::{Forecast, ForecastMetrics, ForecastModel, ForecastRow, Forecaster, LinearTrendModel, RowLabel};
pub use trend::{cumulative_monthly_growth_rate, resample_monthly, TrendAnalyzer, TrendDirection, TrendReport};
