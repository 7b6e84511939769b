use std::fs;

use tempfile::tempdir;
use trendcast::{
    analysis::{cumulative_monthly_growth_rate, Forecaster, LinearTrendModel, RowLabel, TrendAnalyzer, TrendDirection},
    Error,
};

fn write_monthly_csv(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("trends.csv");
    let mut csv = String::from("date,top 1,top 2,top 3\n");
    for m in 0..24u32 {
        let year = 2019 + (m / 12) as i32;
        let month = m % 12 + 1;
        csv.push_str(&format!("{}-{:02}-15,{},{},{}\n", year, month, 10 + m, 40 - m, 5));
    }
    fs::write(&path, csv).unwrap();
    path
}

#[test]
fn test_growth_rate_and_verbs() {
    assert!((cumulative_monthly_growth_rate(100.0, 121.0, 2).unwrap() - 10.0).abs() < 1e-9);
    assert_eq!(TrendDirection::from_slope(0.0).to_string(), "no trending");
    assert_eq!(TrendDirection::from_slope(-1.5).to_string(), "downward trending");
    assert_eq!(TrendDirection::from_slope(2.0).to_string(), "upward trending");
}

#[test]
fn test_trend_reports_from_csv() {
    let dir = tempdir().unwrap();
    let path = write_monthly_csv(dir.path());

    let analyzer = TrendAnalyzer::from_csv(&path, "date", &["top 1", "top 2", "top 3"]).unwrap();
    let reports = analyzer.reports().unwrap();

    assert_eq!(reports.len(), 3);
    assert_eq!(reports[0].direction, TrendDirection::Upward);
    assert_eq!(reports[1].direction, TrendDirection::Downward);
    assert_eq!(reports[2].direction, TrendDirection::Flat);
    assert!((reports[0].slope - 1.0).abs() < 1e-9);
    assert!(reports[0].to_string().starts_with("the slope of the model for top 1 is "));
    assert_eq!(analyzer.preprocessed().unwrap().len(), 24);
}

#[test]
fn test_forecast_to_csv_file() {
    let dir = tempdir().unwrap();
    let path = write_monthly_csv(dir.path());
    let output = dir.path().join("forecast.csv");

    let mut forecaster = Forecaster::from_csv(&path, "date", "top 1", LinearTrendModel::new()).unwrap();
    forecaster.fit(Some(12)).unwrap();
    let forecast = forecaster.predict(6).unwrap();
    forecast.to_csv_path(&output).unwrap();

    assert_eq!(forecast.rows.iter().filter(|r| r.label == RowLabel::Unused).count(), 12);
    assert_eq!(forecast.future().count(), 6);
    assert!(forecast.evaluate().unwrap().mae < 1e-9);

    let written = fs::read_to_string(&output).unwrap();
    assert_eq!(written.lines().count(), 1 + 24 + 6);
    assert!(written.lines().last().unwrap().ends_with(",forecast"));
}

#[test]
fn test_unknown_series_everywhere() {
    let dir = tempdir().unwrap();
    let path = write_monthly_csv(dir.path());

    assert!(matches!(
        Forecaster::from_csv(&path, "date", "top 4", LinearTrendModel::new()),
        Err(Error::UnknownSeriesName { .. })
    ));
    assert!(matches!(
        TrendAnalyzer::from_csv(&path, "date", &["top 4"]),
        Err(Error::UnknownSeriesName { .. })
    ));

    let analyzer = TrendAnalyzer::from_csv(&path, "date", &["top 1"]).unwrap();
    assert!(matches!(analyzer.last_12m("top 2"), Err(Error::UnknownSeriesName { .. })));
}
