//! Fit a linear trend to a CSV series and write the extrapolated forecast.

use clap::Parser;
use env_logger::Env;
use log::{error, info};
use std::io;
use std::path::PathBuf;
use std::process;

use trendcast::analysis::{Forecaster, LinearTrendModel};
use trendcast::Result;

#[derive(Parser)]
#[command(name = "trendcast-forecast")]
#[command(about = "Forecast a CSV series with a linear trend model", long_about = None)]
struct Cli {
    /// Input CSV file
    #[arg(short, long)]
    dataset: PathBuf,

    #[arg(long, default_value = "date")]
    date_column: String,

    /// Column to forecast
    #[arg(short, long)]
    value_column: String,

    /// Number of future points
    #[arg(short, long, default_value = "48")]
    step: usize,

    /// Fit only on the last N points
    #[arg(short, long)]
    pick_last: Option<usize>,

    /// Output CSV file; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn run(cli: Cli) -> Result<()> {
    let mut forecaster = Forecaster::from_csv(&cli.dataset, &cli.date_column, &cli.value_column, LinearTrendModel::new())?;
    forecaster.fit(cli.pick_last)?;
    let forecast = forecaster.predict(cli.step)?;

    info!("{}", forecast.title()?);

    match cli.output {
        Some(path) => forecast.to_csv_path(path)?,
        None => forecast.write_csv(io::stdout().lock())?,
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()) {
        error!("{}", e);
        process::exit(1);
    }
}
