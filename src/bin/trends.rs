//! Print 12-month trend and growth summaries for CSV series.

use clap::Parser;
use env_logger::Env;
use log::error;
use std::path::PathBuf;
use std::process;

use trendcast::analysis::trend::DEFAULT_SERIES;
use trendcast::analysis::TrendAnalyzer;
use trendcast::Result;

#[derive(Parser)]
#[command(name = "trendcast-trends")]
#[command(about = "Summarise the last 12 months of CSV series", long_about = None)]
struct Cli {
    /// Input CSV file
    #[arg(short, long)]
    dataset: PathBuf,

    #[arg(long, default_value = "date")]
    date_column: String,

    /// Comma-separated series columns
    #[arg(short, long, value_delimiter = ',')]
    columns: Vec<String>,
}

fn run(cli: Cli) -> Result<()> {
    let columns: Vec<&str> = if cli.columns.is_empty() {
        DEFAULT_SERIES.to_vec()
    } else {
        cli.columns.iter().map(|c| c.trim()).collect()
    };

    let analyzer = TrendAnalyzer::from_csv(&cli.dataset, &cli.date_column, &columns)?;
    for report in analyzer.reports()? {
        println!("{}\n", report);
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
