//! Train the LSTM next-step predictor on one column of a CSV file.

use clap::Parser;
use env_logger::Env;
use log::{error, info};
use std::path::PathBuf;
use std::process;

use trendcast::data::{DataLoader, SequenceDataset, TimeSeriesFrame};
use trendcast::loss::MSELoss;
use trendcast::models::predictor::RecurrentPredictor;
use trendcast::persistence::{ModelMetadata, PersistentModel};
use trendcast::training::Trainer;
use trendcast::{Result, RunConfig};

#[derive(Parser)]
#[command(name = "trendcast-train")]
#[command(about = "Train an LSTM next-step predictor on a CSV series", long_about = None)]
struct Cli {
    /// JSON run configuration; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the dataset path
    #[arg(short, long)]
    dataset: Option<PathBuf>,

    /// Override the epoch count
    #[arg(short, long)]
    epochs: Option<usize>,

    /// Override the batch size
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Export the trained model (.json for JSON, anything else for bincode)
    #[arg(short, long)]
    save: Option<PathBuf>,
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => RunConfig::from_json_file(path)?,
        None => RunConfig::default(),
    };
    if let Some(dataset) = cli.dataset {
        config.dataset_path = dataset;
    }
    if let Some(epochs) = cli.epochs {
        config.epochs = epochs;
    }
    if let Some(batch_size) = cli.batch_size {
        config.batch_size = batch_size;
    }
    config.validate()?;

    let frame = TimeSeriesFrame::read_csv(&config.dataset_path, &config.date_column, &[config.series_column.as_str()])?;
    let dataset = SequenceDataset::from_frame(&frame, &config.series_column, config.sequence_length, config.pred_length)?;
    info!(
        "{} windows of length {} from '{}' in {}",
        dataset.len(),
        config.sequence_length,
        config.series_column,
        config.dataset_path.display()
    );

    let mut loader = DataLoader::new(&dataset, config.batch_size)?;
    if let Some(seed) = config.shuffle_seed {
        loader = loader.with_shuffle(seed);
    }

    let predictor = RecurrentPredictor::new(config.predictor_config())?;
    info!("predictor has {} parameters", predictor.num_parameters());

    let optimizer = config.optimizer.build(config.learning_rate);
    let mut trainer = Trainer::new(predictor, MSELoss, optimizer).with_config(config.training_config());
    trainer.train(&mut loader)?;

    let final_loss = trainer.get_latest_metrics().map(|m| m.train_loss);
    if let Some(loss) = final_loss {
        info!("final average loss: {}", loss);
    }

    if let Some(path) = cli.save {
        let metadata = ModelMetadata::for_predictor(
            &trainer.predictor,
            config.series_column.clone(),
            config.sequence_length,
            config.epochs,
            final_loss,
        )
        .with_description(format!("trained on {}", config.dataset_path.display()));
        trainer.predictor.save(&path, metadata)?;
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
