use std::fs;
use std::path::Path;

use tempfile::tempdir;
use trendcast::{
    data::{window_count, DataLoader, SequenceDataset, TimeSeriesFrame},
    loss::{LossFunction, MSELoss},
    models::predictor::{PredictorConfig, RecurrentPredictor},
    optimizers::OptimizerKind,
    training::{Trainer, TrainingConfig},
    Error, RunConfig,
};

fn write_series_csv(path: &Path, len: usize) {
    let mut csv = String::from("date,top 1,top 2\n");
    for i in 0..len {
        csv.push_str(&format!("2021-01-{:02},{},{}\n", i + 1, (i as f64 * 0.4).sin(), i));
    }
    fs::write(path, csv).unwrap();
}

#[test]
fn test_csv_to_trained_predictor() {
    let dir = tempdir().unwrap();
    let csv_path = dir.path().join("series.csv");
    write_series_csv(&csv_path, 20);

    let frame = TimeSeriesFrame::read_csv(&csv_path, "date", &["top 1"]).unwrap();
    let dataset = SequenceDataset::from_frame(&frame, "top 1", 4, 1).unwrap();
    assert_eq!(dataset.len(), window_count(20, 4, 1));

    let mut loader = DataLoader::new(&dataset, 3).unwrap().with_shuffle(7);
    assert_eq!(loader.num_batches(), 6);

    let predictor = RecurrentPredictor::new(PredictorConfig::default()).unwrap();
    let mut trainer = Trainer::new(predictor, MSELoss, OptimizerKind::Adam.build(0.01)).with_config(TrainingConfig {
        epochs: 3,
        print_every: 1,
        clip_gradient: None,
    });

    let history = trainer.train(&mut loader).unwrap();
    assert_eq!(history.len(), 3);
    assert!(history.iter().all(|m| m.train_loss.is_finite()));

    let batch = &loader.batches()[0];
    let predictions = trainer.predict(&batch.inputs).unwrap();
    assert_eq!(predictions.dim(), batch.targets.dim());
    assert!(MSELoss.compute_loss(&predictions, &batch.targets).is_finite());
}

#[test]
fn test_run_config_from_file_drives_pipeline() {
    let dir = tempdir().unwrap();
    let csv_path = dir.path().join("trends.csv");
    write_series_csv(&csv_path, 12);

    let config_path = dir.path().join("run.json");
    let config_json = format!(
        r#"{{"dataset_path": {:?}, "epochs": 2, "batch_size": 2, "optimizer": "rmsprop"}}"#,
        csv_path.to_str().unwrap()
    );
    fs::write(&config_path, config_json).unwrap();

    let config = RunConfig::from_json_file(&config_path).unwrap();
    assert_eq!(config.dataset_path, csv_path);

    let frame = TimeSeriesFrame::read_csv(&config.dataset_path, &config.date_column, &[]).unwrap();
    let dataset = SequenceDataset::from_frame(&frame, &config.series_column, config.sequence_length, config.pred_length).unwrap();
    let mut loader = DataLoader::new(&dataset, config.batch_size).unwrap();

    let predictor = RecurrentPredictor::new(config.predictor_config()).unwrap();
    let mut trainer = Trainer::new(predictor, MSELoss, config.optimizer.build(config.learning_rate))
        .with_config(config.training_config());
    assert_eq!(trainer.train(&mut loader).unwrap().len(), 2);
}

#[test]
fn test_short_series_and_unknown_column() {
    let dir = tempdir().unwrap();
    let csv_path = dir.path().join("short.csv");
    write_series_csv(&csv_path, 4);

    let frame = TimeSeriesFrame::read_csv(&csv_path, "date", &[]).unwrap();
    assert!(matches!(
        SequenceDataset::from_frame(&frame, "top 1", 4, 1),
        Err(Error::InvalidConfiguration(_))
    ));
    assert!(matches!(
        SequenceDataset::from_frame(&frame, "top 9", 2, 1),
        Err(Error::UnknownSeriesName { .. })
    ));
}
