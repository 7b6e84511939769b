use ndarray::Array3;
use tempfile::tempdir;
use trendcast::{
    data::{DataLoader, SequenceDataset},
    models::predictor::{PredictorConfig, RecurrentPredictor},
    persistence::{ModelMetadata, ModelPersistence, PersistenceError, PersistentModel},
    training::{create_basic_trainer, TrainingConfig},
};

fn trained_predictor() -> RecurrentPredictor {
    let dataset = SequenceDataset::new((0..16).map(|i| i as f64 / 16.0).collect(), 4, 1).unwrap();
    let mut loader = DataLoader::new(&dataset, 4).unwrap();
    let predictor = RecurrentPredictor::new(PredictorConfig { hidden_size: 3, ..PredictorConfig::default() }).unwrap();
    let mut trainer = create_basic_trainer(predictor, 0.01).with_config(TrainingConfig {
        epochs: 5,
        ..TrainingConfig::default()
    });
    trainer.train(&mut loader).unwrap();
    trainer.predictor
}

fn probe() -> Array3<f64> {
    Array3::from_shape_fn((2, 4, 1), |(b, t, _)| (b * 4 + t) as f64 * 0.1)
}

#[test]
fn test_metadata_for_predictor() {
    let predictor = trained_predictor();
    let metadata = ModelMetadata::for_predictor(&predictor, "top 1", 4, 5, Some(0.02)).with_description("unit test");

    assert_eq!(metadata.model_name, "top 1");
    assert_eq!(metadata.hidden_size, 3);
    assert_eq!(metadata.num_layers, 2);
    assert_eq!(metadata.sequence_length, 4);
    assert_eq!(metadata.version, env!("CARGO_PKG_VERSION"));
    assert!(chrono::DateTime::parse_from_rfc3339(&metadata.created_at).is_ok());
}

#[test]
fn test_predictor_save_load_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.json");
    let predictor = trained_predictor();
    let metadata = ModelMetadata::for_predictor(&predictor, "json", 4, 5, None);

    predictor.save(&path, metadata.clone()).unwrap();
    let (loaded, loaded_metadata) = RecurrentPredictor::load(&path).unwrap();

    assert_eq!(loaded_metadata, metadata);
    assert_eq!(loaded.config(), predictor.config());
    let original = predictor.forward(&probe()).unwrap();
    let restored = loaded.forward(&probe()).unwrap();
    for (a, b) in original.iter().zip(restored.iter()) {
        assert!((a - b).abs() < 1e-12);
    }
}

#[test]
fn test_predictor_save_load_binary() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.bin");
    let predictor = trained_predictor();

    predictor.save(&path, ModelMetadata::for_predictor(&predictor, "bin", 4, 5, None)).unwrap();
    let (loaded, _) = RecurrentPredictor::load(&path).unwrap();

    assert_eq!(loaded.num_parameters(), predictor.num_parameters());
    assert_eq!(loaded.forward(&probe()).unwrap(), predictor.forward(&probe()).unwrap());
}

#[test]
fn test_corrupt_and_missing_files() {
    let dir = tempdir().unwrap();
    let garbage = dir.path().join("broken.json");
    std::fs::write(&garbage, "{ not a model").unwrap();

    assert!(matches!(
        ModelPersistence::load_from_json(&garbage),
        Err(PersistenceError::SerializationError(_))
    ));
    assert!(matches!(
        RecurrentPredictor::load(dir.path().join("missing.bin")),
        Err(PersistenceError::IoError(_))
    ));
}

#[test]
fn test_inconsistent_layer_sizes_rejected_on_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.json");
    let predictor = RecurrentPredictor::new(PredictorConfig::default()).unwrap();
    predictor.save(&path, ModelMetadata::for_predictor(&predictor, "edited", 4, 0, None)).unwrap();

    let mut saved: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    saved["predictor"]["input_size"] = serde_json::json!(3);
    std::fs::write(&path, serde_json::to_string(&saved).unwrap()).unwrap();
    assert!(matches!(RecurrentPredictor::load(&path), Err(PersistenceError::CorruptModel(_))));

    saved["predictor"]["input_size"] = serde_json::json!(1);
    saved["predictor"]["cells"] = serde_json::json!([]);
    std::fs::write(&path, serde_json::to_string(&saved).unwrap()).unwrap();
    assert!(matches!(RecurrentPredictor::load(&path), Err(PersistenceError::CorruptModel(_))));
}
