use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::models::predictor::PredictorConfig;
use crate::optimizers::OptimizerKind;
use crate::training::TrainingConfig;

/// Settings for a training run, read from a JSON file at startup.
///
/// Every field has a default, so a file only needs the values it changes.
/// Unknown fields are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub dataset_path: PathBuf,
    pub date_column: String,
    pub series_column: String,
    pub sequence_length: usize,
    pub pred_length: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub hidden_size: usize,
    pub num_layers: usize,
    pub optimizer: OptimizerKind,
    /// Shuffle windows every epoch with this seed; sequential order when absent
    pub shuffle_seed: Option<u64>,
    pub print_every: usize,
    pub clip_gradient: Option<f64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            dataset_path: PathBuf::from("datasets/trends1.csv"),
            date_column: "date".to_string(),
            series_column: "top 1".to_string(),
            sequence_length: 4,
            pred_length: 1,
            epochs: 2000,
            batch_size: 1,
            learning_rate: 0.001,
            hidden_size: 2,
            num_layers: 2,
            optimizer: OptimizerKind::Adam,
            shuffle_seed: None,
            print_every: 1,
            clip_gradient: None,
        }
    }
}

impl RunConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("reading run config from {}", path.display());
        let config: RunConfig = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: RunConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("sequence_length", self.sequence_length),
            ("pred_length", self.pred_length),
            ("batch_size", self.batch_size),
            ("hidden_size", self.hidden_size),
            ("num_layers", self.num_layers),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(Error::InvalidConfiguration(format!("{} must be at least 1", name)));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::InvalidConfiguration(format!(
                "learning_rate must be a positive number, got {}",
                self.learning_rate
            )));
        }
        if let Some(clip) = self.clip_gradient {
            if !(clip.is_finite() && clip > 0.0) {
                return Err(Error::InvalidConfiguration(format!("clip_gradient must be positive, got {}", clip)));
            }
        }
        Ok(())
    }

    pub fn predictor_config(&self) -> PredictorConfig {
        PredictorConfig {
            hidden_size: self.hidden_size,
            num_layers: self.num_layers,
            ..PredictorConfig::default()
        }
    }

    pub fn training_config(&self) -> TrainingConfig {
        TrainingConfig {
            epochs: self.epochs,
            print_every: self.print_every,
            clip_gradient: self.clip_gradient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_sample_driver() {
        let config = RunConfig::default();
        assert_eq!(config.epochs, 2000);
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.sequence_length, 4);
        assert_eq!(config.optimizer, OptimizerKind::Adam);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = RunConfig::from_json_str(r#"{"dataset_path": "data.csv", "epochs": 10, "batch_size": 4}"#).unwrap();
        assert_eq!(config.dataset_path, PathBuf::from("data.csv"));
        assert_eq!(config.epochs, 10);
        assert_eq!(config.batch_size, 4);
        assert_eq!(config.series_column, "top 1");
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(matches!(RunConfig::from_json_str(r#"{"epoch_count": 3}"#), Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            RunConfig::from_json_str(r#"{"batch_size": 0}"#),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(matches!(
            RunConfig::from_json_str(r#"{"learning_rate": -1.0}"#),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_derived_configs() {
        let config = RunConfig::from_json_str(r#"{"hidden_size": 8, "epochs": 5, "optimizer": "sgd"}"#).unwrap();
        assert_eq!(config.predictor_config().hidden_size, 8);
        assert_eq!(config.predictor_config().input_size, 1);
        assert_eq!(config.training_config().epochs, 5);
        assert_eq!(config.optimizer, OptimizerKind::Sgd);
    }
}
