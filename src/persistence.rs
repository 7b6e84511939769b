use log::info;
use ndarray::{Array2, Dimension};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::layers::linear::LinearLayer;
use crate::layers::lstm_cell::LSTMCell;
use crate::models::lstm_network::LSTMNetwork;
use crate::models::predictor::RecurrentPredictor;

/// Errors that can occur while exporting or loading a trained predictor
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Corrupt model: {0}")]
    CorruptModel(String),
}

impl From<serde_json::Error> for PersistenceError {
    fn from(error: serde_json::Error) -> Self {
        PersistenceError::SerializationError(error.to_string())
    }
}

impl From<bincode::Error> for PersistenceError {
    fn from(error: bincode::Error) -> Self {
        PersistenceError::SerializationError(error.to_string())
    }
}

/// Serializable version of Array2<f64> for persistence
#[derive(Serialize, Deserialize)]
pub struct SerializableArray2 {
    data: Vec<f64>,
    shape: (usize, usize),
}

impl From<&Array2<f64>> for SerializableArray2 {
    fn from(array: &Array2<f64>) -> Self {
        Self {
            data: array.iter().cloned().collect(),
            shape: array.raw_dim().into_pattern(),
        }
    }
}

impl TryFrom<SerializableArray2> for Array2<f64> {
    type Error = PersistenceError;

    fn try_from(value: SerializableArray2) -> Result<Self, Self::Error> {
        Array2::from_shape_vec(value.shape, value.data).map_err(|e| PersistenceError::CorruptModel(e.to_string()))
    }
}

/// Serializable LSTM cell parameters
#[derive(Serialize, Deserialize)]
pub struct SerializableLSTMCell {
    w_ih: SerializableArray2,
    w_hh: SerializableArray2,
    b_ih: SerializableArray2,
    b_hh: SerializableArray2,
    input_size: usize,
    hidden_size: usize,
}

impl From<&LSTMCell> for SerializableLSTMCell {
    fn from(cell: &LSTMCell) -> Self {
        Self {
            w_ih: (&cell.w_ih).into(),
            w_hh: (&cell.w_hh).into(),
            b_ih: (&cell.b_ih).into(),
            b_hh: (&cell.b_hh).into(),
            input_size: cell.input_size,
            hidden_size: cell.hidden_size,
        }
    }
}

impl TryFrom<SerializableLSTMCell> for LSTMCell {
    type Error = PersistenceError;

    fn try_from(value: SerializableLSTMCell) -> Result<Self, Self::Error> {
        let cell = LSTMCell {
            w_ih: value.w_ih.try_into()?,
            w_hh: value.w_hh.try_into()?,
            b_ih: value.b_ih.try_into()?,
            b_hh: value.b_hh.try_into()?,
            input_size: value.input_size,
            hidden_size: value.hidden_size,
        };
        let gates = 4 * cell.hidden_size;
        let consistent = cell.w_ih.dim() == (gates, cell.input_size)
            && cell.w_hh.dim() == (gates, cell.hidden_size)
            && cell.b_ih.dim() == (gates, 1)
            && cell.b_hh.dim() == (gates, 1);
        if !consistent {
            return Err(PersistenceError::CorruptModel(format!(
                "LSTM cell weights do not match input_size {} / hidden_size {}",
                cell.input_size, cell.hidden_size
            )));
        }
        Ok(cell)
    }
}

/// Serializable predictor: recurrent layers plus projection head
#[derive(Serialize, Deserialize)]
pub struct SerializablePredictor {
    cells: Vec<SerializableLSTMCell>,
    head_weight: SerializableArray2,
    head_bias: SerializableArray2,
    input_size: usize,
    hidden_size: usize,
}

impl From<&RecurrentPredictor> for SerializablePredictor {
    fn from(predictor: &RecurrentPredictor) -> Self {
        let network = predictor.network();
        Self {
            cells: network.get_cells().iter().map(SerializableLSTMCell::from).collect(),
            head_weight: (&predictor.head().weight).into(),
            head_bias: (&predictor.head().bias).into(),
            input_size: network.input_size,
            hidden_size: network.hidden_size,
        }
    }
}

impl TryFrom<SerializablePredictor> for RecurrentPredictor {
    type Error = PersistenceError;

    fn try_from(value: SerializablePredictor) -> Result<Self, Self::Error> {
        let cells = value
            .cells
            .into_iter()
            .map(LSTMCell::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        if cells.is_empty() {
            return Err(PersistenceError::CorruptModel("model has no LSTM layers".to_string()));
        }
        for (layer, cell) in cells.iter().enumerate() {
            let expected_input = if layer == 0 { value.input_size } else { value.hidden_size };
            if cell.input_size != expected_input || cell.hidden_size != value.hidden_size {
                return Err(PersistenceError::CorruptModel(format!(
                    "layer {} is {}x{}, expected {}x{}",
                    layer, cell.input_size, cell.hidden_size, expected_input, value.hidden_size
                )));
            }
        }

        let network = LSTMNetwork::from_cells(cells, value.input_size, value.hidden_size);
        let head = LinearLayer::from_weights(value.head_weight.try_into()?, value.head_bias.try_into()?)
            .map_err(|e| PersistenceError::CorruptModel(e.to_string()))?;
        RecurrentPredictor::from_parts(network, head).map_err(|e| PersistenceError::CorruptModel(e.to_string()))
    }
}

/// Model metadata for tracking training information
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ModelMetadata {
    pub model_name: String,
    pub version: String,
    pub created_at: String,
    pub input_size: usize,
    pub hidden_size: usize,
    pub num_layers: usize,
    pub sequence_length: usize,
    pub total_epochs: usize,
    pub final_loss: Option<f64>,
    pub description: Option<String>,
}

impl ModelMetadata {
    /// Metadata stamped with the crate version and current UTC time
    pub fn for_predictor(
        predictor: &RecurrentPredictor,
        model_name: impl Into<String>,
        sequence_length: usize,
        total_epochs: usize,
        final_loss: Option<f64>,
    ) -> Self {
        let config = predictor.config();
        ModelMetadata {
            model_name: model_name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            input_size: config.input_size,
            hidden_size: config.hidden_size,
            num_layers: config.num_layers,
            sequence_length,
            total_epochs,
            final_loss,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Complete saved model including parameters and metadata
#[derive(Serialize, Deserialize)]
pub struct SavedModel {
    pub predictor: SerializablePredictor,
    pub metadata: ModelMetadata,
}

/// Storage format, picked from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Json,
    Binary,
}

impl ModelFormat {
    /// `.json` is JSON, everything else (`.bin`, `.model`, none) is bincode
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|s| s.to_str()) {
            Some("json") => ModelFormat::Json,
            _ => ModelFormat::Binary,
        }
    }
}

/// Model persistence operations
pub struct ModelPersistence;

impl ModelPersistence {
    /// Save model to JSON format (human-readable)
    pub fn save_to_json<P: AsRef<Path>>(model: &SavedModel, path: P) -> Result<(), PersistenceError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, model)?;
        writer.flush()?;
        Ok(())
    }

    /// Load model from JSON format
    pub fn load_from_json<P: AsRef<Path>>(path: P) -> Result<SavedModel, PersistenceError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Save model to binary format (compact and fast)
    pub fn save_to_binary<P: AsRef<Path>>(model: &SavedModel, path: P) -> Result<(), PersistenceError> {
        let mut writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(&mut writer, model)?;
        writer.flush()?;
        Ok(())
    }

    /// Load model from binary format
    pub fn load_from_binary<P: AsRef<Path>>(path: P) -> Result<SavedModel, PersistenceError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(bincode::deserialize_from(reader)?)
    }
}

/// Convenience trait for saving/loading a trained predictor
pub trait PersistentModel {
    /// Save model to file (format determined by file extension)
    fn save<P: AsRef<Path>>(&self, path: P, metadata: ModelMetadata) -> Result<(), PersistenceError>;

    /// Load model from file (format determined by file extension)
    fn load<P: AsRef<Path>>(path: P) -> Result<(Self, ModelMetadata), PersistenceError>
    where
        Self: Sized;
}

impl PersistentModel for RecurrentPredictor {
    fn save<P: AsRef<Path>>(&self, path: P, metadata: ModelMetadata) -> Result<(), PersistenceError> {
        let path = path.as_ref();
        let saved_model = SavedModel {
            predictor: self.into(),
            metadata,
        };

        match ModelFormat::from_path(path) {
            ModelFormat::Json => ModelPersistence::save_to_json(&saved_model, path)?,
            ModelFormat::Binary => ModelPersistence::save_to_binary(&saved_model, path)?,
        }
        info!("saved model '{}' to {}", saved_model.metadata.model_name, path.display());
        Ok(())
    }

    fn load<P: AsRef<Path>>(path: P) -> Result<(Self, ModelMetadata), PersistenceError> {
        let path = path.as_ref();
        let saved_model = match ModelFormat::from_path(path) {
            ModelFormat::Json => ModelPersistence::load_from_json(path)?,
            ModelFormat::Binary => ModelPersistence::load_from_binary(path)?,
        };

        Ok((RecurrentPredictor::try_from(saved_model.predictor)?, saved_model.metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::predictor::PredictorConfig;
    use ndarray::arr2;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ModelFormat::from_path(Path::new("m.json")), ModelFormat::Json);
        assert_eq!(ModelFormat::from_path(Path::new("m.bin")), ModelFormat::Binary);
        assert_eq!(ModelFormat::from_path(Path::new("m")), ModelFormat::Binary);
    }

    #[test]
    fn test_array_shape_mismatch_is_corrupt() {
        let broken = SerializableArray2 {
            data: vec![1.0, 2.0, 3.0],
            shape: (2, 2),
        };
        assert!(matches!(Array2::<f64>::try_from(broken), Err(PersistenceError::CorruptModel(_))));
    }

    #[test]
    fn test_array_round_trip_keeps_layout() {
        let original = arr2(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        let restored = Array2::<f64>::try_from(SerializableArray2::from(&original)).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_cell_with_wrong_dims_rejected() {
        let cell = LSTMCell::new(1, 2);
        let mut serial = SerializableLSTMCell::from(&cell);
        serial.hidden_size = 3;
        assert!(LSTMCell::try_from(serial).is_err());
    }

    #[test]
    fn test_predictor_with_mismatched_layers_rejected() {
        let predictor = RecurrentPredictor::new(PredictorConfig::default()).unwrap();
        let mut serial = SerializablePredictor::from(&predictor);
        serial.cells[1] = SerializableLSTMCell::from(&LSTMCell::new(2, 3));

        assert!(matches!(RecurrentPredictor::try_from(serial), Err(PersistenceError::CorruptModel(_))));
    }
}
