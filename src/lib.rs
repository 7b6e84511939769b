//! # trendcast
//!
//! Univariate time-series forecasting and trend analysis.
//!
//! ## Core Components
//!
//! - **Data**: CSV loading into dated columns, sliding windows and batching
//! - **Predictor**: stacked LSTM with a linear head, trained with full BPTT
//! - **Training**: epoch loop with SGD, Adam or RMSprop and MSE/MAE losses
//! - **Persistence**: JSON or bincode export of a trained predictor
//! - **Analysis**: linear forecasts with RMSE/MAE and 12-month trend reports
//!
//! ## Quick Start
//!
//! ```rust
//! use trendcast::data::{DataLoader, SequenceDataset};
//! use trendcast::models::predictor::{PredictorConfig, RecurrentPredictor};
//! use trendcast::training::{create_basic_trainer, TrainingConfig};
//!
//! let series: Vec<f64> = (0..20).map(|i| (i as f64 * 0.3).sin()).collect();
//! let dataset = SequenceDataset::new(series, 4, 1).unwrap();
//! let mut loader = DataLoader::new(&dataset, 2).unwrap();
//!
//! let predictor = RecurrentPredictor::new(PredictorConfig::default()).unwrap();
//! let mut trainer = create_basic_trainer(predictor, 0.01).with_config(TrainingConfig {
//!     epochs: 5,
//!     ..TrainingConfig::default()
//! });
//! let history = trainer.train(&mut loader).unwrap();
//! assert_eq!(history.len(), 5);
//! ```

pub mod utils;
pub mod error;
pub mod config;
pub mod data;
pub mod layers;
pub mod models;
pub mod loss;
pub mod optimizers;
pub mod training;
pub mod persistence;
pub mod analysis;

// Re-export commonly used items
pub use error::{Error, Result};
pub use config::RunConfig;
pub use data::{DataLoader, SequenceDataset, TimeSeriesFrame, WindowBatch};
pub use models::lstm_network::LSTMNetwork;
pub use models::predictor::{PredictorConfig, RecurrentPredictor};
pub use layers::lstm_cell::LSTMCell;
pub use training::{Trainer, TrainingConfig};
pub use optimizers::{Adam, OptimizerKind, RMSprop, SGD};
pub use loss::{MAELoss, MSELoss};
pub use persistence::{ModelMetadata, ModelPersistence, PersistenceError, PersistentModel};
pub use analysis::{Forecaster, LinearTrendModel, TrendAnalyzer, TrendDirection};
