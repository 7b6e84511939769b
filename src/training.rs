use log::{debug, info};
use ndarray::{Array2, Array3};
use std::time::Instant;

use crate::data::loader::{DataLoader, WindowBatch};
use crate::error::{Error, Result};
use crate::loss::{LossFunction, MSELoss};
use crate::models::predictor::{PredictorGradients, RecurrentPredictor};
use crate::optimizers::{Adam, Optimizer};

/// Configuration for training hyperparameters
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub print_every: usize,
    pub clip_gradient: Option<f64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            epochs: 2000,
            print_every: 1,
            clip_gradient: None,
        }
    }
}

/// Training metrics tracked per epoch
#[derive(Debug, Clone)]
pub struct TrainingMetrics {
    pub epoch: usize,
    pub train_loss: f64,
    pub time_elapsed: f64,
}

/// One optimisation step on a single batch; returns the batch loss.
///
/// Gradients are computed fresh for every batch, so nothing accumulates
/// between steps.
pub fn train_batch<L, O>(
    batch: &WindowBatch,
    predictor: &mut RecurrentPredictor,
    optimizer: &mut O,
    loss_function: &L,
    clip_gradient: Option<f64>,
) -> Result<f64>
where
    L: LossFunction + ?Sized,
    O: Optimizer + ?Sized,
{
    let (predictions, cache) = predictor.forward_with_cache(&batch.inputs)?;
    if predictions.dim() != batch.targets.dim() {
        return Err(Error::shape(
            "loss",
            format!("{:?}", predictions.dim()),
            format!("{:?}", batch.targets.dim()),
        ));
    }

    let loss = loss_function.compute_loss(&predictions, &batch.targets);
    let d_output = loss_function.compute_gradient(&predictions, &batch.targets);

    let mut gradients = predictor.backward(&d_output, &cache)?;
    if let Some(max_norm) = clip_gradient {
        clip_gradients(&mut gradients, max_norm);
    }
    predictor.update_parameters(&gradients, optimizer);

    Ok(loss)
}

/// One pass over `batches`; returns the arithmetic mean of the per-batch losses.
pub fn train_epoch<'a, I, L, O>(
    batches: I,
    predictor: &mut RecurrentPredictor,
    optimizer: &mut O,
    loss_function: &L,
    clip_gradient: Option<f64>,
) -> Result<f64>
where
    I: IntoIterator<Item = &'a WindowBatch>,
    L: LossFunction + ?Sized,
    O: Optimizer + ?Sized,
{
    let mut total_loss = 0.0;
    let mut total_batches = 0usize;

    for batch in batches {
        total_loss += train_batch(batch, predictor, optimizer, loss_function, clip_gradient)?;
        total_batches += 1;
    }

    if total_batches == 0 {
        return Err(Error::InvalidConfiguration("cannot train on an empty batch set".to_string()));
    }

    Ok(total_loss / total_batches as f64)
}

/// Clip each gradient matrix to `max_norm` (Frobenius norm)
pub fn clip_gradients(gradients: &mut PredictorGradients, max_norm: f64) {
    for matrix in gradients.matrices_mut() {
        let norm = matrix.mapv(|x| x * x).sum().sqrt();
        if norm > max_norm {
            let scale = max_norm / norm;
            matrix.mapv_inplace(|x| x * scale);
        }
    }
}

/// Owns the predictor, loss and optimizer for a fixed-epoch training run
pub struct Trainer<L: LossFunction, O: Optimizer> {
    pub predictor: RecurrentPredictor,
    pub loss_function: L,
    pub optimizer: O,
    pub config: TrainingConfig,
    pub metrics_history: Vec<TrainingMetrics>,
}

impl<L: LossFunction, O: Optimizer> Trainer<L, O> {
    pub fn new(predictor: RecurrentPredictor, loss_function: L, optimizer: O) -> Self {
        Trainer {
            predictor,
            loss_function,
            optimizer,
            config: TrainingConfig::default(),
            metrics_history: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: TrainingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn train_epoch(&mut self, batches: &[WindowBatch]) -> Result<f64> {
        train_epoch(
            batches,
            &mut self.predictor,
            &mut self.optimizer,
            &self.loss_function,
            self.config.clip_gradient,
        )
    }

    /// Run `config.epochs` passes over the loader. No early stopping.
    pub fn train(&mut self, loader: &mut DataLoader<'_>) -> Result<&[TrainingMetrics]> {
        info!(
            "training for {} epochs, {} batches of up to {} windows",
            self.config.epochs,
            loader.num_batches(),
            loader.batch_size()
        );

        for epoch in 0..self.config.epochs {
            let start_time = Instant::now();
            let batches = loader.batches();
            let train_loss = self.train_epoch(&batches)?;
            let time_elapsed = start_time.elapsed().as_secs_f64();

            if self.config.print_every > 0 && epoch % self.config.print_every == 0 {
                info!("epoch {}: average loss: {}", epoch, train_loss);
            } else {
                debug!("epoch {}: average loss: {}", epoch, train_loss);
            }

            self.metrics_history.push(TrainingMetrics {
                epoch,
                train_loss,
                time_elapsed,
            });
        }

        info!("training completed");
        Ok(&self.metrics_history)
    }

    pub fn predict(&self, inputs: &Array3<f64>) -> Result<Array2<f64>> {
        self.predictor.forward(inputs)
    }

    pub fn get_latest_metrics(&self) -> Option<&TrainingMetrics> {
        self.metrics_history.last()
    }

    pub fn get_metrics_history(&self) -> &[TrainingMetrics] {
        &self.metrics_history
    }
}

/// Trainer with MSE loss and Adam, the defaults of the sample driver
pub fn create_basic_trainer(predictor: RecurrentPredictor, learning_rate: f64) -> Trainer<MSELoss, Adam> {
    Trainer::new(predictor, MSELoss, Adam::new(learning_rate))
}
