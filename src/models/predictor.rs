use ndarray::{Array2, Array3, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::layers::linear::{LinearGradients, LinearLayer};
use crate::layers::lstm_cell::LSTMCellGradients;
use crate::models::lstm_network::{LSTMNetwork, LSTMNetworkCache};
use crate::optimizers::Optimizer;

/// Shape of a [`RecurrentPredictor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictorConfig {
    pub input_size: usize,
    pub hidden_size: usize,
    pub num_layers: usize,
    pub output_size: usize,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        PredictorConfig {
            input_size: 1,
            hidden_size: 2,
            num_layers: 2,
            output_size: 1,
        }
    }
}

/// Values kept from a forward pass for the backward pass
#[derive(Clone, Debug)]
pub struct PredictorCache {
    pub steps: Vec<LSTMNetworkCache>,
    pub last_hidden: Array2<f64>,
}

#[derive(Clone, Debug)]
pub struct PredictorGradients {
    pub layers: Vec<LSTMCellGradients>,
    pub head: LinearGradients,
}

impl PredictorGradients {
    /// Every gradient matrix, recurrent layers first
    pub fn matrices_mut(&mut self) -> Vec<&mut Array2<f64>> {
        let mut out: Vec<&mut Array2<f64>> = Vec::new();
        for layer in self.layers.iter_mut() {
            out.extend(layer.matrices_mut());
        }
        out.push(&mut self.head.weight);
        out.push(&mut self.head.bias);
        out
    }
}

/// Stacked LSTM followed by a linear projection.
///
/// Maps a batch of windows `(batch, sequence_length, input_size)` to
/// `(batch, output_size)`. Hidden and cell state start at zero on every call,
/// so nothing is carried between windows or batches. The projection reads the
/// final layer's hidden state after the last time step.
#[derive(Clone, Debug)]
pub struct RecurrentPredictor {
    config: PredictorConfig,
    network: LSTMNetwork,
    head: LinearLayer,
}

impl RecurrentPredictor {
    pub fn new(config: PredictorConfig) -> Result<Self> {
        let PredictorConfig { input_size, hidden_size, num_layers, output_size } = config;
        if input_size == 0 || hidden_size == 0 || num_layers == 0 || output_size == 0 {
            return Err(Error::InvalidConfiguration(format!(
                "predictor sizes must be positive, got {:?}",
                config
            )));
        }

        Ok(RecurrentPredictor {
            config,
            network: LSTMNetwork::new(input_size, hidden_size, num_layers),
            head: LinearLayer::new(hidden_size, output_size),
        })
    }

    /// Reassemble a predictor from trained parts (used when loading a saved model)
    pub fn from_parts(network: LSTMNetwork, head: LinearLayer) -> Result<Self> {
        if head.input_size != network.hidden_size {
            return Err(Error::shape(
                "predictor head",
                format!("{} inputs", network.hidden_size),
                format!("{} inputs", head.input_size),
            ));
        }
        let config = PredictorConfig {
            input_size: network.input_size,
            hidden_size: network.hidden_size,
            num_layers: network.num_layers,
            output_size: head.output_size,
        };
        Ok(RecurrentPredictor { config, network, head })
    }

    pub fn config(&self) -> PredictorConfig {
        self.config
    }

    pub fn network(&self) -> &LSTMNetwork {
        &self.network
    }

    pub fn head(&self) -> &LinearLayer {
        &self.head
    }

    pub fn num_parameters(&self) -> usize {
        self.network.num_parameters() + self.head.num_parameters()
    }

    pub fn forward(&self, batch: &Array3<f64>) -> Result<Array2<f64>> {
        self.forward_with_cache(batch).map(|(prediction, _)| prediction)
    }

    pub fn forward_with_cache(&self, batch: &Array3<f64>) -> Result<(Array2<f64>, PredictorCache)> {
        let (batch_size, sequence_length, features) = batch.dim();
        if batch_size == 0 || sequence_length == 0 || features != self.config.input_size {
            return Err(Error::shape(
                "predictor forward",
                format!("(B >= 1, sequence_length >= 1, {})", self.config.input_size),
                format!("{:?}", batch.shape()),
            ));
        }

        // cells take (features, batch) columns per time step
        let sequence: Vec<Array2<f64>> = batch
            .axis_iter(Axis(1))
            .map(|step| step.t().to_owned())
            .collect();

        let (last_hidden, steps) = self.network.forward_sequence_with_cache(&sequence);
        let projected = self.head.forward(&last_hidden)?;

        Ok((projected.t().to_owned(), PredictorCache { steps, last_hidden }))
    }

    /// Gradients of the loss given `d_output`, shaped like the forward output `(batch, output_size)`
    pub fn backward(&self, d_output: &Array2<f64>, cache: &PredictorCache) -> Result<PredictorGradients> {
        let expected = (cache.last_hidden.ncols(), self.config.output_size);
        if d_output.dim() != expected {
            return Err(Error::shape(
                "predictor backward",
                format!("{:?}", expected),
                format!("{:?}", d_output.dim()),
            ));
        }

        let d_projected = d_output.t().to_owned();
        let (head, d_last) = self.head.backward(&cache.last_hidden, &d_projected);
        let layers = self.network.backward_sequence(&d_last, &cache.steps);

        Ok(PredictorGradients { layers, head })
    }

    pub fn update_parameters<O: Optimizer + ?Sized>(&mut self, gradients: &PredictorGradients, optimizer: &mut O) {
        self.network.update_parameters(&gradients.layers, optimizer);
        self.head.update_parameters(&gradients.head, optimizer, "head");
    }
}
