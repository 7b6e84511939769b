use ndarray::Array2;
use crate::layers::lstm_cell::{LSTMCell, LSTMCellGradients, LSTMCellCache};
use crate::optimizers::Optimizer;

/// Cached values for one time step: one entry per layer
#[derive(Clone, Debug)]
pub struct LSTMNetworkCache {
    pub cell_caches: Vec<LSTMCellCache>,
}

/// Multi-layer LSTM network for sequence modeling
///
/// Stacks LSTM cells where the hidden output of layer i becomes the input of
/// layer i+1 at the same time step. Each layer carries its own hidden and cell
/// state across the time steps of a sequence.
#[derive(Clone, Debug)]
pub struct LSTMNetwork {
    cells: Vec<LSTMCell>,
    pub input_size: usize,
    pub hidden_size: usize,
    pub num_layers: usize,
}

impl LSTMNetwork {
    /// Creates a new multi-layer LSTM network
    ///
    /// First layer accepts `input_size` dimensions, subsequent layers
    /// accept `hidden_size` dimensions from the previous layer.
    pub fn new(input_size: usize, hidden_size: usize, num_layers: usize) -> Self {
        let cells = (0..num_layers)
            .map(|i| {
                let layer_input_size = if i == 0 { input_size } else { hidden_size };
                LSTMCell::new(layer_input_size, hidden_size)
            })
            .collect();

        LSTMNetwork {
            cells,
            input_size,
            hidden_size,
            num_layers,
        }
    }

    /// Creates a network from existing cells (used for deserialization)
    pub fn from_cells(cells: Vec<LSTMCell>, input_size: usize, hidden_size: usize) -> Self {
        let num_layers = cells.len();
        LSTMNetwork {
            cells,
            input_size,
            hidden_size,
            num_layers,
        }
    }

    /// Get reference to the cells (used for serialization)
    pub fn get_cells(&self) -> &[LSTMCell] {
        &self.cells
    }

    /// Zero hidden and cell state for every layer, `(hidden_size, batch_size)` each
    pub fn zero_state(&self, batch_size: usize) -> (Vec<Array2<f64>>, Vec<Array2<f64>>) {
        let zeros = vec![Array2::zeros((self.hidden_size, batch_size)); self.num_layers];
        (zeros.clone(), zeros)
    }

    /// One time step through all layers, updating `hx`/`cx` in place.
    ///
    /// Returns the top layer's hidden output and the per-layer caches.
    pub fn step_with_cache(&self, input: &Array2<f64>, hx: &mut [Array2<f64>], cx: &mut [Array2<f64>]) -> (Array2<f64>, LSTMNetworkCache) {
        let mut current_input = input.clone();
        let mut cell_caches = Vec::with_capacity(self.num_layers);

        for (layer, cell) in self.cells.iter().enumerate() {
            let (new_hx, new_cx, cache) = cell.forward_with_cache(&current_input, &hx[layer], &cx[layer]);
            cell_caches.push(cache);

            current_input = new_hx.clone();
            hx[layer] = new_hx;
            cx[layer] = new_cx;
        }

        (current_input, LSTMNetworkCache { cell_caches })
    }

    /// Process a whole sequence starting from zero state.
    ///
    /// Returns the top layer's hidden output at the last step and the caches
    /// for every step.
    pub fn forward_sequence_with_cache(&self, sequence: &[Array2<f64>]) -> (Array2<f64>, Vec<LSTMNetworkCache>) {
        let batch_size = sequence.first().map(|x| x.ncols()).unwrap_or(1);
        let (mut hx, mut cx) = self.zero_state(batch_size);
        let mut last = Array2::zeros((self.hidden_size, batch_size));
        let mut caches = Vec::with_capacity(sequence.len());

        for input in sequence {
            let (top, cache) = self.step_with_cache(input, &mut hx, &mut cx);
            caches.push(cache);
            last = top;
        }

        (last, caches)
    }

    /// Backpropagation through time for a loss that depends only on the top
    /// layer's hidden output at the final step.
    ///
    /// Gradients are summed over all time steps and batch columns.
    pub fn backward_sequence(&self, d_last: &Array2<f64>, caches: &[LSTMNetworkCache]) -> Vec<LSTMCellGradients> {
        let mut gradients = self.zero_gradients();
        let batch_size = d_last.ncols();
        let (mut dh_next, mut dc_next) = self.zero_state(batch_size);

        if let Some(top) = dh_next.last_mut() {
            *top += d_last;
        }

        for step_cache in caches.iter().rev() {
            let mut dx_from_above: Option<Array2<f64>> = None;

            for (layer, cell) in self.cells.iter().enumerate().rev() {
                let dh = match dx_from_above.take() {
                    Some(dx) => &dh_next[layer] + &dx,
                    None => dh_next[layer].clone(),
                };

                let (cell_gradients, dx, dhx, dcx) = cell.backward(&dh, &dc_next[layer], &step_cache.cell_caches[layer]);
                gradients[layer].accumulate(&cell_gradients);

                dh_next[layer] = dhx;
                dc_next[layer] = dcx;
                dx_from_above = Some(dx);
            }
        }

        gradients
    }

    /// Update parameters for all layers using computed gradients
    pub fn update_parameters<O: Optimizer + ?Sized>(&mut self, gradients: &[LSTMCellGradients], optimizer: &mut O) {
        for (i, (cell, cell_gradients)) in self.cells.iter_mut().zip(gradients.iter()).enumerate() {
            let prefix = format!("layer_{}", i);
            cell.update_parameters(cell_gradients, optimizer, &prefix);
        }
    }

    /// Initialize zero gradients for all layers
    pub fn zero_gradients(&self) -> Vec<LSTMCellGradients> {
        self.cells.iter().map(|cell| cell.zero_gradients()).collect()
    }

    pub fn num_parameters(&self) -> usize {
        self.cells.iter().map(LSTMCell::num_parameters).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    fn sequence() -> Vec<Array2<f64>> {
        vec![
            arr2(&[[0.5, -0.2]]),
            arr2(&[[0.1, 0.4]]),
            arr2(&[[-0.3, 0.9]]),
        ]
    }

    #[test]
    fn test_lstm_network_step() {
        let network = LSTMNetwork::new(3, 2, 2);
        let (mut hx, mut cx) = network.zero_state(1);

        let input = arr2(&[[0.5], [0.1], [-0.3]]);
        let (top, cache) = network.step_with_cache(&input, &mut hx, &mut cx);

        assert_eq!(top.shape(), &[2, 1]);
        assert_eq!(cache.cell_caches.len(), 2);
        assert_eq!(hx[1], top);
    }

    #[test]
    fn test_forward_sequence_caches_every_step() {
        let network = LSTMNetwork::new(1, 4, 2);
        let (last, caches) = network.forward_sequence_with_cache(&sequence());

        assert_eq!(last.shape(), &[4, 2]);
        assert_eq!(caches.len(), 3);
        // first step always starts from zero state
        assert!(caches[0].cell_caches.iter().all(|c| c.hx.iter().all(|&v| v == 0.0)));
    }

    #[test]
    fn test_backward_sequence_matches_finite_difference() {
        let network = LSTMNetwork::new(1, 3, 2);
        let seq = sequence();
        let (last, caches) = network.forward_sequence_with_cache(&seq);
        let gradients = network.backward_sequence(&Array2::ones(last.raw_dim()), &caches);

        let eps = 1e-6;
        for layer in 0..2 {
            for &(r, c) in &[(0, 0), (4, 1), (9, 2)] {
                let mut plus = network.clone();
                plus.cells[layer].w_hh[[r, c]] += eps;
                let mut minus = network.clone();
                minus.cells[layer].w_hh[[r, c]] -= eps;

                let numeric = (plus.forward_sequence_with_cache(&seq).0.sum()
                    - minus.forward_sequence_with_cache(&seq).0.sum())
                    / (2.0 * eps);
                assert!((numeric - gradients[layer].w_hh[[r, c]]).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_from_cells_counts_layers() {
        let original = LSTMNetwork::new(1, 2, 3);
        let rebuilt = LSTMNetwork::from_cells(original.get_cells().to_vec(), 1, 2);
        assert_eq!(rebuilt.num_layers, 3);
        assert_eq!(rebuilt.num_parameters(), original.num_parameters());
    }
}
