use ndarray::{Array2, Array3};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data::dataset::SequenceDataset;
use crate::error::{Error, Result};

/// A stack of windows ready for the predictor
#[derive(Debug, Clone, PartialEq)]
pub struct WindowBatch {
    /// (batch, sequence_length, 1)
    pub inputs: Array3<f64>,
    /// (batch, 1)
    pub targets: Array2<f64>,
}

impl WindowBatch {
    pub fn len(&self) -> usize {
        self.targets.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Groups dataset windows into batches.
///
/// Windows are visited in order unless a shuffle seed is set, in which case a
/// new permutation is drawn for every pass. The last batch may be smaller than
/// `batch_size`.
pub struct DataLoader<'a> {
    dataset: &'a SequenceDataset,
    batch_size: usize,
    rng: Option<StdRng>,
}

impl<'a> DataLoader<'a> {
    pub fn new(dataset: &'a SequenceDataset, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::InvalidConfiguration("batch_size must be at least 1".to_string()));
        }
        Ok(DataLoader {
            dataset,
            batch_size,
            rng: None,
        })
    }

    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.rng = Some(StdRng::seed_from_u64(seed));
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn num_batches(&self) -> usize {
        (self.dataset.len() + self.batch_size - 1) / self.batch_size
    }

    /// Materialise the batches of one pass over the dataset
    pub fn batches(&mut self) -> Vec<WindowBatch> {
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();
        if let Some(rng) = self.rng.as_mut() {
            order.shuffle(rng);
        }

        order.chunks(self.batch_size).map(|chunk| self.collate(chunk)).collect()
    }

    fn collate(&self, indices: &[usize]) -> WindowBatch {
        let sequence_length = self.dataset.sequence_length();
        let mut inputs = Array3::zeros((indices.len(), sequence_length, 1));
        let mut targets = Array2::zeros((indices.len(), 1));

        for (row, window) in indices.iter().filter_map(|&i| self.dataset.get(i)).enumerate() {
            for (t, &value) in window.input.iter().enumerate() {
                inputs[[row, t, 0]] = value;
            }
            targets[[row, 0]] = window.target;
        }

        WindowBatch { inputs, targets }
    }
}
