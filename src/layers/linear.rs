use ndarray::{Array2, Axis};
use ndarray_rand::RandomExt;
use rand_distr::Uniform;
use crate::error::{Error, Result};
use crate::optimizers::Optimizer;

/// Holds gradients for linear layer parameters during backpropagation
#[derive(Clone, Debug)]
pub struct LinearGradients {
    pub weight: Array2<f64>,
    pub bias: Array2<f64>,
}

/// Fully connected projection used as the predictor head.
///
/// Performs `output = weight · input + bias` on column batches, where weight has
/// shape (output_size, input_size) and bias has shape (output_size, 1).
#[derive(Clone, Debug)]
pub struct LinearLayer {
    pub weight: Array2<f64>,
    pub bias: Array2<f64>,
    pub input_size: usize,
    pub output_size: usize,
}

impl LinearLayer {
    /// Create a new linear layer with weights and bias drawn from U(-1/√in, 1/√in)
    pub fn new(input_size: usize, output_size: usize) -> Self {
        let bound = 1.0 / (input_size.max(1) as f64).sqrt();
        let dist = Uniform::new_inclusive(-bound, bound);

        Self {
            weight: Array2::random((output_size, input_size), dist),
            bias: Array2::random((output_size, 1), dist),
            input_size,
            output_size,
        }
    }

    /// Create a new linear layer with zero initialization
    pub fn new_zeros(input_size: usize, output_size: usize) -> Self {
        Self {
            weight: Array2::zeros((output_size, input_size)),
            bias: Array2::zeros((output_size, 1)),
            input_size,
            output_size,
        }
    }

    /// Create a layer from explicit parameters
    pub fn from_weights(weight: Array2<f64>, bias: Array2<f64>) -> Result<Self> {
        let (output_size, input_size) = weight.dim();
        if bias.shape() != [output_size, 1] {
            return Err(Error::shape(
                "linear bias",
                format!("({}, 1)", output_size),
                format!("{:?}", bias.shape()),
            ));
        }

        Ok(Self {
            weight,
            bias,
            input_size,
            output_size,
        })
    }

    /// Forward pass: `input` is (input_size, batch_size), output is (output_size, batch_size)
    pub fn forward(&self, input: &Array2<f64>) -> Result<Array2<f64>> {
        if input.nrows() != self.input_size {
            return Err(Error::shape(
                "linear forward",
                format!("{} input rows", self.input_size),
                format!("{} rows", input.nrows()),
            ));
        }
        Ok(&self.weight.dot(input) + &self.bias)
    }

    /// Backward pass given the input used in the forward pass.
    ///
    /// Returns (parameter_gradients, input_gradient).
    pub fn backward(&self, input: &Array2<f64>, grad_output: &Array2<f64>) -> (LinearGradients, Array2<f64>) {
        let gradients = LinearGradients {
            weight: grad_output.dot(&input.t()),
            bias: grad_output.sum_axis(Axis(1)).insert_axis(Axis(1)),
        };
        let input_grad = self.weight.t().dot(grad_output);

        (gradients, input_grad)
    }

    /// Update parameters using the provided optimizer
    pub fn update_parameters<O: Optimizer + ?Sized>(&mut self, gradients: &LinearGradients, optimizer: &mut O, prefix: &str) {
        optimizer.update(&format!("{}_weight", prefix), &mut self.weight, &gradients.weight);
        optimizer.update(&format!("{}_bias", prefix), &mut self.bias, &gradients.bias);
    }

    /// Get the number of parameters in this layer
    pub fn num_parameters(&self) -> usize {
        self.weight.len() + self.bias.len()
    }
}
