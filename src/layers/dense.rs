use rand::Rng;

use crate::{activation::activation::ActivationFunction, math::matrix::Matrix};
use crate::network::parameter::{Parameter, StateDict};
use crate::{Result, TrainError};

/// Fully connected layer over a batch: `a = f(x·W + b)`.
#[derive(Debug, Clone)]
pub struct Dense {
    pub size: usize,
    pub weights: Parameter,
    pub biases: Parameter,
    pub activator: ActivationFunction,
    // (input, pre-activation) from the last forward pass that kept a cache
    cache: Option<(Matrix, Matrix)>,
}

impl Dense {
    pub fn new<R: Rng + ?Sized>(
        size: usize,
        input_size: usize,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Dense {
        let weights = match activation {
            ActivationFunction::ReLU
            | ActivationFunction::LeakyReLU { .. }
            | ActivationFunction::Gelu => Matrix::he_with(input_size, size, rng),
            _ => Matrix::xavier_with(input_size, size, rng),
        };

        Dense {
            size,
            weights: Parameter::new(weights),
            biases: Parameter::new(Matrix::zeros(1, size)),
            activator: activation,
            cache: None,
        }
    }

    /// Forward pass. With `keep_cache` the input and pre-activation are held
    /// for the next `backward`; without it any previous cache is dropped.
    pub fn forward(&mut self, input: &Matrix, keep_cache: bool) -> Result<Matrix> {
        let z = input.matmul(&self.weights.value)?.add_row(&self.biases.value)?;
        let a = self.activator.apply(&z);
        self.cache = if keep_cache { Some((input.clone(), z)) } else { None };
        Ok(a)
    }

    /// Accumulates ∂L/∂W and ∂L/∂b from `grad_out` (∂L/∂a for this layer) and
    /// returns ∂L/∂x for the layer below.
    pub fn backward(&mut self, grad_out: &Matrix) -> Result<Matrix> {
        let (input, z) = self.cache.take().ok_or_else(|| {
            TrainError::Shape("backward called without a cached forward pass".to_string())
        })?;
        // δ = error ⊙ σ'(z)
        let delta = grad_out.hadamard(&self.activator.apply_derivative(&z))?;

        self.weights.accumulate(&input.transpose().matmul(&delta)?)?;
        self.biases.accumulate(&delta.sum_rows())?;

        delta.matmul(&self.weights.value.transpose())
    }

    pub fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        vec![&mut self.weights, &mut self.biases]
    }

    pub fn export(&self, prefix: &str, state: &mut StateDict) {
        state.insert(format!("{}.weight", prefix), self.weights.value.clone());
        state.insert(format!("{}.bias", prefix), self.biases.value.clone());
    }

    pub fn import(&mut self, prefix: &str, state: &StateDict) -> Result<()> {
        let w = state.take_like(&format!("{}.weight", prefix), &self.weights.value)?;
        let b = state.take_like(&format!("{}.bias", prefix), &self.biases.value)?;
        self.weights.value = w;
        self.biases.value = b;
        Ok(())
    }
}
