use std::fmt;

use crate::math::matrix::Matrix;
use crate::network::device::Device;
use crate::network::parameter::{Parameter, StateDict};
use crate::Result;

/// Training vs. evaluation behaviour (dropout and the like).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Eval,
}

/// The four feature outputs every model exposes next to its prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeatureKey {
    T,
    A,
    V,
    M,
}

impl FeatureKey {
    pub const ALL: [FeatureKey; 4] = [FeatureKey::T, FeatureKey::A, FeatureKey::V, FeatureKey::M];

    pub fn name(&self) -> &'static str {
        match self {
            FeatureKey::T => "Feature_T",
            FeatureKey::A => "Feature_A",
            FeatureKey::V => "Feature_V",
            FeatureKey::M => "Feature_M",
        }
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one forward pass.
///
/// `m` holds the class logits [batch, n_classes]; each feature is
/// [batch, feature_dim].
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutput {
    pub m: Matrix,
    pub feature_t: Matrix,
    pub feature_a: Matrix,
    pub feature_v: Matrix,
    pub feature_m: Matrix,
}

impl ModelOutput {
    pub fn feature(&self, key: FeatureKey) -> &Matrix {
        match key {
            FeatureKey::T => &self.feature_t,
            FeatureKey::A => &self.feature_a,
            FeatureKey::V => &self.feature_v,
            FeatureKey::M => &self.feature_m,
        }
    }
}

/// What the trainer needs from a text/audio/vision model.
///
/// There is no autograd: `forward` records what it needs while gradient
/// tracking is on, and `backward` consumes that record to accumulate
/// gradients into `parameters_mut`.
pub trait MultimodalModel {
    fn forward(&mut self, text: &Matrix, audio: &Matrix, vision: &Matrix) -> Result<ModelOutput>;

    /// Back-propagates ∂L/∂M from the most recent tracked `forward`.
    fn backward(&mut self, grad_m: &Matrix) -> Result<()>;

    fn set_mode(&mut self, mode: Mode);

    fn mode(&self) -> Mode;

    fn grad_enabled(&self) -> bool;

    fn set_grad_enabled(&mut self, enabled: bool);

    fn device(&self) -> Device;

    fn to_device(&mut self, device: Device);

    /// Trainable parameters in a stable order.
    fn parameters_mut(&mut self) -> Vec<&mut Parameter>;

    fn state_dict(&self) -> StateDict;

    fn load_state_dict(&mut self, state: &StateDict) -> Result<()>;
}
