use crate::math::matrix::Matrix;
use crate::network::parameter::Parameter;
use crate::Result;

/// Adam hyperparameters. `weight_decay` is classic L2: it is added to the
/// gradient before the moment updates.
#[derive(Debug, Clone, Copy)]
pub struct AdamConfig {
    pub lr: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub eps: f64,
    pub weight_decay: f64,
}

impl AdamConfig {
    pub fn new(lr: f64, weight_decay: f64) -> AdamConfig {
        AdamConfig { lr, beta1: 0.9, beta2: 0.999, eps: 1e-8, weight_decay }
    }
}

pub struct Adam {
    pub config: AdamConfig,
    step: u64,
    // first and second moments, one pair per parameter in `parameters_mut` order
    moments: Vec<(Matrix, Matrix)>,
}

impl Adam {
    pub fn new(config: AdamConfig) -> Adam {
        Adam { config, step: 0, moments: Vec::new() }
    }

    pub fn steps_taken(&self) -> u64 {
        self.step
    }

    pub fn zero_grad(&self, params: Vec<&mut Parameter>) {
        for p in params {
            p.zero_grad();
        }
    }

    /// Applies one update to every parameter from its accumulated gradient.
    pub fn step(&mut self, params: Vec<&mut Parameter>) -> Result<()> {
        self.step += 1;
        let AdamConfig { lr, beta1, beta2, eps, weight_decay } = self.config;
        let bias1 = 1.0 - beta1.powi(self.step as i32);
        let bias2 = 1.0 - beta2.powi(self.step as i32);

        for (i, p) in params.into_iter().enumerate() {
            if p.grad.shape() != p.value.shape() {
                p.zero_grad();
            }
            if self.moments.len() <= i {
                let (r, c) = p.value.shape();
                self.moments.push((Matrix::zeros(r, c), Matrix::zeros(r, c)));
            }

            let grad = p.grad.zip_map(&p.value, |g, w| g + weight_decay * w)?;
            let (m, v) = &mut self.moments[i];
            *m = m.zip_map(&grad, |m, g| beta1 * m + (1.0 - beta1) * g)?;
            *v = v.zip_map(&grad, |v, g| beta2 * v + (1.0 - beta2) * g * g)?;

            let update = m.zip_map(v, |m, v| lr * (m / bias1) / ((v / bias2).sqrt() + eps))?;
            p.value = p.value.zip_map(&update, |w, u| w - u)?;
        }
        Ok(())
    }
}
