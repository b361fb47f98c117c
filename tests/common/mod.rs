#![allow(dead_code)]

use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use ferrite_mmsa::data::PRIMARY_TASK;
use ferrite_mmsa::network::{Parameter, StateDict};
use ferrite_mmsa::{
    Batch, Device, InMemoryDataSource, Matrix, MetricMap, MetricsProvider, Mode, ModelOutput,
    MultimodalModel, Result, Sample, ScoreFn, TrainConfig,
};

/// Marker in `text[0][0]` telling `ScriptedModel` which split a batch is from.
pub const TRAIN: f64 = 0.0;
pub const VALID: f64 = 1.0;
pub const TEST: f64 = 2.0;

pub fn marked_batch(split_marker: f64, n: usize, first_id: usize) -> Batch {
    Batch {
        vision: Matrix::zeros(n, 1),
        audio: Matrix::zeros(n, 1),
        text: Matrix::from_data(vec![vec![split_marker]; n]),
        ids: (first_id..first_id + n).map(|i| format!("id{}", i)).collect(),
        labels: BTreeMap::from([(PRIMARY_TASK.to_string(), vec![0.0; n])]),
    }
}

/// One batch per split, each tagged for `ScriptedModel`.
pub fn marked_source() -> InMemoryDataSource {
    InMemoryDataSource::new(
        vec![marked_batch(TRAIN, 2, 0)],
        vec![marked_batch(VALID, 2, 10)],
        vec![marked_batch(TEST, 2, 20)],
    )
}

/// Two-class model whose validation loss follows a script (one entry per
/// epoch, label 0 everywhere). Training steps are counted in a `steps`
/// buffer that ends up in the state dict, so a snapshot tells which epoch
/// it came from.
pub struct ScriptedModel {
    pub valid_losses: Vec<f64>,
    pub steps: usize,
    pub devices_seen: Vec<Device>,
    valid_calls: usize,
    weight: Parameter,
    mode: Mode,
    grad_enabled: bool,
    device: Device,
}

impl ScriptedModel {
    pub fn new(valid_losses: Vec<f64>) -> Self {
        ScriptedModel {
            valid_losses,
            steps: 0,
            devices_seen: Vec::new(),
            valid_calls: 0,
            weight: Parameter::new(Matrix::zeros(1, 1)),
            mode: Mode::Train,
            grad_enabled: true,
            device: Device::Cpu,
        }
    }

    /// Logit for class 0 such that cross-entropy against class 0 is `loss`.
    fn logit_for_loss(loss: f64) -> f64 {
        -(loss.exp() - 1.0).ln()
    }
}

impl MultimodalModel for ScriptedModel {
    fn forward(&mut self, text: &Matrix, _audio: &Matrix, _vision: &Matrix) -> Result<ModelOutput> {
        let n = text.rows;
        let marker = text.data[0][0];
        let a = if marker == VALID {
            let idx = self.valid_calls.min(self.valid_losses.len() - 1);
            self.valid_calls += 1;
            Self::logit_for_loss(self.valid_losses[idx])
        } else {
            if marker == TRAIN && self.mode == Mode::Train {
                self.steps += 1;
            }
            0.0
        };
        let features = Matrix::zeros(n, 2);
        Ok(ModelOutput {
            m: Matrix::from_data(vec![vec![a, 0.0]; n]),
            feature_t: features.clone(),
            feature_a: features.clone(),
            feature_v: features.clone(),
            feature_m: features,
        })
    }

    fn backward(&mut self, grad_m: &Matrix) -> Result<()> {
        assert!(self.grad_enabled, "backward with gradient tracking off");
        assert_eq!(grad_m.cols, 2);
        Ok(())
    }

    fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    fn mode(&self) -> Mode {
        self.mode
    }

    fn grad_enabled(&self) -> bool {
        self.grad_enabled
    }

    fn set_grad_enabled(&mut self, enabled: bool) {
        self.grad_enabled = enabled;
    }

    fn device(&self) -> Device {
        self.device
    }

    fn to_device(&mut self, device: Device) {
        self.devices_seen.push(device);
        self.device = device;
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        vec![&mut self.weight]
    }

    fn state_dict(&self) -> StateDict {
        let mut state = StateDict::new();
        state.insert("weight", self.weight.value.clone());
        state.insert("steps", Matrix::from_data(vec![vec![self.steps as f64]]));
        state.insert("on_host", Matrix::from_data(vec![vec![self.device.is_cpu() as u8 as f64]]));
        state
    }

    fn load_state_dict(&mut self, state: &StateDict) -> Result<()> {
        self.weight.value = state.take_like("weight", &self.weight.value)?;
        Ok(())
    }
}

/// Provider whose scoring function reports `metric` from a script on every
/// validation call. The trainer scores train, valid, test in that order each
/// epoch, so every third call (offset 1) is validation.
pub struct ScriptedMetrics {
    pub metric: &'static str,
    pub values: Vec<f64>,
}

impl MetricsProvider for ScriptedMetrics {
    fn get_metrics(&self, _dataset_name: &str) -> Result<ScoreFn> {
        let calls = Rc::new(Cell::new(0usize));
        let metric = self.metric;
        let values = self.values.clone();
        Ok(Box::new(move |_pred: &Matrix, _truth: &[usize]| -> Result<MetricMap> {
            let k = calls.get();
            calls.set(k + 1);
            let epoch = k / 3;
            let value = if k % 3 == 1 { values[epoch.min(values.len() - 1)] } else { 0.0 };
            Ok([(metric, value)].into_iter().collect::<MetricMap>())
        }))
    }
}

pub fn config(dir: &std::path::Path, key_eval: &str, early_stop: usize) -> TrainConfig {
    let mut config = TrainConfig::new("scripted", "mosi", dir.join("best.json"));
    config.key_eval = key_eval.to_string();
    config.early_stop = early_stop;
    config
}

/// Linearly separable three-class samples; the class sets the sign pattern
/// of every modality.
pub fn separable_samples(prefix: &str, n: usize) -> Vec<Sample> {
    shifted_samples(prefix, n, 0)
}

/// Like `separable_samples`, but each label is `(class + shift) % 3`. With a
/// non-zero shift the loss on these samples grows as the model learns the
/// unshifted mapping.
pub fn shifted_samples(prefix: &str, n: usize, shift: usize) -> Vec<Sample> {
    (0..n)
        .map(|i| {
            let class = i % 3;
            let signal = |width: usize, jitter: f64| -> Vec<f64> {
                (0..width)
                    .map(|j| {
                        let base = if j % 3 == class { 1.0 } else { -1.0 };
                        base + jitter * (((i * 7 + j * 3) % 5) as f64 - 2.0) / 10.0
                    })
                    .collect()
            };
            Sample {
                id: format!("{}_{}", prefix, i),
                text: signal(6, 0.5),
                audio: signal(3, 0.5),
                vision: signal(3, 1.0),
                label: ((class + shift) % 3) as f64,
            }
        })
        .collect()
}
