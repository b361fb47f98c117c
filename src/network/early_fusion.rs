use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::activation::activation::ActivationFunction;
use crate::layers::dense::Dense;
use crate::math::matrix::Matrix;
use crate::network::device::Device;
use crate::network::model::{Mode, ModelOutput, MultimodalModel};
use crate::network::parameter::{Parameter, StateDict};
use crate::network::spec::FusionSpec;
use crate::{Result, TrainError};

/// Early-fusion classifier.
///
/// ```text
/// text   -> Dense -> Feature_T ┐
/// audio  -> Dense -> Feature_A ├─ concat -> dropout -> Dense -> Feature_M -> linear -> M
/// vision -> Dense -> Feature_V ┘
/// ```
pub struct EarlyFusion {
    spec: FusionSpec,
    text: Dense,
    audio: Dense,
    vision: Dense,
    fusion: Dense,
    head: Dense,
    mode: Mode,
    grad_enabled: bool,
    device: Device,
    rng: StdRng,
    dropout_mask: Option<Matrix>,
}

impl EarlyFusion {
    pub fn new(spec: FusionSpec) -> Result<EarlyFusion> {
        let widths = [
            spec.text_dim, spec.audio_dim, spec.vision_dim,
            spec.text_hidden, spec.audio_hidden, spec.vision_hidden,
            spec.fusion_hidden, spec.num_classes,
        ];
        if widths.contains(&0) {
            return Err(TrainError::Config(format!("fusion spec has a zero width: {:?}", spec)));
        }
        if !(0.0..1.0).contains(&spec.dropout) {
            return Err(TrainError::Config(format!("dropout {} outside [0, 1)", spec.dropout)));
        }

        let mut rng = StdRng::seed_from_u64(spec.seed);
        let act = spec.activation;
        let text = Dense::new(spec.text_hidden, spec.text_dim, act, &mut rng);
        let audio = Dense::new(spec.audio_hidden, spec.audio_dim, act, &mut rng);
        let vision = Dense::new(spec.vision_hidden, spec.vision_dim, act, &mut rng);
        let fused_width = spec.text_hidden + spec.audio_hidden + spec.vision_hidden;
        let fusion = Dense::new(spec.fusion_hidden, fused_width, act, &mut rng);
        let head = Dense::new(spec.num_classes, spec.fusion_hidden, ActivationFunction::Identity, &mut rng);

        Ok(EarlyFusion {
            spec,
            text,
            audio,
            vision,
            fusion,
            head,
            mode: Mode::Train,
            grad_enabled: true,
            device: Device::Cpu,
            rng,
            dropout_mask: None,
        })
    }

    pub fn spec(&self) -> &FusionSpec {
        &self.spec
    }

    fn check_inputs(&self, text: &Matrix, audio: &Matrix, vision: &Matrix) -> Result<()> {
        let n = text.rows;
        text.expect_shape((n, self.spec.text_dim), "text input")?;
        audio.expect_shape((n, self.spec.audio_dim), "audio input")?;
        vision.expect_shape((n, self.spec.vision_dim), "vision input")?;
        Ok(())
    }

    // inverted dropout: kept units are scaled by 1/(1-p)
    fn sample_mask(&mut self, rows: usize, cols: usize) -> Matrix {
        let p = self.spec.dropout;
        let keep = 1.0 / (1.0 - p);
        let mut mask = Matrix::zeros(rows, cols);
        for row in mask.data.iter_mut() {
            for x in row.iter_mut() {
                *x = if self.rng.gen::<f64>() < p { 0.0 } else { keep };
            }
        }
        mask
    }
}

impl MultimodalModel for EarlyFusion {
    fn forward(&mut self, text: &Matrix, audio: &Matrix, vision: &Matrix) -> Result<ModelOutput> {
        self.check_inputs(text, audio, vision)?;
        let track = self.grad_enabled;
        self.dropout_mask = None;

        let feature_t = self.text.forward(text, track)?;
        let feature_a = self.audio.forward(audio, track)?;
        let feature_v = self.vision.forward(vision, track)?;

        let mut fused = Matrix::concat_cols(&[&feature_t, &feature_a, &feature_v])?;
        if self.mode == Mode::Train && self.spec.dropout > 0.0 {
            let mask = self.sample_mask(fused.rows, fused.cols);
            fused = fused.hadamard(&mask)?;
            if track {
                self.dropout_mask = Some(mask);
            }
        }

        let feature_m = self.fusion.forward(&fused, track)?;
        let m = self.head.forward(&feature_m, track)?;

        Ok(ModelOutput { m, feature_t, feature_a, feature_v, feature_m })
    }

    fn backward(&mut self, grad_m: &Matrix) -> Result<()> {
        let grad_feature_m = self.head.backward(grad_m)?;
        let mut grad_fused = self.fusion.backward(&grad_feature_m)?;
        if let Some(mask) = self.dropout_mask.take() {
            grad_fused = grad_fused.hadamard(&mask)?;
        }

        let parts = grad_fused.split_cols(&[
            self.spec.text_hidden,
            self.spec.audio_hidden,
            self.spec.vision_hidden,
        ])?;
        self.text.backward(&parts[0])?;
        self.audio.backward(&parts[1])?;
        self.vision.backward(&parts[2])?;
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
        log::debug!("early fusion: {} -> {}", self.device, device);
        self.device = device;
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        let mut params = Vec::with_capacity(10);
        params.extend(self.text.parameters_mut());
        params.extend(self.audio.parameters_mut());
        params.extend(self.vision.parameters_mut());
        params.extend(self.fusion.parameters_mut());
        params.extend(self.head.parameters_mut());
        params
    }

    fn state_dict(&self) -> StateDict {
        let mut state = StateDict::new();
        self.text.export("text", &mut state);
        self.audio.export("audio", &mut state);
        self.vision.export("vision", &mut state);
        self.fusion.export("fusion", &mut state);
        self.head.export("head", &mut state);
        state
    }

    fn load_state_dict(&mut self, state: &StateDict) -> Result<()> {
        self.text.import("text", state)?;
        self.audio.import("audio", state)?;
        self.vision.import("vision", state)?;
        self.fusion.import("fusion", state)?;
        self.head.import("head", state)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loss::cross_entropy::CrossEntropyLoss;

    fn spec() -> FusionSpec {
        let mut spec = FusionSpec::uniform(3, 2, 4, 5, 3);
        spec.activation = ActivationFunction::Tanh;
        spec.seed = 11;
        spec
    }

    fn inputs() -> (Matrix, Matrix, Matrix) {
        (
            Matrix::from_data(vec![vec![0.1, -0.4, 0.9], vec![0.5, 0.2, -0.3]]),
            Matrix::from_data(vec![vec![1.0, -1.0], vec![0.3, 0.7]]),
            Matrix::from_data(vec![vec![0.2, 0.0, -0.6, 0.4], vec![-0.1, 0.8, 0.5, -0.2]]),
        )
    }

    fn loss_of(model: &mut EarlyFusion, labels: &[usize]) -> f64 {
        let (t, a, v) = inputs();
        let out = model.forward(&t, &a, &v).unwrap();
        CrossEntropyLoss::forward(&out.m, labels).unwrap()
    }

    #[test]
    fn output_shapes_follow_spec() {
        let mut model = EarlyFusion::new(spec()).unwrap();
        let (t, a, v) = inputs();
        let out = model.forward(&t, &a, &v).unwrap();
        assert_eq!(out.m.shape(), (2, 3));
        assert_eq!(out.feature_t.shape(), (2, 5));
        assert_eq!(out.feature_m.shape(), (2, 5));
    }

    #[test]
    fn rejects_mismatched_batch() {
        let mut model = EarlyFusion::new(spec()).unwrap();
        let (t, a, _) = inputs();
        let v = Matrix::zeros(3, 4);
        assert!(matches!(model.forward(&t, &a, &v), Err(TrainError::Shape(_))));
    }

    #[test]
    fn backward_matches_finite_differences() {
        let labels = [2, 0];
        let mut model = EarlyFusion::new(spec()).unwrap();
        let (t, a, v) = inputs();
        let out = model.forward(&t, &a, &v).unwrap();
        let grad = CrossEntropyLoss::backward(&out.m, &labels).unwrap();
        model.backward(&grad).unwrap();

        let analytic: Vec<Matrix> = model.parameters_mut().into_iter().map(|p| p.grad.clone()).collect();
        let h = 1e-6;
        for (idx, expected) in analytic.iter().enumerate() {
            for (i, j) in [(0, 0), (expected.rows - 1, expected.cols - 1)] {
                model.parameters_mut()[idx].value.data[i][j] += h;
                let plus = loss_of(&mut model, &labels);
                model.parameters_mut()[idx].value.data[i][j] -= 2.0 * h;
                let minus = loss_of(&mut model, &labels);
                model.parameters_mut()[idx].value.data[i][j] += h;
                let numeric = (plus - minus) / (2.0 * h);
                assert!(
                    (numeric - expected.data[i][j]).abs() < 1e-5,
                    "param {} [{}, {}]: numeric {} vs analytic {}",
                    idx, i, j, numeric, expected.data[i][j]
                );
            }
        }
    }

    #[test]
    fn untracked_forward_cannot_backpropagate() {
        let mut model = EarlyFusion::new(spec()).unwrap();
        model.set_grad_enabled(false);
        let (t, a, v) = inputs();
        let out = model.forward(&t, &a, &v).unwrap();
        assert!(model.backward(&out.m).is_err());
    }

    #[test]
    fn eval_mode_ignores_dropout() {
        let mut s = spec();
        s.dropout = 0.5;
        let mut model = EarlyFusion::new(s).unwrap();
        model.set_mode(Mode::Eval);
        let (t, a, v) = inputs();
        let first = model.forward(&t, &a, &v).unwrap();
        let second = model.forward(&t, &a, &v).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn state_dict_round_trips_into_fresh_model() {
        let source = EarlyFusion::new(spec()).unwrap();
        let mut other = spec();
        other.seed = 99;
        let mut target = EarlyFusion::new(other).unwrap();
        assert_ne!(source.state_dict(), target.state_dict());
        target.load_state_dict(&source.state_dict()).unwrap();
        assert_eq!(source.state_dict(), target.state_dict());
    }
}
