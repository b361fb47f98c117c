use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::Result;

/// Architecture of an `EarlyFusion` model.
///
/// Fields:
/// - `text_dim` / `audio_dim` / `vision_dim` — per-sample input width of each modality
/// - `text_hidden` / `audio_hidden` / `vision_hidden` — width of Feature_T/A/V
/// - `fusion_hidden` — width of Feature_M
/// - `num_classes`   — width of the M logits
/// - `dropout`       — drop probability on the fused features (train mode only)
/// - `seed`          — drives weight initialisation and the dropout masks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionSpec {
    pub text_dim: usize,
    pub audio_dim: usize,
    pub vision_dim: usize,
    pub text_hidden: usize,
    pub audio_hidden: usize,
    pub vision_hidden: usize,
    pub fusion_hidden: usize,
    pub num_classes: usize,
    #[serde(default)]
    pub dropout: f64,
    #[serde(default)]
    pub activation: ActivationFunction,
    #[serde(default)]
    pub seed: u64,
}

impl FusionSpec {
    /// Same hidden width for every branch.
    pub fn uniform(
        text_dim: usize,
        audio_dim: usize,
        vision_dim: usize,
        hidden: usize,
        num_classes: usize,
    ) -> FusionSpec {
        FusionSpec {
            text_dim,
            audio_dim,
            vision_dim,
            text_hidden: hidden,
            audio_hidden: hidden,
            vision_hidden: hidden,
            fusion_hidden: hidden,
            num_classes,
            dropout: 0.0,
            activation: ActivationFunction::ReLU,
            seed: 0,
        }
    }

    /// Serializes the spec to a pretty-printed JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<FusionSpec> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
