use std::ops::{Index, IndexMut};
use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::data::source::Split;
use crate::math::matrix::Matrix;
use crate::metrics::MetricMap;
use crate::network::model::FeatureKey;
use crate::Result;

/// Metrics for one split after one epoch. Always contains `"Loss"`.
///
/// `details` is only filled by evaluations that asked for per-sample output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochResult {
    pub metrics: MetricMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<SampleDetails>,
}

impl EpochResult {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.metrics.get(name)
    }

    pub fn loss(&self) -> Option<f64> {
        self.metrics.get("Loss")
    }
}

/// Per-sample diagnostics, all in batch-iteration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleDetails {
    pub ids: Vec<String>,
    /// Arg-max class of the M logits for each sample.
    pub predictions: Vec<usize>,
    pub labels: Vec<usize>,
    pub features: FeatureArrays,
}

impl SampleDetails {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// The four feature outputs stacked over a whole split, one row per sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureArrays {
    #[serde(rename = "Feature_T")]
    pub feature_t: Matrix,
    #[serde(rename = "Feature_A")]
    pub feature_a: Matrix,
    #[serde(rename = "Feature_V")]
    pub feature_v: Matrix,
    #[serde(rename = "Feature_M")]
    pub feature_m: Matrix,
}

impl Index<FeatureKey> for FeatureArrays {
    type Output = Matrix;

    fn index(&self, key: FeatureKey) -> &Matrix {
        match key {
            FeatureKey::T => &self.feature_t,
            FeatureKey::A => &self.feature_a,
            FeatureKey::V => &self.feature_v,
            FeatureKey::M => &self.feature_m,
        }
    }
}

impl IndexMut<FeatureKey> for FeatureArrays {
    fn index_mut(&mut self, key: FeatureKey) -> &mut Matrix {
        match key {
            FeatureKey::T => &mut self.feature_t,
            FeatureKey::A => &mut self.feature_a,
            FeatureKey::V => &mut self.feature_v,
            FeatureKey::M => &mut self.feature_m,
        }
    }
}

/// One `EpochResult` per epoch for each split.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunHistory {
    pub train: Vec<EpochResult>,
    pub valid: Vec<EpochResult>,
    pub test: Vec<EpochResult>,
}

impl RunHistory {
    pub fn epochs(&self) -> usize {
        self.train.len()
    }

    pub fn split(&self, split: Split) -> &[EpochResult] {
        match split {
            Split::Train => &self.train,
            Split::Valid => &self.valid,
            Split::Test => &self.test,
        }
    }

    /// Values of one metric across epochs for a split.
    pub fn series(&self, split: Split, metric: &str) -> Vec<Option<f64>> {
        self.split(split).iter().map(|r| r.get(metric)).collect()
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}
