//! Metric maps and the per-dataset scoring functions used by the trainer.

pub mod classification;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;
use crate::{Result, TrainError};

pub use classification::classification_metrics;

/// Metric name -> value, iterated in name order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricMap(pub BTreeMap<String, f64>);

impl MetricMap {
    pub fn new() -> MetricMap {
        MetricMap(BTreeMap::new())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for MetricMap {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        MetricMap(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Renders ` Name: 0.1234 ` for every entry, the format of the console
/// progress lines.
impl fmt::Display for MetricMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.0 {
            write!(f, " {}: {:.4} ", name, value)?;
        }
        Ok(())
    }
}

/// Scores concatenated logits [n, n_classes] against n ground-truth classes.
pub type ScoreFn = Box<dyn Fn(&Matrix, &[usize]) -> Result<MetricMap>>;

pub trait MetricsProvider {
    fn get_metrics(&self, dataset_name: &str) -> Result<ScoreFn>;
}

/// Default provider for the bundled sentiment/emotion datasets.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsTop;

impl MetricsTop {
    pub const DATASETS: [&'static str; 4] = ["mosi", "mosei", "sims", "iemocap"];

    pub fn new() -> MetricsTop {
        MetricsTop
    }
}

impl MetricsProvider for MetricsTop {
    fn get_metrics(&self, dataset_name: &str) -> Result<ScoreFn> {
        let name = dataset_name.to_ascii_lowercase();
        if MetricsTop::DATASETS.contains(&name.as_str()) {
            Ok(Box::new(classification_metrics))
        } else {
            Err(TrainError::UnknownDataset(dataset_name.to_string()))
        }
    }
}
