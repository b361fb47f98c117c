use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;
use crate::{Result, TrainError};

/// Key of the multimodal (primary) task in `Batch::labels`.
pub const PRIMARY_TASK: &str = "M";

/// One unit of iteration: a slice of samples with all three modalities.
///
/// Every matrix has one row per sample, and `ids` and each label vector
/// carry one entry per sample in the same order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub vision: Matrix,
    pub audio: Matrix,
    pub text: Matrix,
    pub ids: Vec<String>,
    pub labels: BTreeMap<String, Vec<f64>>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.text.rows
    }

    pub fn is_empty(&self) -> bool {
        self.text.rows == 0
    }

    /// Checks that every field agrees on the sample count.
    pub fn validate(&self) -> Result<()> {
        let n = self.text.rows;
        let mut counts = vec![
            ("audio", self.audio.rows),
            ("vision", self.vision.rows),
            ("ids", self.ids.len()),
        ];
        for (task, values) in &self.labels {
            counts.push((task.as_str(), values.len()));
        }
        if let Some((field, count)) = counts.into_iter().find(|&(_, c)| c != n) {
            return Err(TrainError::Shape(format!(
                "batch field '{}' has {} entries but text has {} rows", field, count, n
            )));
        }
        Ok(())
    }

    /// Class targets of the primary task. Values are truncated toward zero,
    /// so `2.0` and `2.7` both mean class 2.
    pub fn primary_labels(&self) -> Result<Vec<usize>> {
        let values = self.labels.get(PRIMARY_TASK)
            .ok_or_else(|| TrainError::MissingLabel(PRIMARY_TASK.to_string()))?;
        values.iter()
            .map(|&v| {
                let class = v.trunc();
                if !class.is_finite() || class < 0.0 {
                    Err(TrainError::Shape(format!("label {} is not a class index", v)))
                } else {
                    Ok(class as usize)
                }
            })
            .collect()
    }
}
