use std::collections::BTreeSet;

use crate::math::matrix::Matrix;
use crate::metrics::MetricMap;
use crate::{Result, TrainError};

/// `Acc` (arg-max accuracy) and `F1_score` (F1 averaged over classes,
/// weighted by each class's ground-truth support).
pub fn classification_metrics(logits: &Matrix, truth: &[usize]) -> Result<MetricMap> {
    if truth.is_empty() || logits.rows != truth.len() {
        return Err(TrainError::Shape(format!(
            "{} prediction rows for {} targets", logits.rows, truth.len()
        )));
    }
    let preds = logits.argmax_rows();
    let n = truth.len() as f64;

    let correct = preds.iter().zip(truth.iter()).filter(|(p, t)| p == t).count();

    let classes: BTreeSet<usize> = truth.iter().chain(preds.iter()).copied().collect();
    let mut weighted_f1 = 0.0;
    for class in classes {
        let tp = preds.iter().zip(truth.iter()).filter(|&(&p, &t)| p == class && t == class).count() as f64;
        let predicted = preds.iter().filter(|&&p| p == class).count() as f64;
        let support = truth.iter().filter(|&&t| t == class).count() as f64;
        if support == 0.0 {
            continue;
        }
        let precision = if predicted > 0.0 { tp / predicted } else { 0.0 };
        let recall = tp / support;
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        weighted_f1 += f1 * support / n;
    }

    let mut metrics = MetricMap::new();
    metrics.insert("Acc", correct as f64 / n);
    metrics.insert("F1_score", weighted_f1);
    Ok(metrics)
}
