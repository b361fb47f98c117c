use crate::math::matrix::Matrix;
use crate::{Result, TrainError};

/// Categorical cross-entropy over raw logits and integer class targets.
pub struct CrossEntropyLoss;

impl CrossEntropyLoss {
    /// Mean over the batch of `-log softmax(logits)[label]`.
    ///
    /// `logits` — shape [batch, n_classes]
    /// `labels` — one class index per row
    pub fn forward(logits: &Matrix, labels: &[usize]) -> Result<f64> {
        check(logits, labels)?;
        let total: f64 = logits.data.iter().zip(labels.iter())
            .map(|(row, &label)| log_sum_exp(row) - row[label])
            .sum();
        Ok(total / labels.len() as f64)
    }

    /// Gradient of `forward` w.r.t. the logits: `(softmax - one_hot) / batch`.
    pub fn backward(logits: &Matrix, labels: &[usize]) -> Result<Matrix> {
        check(logits, labels)?;
        let scale = 1.0 / labels.len() as f64;
        let data = logits.data.iter().zip(labels.iter())
            .map(|(row, &label)| {
                let mut probs = softmax(row);
                probs[label] -= 1.0;
                probs.iter().map(|p| p * scale).collect()
            })
            .collect();
        Ok(Matrix::from_data(data))
    }
}

fn check(logits: &Matrix, labels: &[usize]) -> Result<()> {
    if labels.is_empty() || logits.rows != labels.len() {
        return Err(TrainError::Shape(format!(
            "{} logit rows for {} labels", logits.rows, labels.len()
        )));
    }
    if let Some(&bad) = labels.iter().find(|&&l| l >= logits.cols) {
        return Err(TrainError::Shape(format!(
            "label {} out of range for {} classes", bad, logits.cols
        )));
    }
    Ok(())
}

fn log_sum_exp(row: &[f64]) -> f64 {
    let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    max + row.iter().map(|x| (x - max).exp()).sum::<f64>().ln()
}

fn softmax(row: &[f64]) -> Vec<f64> {
    let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = row.iter().map(|x| (x - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
