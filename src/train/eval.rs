use crate::data::batch::Batch;
use crate::loss::cross_entropy::CrossEntropyLoss;
use crate::math::matrix::Matrix;
use crate::network::guard::NoGrad;
use crate::network::model::{FeatureKey, Mode, ModelOutput, MultimodalModel};
use crate::train::progress::batch_bar;
use crate::train::results::{EpochResult, FeatureArrays, SampleDetails};
use crate::train::trainer::Trainer;
use crate::{Result, TrainError};

/// Per-batch pieces kept during a detailed evaluation; merged once at the end.
#[derive(Default)]
struct DetailBuffer {
    ids: Vec<String>,
    predictions: Vec<usize>,
    labels: Vec<usize>,
    features: [Vec<Matrix>; 4],
}

impl DetailBuffer {
    fn push(&mut self, batch: &Batch, labels: &[usize], outputs: &ModelOutput) {
        self.ids.extend(batch.ids.iter().cloned());
        for (slot, key) in self.features.iter_mut().zip(FeatureKey::ALL) {
            slot.push(outputs.feature(key).clone());
        }
        self.labels.extend_from_slice(labels);
        self.predictions.extend(outputs.m.argmax_rows());
    }

    fn finish(self) -> Result<SampleDetails> {
        let mut features = FeatureArrays::default();
        for (parts, key) in self.features.iter().zip(FeatureKey::ALL) {
            features[key] = Matrix::vstack(parts)?;
        }
        Ok(SampleDetails {
            ids: self.ids,
            predictions: self.predictions,
            labels: self.labels,
            features,
        })
    }
}

impl Trainer {
    /// Forward pass over every batch with gradient tracking off; returns the
    /// mean batch loss under `"Loss"` plus the dataset metrics.
    ///
    /// `mode` only labels the console line (`"VAL"`, `"TEST"`, ...). With
    /// `want_details` the result also carries ids, predicted classes, labels
    /// and the four feature arrays for every sample.
    pub fn run_eval<M, I>(
        &self,
        model: &mut M,
        batches: I,
        mode: &str,
        want_details: bool,
    ) -> Result<EpochResult>
    where
        M: MultimodalModel + ?Sized,
        I: IntoIterator<Item = Result<Batch>>,
    {
        model.set_mode(Mode::Eval);

        let mut eval_loss = 0.0;
        let mut num_batches = 0usize;
        let mut y_pred: Vec<Matrix> = Vec::new();
        let mut y_true: Vec<usize> = Vec::new();
        let mut details = want_details.then(DetailBuffer::default);

        let batches = batches.into_iter();
        let pb = batch_bar(batches.size_hint(), mode);
        {
            let mut model = NoGrad::new(model);
            for batch in batches {
                let batch = batch?;
                batch.validate()?;
                let labels = batch.primary_labels()?;
                let outputs = model.forward(&batch.text, &batch.audio, &batch.vision)?;

                if let Some(buffer) = details.as_mut() {
                    buffer.push(&batch, &labels, &outputs);
                }

                eval_loss += CrossEntropyLoss::forward(&outputs.m, &labels)?;
                num_batches += 1;
                y_pred.push(outputs.m);
                y_true.extend(labels);
                pb.inc(1);
            }
        }
        pb.finish_and_clear();

        if num_batches == 0 {
            return Err(TrainError::EmptySplit(mode.to_string()));
        }
        let eval_loss = eval_loss / num_batches as f64;

        let mut metrics = (self.score)(&Matrix::vstack(&y_pred)?, &y_true)?;
        println!(
            "{}-({}) >> loss: {:.4} {}",
            mode, self.config.model_name, eval_loss, metrics
        );
        metrics.insert("Loss", eval_loss);

        let details = details.map(DetailBuffer::finish).transpose()?;
        Ok(EpochResult { metrics, details })
    }
}
