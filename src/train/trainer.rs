use crate::data::source::{DataSource, Split};
use crate::loss::cross_entropy::CrossEntropyLoss;
use crate::math::matrix::Matrix;
use crate::metrics::{MetricsProvider, ScoreFn};
use crate::network::device::Device;
use crate::network::guard::Placement;
use crate::network::model::{Mode, MultimodalModel};
use crate::network::parameter::StateDict;
use crate::optim::adam::{Adam, AdamConfig};
use crate::train::best::BestState;
use crate::train::progress::batch_bar;
use crate::train::results::{EpochResult, RunHistory};
use crate::train::train_config::TrainConfig;
use crate::{Result, TrainError};

/// Drives training with validation-based early stopping and best-model
/// checkpointing. Evaluation lives in `eval.rs` on the same type.
pub struct Trainer {
    pub(super) config: TrainConfig,
    pub(super) score: ScoreFn,
    pub(super) best: BestState,
}

/// Outcome of `Trainer::run_experiment`.
#[derive(Debug, Clone)]
pub struct Experiment {
    pub history: RunHistory,
    pub best: BestState,
    /// Test split evaluated with the restored best parameters, with details.
    pub test: EpochResult,
}

impl Trainer {
    /// Looks up the dataset's scoring function up front; an unknown dataset
    /// fails here rather than after the first epoch.
    pub fn new(config: TrainConfig, metrics: &dyn MetricsProvider) -> Result<Trainer> {
        let score = metrics.get_metrics(&config.dataset_name)?;
        let best = BestState::for_key_eval(&config.key_eval);
        Ok(Trainer { config, score, best })
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Best validation value and epoch of the latest run.
    pub fn best(&self) -> &BestState {
        &self.best
    }

    /// Trains `model` in place until the key validation metric has not
    /// improved for `early_stop` epochs, snapshotting the parameters every
    /// time it does improve.
    ///
    /// There is no epoch cap. Any error ends the run and the history
    /// gathered so far is discarded.
    pub fn run_training<M, D>(&mut self, model: &mut M, data: &D) -> Result<RunHistory>
    where
        M: MultimodalModel + ?Sized,
        D: DataSource + ?Sized,
    {
        let mut optimizer = Adam::new(AdamConfig::new(
            self.config.learning_rate,
            self.config.weight_decay,
        ));
        self.best = BestState::for_key_eval(&self.config.key_eval);
        let mut history = RunHistory::default();
        let mut epoch = 0usize;

        if model.device() != self.config.device {
            model.to_device(self.config.device);
        }
        log::info!(
            "training {} on {} (KeyEval={} {:?}, patience={})",
            self.config.model_name,
            self.config.dataset_name,
            self.config.key_eval,
            self.best.direction,
            self.config.early_stop,
        );

        loop {
            epoch += 1;

            // ── One full pass over the training data ───────────────────────
            let train_result = self.train_epoch(model, data, &mut optimizer)?;
            println!(
                "TRAIN-({}) ({}/{})>> loss: {:.4} {}",
                self.config.model_name,
                self.best.epochs_since(epoch),
                epoch,
                train_result.loss().unwrap_or(f64::NAN),
                train_result.metrics,
            );
            history.train.push(train_result);

            // ── Validation and test ───────────────────────────────────────
            let val_result = self.run_eval(model, data.batches(Split::Valid)?, "VAL", false)?;
            let test_result = self.run_eval(model, data.batches(Split::Test)?, "TEST", false)?;

            let current = val_result.get(&self.config.key_eval)
                .ok_or_else(|| TrainError::MissingMetric(self.config.key_eval.clone()))?;
            history.valid.push(val_result);
            history.test.push(test_result);

            // ── Best model ────────────────────────────────────────────────
            if self.best.is_better(current) {
                self.best.record(current, epoch);
                self.save_snapshot(model)?;
                log::debug!(
                    "epoch {}: {} = {:.4}, snapshot written to {}",
                    epoch,
                    self.config.key_eval,
                    current,
                    self.config.model_save_path.display()
                );
            }

            // ── Early stop ────────────────────────────────────────────────
            if self.best.epochs_since(epoch) >= self.config.early_stop {
                log::info!(
                    "early stop after epoch {}: best {} = {:.4} at epoch {}",
                    epoch,
                    self.config.key_eval,
                    self.best.value,
                    self.best.epoch
                );
                return Ok(history);
            }
        }
    }

    fn train_epoch<M, D>(&self, model: &mut M, data: &D, optimizer: &mut Adam) -> Result<EpochResult>
    where
        M: MultimodalModel + ?Sized,
        D: DataSource + ?Sized,
    {
        model.set_mode(Mode::Train);

        let mut total_loss = 0.0;
        let mut num_batches = 0usize;
        let mut y_pred: Vec<Matrix> = Vec::new();
        let mut y_true: Vec<usize> = Vec::new();

        let batches = data.batches(Split::Train)?;
        let pb = batch_bar(batches.size_hint(), "TRAIN");
        for batch in batches {
            let batch = batch?;
            batch.validate()?;
            let labels = batch.primary_labels()?;

            optimizer.zero_grad(model.parameters_mut());
            let outputs = model.forward(&batch.text, &batch.audio, &batch.vision)?;
            let loss = CrossEntropyLoss::forward(&outputs.m, &labels)?;
            model.backward(&CrossEntropyLoss::backward(&outputs.m, &labels)?)?;
            optimizer.step(model.parameters_mut())?;

            total_loss += loss;
            num_batches += 1;
            y_pred.push(outputs.m);
            y_true.extend(labels);
            pb.inc(1);
        }
        pb.finish_and_clear();

        if num_batches == 0 {
            return Err(TrainError::EmptySplit(Split::Train.to_string()));
        }

        let mut metrics = (self.score)(&Matrix::vstack(&y_pred)?, &y_true)?;
        metrics.insert("Loss", total_loss / num_batches as f64);
        Ok(EpochResult { metrics, details: None })
    }

    /// Writes the current parameters to `model_save_path`, overwriting the
    /// previous snapshot. The model is on the host for the write and back on
    /// its previous device afterwards, even if the write fails.
    fn save_snapshot<M: MultimodalModel + ?Sized>(&self, model: &mut M) -> Result<()> {
        let host = Placement::new(model, Device::Cpu);
        let state = host.state_dict();
        state.save_json(&self.config.model_save_path)
    }

    /// Loads the snapshot at `model_save_path` into `model`.
    pub fn load_best<M: MultimodalModel + ?Sized>(&self, model: &mut M) -> Result<()> {
        let state = StateDict::load_json(&self.config.model_save_path)?;
        let mut host = Placement::new(model, Device::Cpu);
        host.load_state_dict(&state)?;
        log::info!("restored best parameters from {}", self.config.model_save_path.display());
        Ok(())
    }

    /// Train, restore the best snapshot, then evaluate the test split with
    /// per-sample details.
    pub fn run_experiment<M, D>(&mut self, model: &mut M, data: &D) -> Result<Experiment>
    where
        M: MultimodalModel + ?Sized,
        D: DataSource + ?Sized,
    {
        let history = self.run_training(model, data)?;
        self.load_best(model)?;
        let test = self.run_eval(model, data.batches(Split::Test)?, "TEST", true)?;
        Ok(Experiment { history, best: self.best, test })
    }
}
