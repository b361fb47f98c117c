mod common;

use common::{config, marked_source, ScriptedMetrics, ScriptedModel};
use ferrite_mmsa::data::InMemoryDataSource;
use ferrite_mmsa::network::StateDict;
use ferrite_mmsa::{Device, Direction, MetricsTop, MultimodalModel, Split, TrainError, Trainer};

fn snapshot_steps(path: &std::path::Path) -> f64 {
    StateDict::load_json(path).unwrap().get("steps").unwrap().data[0][0]
}

#[test]
fn loss_rising_after_first_epoch_stops_after_two() {
    let dir = tempfile::tempdir().unwrap();
    let mut model = ScriptedModel::new(vec![0.5, 0.6]);
    let mut trainer = Trainer::new(config(dir.path(), "Loss", 1), &MetricsTop::new()).unwrap();

    let history = trainer.run_training(&mut model, &marked_source()).unwrap();

    assert_eq!(history.epochs(), 2);
    assert_eq!(history.valid.len(), 2);
    assert_eq!(history.test.len(), 2);
    assert_eq!(trainer.best().direction, Direction::Minimize);
    assert_eq!(trainer.best().epoch, 1);
    let losses: Vec<f64> = history.series(Split::Valid, "Loss").into_iter().map(Option::unwrap).collect();
    assert!((losses[0] - 0.5).abs() < 1e-9);
    assert!((losses[1] - 0.6).abs() < 1e-9);
    assert!((trainer.best().value - 0.5).abs() < 1e-9);
    assert_eq!(snapshot_steps(&trainer.config().model_save_path), 1.0);
}

#[test]
fn tie_on_maximised_metric_moves_best_epoch_forward() {
    let dir = tempfile::tempdir().unwrap();
    let metrics = ScriptedMetrics { metric: "Acc", values: vec![0.70, 0.70, 0.65, 0.60] };
    let mut model = ScriptedModel::new(vec![0.3]);
    let mut trainer = Trainer::new(config(dir.path(), "Acc", 2), &metrics).unwrap();

    let history = trainer.run_training(&mut model, &marked_source()).unwrap();

    // epoch 3 leaves a gap of 1, epoch 4 reaches the patience of 2
    assert_eq!(history.epochs(), 4);
    assert_eq!(trainer.best().direction, Direction::Maximize);
    assert_eq!(trainer.best().epoch, 2);
    assert_eq!(trainer.best().value, 0.70);
    assert_eq!(snapshot_steps(&trainer.config().model_save_path), 2.0);
    assert_eq!(
        history.series(Split::Valid, "Acc"),
        vec![Some(0.70), Some(0.70), Some(0.65), Some(0.60)]
    );
    assert!(history.train.iter().all(|r| r.loss().is_some()));
}

#[test]
fn run_ends_exactly_patience_epochs_after_last_improvement() {
    for patience in 1..=4 {
        let dir = tempfile::tempdir().unwrap();
        let mut model = ScriptedModel::new(vec![5.0, 4.0, 3.0, 9.0]);
        let mut trainer = Trainer::new(config(dir.path(), "Loss", patience), &MetricsTop::new()).unwrap();

        let history = trainer.run_training(&mut model, &marked_source()).unwrap();

        assert_eq!(trainer.best().epoch, 3, "patience {}", patience);
        assert_eq!(history.epochs(), 3 + patience, "patience {}", patience);
        assert_eq!(snapshot_steps(&trainer.config().model_save_path), 3.0);
    }
}

#[test]
fn steadily_worse_loss_runs_patience_plus_one_epochs() {
    let dir = tempfile::tempdir().unwrap();
    let mut model = ScriptedModel::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let mut trainer = Trainer::new(config(dir.path(), "Loss", 3), &MetricsTop::new()).unwrap();

    let history = trainer.run_training(&mut model, &marked_source()).unwrap();

    assert_eq!(history.epochs(), 4);
    assert_eq!(trainer.best().epoch, 1);
}

#[test]
fn metric_never_reaching_sentinel_writes_no_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let metrics = ScriptedMetrics { metric: "Score", values: vec![-1.0] };
    let mut model = ScriptedModel::new(vec![0.3]);
    let mut trainer = Trainer::new(config(dir.path(), "Score", 2), &metrics).unwrap();

    let history = trainer.run_training(&mut model, &marked_source()).unwrap();

    assert_eq!(history.epochs(), 2);
    assert_eq!(trainer.best().epoch, 0);
    assert!(!trainer.config().model_save_path.exists());
}

#[test]
fn snapshot_is_written_on_host_and_placement_restored() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path(), "Loss", 1);
    cfg.device = Device::Cuda(0);
    let mut model = ScriptedModel::new(vec![0.5, 0.6]);
    let mut trainer = Trainer::new(cfg, &MetricsTop::new()).unwrap();

    trainer.run_training(&mut model, &marked_source()).unwrap();

    assert_eq!(model.device(), Device::Cuda(0));
    assert_eq!(model.devices_seen, vec![Device::Cuda(0), Device::Cpu, Device::Cuda(0)]);
    let state = StateDict::load_json(&trainer.config().model_save_path).unwrap();
    assert_eq!(state.get("on_host").unwrap().data[0][0], 1.0);
}

#[test]
fn missing_key_metric_aborts_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let metrics = ScriptedMetrics { metric: "Acc", values: vec![0.5] };
    let mut model = ScriptedModel::new(vec![0.3]);
    let mut trainer = Trainer::new(config(dir.path(), "F1_score", 2), &metrics).unwrap();

    let err = trainer.run_training(&mut model, &marked_source()).unwrap_err();
    assert!(matches!(err, TrainError::MissingMetric(name) if name == "F1_score"));
}

#[test]
fn empty_training_split_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let source = marked_source();
    let data = InMemoryDataSource::new(Vec::new(), source.valid, source.test);
    let mut model = ScriptedModel::new(vec![0.3]);
    let mut trainer = Trainer::new(config(dir.path(), "Loss", 2), &MetricsTop::new()).unwrap();

    let err = trainer.run_training(&mut model, &data).unwrap_err();
    assert!(matches!(err, TrainError::EmptySplit(_)));
}

#[test]
fn unknown_dataset_fails_before_training() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path(), "Loss", 2);
    cfg.dataset_name = "cifar".to_string();
    assert!(matches!(
        Trainer::new(cfg, &MetricsTop::new()),
        Err(TrainError::UnknownDataset(_))
    ));
}
