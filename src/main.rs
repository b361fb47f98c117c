// Trains an EarlyFusion model from three JSON files and evaluates the best
// snapshot on the test split:
//   ferrite-mmsa <train_config.json> <fusion_spec.json> <samples.json>
// For a self-contained run on generated data:
//   cargo run --example synthetic
use anyhow::Context;

use ferrite_mmsa::data::SampleSet;
use ferrite_mmsa::{EarlyFusion, FusionSpec, MetricsTop, TrainConfig, Trainer};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [config_path, spec_path, samples_path] = args.as_slice() else {
        eprintln!("usage: ferrite-mmsa <train_config.json> <fusion_spec.json> <samples.json>");
        std::process::exit(2);
    };

    let config = TrainConfig::load_json(config_path)
        .with_context(|| format!("reading train config {}", config_path))?;
    let spec = FusionSpec::load_json(spec_path)
        .with_context(|| format!("reading fusion spec {}", spec_path))?;
    let data = SampleSet::load_json(samples_path)
        .with_context(|| format!("reading samples {}", samples_path))?
        .into_source()?;

    let mut model = EarlyFusion::new(spec)?;
    let mut trainer = Trainer::new(config, &MetricsTop::new())?;
    let experiment = trainer.run_experiment(&mut model, &data)?;

    let history_path = trainer.config().model_save_path.with_extension("history.json");
    experiment.history.save_json(&history_path)?;
    log::info!(
        "best epoch {} of {} ({} = {:.4}); history in {}",
        experiment.best.epoch,
        experiment.history.epochs(),
        trainer.config().key_eval,
        experiment.best.value,
        history_path.display()
    );
    Ok(())
}
