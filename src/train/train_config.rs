use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};

use crate::network::device::Device;
use crate::Result;

/// Hyperparameters and bookkeeping for one `Trainer` run.
///
/// JSON field names follow the experiment config files (`KeyEval`,
/// `modelName`, `datasetName`). No validation happens here; a bad value
/// shows up as an error from whatever uses it.
///
/// # Fields
/// - `learning_rate`   — Adam step size
/// - `weight_decay`    — L2 penalty folded into the gradient
/// - `key_eval`        — validation metric that selects the best epoch;
///                       `"Loss"` is minimised, anything else maximised
/// - `early_stop`      — epochs without improvement before the run stops
/// - `model_save_path` — where the best parameter snapshot is written
/// - `device`          — placement the model trains on
/// - `model_name` / `dataset_name` — labels for output and metric lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub learning_rate: f64,
    #[serde(default)]
    pub weight_decay: f64,
    #[serde(rename = "KeyEval")]
    pub key_eval: String,
    pub early_stop: usize,
    pub model_save_path: PathBuf,
    #[serde(default)]
    pub device: Device,
    #[serde(rename = "modelName")]
    pub model_name: String,
    #[serde(rename = "datasetName")]
    pub dataset_name: String,
}

impl TrainConfig {
    /// Config with the usual defaults: lr 1e-3, no weight decay, best epoch
    /// chosen by validation loss, patience 8, CPU.
    pub fn new(
        model_name: impl Into<String>,
        dataset_name: impl Into<String>,
        model_save_path: impl Into<PathBuf>,
    ) -> Self {
        TrainConfig {
            learning_rate: 1e-3,
            weight_decay: 0.0,
            key_eval: "Loss".to_string(),
            early_stop: 8,
            model_save_path: model_save_path.into(),
            device: Device::Cpu,
            model_name: model_name.into(),
            dataset_name: dataset_name.into(),
        }
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<TrainConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_experiment_field_names() {
        let json = r#"{
            "learning_rate": 0.001,
            "weight_decay": 0.0001,
            "KeyEval": "Acc",
            "early_stop": 4,
            "model_save_path": "results/ef_lstm-mosi.json",
            "device": "cuda:0",
            "modelName": "ef_lstm",
            "datasetName": "mosi"
        }"#;
        let config: TrainConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.key_eval, "Acc");
        assert_eq!(config.device, Device::Cuda(0));
        assert_eq!(config.model_name, "ef_lstm");
        assert_eq!(config.early_stop, 4);
    }

    #[test]
    fn optional_fields_default() {
        let json = r#"{
            "learning_rate": 0.01,
            "KeyEval": "Loss",
            "early_stop": 2,
            "model_save_path": "m.json",
            "modelName": "ef",
            "datasetName": "sims"
        }"#;
        let config: TrainConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.weight_decay, 0.0);
        assert_eq!(config.device, Device::Cpu);
    }

    #[test]
    fn saved_config_reads_back_with_experiment_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = TrainConfig::new("ef_lstm", "mosei", dir.path().join("best.json"));
        config.key_eval = "F1_score".to_string();
        config.device = Device::Cuda(1);
        config.save_json(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"KeyEval\""));
        assert!(raw.contains("\"datasetName\""));
        assert!(raw.contains("\"cuda:1\""));
        assert_eq!(TrainConfig::load_json(&path).unwrap(), config);
    }
}
