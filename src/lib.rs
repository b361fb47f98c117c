pub mod math;
pub mod activation;
pub mod layers;
pub mod loss;
pub mod optim;
pub mod network;
pub mod data;
pub mod metrics;
pub mod train;

// Convenience re-exports
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use layers::dense::Dense;
pub use loss::cross_entropy::CrossEntropyLoss;
pub use optim::adam::Adam;
pub use network::device::Device;
pub use network::early_fusion::EarlyFusion;
pub use network::model::{FeatureKey, Mode, ModelOutput, MultimodalModel};
pub use network::spec::FusionSpec;
pub use data::batch::Batch;
pub use data::source::{DataSource, InMemoryDataSource, Sample, Split};
pub use metrics::{MetricMap, MetricsProvider, MetricsTop, ScoreFn};
pub use train::{BestState, Direction, EpochResult, RunHistory, TrainConfig, Trainer};

/// Errors raised anywhere in the training and evaluation pipeline.
///
/// Nothing in the crate recovers from these locally; they propagate to the
/// caller of `Trainer::run_training` and end the run.
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error("Shape error: {0}")]
    Shape(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Batch has no labels for task '{0}'")]
    MissingLabel(String),

    #[error("Metric '{0}' missing from evaluation result")]
    MissingMetric(String),

    #[error("Split '{0}' yielded no batches")]
    EmptySplit(String),

    #[error("No metrics registered for dataset '{0}'")]
    UnknownDataset(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TrainError>;
