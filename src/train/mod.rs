pub mod best;
pub mod eval;
mod progress;
pub mod results;
pub mod train_config;
pub mod trainer;

pub use best::{BestState, Direction};
pub use results::{EpochResult, FeatureArrays, RunHistory, SampleDetails};
pub use train_config::TrainConfig;
pub use trainer::{Experiment, Trainer};
