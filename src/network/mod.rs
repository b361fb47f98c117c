pub mod device;
pub mod early_fusion;
pub mod guard;
pub mod model;
pub mod parameter;
pub mod spec;

pub use device::Device;
pub use early_fusion::EarlyFusion;
pub use guard::{NoGrad, Placement};
pub use model::{FeatureKey, Mode, ModelOutput, MultimodalModel};
pub use parameter::{Parameter, StateDict};
pub use spec::FusionSpec;
