pub mod features;
pub mod land_data;
pub mod model;
pub mod providers;
pub mod recommendations;

pub use features::{build_training_set, to_inference_vector, LabelPolicy, TrainingSet};
pub use land_data::LandDataAssembler;
pub use model::{RecommendationModel, TrainedModelArtifact, TrainingConfig};
pub use recommendations::RecommendationRanker;
