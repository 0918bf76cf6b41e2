pub mod coordinate;
pub mod land;
pub mod plant;
pub mod recommendation;

pub use coordinate::Coordinate;
pub use land::{
    ClimateSample, FeatureVector, HistoricalRecord, LandRecord, SoilSample, FEATURE_COUNT,
    FEATURE_NAMES,
};
pub use plant::{OptimalRange, PlantCatalog, PlantProfile};
pub use recommendation::Recommendation;
