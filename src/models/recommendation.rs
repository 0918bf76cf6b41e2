use serde::Serialize;

use crate::models::plant::PlantProfile;

/// A ranked plant suggestion for one location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub plant_name: String,
    /// Classifier probability in [0, 1]
    pub confidence: f64,
    pub profile: PlantProfile,
}
