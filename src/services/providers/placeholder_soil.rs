use crate::{
    error::AppResult,
    models::{Coordinate, SoilSample},
    services::providers::SoilDataSource,
};

/// Fixed loam profile returned for every coordinate
///
/// There is no soil service behind this yet; the coordinate is ignored.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderSoilSource;

impl PlaceholderSoilSource {
    pub fn sample() -> SoilSample {
        SoilSample {
            clay_content: 20.0,
            sand_content: 30.0,
            silt_content: 50.0,
            ph: 6.5,
            organic_carbon: 3.0,
            soil_type: Some("loam".to_string()),
        }
    }
}

#[async_trait::async_trait]
impl SoilDataSource for PlaceholderSoilSource {
    async fn soil_at(&self, coordinate: Coordinate) -> AppResult<SoilSample> {
        tracing::debug!(%coordinate, provider = self.name(), "Using placeholder soil data");
        Ok(Self::sample())
    }

    fn name(&self) -> &'static str {
        "placeholder_soil"
    }
}
