/// Environmental data provider abstraction
///
/// Climate and soil values come from independent sources so either can be swapped
/// (a different climate API, a geocoded soil service) without touching the assembler.
use crate::{
    error::AppResult,
    models::{ClimateSample, Coordinate, SoilSample},
};

pub mod nasa_power;
pub mod placeholder_soil;

pub use nasa_power::{ClimateClientSettings, ClimateDataClient, ClimateWindow};
pub use placeholder_soil::PlaceholderSoilSource;

/// Trait for climate data providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ClimateSource: Send + Sync {
    /// Fetch trailing-window climate means for a coordinate
    ///
    /// Implementations retry transient failures themselves and return
    /// `AppError::DataUnavailable` once they give up. They never return
    /// partially averaged or defaulted values.
    async fn fetch(&self, coordinate: Coordinate) -> AppResult<ClimateSample>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Trait for soil data providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SoilDataSource: Send + Sync {
    /// Soil properties at (or standing in for) the coordinate
    async fn soil_at(&self, coordinate: Coordinate) -> AppResult<SoilSample>;

    fn name(&self) -> &'static str;
}
