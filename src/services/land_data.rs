use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{Coordinate, LandRecord},
    services::providers::{ClimateSource, SoilDataSource},
};

/// Merges climate and soil data into a single land record
#[derive(Clone)]
pub struct LandDataAssembler {
    climate: Arc<dyn ClimateSource>,
    soil: Arc<dyn SoilDataSource>,
}

impl LandDataAssembler {
    pub fn new(climate: Arc<dyn ClimateSource>, soil: Arc<dyn SoilDataSource>) -> Self {
        Self { climate, soil }
    }

    /// Climate first; the soil source is only consulted once climate succeeded
    pub async fn assemble(&self, coordinate: Coordinate) -> AppResult<LandRecord> {
        let climate = self.climate.fetch(coordinate).await.map_err(|e| {
            tracing::error!(
                error = %e,
                provider = self.climate.name(),
                "Failed to get climate data"
            );
            e
        })?;
        let soil = self.soil.soil_at(coordinate).await?;

        Ok(LandRecord::new(climate, soil))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::ClimateSample;
    use crate::services::providers::{MockClimateSource, MockSoilDataSource, PlaceholderSoilSource};

    fn climate() -> ClimateSample {
        ClimateSample {
            temperature: 24.0,
            precipitation: 120.0,
            solar_radiation: 250.0,
            humidity: 60.0,
            wind_speed: 2.5,
            soil_moisture: 0.3,
        }
    }

    #[tokio::test]
    async fn test_merges_climate_and_soil() {
        let mut climate_source = MockClimateSource::new();
        climate_source
            .expect_fetch()
            .times(1)
            .returning(|_| Ok(climate()));
        climate_source.expect_name().return_const("mock");

        let assembler =
            LandDataAssembler::new(Arc::new(climate_source), Arc::new(PlaceholderSoilSource));
        let record = assembler
            .assemble(Coordinate::new(40.0, -74.0).unwrap())
            .await
            .unwrap();

        assert_eq!(record.climate, climate());
        assert_eq!(record.soil, PlaceholderSoilSource::sample());
    }

    #[tokio::test]
    async fn test_climate_failure_short_circuits_soil() {
        let mut climate_source = MockClimateSource::new();
        climate_source.expect_fetch().returning(|_| {
            Err(AppError::DataUnavailable {
                attempts: 3,
                cause: "timeout".to_string(),
            })
        });
        climate_source.expect_name().return_const("mock");

        let mut soil_source = MockSoilDataSource::new();
        soil_source.expect_soil_at().never();

        let assembler = LandDataAssembler::new(Arc::new(climate_source), Arc::new(soil_source));
        let result = assembler
            .assemble(Coordinate::new(40.0, -74.0).unwrap())
            .await;

        tokio_test::assert_err!(&result);
        assert!(matches!(
            result,
            Err(AppError::DataUnavailable { attempts: 3, .. })
        ));
    }
}
