use std::{io::Read, path::Path};

use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{ClimateSample, HistoricalRecord, LandRecord, SoilSample, FEATURE_NAMES},
};

/// One CSV row; empty cells deserialize as `None`
#[derive(Debug, Deserialize)]
struct HistoricalRow {
    #[serde(default)]
    plant_name: Option<String>,
    avg_temperature: Option<f64>,
    avg_precipitation: Option<f64>,
    avg_solar_radiation: Option<f64>,
    avg_humidity: Option<f64>,
    avg_wind_speed: Option<f64>,
    avg_soil_moisture: Option<f64>,
    clay_content: Option<f64>,
    sand_content: Option<f64>,
    silt_content: Option<f64>,
    soil_ph: Option<f64>,
    soil_organic_carbon: Option<f64>,
    successful_plant: u8,
}

impl TryFrom<HistoricalRow> for HistoricalRecord {
    type Error = AppError;

    fn try_from(row: HistoricalRow) -> AppResult<Self> {
        let successful_plant = match row.successful_plant {
            0 => false,
            1 => true,
            other => {
                return Err(AppError::InvalidInput(format!(
                    "successful_plant must be 0 or 1, got {}",
                    other
                )))
            }
        };
        let value = |v: Option<f64>| v.unwrap_or(f64::NAN);

        Ok(HistoricalRecord {
            plant_name: row.plant_name.filter(|name| !name.trim().is_empty()),
            land: LandRecord::new(
                ClimateSample {
                    temperature: value(row.avg_temperature),
                    precipitation: value(row.avg_precipitation),
                    solar_radiation: value(row.avg_solar_radiation),
                    humidity: value(row.avg_humidity),
                    wind_speed: value(row.avg_wind_speed),
                    soil_moisture: value(row.avg_soil_moisture),
                },
                SoilSample {
                    clay_content: value(row.clay_content),
                    sand_content: value(row.sand_content),
                    silt_content: value(row.silt_content),
                    ph: value(row.soil_ph),
                    organic_carbon: value(row.soil_organic_carbon),
                    soil_type: None,
                },
            ),
            successful_plant,
        })
    }
}

/// Reads historical observations; missing feature cells become NaN for the imputer
pub fn load_historical_data(path: impl AsRef<Path>) -> AppResult<Vec<HistoricalRecord>> {
    let path = path.as_ref();
    let records = read_historical(csv::Reader::from_path(path)?)?;
    tracing::info!(
        records = records.len(),
        path = %path.display(),
        "Loaded historical records"
    );
    Ok(records)
}

fn read_historical<R: Read>(mut reader: csv::Reader<R>) -> AppResult<Vec<HistoricalRecord>> {
    let headers = reader.headers()?.clone();
    for column in FEATURE_NAMES.iter().chain(&["successful_plant"]) {
        if !headers.iter().any(|h| h == *column) {
            return Err(AppError::InvalidInput(format!(
                "historical data is missing column {}",
                column
            )));
        }
    }

    reader
        .deserialize::<HistoricalRow>()
        .map(|row| HistoricalRecord::try_from(row?))
        .collect()
}
