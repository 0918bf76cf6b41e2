use serde::{Deserialize, Serialize};

/// Number of dimensions in every feature vector
pub const FEATURE_COUNT: usize = 11;

/// Canonical feature order shared by training and inference
///
/// The names double as the historical CSV column headers.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "avg_temperature",
    "avg_precipitation",
    "avg_solar_radiation",
    "avg_humidity",
    "avg_wind_speed",
    "avg_soil_moisture",
    "clay_content",
    "sand_content",
    "silt_content",
    "soil_ph",
    "soil_organic_carbon",
];

/// One row of the feature matrix, in `FEATURE_NAMES` order
pub type FeatureVector = [f64; FEATURE_COUNT];

/// Trailing-window climate means for a single location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateSample {
    /// Air temperature at 2m, °C
    pub temperature: f64,
    /// Corrected precipitation, mm/day
    pub precipitation: f64,
    /// All-sky surface shortwave irradiance
    pub solar_radiation: f64,
    /// Relative humidity at 2m, %
    pub humidity: f64,
    /// Wind speed at 2m, m/s
    pub wind_speed: f64,
    /// Root zone soil wetness, fraction
    pub soil_moisture: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilSample {
    /// Percent
    pub clay_content: f64,
    pub sand_content: f64,
    pub silt_content: f64,
    pub ph: f64,
    pub organic_carbon: f64,
    /// Descriptive label, not part of the feature vector
    pub soil_type: Option<String>,
}

/// Merged climate and soil description of a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandRecord {
    pub climate: ClimateSample,
    pub soil: SoilSample,
}

impl LandRecord {
    pub fn new(climate: ClimateSample, soil: SoilSample) -> Self {
        Self { climate, soil }
    }

    /// Flattens the record into the canonical feature order
    pub fn features(&self) -> FeatureVector {
        let c = &self.climate;
        let s = &self.soil;
        [
            c.temperature,
            c.precipitation,
            c.solar_radiation,
            c.humidity,
            c.wind_speed,
            c.soil_moisture,
            s.clay_content,
            s.sand_content,
            s.silt_content,
            s.ph,
            s.organic_carbon,
        ]
    }
}

/// A logged observation with its planting outcome
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalRecord {
    /// Plant grown, when the log recorded one
    pub plant_name: Option<String>,
    pub land: LandRecord,
    pub successful_plant: bool,
}
