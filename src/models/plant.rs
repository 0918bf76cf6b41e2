use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::land::{FeatureVector, FEATURE_COUNT};

/// Optimal growing envelope for one feature: a `[min, max]` pair or a list of values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptimalRange(pub Vec<f64>);

impl OptimalRange {
    /// Arithmetic mean of the range bounds, NaN when empty
    pub fn mean(&self) -> f64 {
        if self.0.is_empty() {
            return f64::NAN;
        }
        self.0.iter().sum::<f64>() / self.0.len() as f64
    }
}

/// Catalog entry describing where a plant grows best
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantProfile {
    pub plant_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub optimal_temperature: OptimalRange,
    pub optimal_precipitation: OptimalRange,
    pub optimal_solar_radiation: OptimalRange,
    pub optimal_humidity: OptimalRange,
    pub optimal_wind_speed: OptimalRange,
    pub optimal_soil_moisture: OptimalRange,
    pub optimal_clay_content: OptimalRange,
    pub optimal_sand_content: OptimalRange,
    pub optimal_silt_content: OptimalRange,
    pub optimal_soil_ph: OptimalRange,
    pub optimal_soil_organic_carbon: OptimalRange,
}

impl PlantProfile {
    /// Ranges in canonical feature order
    pub fn ranges(&self) -> [&OptimalRange; FEATURE_COUNT] {
        [
            &self.optimal_temperature,
            &self.optimal_precipitation,
            &self.optimal_solar_radiation,
            &self.optimal_humidity,
            &self.optimal_wind_speed,
            &self.optimal_soil_moisture,
            &self.optimal_clay_content,
            &self.optimal_sand_content,
            &self.optimal_silt_content,
            &self.optimal_soil_ph,
            &self.optimal_soil_organic_carbon,
        ]
    }

    /// Midpoint of every optimal range
    pub fn centroid(&self) -> FeatureVector {
        self.ranges().map(OptimalRange::mean)
    }
}

/// Read-only plant lookup keyed by name, preserving insertion order
#[derive(Debug, Clone, Default)]
pub struct PlantCatalog {
    plants: Vec<PlantProfile>,
    by_name: HashMap<String, usize>,
}

impl PlantCatalog {
    /// Builds a catalog; a later profile with a duplicate name replaces the earlier one
    pub fn new(profiles: Vec<PlantProfile>) -> Self {
        let mut catalog = Self::default();
        for profile in profiles {
            match catalog.by_name.get(&profile.plant_name) {
                Some(&idx) => catalog.plants[idx] = profile,
                None => {
                    catalog
                        .by_name
                        .insert(profile.plant_name.clone(), catalog.plants.len());
                    catalog.plants.push(profile);
                }
            }
        }
        catalog
    }

    pub fn get(&self, plant_name: &str) -> Option<&PlantProfile> {
        self.by_name.get(plant_name).map(|&idx| &self.plants[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlantProfile> {
        self.plants.iter()
    }

    pub fn len(&self) -> usize {
        self.plants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plants.is_empty()
    }
}

impl FromIterator<PlantProfile> for PlantCatalog {
    fn from_iter<I: IntoIterator<Item = PlantProfile>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
