use std::time::Duration;

use serde::Deserialize;

use crate::services::{
    features::LabelPolicy,
    model::{ForestParams, TrainingConfig},
    providers::nasa_power::ClimateClientSettings,
};

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// NASA POWER daily point endpoint
    #[serde(default = "default_climate_api_url")]
    pub climate_api_url: String,

    /// POWER community tag
    #[serde(default = "default_climate_community")]
    pub climate_community: String,

    /// Number of trailing days averaged into a climate sample
    #[serde(default = "default_climate_window_days")]
    pub climate_window_days: u32,

    /// Total attempts against the climate service before giving up
    #[serde(default = "default_climate_max_retries")]
    pub climate_max_retries: u32,

    /// Fixed delay between climate attempts, in seconds
    #[serde(default = "default_climate_backoff_secs")]
    pub climate_backoff_secs: u64,

    /// Per-request HTTP timeout, in seconds
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Persisted model artifact
    #[serde(default = "default_model_path")]
    pub model_path: String,

    /// Historical observations CSV
    #[serde(default = "default_historical_data_path")]
    pub historical_data_path: String,

    /// Plant catalog JSON
    #[serde(default = "default_plant_catalog_path")]
    pub plant_catalog_path: String,

    #[serde(default = "default_seed")]
    pub split_seed: u64,

    #[serde(default = "default_seed")]
    pub forest_seed: u64,

    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,

    #[serde(default = "default_n_trees")]
    pub n_trees: usize,

    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,

    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,

    /// Maximum number of recommendations returned
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// How historical outcomes are labelled in the training set
    #[serde(default)]
    pub label_policy: LabelPolicy,

    /// Coordinate used by the command-line run
    #[serde(default = "default_latitude")]
    pub latitude: f64,

    #[serde(default = "default_longitude")]
    pub longitude: f64,
}

fn default_climate_api_url() -> String {
    "https://power.larc.nasa.gov/api/temporal/daily/point".to_string()
}

fn default_climate_community() -> String {
    "AG".to_string()
}

fn default_climate_window_days() -> u32 {
    365
}

fn default_climate_max_retries() -> u32 {
    3
}

fn default_climate_backoff_secs() -> u64 {
    5
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_model_path() -> String {
    "plant_recommendation_model.json".to_string()
}

fn default_historical_data_path() -> String {
    "data/plant_historical_data.csv".to_string()
}

fn default_plant_catalog_path() -> String {
    "data/plant_catalog.json".to_string()
}

fn default_seed() -> u64 {
    42
}

fn default_test_fraction() -> f64 {
    0.2
}

fn default_n_trees() -> usize {
    200
}

fn default_min_samples_split() -> usize {
    5
}

fn default_min_samples_leaf() -> usize {
    2
}

fn default_top_k() -> usize {
    5
}

fn default_latitude() -> f64 {
    40.7128
}

fn default_longitude() -> f64 {
    -74.0060
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn climate_settings(&self) -> ClimateClientSettings {
        ClimateClientSettings {
            base_url: self.climate_api_url.clone(),
            community: self.climate_community.clone(),
            window_days: self.climate_window_days,
            max_retries: self.climate_max_retries,
            backoff: Duration::from_secs(self.climate_backoff_secs),
            timeout: Duration::from_secs(self.http_timeout_secs),
        }
    }

    pub fn training_config(&self) -> TrainingConfig {
        TrainingConfig {
            test_fraction: self.test_fraction,
            split_seed: self.split_seed,
            forest: ForestParams {
                n_trees: self.n_trees,
                min_samples_split: self.min_samples_split,
                min_samples_leaf: self.min_samples_leaf,
                seed: self.forest_seed,
                ..ForestParams::default()
            },
        }
    }
}
