//! Location-based plant recommendations
//!
//! Climate means from NASA POWER and soil properties are merged into an
//! 11-feature land record, scored by a random forest trained on historical
//! observations and catalog profiles, and ranked against the plant catalog.

pub mod config;
pub mod data;
pub mod error;
pub mod models;
pub mod services;

pub use error::{AppError, AppResult};
