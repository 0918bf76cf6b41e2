//! Conversion of land records into fixed-order feature vectors
//!
//! The training set draws labels from two places:
//! - historical observations, labelled with their success outcome
//! - one synthetic row per catalog plant (the midpoint of each optimal range),
//!   labelled with the plant name
//!
//! Under [`LabelPolicy::Mixed`] both end up in one class space, so a trained
//! classifier predicts `"0"`, `"1"` and plant names side by side. The ranker
//! drops the outcome classes because they have no catalog entry, but they still
//! take probability mass. [`LabelPolicy::NearestProfile`] attributes each
//! successful observation to its recorded plant (when the catalog knows it) or
//! else the closest catalog plant, and discards failures, so every class is a plant.

use serde::{Deserialize, Serialize};

use crate::models::{
    FeatureVector, HistoricalRecord, LandRecord, PlantCatalog, FEATURE_COUNT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelPolicy {
    /// Historical rows keep their outcome (`"0"`/`"1"`) as class label
    #[default]
    Mixed,
    /// Successful historical rows take their recorded or nearest plant's name; failures are dropped
    NearestProfile,
}

/// Feature matrix and labels, row-aligned
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrainingSet {
    pub features: Vec<FeatureVector>,
    pub labels: Vec<String>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    fn push(&mut self, features: FeatureVector, label: String) {
        self.features.push(features);
        self.labels.push(label);
    }
}

/// Builds the classifier's training set from observations and catalog profiles
pub fn build_training_set(
    historical: &[HistoricalRecord],
    catalog: &PlantCatalog,
    policy: LabelPolicy,
) -> TrainingSet {
    let mut set = TrainingSet::default();
    let centroids: Vec<(&str, FeatureVector)> = catalog
        .iter()
        .map(|p| (p.plant_name.as_str(), p.centroid()))
        .collect();
    let spread = feature_spread(&centroids);

    let mut dropped = 0usize;
    for record in historical {
        let features = to_inference_vector(&record.land);
        match policy {
            LabelPolicy::Mixed => {
                let label = if record.successful_plant { "1" } else { "0" };
                set.push(features, label.to_string());
            }
            LabelPolicy::NearestProfile => {
                let recorded = record
                    .plant_name
                    .as_deref()
                    .filter(|name| catalog.get(name).is_some());
                let label = record
                    .successful_plant
                    .then(|| recorded.or_else(|| nearest_plant(&features, &centroids, &spread)))
                    .flatten();
                match label {
                    Some(name) => set.push(features, name.to_string()),
                    None => dropped += 1,
                }
            }
        }
    }

    for (name, centroid) in &centroids {
        set.push(*centroid, name.to_string());
    }

    tracing::info!(
        historical_rows = historical.len() - dropped,
        dropped_rows = dropped,
        profile_rows = centroids.len(),
        ?policy,
        "Training set assembled"
    );

    set
}

/// The 11 features of one record, in canonical order
pub fn to_inference_vector(record: &LandRecord) -> FeatureVector {
    record.features()
}

/// Per-feature standard deviation of the catalog centroids, 1.0 where degenerate
fn feature_spread(centroids: &[(&str, FeatureVector)]) -> FeatureVector {
    let mut spread = [1.0; FEATURE_COUNT];
    for (j, slot) in spread.iter_mut().enumerate() {
        let values: Vec<f64> = centroids
            .iter()
            .map(|(_, c)| c[j])
            .filter(|v| v.is_finite())
            .collect();
        if values.len() < 2 {
            continue;
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        if var > 0.0 {
            *slot = var.sqrt();
        }
    }
    spread
}

/// Closest centroid under spread-normalised Euclidean distance; missing values are ignored
fn nearest_plant<'a>(
    features: &FeatureVector,
    centroids: &[(&'a str, FeatureVector)],
    spread: &FeatureVector,
) -> Option<&'a str> {
    centroids
        .iter()
        .map(|(name, centroid)| {
            let distance: f64 = (0..FEATURE_COUNT)
                .filter(|&j| features[j].is_finite() && centroid[j].is_finite())
                .map(|j| ((features[j] - centroid[j]) / spread[j]).powi(2))
                .sum();
            (*name, distance)
        })
        .min_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)))
        .map(|(name, _)| name)
}
