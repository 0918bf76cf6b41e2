use std::collections::BTreeMap;

use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Coordinate, PlantCatalog, Recommendation},
    services::{features::to_inference_vector, land_data::LandDataAssembler, model::TrainedModelArtifact},
};

/// Produces ranked plant suggestions for a location
///
/// The artifact and catalog are borrowed read-only, so one loaded model can serve
/// any number of concurrent requests. Swapping in a retrained artifact is up to
/// the caller.
#[derive(Clone)]
pub struct RecommendationRanker {
    assembler: LandDataAssembler,
}

impl RecommendationRanker {
    pub fn new(assembler: LandDataAssembler) -> Self {
        Self { assembler }
    }

    /// Top `top_k` plants for the coordinate, most probable first
    ///
    /// Fails with the upstream error when land data cannot be assembled; nothing
    /// is ranked in that case. Predicted classes without a catalog entry are
    /// dropped, so fewer than `top_k` items may come back.
    #[tracing::instrument(
        skip_all,
        fields(request_id = %Uuid::new_v4(), coordinate = %coordinate, top_k = top_k)
    )]
    pub async fn recommend(
        &self,
        coordinate: Coordinate,
        artifact: &TrainedModelArtifact,
        catalog: &PlantCatalog,
        top_k: usize,
    ) -> AppResult<Vec<Recommendation>> {
        let land = self.assembler.assemble(coordinate).await.map_err(|e| {
            tracing::error!(error = %e, "Unable to get land data for recommendations");
            e
        })?;

        let vector = to_inference_vector(&land);
        let probabilities = artifact.predict_probabilities(&vector)?;
        let recommendations = rank(probabilities, catalog, top_k);

        for rec in &recommendations {
            tracing::info!(
                plant = %rec.plant_name,
                score = rec.confidence,
                "Recommended plant"
            );
        }

        Ok(recommendations)
    }
}

/// Sorts by probability (descending, then name ascending), keeps `top_k`, joins to the catalog
pub fn rank(
    probabilities: BTreeMap<String, f64>,
    catalog: &PlantCatalog,
    top_k: usize,
) -> Vec<Recommendation> {
    let mut scored: Vec<(String, f64)> = probabilities.into_iter().collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    scored.truncate(top_k);

    scored
        .into_iter()
        .filter_map(|(plant_name, confidence)| match catalog.get(&plant_name) {
            Some(profile) => Some(Recommendation {
                profile: profile.clone(),
                plant_name,
                confidence,
            }),
            None => {
                tracing::debug!(class = %plant_name, "Predicted class not in catalog, skipping");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::AppError;
    use crate::models::plant::fixtures::profile_around;
    use crate::models::{ClimateSample, FEATURE_COUNT};
    use crate::services::features::{build_training_set, LabelPolicy};
    use crate::services::model::{ForestParams, RecommendationModel, TrainingConfig};
    use crate::services::providers::{MockClimateSource, PlaceholderSoilSource};

    fn probabilities(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn catalog(names: &[&str]) -> PlantCatalog {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| profile_around(name, [i as f64; FEATURE_COUNT]))
            .collect()
    }

    fn names(recs: &[Recommendation]) -> Vec<&str> {
        recs.iter().map(|r| r.plant_name.as_str()).collect()
    }

    #[test]
    fn test_rank_orders_by_probability_then_name() {
        let probs = probabilities(&[
            ("Pepper", 0.1),
            ("Tomato", 0.3),
            ("Basil", 0.3),
            ("Carrot", 0.2),
            ("Lettuce", 0.1),
        ]);
        let recs = rank(
            probs,
            &catalog(&["Tomato", "Basil", "Carrot", "Pepper", "Lettuce"]),
            5,
        );

        assert_eq!(names(&recs), vec!["Basil", "Tomato", "Carrot", "Lettuce", "Pepper"]);
        assert_eq!(recs[0].confidence, 0.3);
        assert_eq!(recs[0].profile.plant_name, "Basil");
    }

    #[test]
    fn test_rank_truncates_to_top_k() {
        let probs = probabilities(&[("Tomato", 0.5), ("Basil", 0.3), ("Carrot", 0.2)]);
        let recs = rank(probs, &catalog(&["Tomato", "Basil", "Carrot"]), 2);

        assert_eq!(names(&recs), vec!["Tomato", "Basil"]);
    }

    #[test]
    fn test_rank_drops_classes_missing_from_catalog() {
        let probs = probabilities(&[("1", 0.4), ("Tomato", 0.3), ("0", 0.2), ("Basil", 0.1)]);
        let recs = rank(probs, &catalog(&["Tomato", "Basil"]), 3);

        assert!(recs.len() < 3);
        assert_eq!(names(&recs), vec!["Tomato"]);
    }

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

    fn ranker(climate_source: MockClimateSource) -> RecommendationRanker {
        RecommendationRanker::new(LandDataAssembler::new(
            Arc::new(climate_source),
            Arc::new(PlaceholderSoilSource),
        ))
    }

    fn artifact(catalog: &PlantCatalog) -> TrainedModelArtifact {
        let set = build_training_set(&[], catalog, LabelPolicy::Mixed);
        RecommendationModel::new(TrainingConfig {
            forest: ForestParams {
                n_trees: 20,
                ..ForestParams::default()
            },
            ..TrainingConfig::default()
        })
        .train(&set.features, &set.labels)
        .unwrap()
        .artifact
    }

    #[tokio::test]
    async fn test_recommend_is_deterministic() {
        let mut climate_source = MockClimateSource::new();
        climate_source
            .expect_fetch()
            .times(2)
            .returning(|_| Ok(climate()));
        climate_source.expect_name().return_const("mock");

        let plants = catalog(&["Tomato", "Basil", "Carrot", "Pepper", "Lettuce", "Rose"]);
        let artifact = artifact(&plants);
        let ranker = ranker(climate_source);
        let coordinate = Coordinate::new(40.0, -74.0).unwrap();

        let first = ranker.recommend(coordinate, &artifact, &plants, 5).await.unwrap();
        let second = ranker.recommend(coordinate, &artifact, &plants, 5).await.unwrap();

        assert_eq!(first, second);
        assert!(first.len() <= 5);
        assert!(first
            .windows(2)
            .all(|w| w[0].confidence > w[1].confidence
                || (w[0].confidence == w[1].confidence && w[0].plant_name < w[1].plant_name)));
    }

    #[tokio::test]
    async fn test_recommend_surfaces_climate_failure() {
        let mut climate_source = MockClimateSource::new();
        climate_source.expect_fetch().returning(|_| {
            Err(AppError::DataUnavailable {
                attempts: 3,
                cause: "HTTP 503".to_string(),
            })
        });
        climate_source.expect_name().return_const("mock");

        let plants = catalog(&["Tomato", "Basil", "Carrot"]);
        let artifact = artifact(&plants);
        let result = ranker(climate_source)
            .recommend(Coordinate::new(40.0, -74.0).unwrap(), &artifact, &plants, 5)
            .await;

        assert!(matches!(result, Err(AppError::DataUnavailable { .. })));
    }
}
