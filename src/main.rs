use std::{path::Path, sync::Arc};

use plant_advisor::{
    config::Config,
    data::{load_historical_data, load_plant_catalog},
    models::Coordinate,
    services::{
        build_training_set,
        providers::{ClimateDataClient, PlaceholderSoilSource},
        LandDataAssembler, RecommendationModel, RecommendationRanker, TrainedModelArtifact,
    },
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plant_advisor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let force_retrain = std::env::args().any(|arg| arg == "--retrain");

    let catalog = load_plant_catalog(&config.plant_catalog_path)?;

    let artifact = match load_or_skip(&config.model_path, force_retrain) {
        Some(artifact) => artifact,
        None => {
            let historical = load_historical_data(&config.historical_data_path)?;
            if historical.is_empty() {
                anyhow::bail!("No historical data available. Cannot train model.");
            }

            let set = build_training_set(&historical, &catalog, config.label_policy);
            let outcome =
                RecommendationModel::new(config.training_config()).train(&set.features, &set.labels)?;
            outcome.artifact.save(&config.model_path)?;
            outcome.artifact
        }
    };

    let assembler = LandDataAssembler::new(
        Arc::new(ClimateDataClient::new(config.climate_settings())?),
        Arc::new(PlaceholderSoilSource),
    );
    let ranker = RecommendationRanker::new(assembler);
    let coordinate = Coordinate::new(config.latitude, config.longitude)?;

    let recommendations = ranker
        .recommend(coordinate, &artifact, &catalog, config.top_k)
        .await?;

    if recommendations.is_empty() {
        tracing::info!("No recommendations available.");
    }

    Ok(())
}

fn load_or_skip(path: &str, force_retrain: bool) -> Option<TrainedModelArtifact> {
    if force_retrain {
        tracing::info!("Training new model (forced retraining)");
        return None;
    }
    if !Path::new(path).exists() {
        tracing::info!(path, "Training new model (no saved model)");
        return None;
    }
    match TrainedModelArtifact::load(path) {
        Ok(artifact) => Some(artifact),
        Err(e) => {
            tracing::warn!(error = %e, "Training new model (saved model unusable)");
            None
        }
    }
}
