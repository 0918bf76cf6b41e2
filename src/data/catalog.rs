use std::{fs::File, io::BufReader, path::Path};

use crate::{
    error::AppResult,
    models::{PlantCatalog, PlantProfile},
};

/// Reads a JSON array of plant profiles
pub fn load_plant_catalog(path: impl AsRef<Path>) -> AppResult<PlantCatalog> {
    let path = path.as_ref();
    let profiles: Vec<PlantProfile> = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    let catalog = PlantCatalog::new(profiles);

    tracing::info!(plants = catalog.len(), path = %path.display(), "Loaded plant catalog");
    Ok(catalog)
}
