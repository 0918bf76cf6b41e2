//! Training, persistence and inference for the plant classifier
//!
//! The fitted classifier only makes sense on inputs that went through the
//! imputer and scaler fitted alongside it, so the three are bundled into one
//! [`TrainedModelArtifact`] and saved and loaded as a single file.

use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::FEATURE_COUNT,
};

pub mod evaluation;
pub mod forest;
pub mod preprocessing;

pub use evaluation::{ClassMetrics, EvaluationReport};
pub use forest::{ForestParams, MaxFeatures, RandomForest};
pub use preprocessing::{MeanImputer, StandardScaler};

/// Split and forest settings; seeds are explicit so runs are reproducible
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    /// Fraction of rows held out for evaluation, rounded up
    pub test_fraction: f64,
    pub split_seed: u64,
    pub forest: ForestParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            split_seed: 42,
            forest: ForestParams::default(),
        }
    }
}

/// Classifier, imputer and scaler fitted together on one training split
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainedModelArtifact {
    classifier: RandomForest,
    imputer: MeanImputer,
    scaler: StandardScaler,
}

/// On-disk shape; every part is optional so a missing one is reported, not defaulted
#[derive(Deserialize)]
struct PersistedArtifact {
    classifier: Option<RandomForest>,
    imputer: Option<MeanImputer>,
    scaler: Option<StandardScaler>,
}

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub artifact: TrainedModelArtifact,
    pub report: EvaluationReport,
}

/// Trains plant classifiers
#[derive(Debug, Clone, Default)]
pub struct RecommendationModel {
    config: TrainingConfig,
}

impl RecommendationModel {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// Splits, fits imputer → scaler → forest on the training rows, and scores the held-out rows
    pub fn train<R: AsRef<[f64]>>(&self, rows: &[R], labels: &[String]) -> AppResult<TrainingOutcome> {
        let fraction = self.config.test_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(AppError::InvalidInput(format!(
                "test fraction {} must be within (0, 1)",
                fraction
            )));
        }
        if rows.len() != labels.len() {
            return Err(AppError::InvalidInput(format!(
                "{} feature rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }
        for row in rows {
            AppError::check_dimensions(FEATURE_COUNT, row.as_ref().len())?;
        }

        let n = rows.len();
        let n_test = (n as f64 * fraction).ceil() as usize;
        let n_train = n.saturating_sub(n_test);
        if n_test == 0 || n_train == 0 {
            return Err(AppError::InsufficientData(format!(
                "{} record(s) cannot be split into train and test sets",
                n
            )));
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut StdRng::seed_from_u64(self.config.split_seed));
        let (test_idx, train_idx) = order.split_at(n_test);

        let gather = |idx: &[usize]| -> (Vec<Vec<f64>>, Vec<String>) {
            idx.iter()
                .map(|&i| (rows[i].as_ref().to_vec(), labels[i].clone()))
                .unzip()
        };
        let (x_train, y_train) = gather(train_idx);
        let (x_test, y_test) = gather(test_idx);

        let imputer = MeanImputer::fit(&x_train, FEATURE_COUNT);
        let x_train = x_train
            .iter()
            .map(|row| imputer.transform(row))
            .collect::<AppResult<Vec<_>>>()?;
        let scaler = StandardScaler::fit(&x_train, FEATURE_COUNT)?;
        let x_train = x_train
            .iter()
            .map(|row| scaler.transform(row))
            .collect::<AppResult<Vec<_>>>()?;

        let classifier = RandomForest::fit(&x_train, &y_train, &self.config.forest)?;
        let artifact = TrainedModelArtifact {
            classifier,
            imputer,
            scaler,
        };

        let predicted = x_test
            .iter()
            .map(|row| artifact.predict_label(row))
            .collect::<AppResult<Vec<_>>>()?;
        let report = EvaluationReport::from_predictions(&y_test, &predicted);

        tracing::info!(
            train_rows = n_train,
            test_rows = n_test,
            classes = artifact.classes().len(),
            accuracy = report.accuracy,
            "Model trained"
        );
        tracing::info!("Classification report:\n{}", report);

        Ok(TrainingOutcome { artifact, report })
    }
}

impl TrainedModelArtifact {
    /// Class labels the classifier can emit, sorted
    pub fn classes(&self) -> &[String] {
        self.classifier.classes()
    }

    /// Probability per class for one raw (unimputed, unscaled) feature vector
    pub fn predict_probabilities(&self, vector: &[f64]) -> AppResult<BTreeMap<String, f64>> {
        let proba = self.class_probabilities(vector)?;
        Ok(self
            .classifier
            .classes()
            .iter()
            .cloned()
            .zip(proba)
            .collect())
    }

    /// Most probable class; ties go to the first class in sorted order
    pub fn predict_label(&self, vector: &[f64]) -> AppResult<String> {
        let proba = self.class_probabilities(vector)?;
        let mut best = 0;
        for (idx, p) in proba.iter().enumerate() {
            if *p > proba[best] {
                best = idx;
            }
        }
        Ok(self.classifier.classes()[best].clone())
    }

    fn class_probabilities(&self, vector: &[f64]) -> AppResult<Vec<f64>> {
        AppError::check_dimensions(FEATURE_COUNT, vector.len())?;
        let imputed = self.imputer.transform(vector)?;
        let scaled = self.scaler.transform(&imputed)?;
        self.classifier.predict_proba(&scaled)
    }

    /// Writes all three parts to a sibling temp file, then renames it over `path`
    pub fn save(&self, path: impl AsRef<Path>) -> AppResult<()> {
        let path = path.as_ref();
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");

        let written = File::create(&tmp).map_err(AppError::from).and_then(|file| {
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, self)?;
            writer.flush()?;
            writer
                .into_inner()
                .map_err(|e| AppError::Io(e.into_error()))?
                .sync_all()?;
            Ok(())
        });

        if let Err(e) = written.and_then(|()| fs::rename(&tmp, path).map_err(AppError::from)) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }

        tracing::info!(path = %path.display(), "Model saved");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let persisted: PersistedArtifact = serde_json::from_reader(reader)
            .map_err(|e| AppError::ArtifactCorrupt(format!("unreadable artifact: {}", e)))?;

        let missing = |part: &str| AppError::ArtifactCorrupt(format!("missing {}", part));
        let artifact = Self {
            classifier: persisted.classifier.ok_or_else(|| missing("classifier"))?,
            imputer: persisted.imputer.ok_or_else(|| missing("imputer"))?,
            scaler: persisted.scaler.ok_or_else(|| missing("scaler"))?,
        };
        artifact.validate()?;

        tracing::info!(
            path = %path.display(),
            classes = artifact.classes().len(),
            "Model loaded"
        );
        Ok(artifact)
    }

    fn validate(&self) -> AppResult<()> {
        let widths = [
            ("classifier", self.classifier.n_features()),
            ("imputer", self.imputer.n_features()),
            ("scaler", self.scaler.n_features()),
        ];
        for (part, width) in widths {
            if width != FEATURE_COUNT {
                return Err(AppError::ArtifactCorrupt(format!(
                    "{} has {} features, expected {}",
                    part, width, FEATURE_COUNT
                )));
            }
        }
        self.classifier.validate().map_err(AppError::ArtifactCorrupt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeatureVector;

    const TOMATO: FeatureVector = [24.0, 120.0, 250.0, 60.0, 2.5, 0.3, 20.0, 30.0, 50.0, 6.5, 3.0];
    const LETTUCE: FeatureVector = [20.0, 200.0, 220.0, 70.0, 1.5, 0.35, 15.0, 35.0, 50.0, 6.0, 4.0];

    fn quick_config() -> TrainingConfig {
        TrainingConfig {
            forest: ForestParams {
                n_trees: 25,
                ..ForestParams::default()
            },
            ..TrainingConfig::default()
        }
    }

    /// Ten jittered rows around each plant's centroid
    fn dataset() -> (Vec<FeatureVector>, Vec<String>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..10 {
            let jitter = 1.0 + (i as f64 - 5.0) * 0.01;
            rows.push(TOMATO.map(|v| v * jitter));
            labels.push("Tomato".to_string());
            rows.push(LETTUCE.map(|v| v * jitter));
            labels.push("Lettuce".to_string());
        }
        (rows, labels)
    }

    fn trained() -> TrainedModelArtifact {
        let (rows, labels) = dataset();
        RecommendationModel::new(quick_config())
            .train(&rows, &labels)
            .unwrap()
            .artifact
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("{}-{}.json", name, uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_train_and_predict() {
        let (rows, labels) = dataset();
        let outcome = RecommendationModel::new(quick_config())
            .train(&rows, &labels)
            .unwrap();

        assert_eq!(outcome.report.test_size, 4);
        assert_eq!(outcome.artifact.classes(), &["Lettuce".to_string(), "Tomato".to_string()]);

        let proba = outcome.artifact.predict_probabilities(&TOMATO).unwrap();
        assert!(proba["Tomato"] > 0.5, "{:?}", proba);
        assert_eq!(outcome.artifact.predict_label(&LETTUCE).unwrap(), "Lettuce");
    }

    #[test]
    fn test_probabilities_form_a_distribution() {
        let artifact = trained();
        let mut probe = TOMATO;
        probe[3] = f64::NAN;

        let proba = artifact.predict_probabilities(&probe).unwrap();
        let total: f64 = proba.values().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(proba.values().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_training_is_reproducible() {
        assert_eq!(trained(), trained());
    }

    #[test]
    fn test_insufficient_data() {
        let model = RecommendationModel::new(quick_config());

        let empty: Vec<FeatureVector> = Vec::new();
        assert!(matches!(
            model.train(&empty, &[]),
            Err(AppError::InsufficientData(_))
        ));
        assert!(matches!(
            model.train(&[TOMATO], &["Tomato".to_string()]),
            Err(AppError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_two_rows_is_enough_to_split() {
        let outcome = RecommendationModel::new(quick_config())
            .train(&[TOMATO, TOMATO], &["Tomato".to_string(), "Tomato".to_string()])
            .unwrap();
        assert_eq!(outcome.report.test_size, 1);
        assert_eq!(outcome.report.accuracy, 1.0);
    }

    #[test]
    fn test_train_rejects_wrong_width_rows() {
        let rows = vec![vec![1.0; 10], vec![1.0; 10]];
        let labels = vec!["a".to_string(), "b".to_string()];
        assert!(matches!(
            RecommendationModel::default().train(&rows, &labels),
            Err(AppError::DimensionMismatch { expected: 11, actual: 10 })
        ));
    }

    #[test]
    fn test_train_rejects_misaligned_labels() {
        assert!(matches!(
            RecommendationModel::default().train(&[TOMATO, LETTUCE], &["Tomato".to_string()]),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_inference_dimension_guard() {
        let artifact = trained();
        for len in [10, 12] {
            let vector = vec![1.0; len];
            assert!(matches!(
                artifact.predict_probabilities(&vector),
                Err(AppError::DimensionMismatch { expected: 11, actual }) if actual == len
            ));
        }
    }

    #[test]
    fn test_save_load_round_trip() {
        let artifact = trained();
        let path = temp_path("artifact");

        artifact.save(&path).unwrap();
        let loaded = TrainedModelArtifact::load(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(loaded, artifact);
        for probe in [TOMATO, LETTUCE, [0.0; FEATURE_COUNT]] {
            assert_eq!(
                loaded.predict_probabilities(&probe).unwrap(),
                artifact.predict_probabilities(&probe).unwrap()
            );
        }
    }

    #[test]
    fn test_load_rejects_missing_part() {
        let artifact = trained();
        let mut value = serde_json::to_value(&artifact).unwrap();
        value.as_object_mut().unwrap().remove("scaler");
        let path = temp_path("artifact-missing-scaler");
        fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();

        let result = TrainedModelArtifact::load(&path);
        fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(AppError::ArtifactCorrupt(msg)) if msg.contains("scaler")));
    }

    #[test]
    fn test_load_reports_width_of_mismatched_part() {
        let artifact = trained();
        let mut value = serde_json::to_value(&artifact).unwrap();
        value["imputer"]["means"].as_array_mut().unwrap().pop();
        let path = temp_path("artifact-narrow-imputer");
        fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();

        let result = TrainedModelArtifact::load(&path);
        fs::remove_file(&path).unwrap();

        assert!(matches!(
            result,
            Err(AppError::ArtifactCorrupt(msg)) if msg == "imputer has 10 features, expected 11"
        ));
    }

    #[test]
    fn test_load_rejects_garbage() {
        let path = temp_path("artifact-garbage");
        fs::write(&path, b"not a model").unwrap();

        let result = TrainedModelArtifact::load(&path);
        fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(AppError::ArtifactCorrupt(_))));
    }

    #[test]
    fn test_rejects_invalid_test_fraction() {
        let model = RecommendationModel::new(TrainingConfig {
            test_fraction: 1.0,
            ..quick_config()
        });
        let (rows, labels) = dataset();
        assert!(matches!(
            model.train(&rows, &labels),
            Err(AppError::InvalidInput(_))
        ));
    }
}
