/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Climate data unavailable after {attempts} attempt(s): {cause}")]
    DataUnavailable { attempts: u32, cause: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Feature vector has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Model artifact corrupt: {0}")]
    ArtifactCorrupt(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl AppError {
    /// Checks a vector length against the fixed feature schema
    pub fn check_dimensions(expected: usize, actual: usize) -> AppResult<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(AppError::DimensionMismatch { expected, actual })
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
