use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("No data to analyze: the trial balance contains no rows")]
    NoData,

    #[error("Invalid configuration for '{field}': {details}")]
    InvalidConfig { field: String, details: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
