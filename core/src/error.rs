use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Row {row}, column '{column}': cannot parse '{value}'")]
    CellParse {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),
}

pub type ReconResult<T> = Result<T, ReconError>;
