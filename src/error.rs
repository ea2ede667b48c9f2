use thiserror::Error;

#[derive(Error, Debug)]
pub enum TallyError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unrecognized or malformed statement file. Parsing aborts with no partial results.
    #[error("{0}")]
    Format(String),

    /// Required fields missing from a manual entry row (1-based row index).
    #[error("Row {row}: missing {}", fields.join(", "))]
    Validation { row: usize, fields: Vec<String> },

    #[error("Could not save: {0}")]
    Persistence(String),

    #[error("Unknown vendor: {0}")]
    UnknownVendor(String),

    #[error("Unknown revenue source: {0}")]
    UnknownSource(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

impl TallyError {
    pub fn unsupported_format() -> Self {
        Self::Format("Unsupported CSV file format".to_string())
    }
}

pub type Result<T> = std::result::Result<T, TallyError>;
