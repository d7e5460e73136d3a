use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocationError {
    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A node points at a parent that is not part of the gazetteer.
    #[error("{kind} '{id}' references unknown parent '{parent}'")]
    DanglingParent {
        kind: &'static str,
        id: String,
        parent: String,
    },

    #[error("Duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },

    #[error("Unsupported gazetteer format: {0}")]
    UnsupportedFormat(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, LocationError>;
