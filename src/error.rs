use std::path;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("could not build map '{name}': {reason}")]
    MapBuild { name: String, reason: String },

    #[error(transparent)]
    RowTransform(#[from] RowTransformError),

    #[error("validation of {ingest} failed with {} infraction(s)", infractions.len())]
    Validation { ingest: String, infractions: Vec<String> },

    #[error("could not merge {}: {reason}", path.display())]
    Merge { path: path::PathBuf, reason: String },

    #[error("missing required column '{column}' in {}", path.display())]
    MissingColumn { path: path::PathBuf, column: String },

    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    #[error("could not derive {}: {reason}", path.display())]
    Prepare { path: path::PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yml::Error),

    #[error(transparent)]
    Polars(#[from] polars::error::PolarsError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Xml(#[from] xmltree::ParseError),
}

/// Raised by a transform when a row cannot be mapped. The job runner logs it and moves on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RowTransformError {
    #[error("missing required field '{0}'")]
    MissingField(String),

    #[error("field '{field}' has unexpected value '{value}'")]
    UnexpectedValue { field: String, value: String },

    #[error("map '{0}' was not loaded for this ingest")]
    MissingMap(String),

    #[error("association {id} violates provenance: {reason}")]
    Provenance { id: String, reason: String },

    #[error("transform panicked: {0}")]
    Panic(String),
}

impl IngestError {
    pub fn map_build<N: Into<String>, R: ToString>(name: N, reason: R) -> Self {
        IngestError::MapBuild { name: name.into(), reason: reason.to_string() }
    }
}
