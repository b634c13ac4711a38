use std::path::PathBuf;
use thiserror::Error;

use crate::section::SaveStage;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Failed to serialize '{key}': {source}")]
    Serialize {
        key: String,
        source: serde_yaml::Error,
    },

    #[error("{path} does not hold a YAML mapping at its root")]
    NotAMapping { path: PathBuf },

    #[error("Invalid section mapping: {reason}")]
    Mapping { reason: String },

    #[error("Section '{0}' has no file mapping")]
    SectionNotMapped(String),

    #[error("Required sections missing: {}", .0.join(", "))]
    MissingSections(Vec<String>),

    #[error(
        "Conflicting keys must be merged or fixed before combining: {}",
        .0.join(", ")
    )]
    UnresolvedConflicts(Vec<String>),

    #[error("Save failed while {stage} ({path}): {source}")]
    SaveFailed {
        stage: SaveStage,
        path: PathBuf,
        source: Box<EditorError>,
    },

    #[error("Configuration error: {0}")]
    Settings(#[from] confique::Error),

    #[error("Invalid value for '{arg}': {reason}")]
    InvalidArgument { arg: String, reason: String },

    #[error("File not found: {0}")]
    FileNotFound(String),
}

impl EditorError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EditorError::Io {
            path: path.into(),
            source,
        }
    }
}
