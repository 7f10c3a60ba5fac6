use thiserror::Error;

use crate::types::LocationId;

#[derive(Error, Debug)]
pub enum ToponymError {
    #[error("Invalid location {id}: {reason}")]
    InvalidLocation { id: LocationId, reason: String },

    #[error("Model incompatible with feature vector: {0}")]
    IncompatibleModel(String),

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("Index search failed for {searcher}: {message}")]
    IndexSearch { searcher: String, message: String },

    #[error("Gazetteer error: {0}")]
    Gazetteer(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ToponymError>;
