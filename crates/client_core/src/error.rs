use shared::{domain::ProfileId, error::LookupError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("durable storage failed for key '{key}': {source}")]
    Backend {
        key: String,
        source: anyhow::Error,
    },
    #[error("persisted value under '{key}' could not be decoded: {source}")]
    Decode {
        key: String,
        source: serde_json::Error,
    },
    #[error("value for '{key}' could not be encoded: {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("resolved profile could not be saved: {0}")]
    Apply(String),
    #[error("watch-list index {index} is out of range for {len} entries")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("no watched profile with id {0}")]
    UnknownProfile(ProfileId),
    #[error(transparent)]
    Store(#[from] StoreError),
}
