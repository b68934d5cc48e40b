//! JSON configuration loading.

use crate::error::{ConfigError, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Read and deserialize a JSON file. Missing or malformed files are errors.
pub async fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}
