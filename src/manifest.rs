use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid manifest: {0}")]
    Json(#[from] serde_json::Error),
    #[error("version {0:?} is not present in the manifest")]
    UnknownVersion(String),
    #[error("a --version label is required to select messages from a manifest")]
    MissingVersionLabel,
}

/// Message manifest keyed by version label:
///
/// ```json
/// { "versions": { "21.3.5": ["IATA_OrderViewRS", "IATA_OrderCreateRQ"] } }
/// ```
#[derive(Debug, Deserialize)]
pub struct MessageManifest {
    versions: BTreeMap<String, Vec<String>>,
}

impl MessageManifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }

    pub fn messages_for(&self, version: &str) -> Result<&[String], ManifestError> {
        self.versions
            .get(version)
            .map(Vec::as_slice)
            .ok_or_else(|| ManifestError::UnknownVersion(version.to_string()))
    }
}
