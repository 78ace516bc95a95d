use crate::Error;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

pub const STORAGE_ROOT_ENV: &str = "PDF_SIGN_STORAGE_ROOT";
pub const METADATA_PATH_ENV: &str = "PDF_SIGN_METADATA_PATH";

/// Where documents and their records are kept.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Artifacts are stored as `<storage_root>/<user_id>/<filename>`.
    pub storage_root: PathBuf,
    /// JSON file holding all document records.
    pub metadata_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage_root: PathBuf::from("uploads"),
            metadata_path: PathBuf::from("uploads").join("documents.json"),
        }
    }
}

impl Config {
    /// Defaults, overridden by environment variables when they are set.
    pub fn from_env() -> Self {
        let mut config = Config::default();
        if let Ok(root) = env::var(STORAGE_ROOT_ENV) {
            config.metadata_path = PathBuf::from(&root).join("documents.json");
            config.storage_root = PathBuf::from(root);
        }
        if let Ok(path) = env::var(METADATA_PATH_ENV) {
            config.metadata_path = PathBuf::from(path);
        }
        config
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let data = std::fs::read(path.as_ref())?;
        Ok(serde_json::from_slice(&data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_use_defaults() {
        let config: Config = serde_json::from_str(r#"{ "storageRoot": "/srv/pdf" }"#).unwrap();
        assert_eq!(config.storage_root, PathBuf::from("/srv/pdf"));
        assert_eq!(config.metadata_path, Config::default().metadata_path);
    }

    #[test]
    fn reads_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "storageRoot": "data", "metadataPath": "data/meta.json" }"#,
        )
        .unwrap();
        let config = Config::from_json_file(&path).unwrap();
        assert_eq!(config.storage_root, PathBuf::from("data"));
        assert_eq!(config.metadata_path, PathBuf::from("data/meta.json"));
        assert!(Config::from_json_file(dir.path().join("missing.json")).is_err());
    }
}
