//! The on-disk YAML config file shape (`read_yaml`/`write_yaml` in
//! `slReadConfig.py`).
//!
//! Each top-level section is kept as a map of id to raw [`Value`] rather
//! than typed structs: the file may carry partially-filled entries that
//! only become valid once merged with defaults elsewhere, exactly as the
//! original's untyped YAML dict was validated lazily, one entry at a time,
//! against its schema.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub servers: HashMap<String, Value>,
    #[serde(default)]
    pub meetings: HashMap<String, Value>,
    #[serde(default)]
    pub commands: HashMap<String, Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("failed to read {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("failed to parse {path} as YAML: {source}")]
    Parse { path: String, source: serde_yaml::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: String, source: std::io::Error },
    #[error("failed to serialize config as YAML: {source}")]
    Serialize { source: serde_yaml::Error },
}

pub fn read(path: &Path) -> Result<ConfigFile, FileError> {
    let raw = std::fs::read_to_string(path).map_err(|source| FileError::Read {
        path: path.display().to_string(),
        source,
    })?;
    serde_yaml::from_str(&raw).map_err(|source| FileError::Parse {
        path: path.display().to_string(),
        source,
    })
}

pub fn write(path: &Path, config: &ConfigFile) -> Result<(), FileError> {
    let raw = serde_yaml::to_string(config).map_err(|source| FileError::Serialize { source })?;
    std::fs::write(path, raw).map_err(|source| FileError::Write {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_yaml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.yml");

        let mut config = ConfigFile::default();
        config.servers.insert("prod".to_string(), serde_json::json!({"id": "prod"}));

        write(&path, &config).expect("write succeeds");
        let loaded = read(&path).expect("read succeeds");

        assert_eq!(loaded.servers.get("prod"), config.servers.get("prod"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = Path::new("/nonexistent/config.yml");
        assert!(read(path).is_err());
    }
}
