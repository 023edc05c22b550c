//! JSON documents on disk for the settings/history store.
//!
//! Writes land in a `<name>.tmp` sibling that is renamed over the target, so
//! readers only ever see a complete document.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StoreError;

/// Serialize `value` as pretty JSON and replace `path` with it.
///
/// Parent directories are created on demand.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let staging = staging_path(path);
    std::fs::write(&staging, &bytes)?;
    if let Err(e) = std::fs::rename(&staging, path) {
        let _ = std::fs::remove_file(&staging);
        return Err(e.into());
    }
    Ok(())
}

/// Read a JSON document, `None` when the file does not exist.
///
/// Unparseable content is `StoreError::Serialization`; other IO failures are
/// `StoreError::Io`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

/// `history.json` stages as `history.json.tmp`.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Entry {
        topic: String,
        artifacts: u32,
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");

        let data = vec![Entry {
            topic: "Edge AI".into(),
            artifacts: 4,
        }];

        write_json_atomic(&path, &data).unwrap();
        let loaded: Option<Vec<Entry>> = read_json(&path).unwrap();
        assert_eq!(loaded, Some(data));
    }

    #[test]
    fn test_write_creates_parent_dirs_and_leaves_no_staging_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("store").join("settings.json");
        write_json_atomic(&path, &"x").unwrap();
        assert!(path.exists());
        assert!(!dir.path().join("nested/store/settings.json.tmp").exists());
    }

    #[test]
    fn test_write_replaces_existing_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        write_json_atomic(&path, &1u32).unwrap();
        write_json_atomic(&path, &2u32).unwrap();
        assert_eq!(read_json::<u32>(&path).unwrap(), Some(2));
    }

    #[test]
    fn test_staging_path_keeps_extension() {
        assert_eq!(
            staging_path(Path::new("/data/history.json")),
            PathBuf::from("/data/history.json.tmp")
        );
    }

    #[test]
    fn test_read_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let result: Option<Entry> = read_json(&dir.path().join("absent.json")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_read_corrupt_is_serialization_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = read_json::<Entry>(&path).unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn test_read_directory_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = read_json::<Entry>(dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
