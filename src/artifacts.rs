//! Model artifact storage.
//!
//! Artifacts are `<key>.smodel` files. The payload is JSON, optionally packed
//! into a single-entry zip archive; readers sniff the zip magic so both forms load.

use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::app_dirs::{self, AppDirError};
use crate::config::ModelSettings;

/// Key of the pre-trained model shipped with the app.
pub const DEMO_MODEL_KEY: &str = "demo-shape-classifier";
/// File extension for stored artifacts.
pub const ARTIFACT_EXTENSION: &str = "smodel";

const BUNDLED_MODELS_DIR: &str = "models";
const PAYLOAD_ENTRY: &str = "model.json";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const MAX_PAYLOAD_BYTES: u64 = 256 * 1024 * 1024;

/// Errors raised while locating or (de)serializing artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Invalid model key {key:?}")]
    InvalidKey { key: String },
    #[error("No model artifact named {key}")]
    NotFound { key: String },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Zip error: {0}")]
    Zip(String),
    #[error("Invalid payload: {0}")]
    Invalid(String),
}

/// Directory-backed artifact store with read-only fallbacks.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    fallbacks: Vec<PathBuf>,
}

impl ArtifactStore {
    /// Store writing to `dir`, falling back to the `models/` folder next to the executable.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            fallbacks: bundled_models_dir().into_iter().collect(),
        }
    }

    /// Store with an explicit fallback list.
    pub fn with_fallbacks(dir: impl Into<PathBuf>, fallbacks: Vec<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            fallbacks,
        }
    }

    pub fn from_settings(settings: &ModelSettings) -> Result<Self, AppDirError> {
        let dir = match &settings.models_dir {
            Some(dir) => dir.clone(),
            None => app_dirs::models_dir()?,
        };
        Ok(Self::new(dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writable path for `key`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, ArtifactError> {
        validate_key(key)?;
        Ok(self.dir.join(file_name(key)))
    }

    /// First existing artifact for `key`, searching the store then its fallbacks.
    pub fn resolve(&self, key: &str) -> Result<PathBuf, ArtifactError> {
        validate_key(key)?;
        let name = file_name(key);
        std::iter::once(&self.dir)
            .chain(self.fallbacks.iter())
            .map(|dir| dir.join(&name))
            .find(|path| path.is_file())
            .ok_or_else(|| ArtifactError::NotFound {
                key: key.to_string(),
            })
    }

    pub fn read(&self, key: &str) -> Result<Vec<u8>, ArtifactError> {
        let path = self.resolve(key)?;
        debug!("Reading model artifact {}", path.display());
        std::fs::read(&path).map_err(|source| ArtifactError::Read { path, source })
    }

    /// Atomically write `bytes` under `key`, replacing any existing artifact.
    pub fn write(&self, key: &str, bytes: &[u8]) -> Result<PathBuf, ArtifactError> {
        let path = self.path_for(key)?;
        let write_err = |source: std::io::Error| ArtifactError::Write {
            path: path.clone(),
            source,
        };
        std::fs::create_dir_all(&self.dir).map_err(write_err)?;
        let mut temp = tempfile::NamedTempFile::new_in(&self.dir).map_err(write_err)?;
        temp.write_all(bytes).map_err(write_err)?;
        temp.as_file().sync_all().map_err(write_err)?;
        temp.persist(&path).map_err(|err| write_err(err.error))?;
        Ok(path)
    }

    /// Keys stored in the primary directory, sorted.
    pub fn keys(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut keys: Vec<String> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == ARTIFACT_EXTENSION))
            .filter_map(|path| path.file_stem()?.to_str().map(str::to_string))
            .collect();
        keys.sort();
        keys
    }
}

/// Fresh unique key of the form `<prefix>-<uuid>`.
pub fn export_key(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

/// Wrap a JSON payload, deflating it into a zip entry when `compress` is set.
pub fn encode_payload(json: &[u8], compress: bool) -> Result<Vec<u8>, ArtifactError> {
    if !compress {
        return Ok(json.to_vec());
    }
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    zip.start_file(PAYLOAD_ENTRY, options)
        .map_err(|err| ArtifactError::Zip(err.to_string()))?;
    zip.write_all(json)
        .map_err(|err| ArtifactError::Zip(err.to_string()))?;
    let cursor = zip
        .finish()
        .map_err(|err| ArtifactError::Zip(err.to_string()))?;
    Ok(cursor.into_inner())
}

/// Recover the JSON payload from plain or zipped artifact bytes.
pub fn decode_payload(bytes: &[u8]) -> Result<Vec<u8>, ArtifactError> {
    if !bytes.starts_with(ZIP_MAGIC) {
        return Ok(bytes.to_vec());
    }
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|err| ArtifactError::Zip(err.to_string()))?;
    let entry = archive
        .by_name(PAYLOAD_ENTRY)
        .map_err(|err| ArtifactError::Zip(err.to_string()))?;
    if entry.size() > MAX_PAYLOAD_BYTES {
        return Err(ArtifactError::Invalid(format!(
            "Payload is too large ({} bytes, limit {MAX_PAYLOAD_BYTES})",
            entry.size()
        )));
    }
    let mut json = Vec::with_capacity(entry.size() as usize);
    entry
        .take(MAX_PAYLOAD_BYTES)
        .read_to_end(&mut json)
        .map_err(|err| ArtifactError::Zip(err.to_string()))?;
    Ok(json)
}

fn file_name(key: &str) -> String {
    format!("{key}.{ARTIFACT_EXTENSION}")
}

fn validate_key(key: &str) -> Result<(), ArtifactError> {
    let invalid = key.is_empty()
        || key.trim() != key
        || key == "."
        || key == ".."
        || key.contains(['/', '\\', ':']);
    if invalid {
        return Err(ArtifactError::InvalidKey {
            key: key.to_string(),
        });
    }
    Ok(())
}

fn bundled_models_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    Some(exe.parent()?.join(BUNDLED_MODELS_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_then_read_uses_extension() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::with_fallbacks(dir.path(), Vec::new());
        let path = store.write("sketchy", b"{}").unwrap();
        assert_eq!(path, dir.path().join("sketchy.smodel"));
        assert_eq!(store.read("sketchy").unwrap(), b"{}");
        assert_eq!(store.keys(), vec!["sketchy".to_string()]);
    }

    #[test]
    fn resolve_falls_back_to_bundled_dir() {
        let primary = tempdir().unwrap();
        let bundled = tempdir().unwrap();
        std::fs::write(bundled.path().join("demo-shape-classifier.smodel"), b"x").unwrap();
        let store =
            ArtifactStore::with_fallbacks(primary.path(), vec![bundled.path().to_path_buf()]);
        let resolved = store.resolve(DEMO_MODEL_KEY).unwrap();
        assert!(resolved.starts_with(bundled.path()));
    }

    #[test]
    fn missing_and_invalid_keys() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::with_fallbacks(dir.path(), Vec::new());
        assert!(matches!(
            store.resolve("absent"),
            Err(ArtifactError::NotFound { .. })
        ));
        for key in ["", "../escape", "a/b", " padded"] {
            assert!(
                matches!(store.resolve(key), Err(ArtifactError::InvalidKey { .. })),
                "{key:?}"
            );
        }
    }

    #[test]
    fn compressed_payload_is_zip_and_decodes() {
        let json = br#"{"classes":["Circle"]}"#;
        let packed = encode_payload(json, true).unwrap();
        assert!(packed.starts_with(ZIP_MAGIC));
        assert_eq!(decode_payload(&packed).unwrap(), json);
        assert_eq!(decode_payload(&encode_payload(json, false).unwrap()).unwrap(), json);
    }

    #[test]
    fn export_keys_are_unique() {
        let a = export_key(DEMO_MODEL_KEY);
        let b = export_key(DEMO_MODEL_KEY);
        assert_ne!(a, b);
        assert!(a.starts_with("demo-shape-classifier-"));
        validate_key(&a).unwrap();
    }
}
