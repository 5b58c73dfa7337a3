//! Key-value persistence for saved planner tabs.
//!
//! Values are stored as JSON under string keys. The calculation core never
//! touches this; commands read saved inputs before calculating and write them
//! back afterwards.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("store {path} is not a JSON object: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid JSON for key '{key}': {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub trait KeyValueStore {
    /// Stored value for `key`, or `default` if nothing is stored
    fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, StoreError>;

    fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError>;

    fn contains(&self, key: &str) -> bool;
}

fn decode<T: DeserializeOwned>(key: &str, value: &Value) -> Result<T, StoreError> {
    T::deserialize(value).map_err(|source| StoreError::Json {
        key: key.to_string(),
        source,
    })
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|source| StoreError::Json {
        key: key.to_string(),
        source,
    })
}

/// In-memory store, nothing survives the process
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Map<String, Value>,
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, StoreError> {
        self.values.get(key).map_or(Ok(default), |v| decode(key, v))
    }

    fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), encode(key, value)?);
        Ok(())
    }

    fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

/// Store backed by a single JSON object file. The file is read once when
/// opened and rewritten in full on every `set`.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Map<String, Value>,
}

impl JsonFileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let io_err = |source: std::io::Error| StoreError::Io {
            path: path.clone(),
            source,
        };

        let values = if path.exists() {
            let reader = BufReader::new(File::open(&path).map_err(io_err)?);
            serde_json::from_reader(reader).map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                source,
            })?
        } else {
            log::debug!("Store {} does not exist yet", path.display());
            Map::new()
        };

        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        let io_err = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut writer = BufWriter::new(File::create(&self.path).map_err(io_err)?);
        serde_json::to_writer_pretty(&mut writer, &self.values).map_err(|source| {
            StoreError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        writer.flush().map_err(io_err)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, StoreError> {
        self.values.get(key).map_or(Ok(default), |v| decode(key, v))
    }

    fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), encode(key, value)?);
        self.flush()
    }

    fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}
