// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Durable key-value storage.
//!
//! Every wardrobe collection is persisted as one string value under one
//! named key. The storage contract is deliberately tiny: get a value, or
//! replace a value wholesale. There are no partial updates.
//!
//! # Backends
//!
//! - [`FileKeyValueStore`] keeps one JSON document per key inside a
//!   directory. Writes go to a temporary sibling first and are renamed into
//!   place, so a crash mid-write never leaves a half-written value behind.
//! - [`MemoryKeyValueStore`] keeps values in process memory.

use serde::{de::DeserializeOwned, Serialize};
use std::{
    collections::HashMap,
    future::Future,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::{debug, instrument, warn};

/// Durable string-keyed storage.
pub trait KeyValueStore: Send + Sync + 'static {
    /// Read value stored under `key`, or `None` if it was never written.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Replace value stored under `key`.
    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<()>> + Send;
}

/// Key-value store backed by a directory of files.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    root: PathBuf,
}

impl FileKeyValueStore {
    /// Open key-value store rooted at target directory.
    ///
    /// Creates the directory if it does not exist yet.
    ///
    /// # Errors
    ///
    /// - Return [`KvError::CreateRoot`] if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        mkdirp::mkdirp(&root).map_err(|err| KvError::CreateRoot {
            source: err,
            root: root.clone(),
        })?;

        Ok(Self { root })
    }

    /// Directory holding stored values.
    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    fn value_path(&self, key: &str) -> PathBuf {
        // INVARIANT: Keys never escape the store directory.
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.root.join(format!("{name}.json"))
    }
}

impl KeyValueStore for FileKeyValueStore {
    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.value_path(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("no value stored for {key}");
                Ok(None)
            }
            Err(err) => Err(KvError::Read {
                source: err,
                key: key.into(),
            }),
        }
    }

    #[instrument(skip(self, value), level = "debug")]
    async fn set(&self, key: &str, value: String) -> Result<()> {
        let path = self.value_path(key);
        let staging = path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4().simple()));

        tokio::fs::write(&staging, value.as_bytes())
            .await
            .map_err(|err| KvError::Write {
                source: err,
                key: key.into(),
            })?;

        // INVARIANT: Replace the stored value atomically.
        if let Err(err) = tokio::fs::rename(&staging, &path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(KvError::Write {
                source: err,
                key: key.into(),
            });
        }

        debug!("stored {} bytes under {key}", value.len());
        Ok(())
    }
}

/// Key-value store kept in process memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryKeyValueStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKeyValueStore {
    /// Construct new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.lock().map_err(|_| KvError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let mut values = self.values.lock().map_err(|_| KvError::Poisoned)?;
        values.insert(key.into(), value);
        Ok(())
    }
}

/// Read JSON array stored under `key`.
///
/// Missing, unreadable, or malformed payloads all read as an empty
/// collection. Only the latter two are logged.
pub(crate) async fn read_json_list<K, T>(store: &K, key: &str) -> Vec<T>
where
    K: KeyValueStore,
    T: DeserializeOwned,
{
    let raw = match store.get(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(error) => {
            warn!("cannot read {key}, treating as empty: {error}");
            return Vec::new();
        }
    };

    if raw.trim().is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Vec<T>>(&raw) {
        Ok(list) => list,
        Err(error) => {
            warn!("malformed payload under {key}, treating as empty: {error}");
            Vec::new()
        }
    }
}

/// Replace JSON array stored under `key`.
///
/// # Errors
///
/// - Return [`KvError::Encode`] if the collection cannot be serialized.
/// - Return [`KvError::Write`] if the store rejects the write.
pub(crate) async fn write_json_list<K, T>(store: &K, key: &str, list: &[T]) -> Result<()>
where
    K: KeyValueStore,
    T: Serialize,
{
    let raw = serde_json::to_string(list)?;
    store.set(key, raw).await
}

/// Key-value store error types.
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    /// Store directory cannot be created.
    #[error("failed to create key-value store at {:?}", root.display())]
    CreateRoot {
        #[source]
        source: std::io::Error,
        root: PathBuf,
    },

    /// Stored value cannot be read.
    #[error("failed to read value of {key:?}")]
    Read {
        #[source]
        source: std::io::Error,
        key: String,
    },

    /// Value cannot be written.
    #[error("failed to write value of {key:?}")]
    Write {
        #[source]
        source: std::io::Error,
        key: String,
    },

    /// Collection cannot be encoded as JSON.
    #[error(transparent)]
    Encode(#[from] serde_json::Error),

    /// In-memory store lock was poisoned by a panicking writer.
    #[error("in-memory key-value store lock poisoned")]
    Poisoned,
}

/// Friendly result alias :3
pub type Result<T, E = KvError> = std::result::Result<T, E>;
