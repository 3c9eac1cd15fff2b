// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Wardrobe index.
//!
//! The __index__ is the ordered collection of every wardrobe item, newest
//! first. It is persisted as one JSON array under one key, and that whole
//! array is the unit of persistence: every mutation reads the full
//! collection, applies its change, and writes the full collection back.
//!
//! # Record Layout
//!
//! ```json
//! { "id": "…", "uri": "…", "createdAt": 1700000000000, "tags": ["top"] }
//! ```
//!
//! The `tags` field may be missing in older records and reads as empty.
//!
//! # Writers
//!
//! All clones of a [`WardrobeIndex`] share one write gate, so overlapping
//! read-modify-write cycles in the same process are serialized. Separate
//! processes writing the same store are still last-writer-wins.

use crate::{
    blob::{BlobStore, Fetch, HttpFetcher},
    kv::{read_json_list, write_json_list, KeyValueStore, KvError},
    tags::Tags,
};

use serde::{Deserialize, Serialize};
use std::{collections::HashSet, sync::Arc};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Storage key of the wardrobe index.
pub const INDEX_KEY: &str = "WARDROBE_INDEX_v1";

/// One garment photo.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WardrobeItem {
    /// Unique, immutable identifier.
    pub id: String,

    /// Locator of the stored image.
    pub uri: String,

    /// Creation time in milliseconds since the Unix epoch.
    pub created_at: i64,

    /// Normalized tags.
    #[serde(default)]
    pub tags: Tags,
}

impl WardrobeItem {
    /// Construct new item created now.
    pub fn new(id: impl Into<String>, uri: impl Into<String>, tags: Tags) -> Self {
        Self {
            id: id.into(),
            uri: uri.into(),
            created_at: now_millis(),
            tags,
        }
    }

    /// Synthesize an item for a bare file found in the blob store.
    ///
    /// The file path doubles as id and image locator. Original creation time
    /// and tags are unknown, so the item is created now without tags.
    pub fn from_orphan_file(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(path.clone(), path, Tags::new())
    }
}

/// Current time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Outcome of an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// Existing item was replaced in place.
    Replaced,

    /// Item was new and got prepended.
    Inserted,
}

/// Ordered, persisted collection of wardrobe items.
#[derive(Debug)]
pub struct WardrobeIndex<K, F = HttpFetcher>
where
    K: KeyValueStore,
    F: Fetch,
{
    kv: Arc<K>,
    blobs: BlobStore<F>,
    gate: Arc<Mutex<()>>,
}

impl<K, F> Clone for WardrobeIndex<K, F>
where
    K: KeyValueStore,
    F: Fetch,
{
    fn clone(&self) -> Self {
        Self {
            kv: self.kv.clone(),
            blobs: self.blobs.clone(),
            gate: self.gate.clone(),
        }
    }
}

impl<K, F> WardrobeIndex<K, F>
where
    K: KeyValueStore,
    F: Fetch,
{
    /// Construct new index over a key-value store.
    ///
    /// The blob store is used to reclaim image files of removed items.
    pub fn new(kv: Arc<K>, blobs: BlobStore<F>) -> Self {
        Self {
            kv,
            blobs,
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// Read every item, newest first.
    ///
    /// Unreadable or malformed payloads read as an empty index. Records
    /// repeating an earlier id are dropped.
    #[instrument(skip(self), level = "debug")]
    pub async fn read_all(&self) -> Vec<WardrobeItem> {
        let items = read_json_list::<K, WardrobeItem>(self.kv.as_ref(), INDEX_KEY).await;

        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(items.len());
        for item in items {
            if seen.insert(item.id.clone()) {
                unique.push(item);
            } else {
                warn!("dropping duplicate index record {:?}", item.id);
            }
        }

        unique
    }

    /// Find item by id.
    pub async fn get(&self, id: &str) -> Option<WardrobeItem> {
        self.read_all().await.into_iter().find(|item| item.id == id)
    }

    /// Replace entire index.
    ///
    /// # Errors
    ///
    /// - Return [`IndexError::DuplicateId`] if two items share an id.
    /// - Return [`IndexError::Store`] if the index cannot be written.
    #[instrument(skip(self, items), level = "debug")]
    pub async fn write_all(&self, items: &[WardrobeItem]) -> Result<()> {
        let mut seen = HashSet::new();
        if let Some(dup) = items.iter().find(|item| !seen.insert(item.id.as_str())) {
            return Err(IndexError::DuplicateId(dup.id.clone()));
        }

        let _guard = self.gate.lock().await;
        self.store(items).await
    }

    /// Prepend new item.
    ///
    /// # Errors
    ///
    /// - Return [`IndexError::DuplicateId`] if an item with the same id is
    ///   already indexed. Use [`WardrobeIndex::upsert`] for edits.
    /// - Return [`IndexError::Store`] if the index cannot be written.
    #[instrument(skip(self, item), fields(id = %item.id), level = "debug")]
    pub async fn append(&self, item: WardrobeItem) -> Result<()> {
        let _guard = self.gate.lock().await;
        let mut items = self.read_all().await;
        if items.iter().any(|existing| existing.id == item.id) {
            return Err(IndexError::DuplicateId(item.id));
        }

        info!("add item {:?}", item.id);
        items.insert(0, item);
        self.store(&items).await
    }

    /// Replace item with same id in place, or prepend it if it is new.
    ///
    /// # Errors
    ///
    /// - Return [`IndexError::Store`] if the index cannot be written.
    #[instrument(skip(self, item), fields(id = %item.id), level = "debug")]
    pub async fn upsert(&self, item: WardrobeItem) -> Result<Upsert> {
        let _guard = self.gate.lock().await;
        let mut items = self.read_all().await;

        let outcome = match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => {
                info!("update item {:?}", item.id);
                *existing = item;
                Upsert::Replaced
            }
            None => {
                info!("add item {:?}", item.id);
                items.insert(0, item);
                Upsert::Inserted
            }
        };

        self.store(&items).await?;
        Ok(outcome)
    }

    /// Remove item and reclaim its image file.
    ///
    /// Returns `false` without writing anything if no item has that id.
    /// Failing to delete the image file does not undo the index change.
    ///
    /// # Errors
    ///
    /// - Return [`IndexError::Store`] if the index cannot be written.
    #[instrument(skip(self), level = "debug")]
    pub async fn remove(&self, id: &str) -> Result<bool> {
        let _guard = self.gate.lock().await;
        let mut items = self.read_all().await;
        let before = items.len();
        items.retain(|item| item.id != id);

        let removed = items.len() != before;
        if removed {
            info!("remove item {id:?}");
            self.store(&items).await?;
        } else {
            debug!("no item {id:?} to remove");
        }
        self.blobs.remove(id).await;

        Ok(removed)
    }

    /// Apply an edit to every item and write the result back.
    ///
    /// Returns the number of items the editor reported as changed. Nothing
    /// is written if no item changed.
    ///
    /// # Errors
    ///
    /// - Return [`IndexError::Store`] if the index cannot be written.
    pub async fn edit_each<E>(&self, mut editor: E) -> Result<usize>
    where
        E: FnMut(&mut WardrobeItem) -> bool,
    {
        let _guard = self.gate.lock().await;
        let mut items = self.read_all().await;
        let changed = items.iter_mut().map(&mut editor).filter(|changed| *changed).count();
        if changed > 0 {
            self.store(&items).await?;
        }

        Ok(changed)
    }

    async fn store(&self, items: &[WardrobeItem]) -> Result<()> {
        write_json_list(self.kv.as_ref(), INDEX_KEY, items).await?;
        debug!("stored {} index records", items.len());

        Ok(())
    }
}

/// Wardrobe index error types.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Two records would share one id.
    #[error("item {0:?} is already indexed")]
    DuplicateId(String),

    /// Index cannot be persisted.
    #[error(transparent)]
    Store(#[from] KvError),
}

/// Friendly result alias :3
pub type Result<T, E = IndexError> = std::result::Result<T, E>;
