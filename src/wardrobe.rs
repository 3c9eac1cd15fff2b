// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Wardrobe management.
//!
//! The [`Wardrobe`] bundles the blob store, index, tag registry, and filter
//! state over one shared key-value store, and implements the user facing
//! flows on top of them: saving a new photo, editing an existing one,
//! deleting, and browsing.
//!
//! # Saving
//!
//! A save starts from a [`SaveDraft`], the in-progress state of the upload
//! screen. The draft is only borrowed, so when a save fails the selected
//! image and the entered tags are still there for a retry. Lower layers
//! absorb their own failures; the only failures a save reports are a missing
//! image and an index that cannot be written.

use crate::{
    blob::{BlobStore, Fetch, HttpFetcher},
    config::Config,
    filter::FilterState,
    index::{now_millis, IndexError, Upsert, WardrobeIndex, WardrobeItem},
    kv::{FileKeyValueStore, KeyValueStore, KvError},
    query::{browse, View},
    tags::{TagRegistry, Tags, DEFAULT_PRESET_TAGS},
};

use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Outcome of asking the picker or camera for an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquisition {
    /// User picked an image at this locator.
    Picked(String),

    /// User closed the picker without choosing.
    Cancelled,

    /// User refused access to photos or camera.
    PermissionDenied,
}

impl Acquisition {
    /// Source locator, if an image was obtained.
    pub fn into_source(self) -> Option<String> {
        match self {
            Self::Picked(source) if !source.trim().is_empty() => Some(source),
            _ => None,
        }
    }
}

/// In-progress upload or edit.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SaveDraft {
    /// Selected image locator.
    pub image: Option<String>,

    /// Id of the item being edited, `None` for a new item.
    pub editing_id: Option<String>,

    /// Tags entered so far.
    pub tags: Tags,
}

impl SaveDraft {
    /// Start a new, empty draft.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start editing an existing item.
    pub fn edit(item: &WardrobeItem) -> Self {
        Self {
            image: Some(item.uri.clone()),
            editing_id: Some(item.id.clone()),
            tags: item.tags.clone(),
        }
    }

    /// Take image from an acquisition.
    ///
    /// Returns `false` and keeps the current image if none was obtained.
    pub fn acquire(&mut self, acquisition: Acquisition) -> bool {
        match acquisition.into_source() {
            Some(source) => {
                self.image = Some(source);
                true
            }
            None => false,
        }
    }
}

/// Outcome of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Saved {
    /// A new item entered the wardrobe.
    Created(WardrobeItem),

    /// An existing item was updated.
    Updated(WardrobeItem),
}

impl Saved {
    pub fn item(&self) -> &WardrobeItem {
        match self {
            Self::Created(item) | Self::Updated(item) => item,
        }
    }
}

/// Local wardrobe state.
#[derive(Debug)]
pub struct Wardrobe<K = FileKeyValueStore, F = HttpFetcher>
where
    K: KeyValueStore,
    F: Fetch,
{
    blobs: BlobStore<F>,
    index: WardrobeIndex<K, F>,
    tags: TagRegistry<K>,
    filter: FilterState<K>,
}

impl<K, F> Clone for Wardrobe<K, F>
where
    K: KeyValueStore,
    F: Fetch,
{
    fn clone(&self) -> Self {
        Self {
            blobs: self.blobs.clone(),
            index: self.index.clone(),
            tags: self.tags.clone(),
            filter: self.filter.clone(),
        }
    }
}

impl Wardrobe<FileKeyValueStore, HttpFetcher> {
    /// Open wardrobe stored under the configured data directory.
    ///
    /// # Errors
    ///
    /// - Return [`KvError::CreateRoot`] if the key-value store directory
    ///   cannot be created.
    pub fn open(config: &Config) -> Result<Self, KvError> {
        let kv = FileKeyValueStore::open(config.kv_root())?;
        let blobs = BlobStore::open(config.blob_root(), config.fallback_extension.clone());
        let wardrobe = match &config.preset_tags {
            Some(seed) => Self::with_seed(kv, blobs, seed),
            None => Self::new(kv, blobs),
        };

        Ok(wardrobe)
    }
}

impl<K, F> Wardrobe<K, F>
where
    K: KeyValueStore,
    F: Fetch,
{
    /// Construct wardrobe with the default preset tag vocabulary.
    pub fn new(kv: K, blobs: BlobStore<F>) -> Self {
        Self::with_seed(kv, blobs, DEFAULT_PRESET_TAGS)
    }

    /// Construct wardrobe with a custom preset tag vocabulary.
    pub fn with_seed(
        kv: K,
        blobs: BlobStore<F>,
        seed: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Self {
        let kv = Arc::new(kv);
        Self {
            index: WardrobeIndex::new(kv.clone(), blobs.clone()),
            tags: TagRegistry::with_seed(kv.clone(), seed),
            filter: FilterState::new(kv),
            blobs,
        }
    }

    pub fn blobs(&self) -> &BlobStore<F> {
        &self.blobs
    }

    pub fn index(&self) -> &WardrobeIndex<K, F> {
        &self.index
    }

    pub fn tags(&self) -> &TagRegistry<K> {
        &self.tags
    }

    pub fn filter(&self) -> &FilterState<K> {
        &self.filter
    }

    /// Save draft as a new item, or as an update of the item it edits.
    ///
    /// # Errors
    ///
    /// - Return [`SaveError::MissingImage`] if the draft has no image. No
    ///   storage is touched in that case.
    /// - Return [`SaveError::Index`] if the index cannot be written.
    #[instrument(skip(self, draft), level = "debug")]
    pub async fn save(&self, draft: &SaveDraft) -> Result<Saved, SaveError> {
        let source = draft
            .image
            .as_deref()
            .filter(|image| !image.trim().is_empty())
            .ok_or(SaveError::MissingImage)?;

        self.blobs.ensure_root_exists().await;

        let id = match &draft.editing_id {
            Some(id) => id.clone(),
            None => uuid::Uuid::new_v4().to_string(),
        };
        let uri = self.blobs.persist(source, &id).await;

        let saved = match &draft.editing_id {
            Some(_) => {
                // INVARIANT: Creation time survives edits.
                let created_at = match self.index.get(&id).await {
                    Some(existing) => existing.created_at,
                    None => now_millis(),
                };
                let item = WardrobeItem {
                    id,
                    uri,
                    created_at,
                    tags: draft.tags.clone(),
                };
                match self.index.upsert(item.clone()).await? {
                    Upsert::Replaced => Saved::Updated(item),
                    Upsert::Inserted => Saved::Created(item),
                }
            }
            None => {
                let item = WardrobeItem::new(id.clone(), uri, draft.tags.clone());
                if let Err(error) = self.index.append(item.clone()).await {
                    // INVARIANT: No stored image without an index record.
                    warn!("cannot index new item {id:?}, reclaiming its image");
                    self.blobs.remove(&id).await;
                    return Err(error.into());
                }
                Saved::Created(item)
            }
        };

        for tag in draft.tags.iter() {
            if let Err(error) = self.tags.add(tag).await {
                warn!("cannot register tag {tag:?}: {error}");
            }
        }
        info!("saved item {:?}", saved.item().id);

        Ok(saved)
    }

    /// Delete item and its stored image.
    ///
    /// Returns `false` if there was no such item.
    ///
    /// # Errors
    ///
    /// - Return [`IndexError::Store`] if the index cannot be written.
    pub async fn delete(&self, id: &str) -> Result<bool, IndexError> {
        self.index.remove(id).await
    }

    /// Remove every tag from every item.
    ///
    /// Returns number of items that lost tags. The registry is untouched.
    ///
    /// # Errors
    ///
    /// - Return [`IndexError::Store`] if the index cannot be written.
    pub async fn clear_all_tags(&self) -> Result<usize, IndexError> {
        self.index
            .edit_each(|item| {
                let had_tags = !item.tags.is_empty();
                item.tags = Tags::new();
                had_tags
            })
            .await
    }

    /// Produce the view a browsing screen should render.
    pub async fn browse(&self) -> View {
        browse(&self.index, &self.filter, &self.blobs).await
    }

    /// Every tag known to the wardrobe, sorted.
    pub async fn all_known_tags(&self) -> Vec<String> {
        self.tags.all_known_tags(&self.index).await
    }
}

/// Save error types.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    /// No image was selected.
    #[error("choose a photo first")]
    MissingImage,

    /// Index cannot be updated.
    #[error(transparent)]
    Index(#[from] IndexError),
}
