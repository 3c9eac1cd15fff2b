// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

mod integration;

use anyhow::Result;
use clothesline::{
    config::Config, BlobStore, FileKeyValueStore, HttpFetcher, KeyValueStore, SaveDraft, Wardrobe,
    WardrobeItem,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Sandboxed wardrobe laid out the way the CLI lays it out on disk.
pub(crate) struct WardrobeFixture {
    dir: TempDir,
    config: Config,
}

impl WardrobeFixture {
    pub(crate) fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;

        // INVARIANT: Never touch the real data directory.
        let config = Config {
            data_dir: dir.path().join("data"),
            ..Config::default()
        };

        Ok(Self { dir, config })
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    /// Open a fresh handle on the same on-disk state, like a new screen would.
    pub(crate) fn open(&self) -> Result<Wardrobe> {
        Ok(Wardrobe::open(&self.config)?)
    }

    /// Raw key-value store under the fixture's data directory.
    pub(crate) fn kv(&self) -> Result<FileKeyValueStore> {
        Ok(FileKeyValueStore::open(self.config.kv_root())?)
    }

    pub(crate) fn blobs(&self) -> BlobStore<HttpFetcher> {
        BlobStore::open(self.config.blob_root(), self.config.fallback_extension.clone())
    }

    /// Write a picker-style source image outside the sandbox.
    pub(crate) fn picked_image(&self, name: impl AsRef<Path>, contents: &[u8]) -> Result<PathBuf> {
        let path = self.dir.path().join("picker-cache").join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, contents)?;

        Ok(path)
    }

    /// Save a picked image with tags through the full save flow.
    pub(crate) async fn add(&self, name: &str, tags: &[&str]) -> Result<WardrobeItem> {
        let source = self.picked_image(name, name.as_bytes())?;
        let mut draft = SaveDraft::new();
        draft.image = Some(source.to_string_lossy().into_owned());
        draft.tags = tags.iter().collect();

        Ok(self.open()?.save(&draft).await?.item().clone())
    }

    /// Overwrite a stored collection with a raw payload.
    pub(crate) async fn poke(&self, key: &str, raw: &str) -> Result<()> {
        self.kv()?.set(key, raw.into()).await?;
        Ok(())
    }
}
