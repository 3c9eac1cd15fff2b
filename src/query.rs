// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Derive the browsable wardrobe.
//!
//! Recombines the index, the active filter, and the blob store listing into
//! the list a browsing screen renders. Run it every time such a screen
//! becomes active, never cache its result across activations.
//!
//! # Orphan Recovery
//!
//! If the index is empty but the blob store still holds files, one item is
//! synthesized per file: the path is used as id and image locator, tags are
//! empty, and the creation time is the moment of the query. Original
//! metadata is not reconstructed.
//!
//! # Filtering
//!
//! A non-empty filter keeps only items sharing at least one tag with it. An
//! untagged item never matches a non-empty filter.

use crate::{
    blob::{BlobStore, Fetch},
    filter::FilterState,
    index::{WardrobeIndex, WardrobeItem},
    kv::KeyValueStore,
    tags::Tags,
};

use tracing::{debug, info, instrument};

/// Result of browsing the wardrobe.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct View {
    /// Items to render, in index order.
    pub items: Vec<WardrobeItem>,

    /// Filter that was applied.
    pub active_filter: Tags,

    /// Number of items before filtering.
    pub total: usize,
}

/// What an empty view should tell the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyState {
    /// There is something to show.
    NotEmpty,

    /// The wardrobe holds no items at all.
    NoItems,

    /// Items exist, but none match the active filter.
    NoMatches,
}

impl View {
    pub fn empty_state(&self) -> EmptyState {
        if !self.items.is_empty() {
            EmptyState::NotEmpty
        } else if self.active_filter.is_empty() {
            EmptyState::NoItems
        } else {
            EmptyState::NoMatches
        }
    }
}

/// Produce the view a browsing screen should render.
#[instrument(skip_all, level = "debug")]
pub async fn browse<K, F>(
    index: &WardrobeIndex<K, F>,
    filter: &FilterState<K>,
    blobs: &BlobStore<F>,
) -> View
where
    K: KeyValueStore,
    F: Fetch,
{
    blobs.ensure_root_exists().await;

    let (mut items, active_filter) = futures::join!(index.read_all(), filter.get_active());
    if items.is_empty() {
        let files = blobs.list().await;
        if !files.is_empty() {
            info!("index is empty, recovering {} items from blob store", files.len());
            items = files.into_iter().map(WardrobeItem::from_orphan_file).collect();
        }
    }

    let total = items.len();
    let items = apply_filter(items, &active_filter);
    debug!("{} of {total} items visible under [{active_filter}]", items.len());

    View {
        items,
        active_filter,
        total,
    }
}

/// Keep items sharing at least one tag with the filter.
///
/// An empty filter keeps everything. Order is preserved.
pub fn apply_filter(items: Vec<WardrobeItem>, filter: &Tags) -> Vec<WardrobeItem> {
    if filter.is_empty() {
        return items;
    }

    items
        .into_iter()
        .filter(|item| item.tags.intersects(filter))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{blob::HttpFetcher, kv::MemoryKeyValueStore};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn item(id: &str, tags: &[&str]) -> WardrobeItem {
        WardrobeItem {
            id: id.into(),
            uri: format!("img_{id}.jpg"),
            created_at: 0,
            tags: tags.iter().collect(),
        }
    }

    fn wardrobe() -> Vec<WardrobeItem> {
        vec![item("1", &["top"]), item("2", &["bottom"]), item("3", &[])]
    }

    #[test]
    fn filter_keeps_intersecting_items() {
        let filter: Tags = ["Top"].into_iter().collect();
        assert_eq!(apply_filter(wardrobe(), &filter), vec![item("1", &["top"])]);
    }

    #[test]
    fn empty_filter_passes_everything() {
        assert_eq!(apply_filter(wardrobe(), &Tags::new()), wardrobe());
    }

    #[test]
    fn untagged_items_never_match() {
        let filter: Tags = ["top", "bottom"].into_iter().collect();
        let ids = apply_filter(wardrobe(), &filter)
            .into_iter()
            .map(|i| i.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn empty_state_distinguishes_no_matches() {
        let mut view = View::default();
        assert_eq!(view.empty_state(), EmptyState::NoItems);

        view.active_filter = ["top"].into_iter().collect();
        view.total = 2;
        assert_eq!(view.empty_state(), EmptyState::NoMatches);

        view.items.push(item("1", &["top"]));
        assert_eq!(view.empty_state(), EmptyState::NotEmpty);
    }

    #[tokio::test]
    async fn browse_recovers_orphan_files() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let kv = Arc::new(MemoryKeyValueStore::new());
        let blobs = BlobStore::<HttpFetcher>::open(dir.path().join("Wardrobe"), "jpg");
        let index = WardrobeIndex::new(kv.clone(), blobs.clone());
        let filter = FilterState::new(kv);

        blobs.ensure_root_exists().await;
        std::fs::write(blobs.root().join("img_a.jpg"), b"a")?;
        std::fs::write(blobs.root().join("img_b.png"), b"b")?;

        let view = browse(&index, &filter, &blobs).await;
        assert_eq!(view.items.len(), 2);
        for item in &view.items {
            assert!(item.tags.is_empty());
            assert_eq!(item.id, item.uri);
            assert!(item.id.starts_with(&*blobs.root().to_string_lossy()));
        }

        // Recovery never writes the index.
        assert!(index.read_all().await.is_empty());

        Ok(())
    }
}
