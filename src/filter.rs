// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Active filter state.
//!
//! The set of tags currently used to narrow the browsed wardrobe. It is pure
//! view state, persisted only so that it survives navigation between screens.
//! Updates replace the whole set; there is no incremental add or remove.

use crate::{
    kv::{read_json_list, write_json_list, KeyValueStore, Result},
    tags::Tags,
};

use std::sync::Arc;
use tracing::{info, instrument};

/// Storage key of the active filter tags.
pub const FILTER_TAGS_KEY: &str = "WARDROBE_FILTER_TAGS_v1";

/// Persisted set of active filter tags.
#[derive(Debug)]
pub struct FilterState<K>
where
    K: KeyValueStore,
{
    kv: Arc<K>,
}

impl<K> Clone for FilterState<K>
where
    K: KeyValueStore,
{
    fn clone(&self) -> Self {
        Self {
            kv: self.kv.clone(),
        }
    }
}

impl<K> FilterState<K>
where
    K: KeyValueStore,
{
    pub fn new(kv: Arc<K>) -> Self {
        Self { kv }
    }

    /// Replace active filter with given tags.
    ///
    /// Tags are normalized before they are stored.
    ///
    /// # Errors
    ///
    /// - Return [`KvError`](crate::kv::KvError) if the filter cannot be
    ///   written.
    #[instrument(skip(self, tags), level = "debug")]
    pub async fn set_active(&self, tags: impl IntoIterator<Item = impl AsRef<str>>) -> Result<()> {
        let tags: Tags = tags.into_iter().collect();
        info!("set active filter to [{tags}]");
        let tags: Vec<String> = tags.into();
        write_json_list(self.kv.as_ref(), FILTER_TAGS_KEY, &tags).await
    }

    /// Clear active filter.
    ///
    /// # Errors
    ///
    /// - Return [`KvError`](crate::kv::KvError) if the filter cannot be
    ///   written.
    pub async fn clear(&self) -> Result<()> {
        self.set_active(std::iter::empty::<&str>()).await
    }

    /// Read active filter, empty if it was never set.
    #[instrument(skip(self), level = "debug")]
    pub async fn get_active(&self) -> Tags {
        read_json_list::<K, String>(self.kv.as_ref(), FILTER_TAGS_KEY)
            .await
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKeyValueStore;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn filter_defaults_to_empty() {
        let filter = FilterState::new(Arc::new(MemoryKeyValueStore::new()));
        assert!(filter.get_active().await.is_empty());
    }

    #[tokio::test]
    async fn filter_set_replaces_previous() -> anyhow::Result<()> {
        let filter = FilterState::new(Arc::new(MemoryKeyValueStore::new()));

        filter.set_active(["Top", " blue "]).await?;
        filter.set_active(["Winter", "winter"]).await?;

        let result = filter.get_active().await;
        assert_eq!(result.iter().collect::<Vec<_>>(), vec!["winter"]);

        filter.clear().await?;
        assert!(filter.get_active().await.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn filter_normalizes_stored_payload() -> anyhow::Result<()> {
        let kv = Arc::new(MemoryKeyValueStore::new());
        kv.set(FILTER_TAGS_KEY, r#"["TOP", " top"]"#.into()).await?;
        let filter = FilterState::new(kv);

        assert_eq!(filter.get_active().await.iter().collect::<Vec<_>>(), vec!["top"]);

        Ok(())
    }
}
