// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Tag normalization and the preset tag registry.
//!
//! A __normalized tag__ is a tag string trimmed of surrounding whitespace and
//! lower-cased. Every tag that enters the wardrobe, whether attached to an
//! item, added to the registry, or used as a filter, goes through
//! [`normalize_tag`] first. Normalization is idempotent, so `"  Blue "` and
//! `"blue"` name the same tag.
//!
//! # Tag Registry
//!
//! The registry is the vocabulary offered by tag pickers. It is seeded with a
//! fixed default list the first time it is read while empty, and grows
//! whenever the user adds a tag. Tags are never removed from it
//! automatically. Item tags do not need to be registered: the full set of
//! known tags is the union of the registry and every tag on every item.

use crate::{
    blob::Fetch,
    index::WardrobeIndex,
    kv::{read_json_list, write_json_list, KeyValueStore, Result},
};

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter, Result as FmtResult},
    sync::Arc,
};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Storage key of the preset tag vocabulary.
pub const PRESET_TAGS_KEY: &str = "WARDROBE_PRESET_TAGS_v1";

/// Vocabulary seeded into an empty registry.
pub const DEFAULT_PRESET_TAGS: [&str; 16] = [
    "top", "bottom", "dress", "outerwear", "shoes", "accessory", "casual", "formal", "sport",
    "spring", "summer", "autumn", "winter", "black", "white", "blue",
];

/// Normalize a tag.
///
/// Returns `None` if nothing is left after trimming.
pub fn normalize_tag(tag: impl AsRef<str>) -> Option<String> {
    let tag = tag.as_ref().trim();
    if tag.is_empty() {
        return None;
    }

    Some(tag.to_lowercase())
}

/// Parse comma separated tag input, e.g., `"striped, Casual ,"`.
pub fn parse_tag_list(input: impl AsRef<str>) -> Tags {
    input.as_ref().split(',').collect()
}

/// Set of normalized tags.
///
/// # Invariant
///
/// - Every member is normalized.
/// - No duplicates.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Tags(BTreeSet<String>);

impl Tags {
    /// Construct new empty tag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tag, returning `true` if it was not present yet.
    pub fn insert(&mut self, tag: impl AsRef<str>) -> bool {
        match normalize_tag(tag) {
            Some(tag) => self.0.insert(tag),
            None => false,
        }
    }

    /// Check if tag is a member after normalization.
    pub fn contains(&self, tag: impl AsRef<str>) -> bool {
        normalize_tag(tag).is_some_and(|tag| self.0.contains(&tag))
    }

    /// Check if both sets share at least one tag.
    pub fn intersects(&self, other: &Tags) -> bool {
        self.0.intersection(&other.0).next().is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate tags in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Merge another set into this one.
    pub fn extend_from(&mut self, other: &Tags) {
        self.0.extend(other.0.iter().cloned());
    }
}

impl<S> FromIterator<S> for Tags
where
    S: AsRef<str>,
{
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().filter_map(normalize_tag).collect())
    }
}

impl From<Vec<String>> for Tags {
    fn from(tags: Vec<String>) -> Self {
        tags.into_iter().collect()
    }
}

impl From<Tags> for Vec<String> {
    fn from(tags: Tags) -> Self {
        tags.0.into_iter().collect()
    }
}

impl Display for Tags {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let tags = self.iter().collect::<Vec<_>>();
        fmt.write_str(&tags.join(", "))
    }
}

/// Registry of preset tags offered to tag pickers.
#[derive(Debug)]
pub struct TagRegistry<K>
where
    K: KeyValueStore,
{
    kv: Arc<K>,
    seed: Vec<String>,
    gate: Arc<Mutex<()>>,
}

impl<K> Clone for TagRegistry<K>
where
    K: KeyValueStore,
{
    fn clone(&self) -> Self {
        Self {
            kv: self.kv.clone(),
            seed: self.seed.clone(),
            gate: self.gate.clone(),
        }
    }
}

impl<K> TagRegistry<K>
where
    K: KeyValueStore,
{
    /// Construct registry seeded with [`DEFAULT_PRESET_TAGS`].
    pub fn new(kv: Arc<K>) -> Self {
        Self::with_seed(kv, DEFAULT_PRESET_TAGS)
    }

    /// Construct registry seeded with a custom vocabulary.
    pub fn with_seed(kv: Arc<K>, seed: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        let mut normalized = Vec::new();
        for tag in seed.into_iter().filter_map(normalize_tag) {
            if !normalized.contains(&tag) {
                normalized.push(tag);
            }
        }

        Self {
            kv,
            seed: normalized,
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// Read all registry tags.
    ///
    /// Seeds and persists the default vocabulary if the registry is empty.
    /// A failure to persist the seed is logged, the seed is still returned.
    #[instrument(skip(self), level = "debug")]
    pub async fn read_all(&self) -> Tags {
        let _guard = self.gate.lock().await;
        self.load_or_seed().await.iter().collect()
    }

    /// Add tag to registry.
    ///
    /// Returns `true` if the registry grew. Tags that are empty after
    /// trimming, or already present, leave the registry untouched.
    ///
    /// # Errors
    ///
    /// - Return [`KvError`](crate::kv::KvError) if the registry cannot be
    ///   written back.
    #[instrument(skip(self, tag), level = "debug")]
    pub async fn add(&self, tag: impl AsRef<str>) -> Result<bool> {
        let Some(tag) = normalize_tag(tag) else {
            return Ok(false);
        };

        let _guard = self.gate.lock().await;
        let mut tags = self.load_or_seed().await;
        if tags.contains(&tag) {
            debug!("tag {tag:?} already registered");
            return Ok(false);
        }

        info!("register tag {tag:?}");
        tags.push(tag);
        write_json_list(self.kv.as_ref(), PRESET_TAGS_KEY, &tags).await?;

        Ok(true)
    }

    /// Every tag known to the wardrobe, sorted lexicographically.
    ///
    /// Union of registry tags and the tags of every indexed item.
    pub async fn all_known_tags<F>(&self, index: &WardrobeIndex<K, F>) -> Vec<String>
    where
        F: Fetch,
    {
        let mut known = self.read_all().await;
        for item in index.read_all().await {
            known.extend_from(&item.tags);
        }

        known.into()
    }

    async fn load_or_seed(&self) -> Vec<String> {
        let mut tags = Vec::new();
        for tag in read_json_list::<K, String>(self.kv.as_ref(), PRESET_TAGS_KEY)
            .await
            .into_iter()
            .filter_map(normalize_tag)
        {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }

        if !tags.is_empty() {
            return tags;
        }

        debug!("seed preset tags");
        if let Err(error) = write_json_list(self.kv.as_ref(), PRESET_TAGS_KEY, &self.seed).await {
            warn!("cannot persist preset tag seed: {error}");
        }

        self.seed.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKeyValueStore;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    #[test_case("  Blue ", Some("blue"); "trims and lowercases")]
    #[test_case("blue", Some("blue"); "already normalized")]
    #[test_case("   ", None; "whitespace only")]
    #[test_case("", None; "empty")]
    #[test_case("Light Blue", Some("light blue"); "inner whitespace kept")]
    #[test]
    fn tag_normalization(input: &str, expect: Option<&str>) {
        pretty_assertions::assert_eq!(normalize_tag(input).as_deref(), expect);
    }

    #[test]
    fn parse_comma_separated_tags() {
        let result = parse_tag_list("striped, Casual ,,casual");
        assert_eq!(result.iter().collect::<Vec<_>>(), vec!["casual", "striped"]);
    }

    #[test]
    fn tags_intersection() {
        let item: Tags = ["Top", "blue"].into_iter().collect();
        let filter: Tags = ["TOP"].into_iter().collect();
        let other: Tags = ["bottom"].into_iter().collect();
        assert!(item.intersects(&filter));
        assert!(!item.intersects(&other));
        assert!(!Tags::new().intersects(&filter));
    }

    #[test]
    fn tags_deserialize_normalizes() -> anyhow::Result<()> {
        let tags: Tags = serde_json::from_str(r#"[" Top", "top", "BLUE", ""]"#)?;
        assert_eq!(serde_json::to_string(&tags)?, r#"["blue","top"]"#);

        Ok(())
    }

    #[tokio::test]
    async fn registry_seeds_when_empty() -> anyhow::Result<()> {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let registry = TagRegistry::new(kv.clone());

        let tags = registry.read_all().await;
        assert_eq!(tags.len(), DEFAULT_PRESET_TAGS.len());
        assert!(tags.contains("winter"));

        // Seed is persisted.
        let stored = kv.get(PRESET_TAGS_KEY).await?.unwrap_or_default();
        let stored: Vec<String> = serde_json::from_str(&stored)?;
        assert_eq!(stored.len(), DEFAULT_PRESET_TAGS.len());

        Ok(())
    }

    #[tokio::test]
    async fn registry_add_is_idempotent_under_normalization() -> anyhow::Result<()> {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let registry = TagRegistry::with_seed(kv, ["top"]);

        assert!(registry.add("  Striped ").await?);
        assert!(!registry.add("striped").await?);
        assert!(!registry.add("   ").await?);

        let tags = registry.read_all().await;
        assert_eq!(tags.iter().collect::<Vec<_>>(), vec!["striped", "top"]);

        Ok(())
    }

    #[tokio::test]
    async fn registry_add_blue_twice_keeps_one_entry() -> anyhow::Result<()> {
        let kv = Arc::new(MemoryKeyValueStore::new());
        kv.set(PRESET_TAGS_KEY, r#"["top"]"#.into()).await?;
        let registry = TagRegistry::new(kv.clone());

        registry.add("  Blue ").await?;
        registry.add("blue").await?;

        let stored: Vec<String> =
            serde_json::from_str(&kv.get(PRESET_TAGS_KEY).await?.unwrap_or_default())?;
        assert_eq!(stored, vec!["top".to_string(), "blue".to_string()]);

        Ok(())
    }
}
