// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Local persistence for a photo wardrobe.
//!
//! Users photograph clothing items, tag them, browse them by tag, and see
//! them on a calendar. Everything lives on the device: an index of items,
//! a vocabulary of preset tags, the active filter, and a sandbox directory
//! holding a copy of every photo.
//!
//! # Components
//!
//! - [`blob`]: durable copies of image files, one per item.
//! - [`tags`]: tag normalization and the preset tag registry.
//! - [`filter`]: the active filter tags.
//! - [`index`]: the ordered collection of wardrobe items.
//! - [`query`]: derive the browsable list from all of the above.
//! - [`wardrobe`]: user facing flows that tie the components together.
//!
//! Each collection is persisted whole through a [`kv::KeyValueStore`]. All
//! access goes through the services above, never directly to storage.

pub mod blob;
pub mod calendar;
pub mod config;
pub mod filter;
pub mod index;
pub mod kv;
pub mod path;
pub mod query;
pub mod tags;
pub mod wardrobe;

pub use blob::{BlobStore, Fetch, HttpFetcher};
pub use config::Config;
pub use filter::FilterState;
pub use index::{WardrobeIndex, WardrobeItem};
pub use kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use query::{EmptyState, View};
pub use tags::{normalize_tag, parse_tag_list, TagRegistry, Tags};
pub use wardrobe::{Acquisition, SaveDraft, SaveError, Saved, Wardrobe};
