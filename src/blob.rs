// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Blob store for wardrobe images.
//!
//! Image sources handed over by a picker are often ephemeral: a cache file
//! that disappears after the picking session, a platform asset identifier
//! that cannot be read directly, or a remote URL. The __blob store__ turns
//! such a source into a durable reference by copying its bytes into an
//! app-private sandbox directory.
//!
//! # Persisting
//!
//! Each stored file is named after the item it belongs to, i.e.,
//! `img_<id>.<ext>`, so persisting twice for the same item overwrites the
//! same file. Id bytes outside `[A-Za-z0-9_-]` are percent-encoded, so two
//! distinct ids never share a file. The extension is read off the source locator, falling back to
//! a configured default. Persisting tries, in order:
//!
//! 1. Direct copy from the source path.
//! 2. Download, if the source is an `http` or `https` URL.
//! 3. Keep the original source locator as is.
//!
//! Bytes are staged in a hidden sibling and renamed into place, so a failed
//! copy or download leaves any previously stored image untouched.
//!
//! Persisting never fails outward. The caller always gets some usable
//! reference back, at worst the one it passed in.

use std::{
    future::Future,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, info, instrument, warn};

/// Prefix of every stored image file name.
pub const BLOB_PREFIX: &str = "img_";

/// Fetch remote image sources.
pub trait Fetch: Send + Sync + 'static {
    /// Download `url` into file at `dest`.
    fn fetch(&self, url: &str, dest: &Path) -> impl Future<Output = Result<()>> + Send;
}

/// Fetch remote sources over HTTP.
#[derive(Debug, Default, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Fetch for HttpFetcher {
    #[instrument(skip(self, dest), level = "debug")]
    async fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        tokio::fs::write(dest, &bytes)
            .await
            .map_err(|err| BlobError::Write {
                source: err,
                path: dest.to_path_buf(),
            })?;
        debug!("downloaded {} bytes to {:?}", bytes.len(), dest.display());

        Ok(())
    }
}

/// Sandboxed directory of copied images.
#[derive(Debug)]
pub struct BlobStore<F = HttpFetcher>
where
    F: Fetch,
{
    root: PathBuf,
    fallback_extension: String,
    fetcher: Arc<F>,
}

impl<F> Clone for BlobStore<F>
where
    F: Fetch,
{
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            fallback_extension: self.fallback_extension.clone(),
            fetcher: self.fetcher.clone(),
        }
    }
}

impl BlobStore<HttpFetcher> {
    /// Construct blob store that downloads remote sources over HTTP.
    pub fn open(root: impl Into<PathBuf>, fallback_extension: impl Into<String>) -> Self {
        Self::with_fetcher(root, fallback_extension, HttpFetcher::new())
    }
}

impl<F> BlobStore<F>
where
    F: Fetch,
{
    /// Construct blob store with a custom fetcher for remote sources.
    pub fn with_fetcher(
        root: impl Into<PathBuf>,
        fallback_extension: impl Into<String>,
        fetcher: F,
    ) -> Self {
        Self {
            root: root.into(),
            fallback_extension: fallback_extension.into(),
            fetcher: Arc::new(fetcher),
        }
    }

    /// Sandbox directory.
    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    /// Create sandbox directory if it does not exist yet.
    ///
    /// Failures are logged, never returned, because nearly every persistence
    /// operation runs this first.
    #[instrument(skip(self), level = "debug")]
    pub async fn ensure_root_exists(&self) {
        if let Err(error) = tokio::fs::create_dir_all(&self.root).await {
            warn!(
                "cannot create blob store at {:?}: {error}",
                self.root.display()
            );
        }
    }

    /// Deterministic file name for an item's image.
    pub fn file_name(&self, id: &str, source: &str) -> String {
        let extension = extension_of(source).unwrap_or_else(|| self.fallback_extension.clone());
        format!("{BLOB_PREFIX}{}.{extension}", encode_id(id))
    }

    /// Persist image source for target item.
    ///
    /// Returns the stored reference, or `source` unchanged if neither copy
    /// nor download worked.
    #[instrument(skip(self), level = "debug")]
    pub async fn persist(&self, source: &str, id: &str) -> String {
        let dest = self.root.join(self.file_name(id, source));
        let local = local_path(source);

        // INVARIANT: Never copy a stored file onto itself, that truncates it.
        if is_same_file(&local, &dest).await {
            debug!("{source} is already stored at {:?}", dest.display());
            return path_to_ref(&dest);
        }

        // INVARIANT: Only a complete image ever replaces the stored one.
        let staging = self.staging_path();
        let copy_error = match tokio::fs::copy(&local, &staging).await {
            Ok(bytes) => {
                if self.commit(&staging, &dest, id).await {
                    info!("copied {bytes} bytes from {source} to {:?}", dest.display());
                    return path_to_ref(&dest);
                }
                return source.to_string();
            }
            Err(error) => {
                discard(&staging).await;
                error
            }
        };

        if is_remote(source) {
            match self.fetcher.fetch(source, &staging).await {
                Ok(()) => {
                    if self.commit(&staging, &dest, id).await {
                        info!("downloaded {source} to {:?}", dest.display());
                        return path_to_ref(&dest);
                    }
                }
                Err(error) => {
                    warn!("download of {source} failed, keeping original locator: {error}");
                    discard(&staging).await;
                }
            }
        } else {
            warn!("copy of {source} failed, keeping original locator: {copy_error}");
        }

        source.to_string()
    }

    /// Delete stored image of target item.
    ///
    /// Deleting an image that does not exist is not an error. Other failures
    /// are logged and ignored.
    #[instrument(skip(self), level = "debug")]
    pub async fn remove(&self, id: &str) {
        let mut targets = self.stored_files_of(id);

        // INVARIANT: Ids synthesized from a directory listing are file paths.
        let direct = Path::new(id);
        if direct.parent() == Some(self.root.as_path()) && !targets.iter().any(|t| t == direct) {
            targets.push(direct.to_path_buf());
        }

        for target in targets {
            match tokio::fs::remove_file(&target).await {
                Ok(()) => info!("removed {:?}", target.display()),
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                    debug!("{:?} already gone", target.display());
                }
                Err(error) => warn!("cannot remove {:?}: {error}", target.display()),
            }
        }
    }

    /// List every file in the sandbox.
    ///
    /// Hidden files, i.e., staged partial images, are skipped. Unreadable or
    /// missing sandbox lists as empty.
    #[instrument(skip(self), level = "debug")]
    pub async fn list(&self) -> Vec<String> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(error) => {
                warn!("cannot list blob store at {:?}: {error}", self.root.display());
                return Vec::new();
            }
        };

        let mut files = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let hidden = entry.file_name().to_string_lossy().starts_with('.');
                    if !hidden && entry.file_type().await.is_ok_and(|kind| kind.is_file()) {
                        files.push(path_to_ref(&entry.path()));
                    }
                }
                Ok(None) => break,
                Err(error) => {
                    warn!("blob store listing interrupted: {error}");
                    break;
                }
            }
        }
        files.sort();

        files
    }

    fn stored_files_of(&self, id: &str) -> Vec<PathBuf> {
        let Some(root) = self.root.to_str() else {
            return Vec::new();
        };
        let pattern = format!(
            "{}/{BLOB_PREFIX}{}.*",
            glob::Pattern::escape(root.trim_end_matches('/')),
            encode_id(id)
        );

        match glob::glob(&pattern) {
            Ok(paths) => paths.filter_map(|path| path.ok()).collect(),
            Err(error) => {
                warn!("bad blob pattern {pattern:?}: {error}");
                Vec::new()
            }
        }
    }

    fn staging_path(&self) -> PathBuf {
        self.root
            .join(format!(".{BLOB_PREFIX}{}.part", uuid::Uuid::new_v4().simple()))
    }

    /// Move staged image into place, returning `false` if that failed.
    async fn commit(&self, staging: &Path, dest: &Path, id: &str) -> bool {
        match tokio::fs::rename(staging, dest).await {
            Ok(()) => {
                self.remove_stale_siblings(id, dest);
                true
            }
            Err(error) => {
                warn!("cannot move image into {:?}: {error}", dest.display());
                discard(staging).await;
                false
            }
        }
    }

    fn remove_stale_siblings(&self, id: &str, keep: &Path) {
        for stale in self.stored_files_of(id).into_iter().filter(|path| path != keep) {
            debug!("remove stale image {:?}", stale.display());
            if let Err(error) = std::fs::remove_file(&stale) {
                warn!("cannot remove stale image {:?}: {error}", stale.display());
            }
        }
    }
}

/// Extension of the file a source locator points at, lower-cased.
///
/// Query strings and fragments are ignored. Returns `None` for locators
/// without a plausible extension, e.g., platform asset identifiers.
pub fn extension_of(source: &str) -> Option<String> {
    let source = source.split(['?', '#']).next().unwrap_or_default();
    let name = source.rsplit('/').next().unwrap_or_default();
    let (stem, extension) = name.rsplit_once('.')?;
    let plausible = !stem.is_empty()
        && (1..=5).contains(&extension.len())
        && extension.chars().all(|c| c.is_ascii_alphanumeric());

    plausible.then(|| extension.to_ascii_lowercase())
}

/// Check if source locator is a remote URL.
pub fn is_remote(source: &str) -> bool {
    let lower = source.get(..8).unwrap_or(source).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn local_path(source: &str) -> PathBuf {
    PathBuf::from(source.strip_prefix("file://").unwrap_or(source))
}

fn encode_id(id: &str) -> String {
    let mut encoded = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }

    encoded
}

async fn discard(staging: &Path) {
    if let Err(error) = tokio::fs::remove_file(staging).await {
        if error.kind() != std::io::ErrorKind::NotFound {
            warn!("cannot remove staged image {:?}: {error}", staging.display());
        }
    }
}

fn path_to_ref(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

async fn is_same_file(a: &Path, b: &Path) -> bool {
    match (tokio::fs::canonicalize(a).await, tokio::fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Blob store error types.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// Remote source cannot be fetched.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Fetched bytes cannot be written into the sandbox.
    #[error("failed to write image to {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = BlobError> = std::result::Result<T, E>;
