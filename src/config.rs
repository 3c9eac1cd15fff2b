// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the configuration file that decides where the
//! wardrobe keeps its state, and how the blob store names its files. The
//! configuration is optional: a missing file means every setting takes its
//! default value.

use crate::path::default_data_dir;

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, instrument};

/// Name of the blob store sandbox directory inside the data directory.
pub const DEFAULT_BLOB_FOLDER: &str = "Wardrobe";

/// Extension used for stored images when none can be read off the source.
pub const DEFAULT_FALLBACK_EXTENSION: &str = "jpg";

/// Wardrobe configuration.
///
/// # General Layout
///
/// ```toml
/// data_dir = "$HOME/.local/share/clothesline"
/// blob_folder = "Wardrobe"
/// fallback_extension = "jpg"
/// preset_tags = ["top", "bottom"]
/// ```
///
/// Every field may be omitted.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Root of app-private storage.
    pub data_dir: PathBuf,

    /// Sandbox subdirectory holding copied images.
    pub blob_folder: String,

    /// Extension for stored images whose source has no detectable extension.
    pub fallback_extension: String,

    /// Override for the vocabulary seeded into an empty tag registry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset_tags: Option<Vec<String>>,
}

impl Config {
    /// Load configuration file, or fall back to defaults if it is missing.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if the file exists but is unreadable.
    /// - Return [`ConfigError::Deserialize`] if the file is not valid TOML.
    /// - Return [`ConfigError::ShellExpansion`] if `data_dir` expansion fails.
    #[instrument(skip(path), level = "debug")]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(data) => data.parse(),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("no configuration at {:?}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(err) => Err(ConfigError::Read {
                source: err,
                config_path: path.to_path_buf(),
            }),
        }
    }

    /// Absolute path to the blob store sandbox directory.
    pub fn blob_root(&self) -> PathBuf {
        self.data_dir.join(&self.blob_folder)
    }

    /// Absolute path to the key-value store directory.
    pub fn kv_root(&self) -> PathBuf {
        self.data_dir.join("kv")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // INVARIANT: Fall back to a relative directory when no home exists.
            data_dir: default_data_dir().unwrap_or_else(|_| PathBuf::from(".clothesline")),
            blob_folder: DEFAULT_BLOB_FOLDER.into(),
            fallback_extension: DEFAULT_FALLBACK_EXTENSION.into(),
            preset_tags: None,
        }
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: Config = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on data directory field.
        config.data_dir = PathBuf::from(
            shellexpand::full(config.data_dir.to_string_lossy().as_ref())
                .map_err(ConfigError::ShellExpansion)?
                .into_owned(),
        );

        Ok(config)
    }
}

impl Display for Config {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file exists but cannot be read.
    #[error("failed to read configuration at {:?}", config_path.display())]
    Read {
        #[source]
        source: std::io::Error,
        config_path: PathBuf,
    },

    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[sealed_test(env = [("CLOSET", "/home/blah/closet")])]
    fn deserialize_config() -> anyhow::Result<()> {
        let result: Config = r#"
            data_dir = "$CLOSET/state"
            blob_folder = "Photos"
            fallback_extension = "png"
            preset_tags = ["top", "bottom"]
        "#
        .parse()?;

        let expect = Config {
            data_dir: PathBuf::from("/home/blah/closet/state"),
            blob_folder: "Photos".into(),
            fallback_extension: "png".into(),
            preset_tags: Some(vec!["top".into(), "bottom".into()]),
        };

        assert_eq!(result, expect);
        assert_eq!(result.blob_root(), PathBuf::from("/home/blah/closet/state/Photos"));

        Ok(())
    }

    #[test]
    fn deserialize_partial_config_uses_defaults() -> anyhow::Result<()> {
        let result: Config = r#"data_dir = "/tmp/closet""#.parse()?;
        assert_eq!(result.blob_folder, DEFAULT_BLOB_FOLDER);
        assert_eq!(result.fallback_extension, DEFAULT_FALLBACK_EXTENSION);
        assert_eq!(result.preset_tags, None);

        Ok(())
    }

    #[test]
    fn serialize_config() {
        let result = Config {
            data_dir: PathBuf::from("/home/blah/closet"),
            blob_folder: "Wardrobe".into(),
            fallback_extension: "jpg".into(),
            preset_tags: Some(vec!["top".into(), "blue".into()]),
        }
        .to_string();

        let expect = indoc! {r#"
            data_dir = "/home/blah/closet"
            blob_folder = "Wardrobe"
            fallback_extension = "jpg"
            preset_tags = [
                "top",
                "blue",
            ]
        "#};

        assert_eq!(result, expect);
    }

    #[test]
    fn load_missing_config_is_default() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let result = Config::load(dir.path().join("nope.toml"))?;
        assert_eq!(result, Config::default());

        Ok(())
    }
}
