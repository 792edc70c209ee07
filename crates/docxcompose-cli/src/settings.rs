//! Configuration Settings
//!
//! Options read from `docxcompose.toml`:
//!
//! ```toml
//! [compose]
//! remove_property_fields = true
//! restart_numbering = true
//! bookmark_numbering = "paired"
//! nsid_seed = 42
//!
//! [log]
//! level = "info"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use docxcompose_core::{BookmarkNumbering, ComposeOptions};

/// File looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "docxcompose.toml";

/// How bookmark ids are renumbered after each insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BookmarkMode {
    /// Starts and ends share one counter, matched pairs keep one id
    #[default]
    Paired,
    /// Starts and ends are counted separately
    Independent,
}

impl From<BookmarkMode> for BookmarkNumbering {
    fn from(mode: BookmarkMode) -> Self {
        match mode {
            BookmarkMode::Paired => BookmarkNumbering::Paired,
            BookmarkMode::Independent => BookmarkNumbering::Independent,
        }
    }
}

/// Top-level settings structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub compose: ComposeSettings,
    pub log: LogSettings,
}

impl Settings {
    /// Parse settings from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Read settings from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Settings from `explicit` if given, else from `docxcompose.toml` in
    /// `dir` when present, else the defaults
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate: PathBuf = dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            log::debug!("using {}", candidate.display());
            return Self::load(&candidate);
        }
        Ok(Self::default())
    }

    pub fn to_options(&self) -> ComposeOptions {
        ComposeOptions {
            remove_property_fields: self.compose.remove_property_fields,
            restart_numbering: self.compose.restart_numbering,
            bookmark_numbering: self.compose.bookmark_numbering.into(),
            nsid_seed: self.compose.nsid_seed,
        }
    }
}

/// `[compose]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeSettings {
    /// Turn DOCPROPERTY fields of appended documents into plain text
    pub remove_property_fields: bool,
    /// Restart numbered lists in each appended document
    pub restart_numbering: bool,
    pub bookmark_numbering: BookmarkMode,
    /// Fixed seed for numbering nsids, for reproducible output
    pub nsid_seed: Option<u32>,
}

impl Default for ComposeSettings {
    fn default() -> Self {
        Self {
            remove_property_fields: true,
            restart_numbering: true,
            bookmark_numbering: BookmarkMode::Paired,
            nsid_seed: None,
        }
    }
}

/// `[log]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Filter used when neither `--verbose` nor `RUST_LOG` is given
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}
