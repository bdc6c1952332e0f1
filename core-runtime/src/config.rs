//! # Core Configuration Module
//!
//! Provides configuration management for the tag synchronization core.
//!
//! ## Overview
//!
//! Configuration lives in a single JSON file (camelCase keys). Missing keys
//! fall back to defaults, and a missing file is created with defaults on first
//! load. Components never read configuration ad hoc: the host loads an
//! [`AppConfig`] snapshot, validates it and passes it to each operation, so a
//! single run always sees one consistent view.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::AppConfig;
//!
//! let config = AppConfig::load_or_init(&AppConfig::default_config_path())?
//!     .with_source_a("/music/master")
//!     .with_source_b("/music/usb");
//! config.validate()?;
//! ```
//!
//! ## File Format
//!
//! ```json
//! {
//!   "databasePath": null,
//!   "sourceAPath": "/music/master",
//!   "sourceBPath": "/music/usb",
//!   "tagsToSync": "ALL",
//!   "bidirectionalTags": ["TKEY", "TBPM", "TXXX:EnergyLevel"],
//!   "membershipTag": "TXXX:DJBIBLIOTHEK",
//!   "membershipExcludedValue": "nein",
//!   "trackedExtension": "mp3",
//!   "changeDetection": "ledger",
//!   "logFilePath": null,
//!   "logLevel": "info"
//! }
//! ```

use crate::error::{Error, Result};
use bridge_traits::time::LogLevel;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory name used under the platform data directory
const APP_DIR_NAME: &str = "tagsync";

/// Frames synchronized one-way when `tagsToSync` is `"ALL"`
pub const STANDARD_FRAMES: &[&str] = &[
    "TIT2", "TPE1", "TPE2", "TALB", "TYER", "TDRC", "TRCK", "TPOS", "TCON", "TCOM", "TCMP",
    "TPUB", "TBPM", "TKEY", "COMM",
];

/// Default bidirectional frames
pub const DEFAULT_BIDIRECTIONAL_TAGS: &[&str] = &["TKEY", "TBPM", "TXXX:EnergyLevel"];

/// Which tags flow one-way from Source A to Source B
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "TagSelectionRepr", into = "TagSelectionRepr")]
pub enum TagSelection {
    /// The standard frame set ([`STANDARD_FRAMES`])
    #[default]
    All,
    /// An explicit list of frame identifiers
    List(Vec<String>),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum TagSelectionRepr {
    Keyword(String),
    List(Vec<String>),
}

impl TryFrom<TagSelectionRepr> for TagSelection {
    type Error = String;

    fn try_from(repr: TagSelectionRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            TagSelectionRepr::Keyword(k) if k.eq_ignore_ascii_case("ALL") => Ok(TagSelection::All),
            TagSelectionRepr::Keyword(k) => Err(format!(
                "tagsToSync must be \"ALL\" or a list of frame ids, got \"{k}\""
            )),
            TagSelectionRepr::List(list) => Ok(TagSelection::List(list)),
        }
    }
}

impl From<TagSelection> for TagSelectionRepr {
    fn from(selection: TagSelection) -> Self {
        match selection {
            TagSelection::All => TagSelectionRepr::Keyword("ALL".to_string()),
            TagSelection::List(list) => TagSelectionRepr::List(list),
        }
    }
}

impl TagSelection {
    /// Resolve the selection to concrete frame identifiers
    pub fn resolve(&self) -> Vec<String> {
        match self {
            TagSelection::All => STANDARD_FRAMES.iter().map(|s| s.to_string()).collect(),
            TagSelection::List(list) => list.clone(),
        }
    }
}

/// Strategy used by preview/run to decide which side of a pair changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ChangeDetection {
    /// Compare current values against the per-tag ledger of last observed values
    #[default]
    Ledger,
    /// Compare file modification times against the pair's last sync time
    ModificationTime,
}

/// Application configuration snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// SQLite database file; defaults to `<data dir>/sync_data.db`
    pub database_path: Option<PathBuf>,
    /// Root of the authoritative tree
    pub source_a_path: Option<PathBuf>,
    /// Root of the mirrored tree
    pub source_b_path: Option<PathBuf>,
    pub tags_to_sync: TagSelection,
    pub bidirectional_tags: Vec<String>,
    /// Tag deciding library membership of a Source-A file
    pub membership_tag: String,
    /// Membership tag value that excludes a file (compared case-insensitively)
    pub membership_excluded_value: String,
    /// File extension tracked in both trees, without the dot
    pub tracked_extension: String,
    pub change_detection: ChangeDetection,
    /// Log file; defaults to `<data dir>/logs/tagsync.log`
    pub log_file_path: Option<PathBuf>,
    pub log_level: LogLevel,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            source_a_path: None,
            source_b_path: None,
            tags_to_sync: TagSelection::All,
            bidirectional_tags: DEFAULT_BIDIRECTIONAL_TAGS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            membership_tag: "TXXX:DJBIBLIOTHEK".to_string(),
            membership_excluded_value: "nein".to_string(),
            tracked_extension: "mp3".to_string(),
            change_detection: ChangeDetection::Ledger,
            log_file_path: None,
            log_level: LogLevel::Info,
        }
    }
}

impl AppConfig {
    /// Platform data directory for this application
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(APP_DIR_NAME)
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_data_dir().join("config.json")
    }

    /// Load configuration from `path`, writing defaults there when missing
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or if
    /// the defaults cannot be written.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            info!(path = %path.display(), "No config found, wrote defaults");
            return Ok(config);
        }

        Self::load(path)
    }

    /// Load configuration from an existing file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Persist configuration as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        debug!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// Validates the configuration
    ///
    /// Root paths are optional here; operations that need them check for them
    /// when they run.
    pub fn validate(&self) -> Result<()> {
        if self.membership_tag.trim().is_empty() {
            return Err(Error::Config("membershipTag cannot be empty".to_string()));
        }

        if self.tracked_extension.trim_start_matches('.').trim().is_empty() {
            return Err(Error::Config("trackedExtension cannot be empty".to_string()));
        }

        let mut seen = HashSet::new();
        for tag in &self.bidirectional_tags {
            validate_tag_id(tag)?;
            if !seen.insert(tag.to_ascii_lowercase()) {
                return Err(Error::Config(format!(
                    "bidirectionalTags contains duplicate entry: {tag}"
                )));
            }
        }

        if let TagSelection::List(list) = &self.tags_to_sync {
            for tag in list {
                validate_tag_id(tag)?;
            }
        }

        if let (Some(a), Some(b)) = (&self.source_a_path, &self.source_b_path) {
            if a == b {
                return Err(Error::Config(
                    "sourceAPath and sourceBPath must point to different directories".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Database path, falling back to the data directory default
    pub fn resolved_database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join("sync_data.db"))
    }

    /// Log file path, falling back to the data directory default
    pub fn resolved_log_file_path(&self) -> PathBuf {
        self.log_file_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join("logs").join("tagsync.log"))
    }

    /// Frames that flow one-way, excluding anything configured as bidirectional
    pub fn one_way_tags(&self) -> Vec<String> {
        self.tags_to_sync
            .resolve()
            .into_iter()
            .filter(|tag| !self.is_bidirectional(tag))
            .collect()
    }

    /// Case-insensitive membership test against the bidirectional set
    pub fn is_bidirectional(&self, tag: &str) -> bool {
        self.bidirectional_tags
            .iter()
            .any(|t| t.eq_ignore_ascii_case(tag))
    }

    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    pub fn with_source_a(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_a_path = Some(path.into());
        self
    }

    pub fn with_source_b(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_b_path = Some(path.into());
        self
    }

    pub fn with_tags_to_sync(mut self, selection: TagSelection) -> Self {
        self.tags_to_sync = selection;
        self
    }

    pub fn with_bidirectional_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bidirectional_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_membership_tag(mut self, tag: impl Into<String>) -> Self {
        self.membership_tag = tag.into();
        self
    }

    pub fn with_membership_excluded_value(mut self, value: impl Into<String>) -> Self {
        self.membership_excluded_value = value.into();
        self
    }

    pub fn with_change_detection(mut self, detection: ChangeDetection) -> Self {
        self.change_detection = detection;
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file_path = Some(path.into());
        self
    }
}

fn validate_tag_id(tag: &str) -> Result<()> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        return Err(Error::Config("Tag identifiers cannot be empty".to_string()));
    }
    if let Some(description) = trimmed.strip_prefix("TXXX:") {
        if description.is_empty() {
            return Err(Error::Config(format!(
                "User text frame needs a description: {tag}"
            )));
        }
    }
    Ok(())
}
