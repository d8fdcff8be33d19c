//! Configuration for the offline map manager
//!
//! `OfflineConfig` can be built in code with the `with_*` setters or loaded
//! from a JSON document; every field has a default so partial documents work.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::constants::{DEFAULT_THEME_FILE, DEFAULT_ZOOM_LEVEL};
use crate::LoadError;

/// How a composite store answers area queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Try members in bounding-box order and return the first one that covers the area
    #[default]
    FirstMatch,
    /// Return every member overlapping the area
    ReturnAll,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfflineConfig {
    /// Application-private directory holding the map files and the theme
    pub maps_dir: PathBuf,
    /// Theme location, relative to `maps_dir`
    pub theme_file: PathBuf,
    /// Zoom used when the store does not record a start zoom
    pub default_zoom_level: u8,
    pub merge_policy: MergePolicy,
    /// Reject plain map files whose header size field disagrees with the on-disk length
    pub verify_file_size: bool,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            maps_dir: PathBuf::from("offline_maps"),
            theme_file: PathBuf::from(DEFAULT_THEME_FILE),
            default_zoom_level: DEFAULT_ZOOM_LEVEL,
            merge_policy: MergePolicy::default(),
            verify_file_size: true,
        }
    }
}

impl OfflineConfig {
    /// Default configuration rooted at `maps_dir`
    pub fn for_dir(maps_dir: impl Into<PathBuf>) -> Self {
        Self {
            maps_dir: maps_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_theme_file(mut self, theme_file: impl Into<PathBuf>) -> Self {
        self.theme_file = theme_file.into();
        self
    }

    pub fn with_default_zoom_level(mut self, zoom: u8) -> Self {
        self.default_zoom_level = zoom;
        self
    }

    pub fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    pub fn with_verify_file_size(mut self, verify: bool) -> Self {
        self.verify_file_size = verify;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        serde_json::from_str(json).map_err(|e| LoadError::Config(e.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| LoadError::io(path.to_path_buf(), e))?;
        let config = Self::from_json_str(&contents)?;
        log::debug!("loaded offline config from {}", path.display());
        Ok(config)
    }

    /// Absolute (or `maps_dir`-relative) location of the theme file
    pub fn theme_path(&self) -> PathBuf {
        self.maps_dir.join(&self.theme_file)
    }
}
