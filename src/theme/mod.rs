//! Render theme resolution

pub mod resolver;

pub use resolver::RenderThemeResolver;

use std::path::{Path, PathBuf};

/// Theme the renderer should load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeHandle {
    /// Theme file on disk, either user supplied or materialized from the bundled default
    External { path: PathBuf },
    /// The renderer's internal theme; the on-disk theme could not be provided
    BuiltIn { reason: String },
}

impl ThemeHandle {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ThemeHandle::External { path } => Some(path),
            ThemeHandle::BuiltIn { .. } => None,
        }
    }

    pub fn is_built_in(&self) -> bool {
        matches!(self, ThemeHandle::BuiltIn { .. })
    }
}

/// Theme shipped inside the crate, written out when a directory has none
pub const BUNDLED_THEME: &[u8] = include_bytes!("default_theme.xml");
