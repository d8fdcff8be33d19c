//! # offmap
//!
//! Offline map store manager.
//!
//! The crate discovers local Mapsforge map files (`.map` and `.map.gz`) in a
//! single directory, opens them as one logical data store, resolves the render
//! theme the renderer should use, and hands the result to the caller as a
//! [`ReadyOfflineMap`]. Drawing, gestures and camera control belong to the
//! rendering surface that consumes that handle.
//!
//! ```no_run
//! use offmap::prelude::*;
//!
//! # async fn demo() -> offmap::Result<()> {
//! let lifecycle = OfflineMapLifecycle::new(OfflineConfig::for_dir("/data/offline_maps"));
//! for descriptor in lifecycle.list_available().await? {
//!     println!("{} ({} bytes)", descriptor.name(), descriptor.size_bytes());
//! }
//! let ready = lifecycle.prepare().await?;
//! println!("centre on {:?} at zoom {}", ready.initial_center, ready.initial_zoom_level);
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

pub mod catalog;
pub mod core;
pub mod lifecycle;
pub mod logging;
pub mod prelude;
pub mod runtime;
pub mod store;
pub mod theme;
pub mod traits;
pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    config::{MergePolicy, OfflineConfig},
    geo::{LatLng, LatLngBounds, TileCoord},
};

pub use catalog::{
    header::{Compression, MapFileHeader},
    index::MapFileIndex,
    MapFileDescriptor, OfflineCatalog,
};

pub use store::{CompositeStore, LogicalStore, SingleFileStore, StoreLoader};

pub use theme::{RenderThemeResolver, ThemeHandle};

pub use lifecycle::{LifecycleState, OfflineMapLifecycle, ReadyOfflineMap};

pub use runtime::IoPool;

pub use traits::{MapAcquirer, MapDataStore};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, LoadError>;

/// Errors surfaced by scanning, opening, theming and lifecycle operations.
///
/// Per-file problems (`InvalidMapFile`, `DuplicateName`, `PartialLoadFailure`,
/// `ThemeUnavailable`) are normally absorbed and reported alongside a
/// successful result; the remaining variants fail the whole operation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadError {
    #[error("no offline map data available")]
    NoDataAvailable,

    #[error("{} map file(s) failed to open: {}", .failed.len(), .failed.join(", "))]
    PartialLoadFailure { failed: Vec<String> },

    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("offline map '{name}' not found")]
    NotFound { name: String },

    #[error("render theme unavailable at {path:?}: {reason}")]
    ThemeUnavailable { path: PathBuf, reason: String },

    #[error("invalid map file {path:?}: {reason}")]
    InvalidMapFile { path: PathBuf, reason: String },

    #[error("map name '{name}' is already taken, ignoring {path:?}")]
    DuplicateName { name: String, path: PathBuf },

    #[error("invalid map name '{name}'")]
    InvalidName { name: String },

    #[error("superseded by a newer prepare request")]
    Superseded,

    #[error("worker task failed: {0}")]
    Worker(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl LoadError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn invalid_map(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::InvalidMapFile {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Error type alias for convenience
pub type Error = LoadError;
