//! Prelude module for common offmap types and traits
//!
//! `use offmap::prelude::*;` brings in what an embedding application usually
//! needs to list, prepare and hand over offline maps.

pub use crate::core::{
    config::{MergePolicy, OfflineConfig},
    geo::{LatLng, LatLngBounds, TileCoord},
};

pub use crate::catalog::{
    header::{Compression, MapFileHeader},
    index::MapFileIndex,
    MapFileDescriptor, OfflineCatalog, Readability,
};

pub use crate::store::{CompositeStore, LogicalStore, SingleFileStore, StoreLayout, StoreLoader};

pub use crate::theme::{RenderThemeResolver, ThemeHandle};

pub use crate::lifecycle::{LifecycleState, OfflineMapLifecycle, ReadyOfflineMap};

pub use crate::runtime::IoPool;

pub use crate::traits::{MapAcquirer, MapDataStore};

pub use crate::{LoadError, Result};

pub use std::sync::Arc;

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
