//! Opened map data.
//!
//! A [`LogicalStore`] is what the renderer queries: either one map file or a
//! [`CompositeStore`] over several, plus a record of the files that could not
//! be opened.

pub mod composite;
pub mod loader;
pub mod single;

pub use composite::CompositeStore;
pub use loader::StoreLoader;
pub use single::SingleFileStore;

use crate::core::geo::{LatLng, LatLngBounds};
use crate::traits::MapDataStore;
use crate::LoadError;

#[derive(Debug)]
pub enum StoreLayout {
    Single(SingleFileStore),
    Composite(CompositeStore),
}

impl StoreLayout {
    fn as_data_store(&self) -> &dyn MapDataStore {
        match self {
            StoreLayout::Single(store) => store,
            StoreLayout::Composite(store) => store,
        }
    }
}

/// A cataloged file that was usable at scan time but failed to open
#[derive(Debug, Clone)]
pub struct SkippedMember {
    pub name: String,
    pub error: LoadError,
}

#[derive(Debug)]
pub struct LogicalStore {
    layout: StoreLayout,
    skipped: Vec<SkippedMember>,
}

impl LogicalStore {
    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn skipped(&self) -> &[SkippedMember] {
        &self.skipped
    }

    pub fn member_names(&self) -> Vec<&str> {
        self.members().into_iter().map(|m| m.name()).collect()
    }

    /// `PartialLoadFailure` naming the skipped files, if any were skipped
    pub fn partial_failure(&self) -> Option<LoadError> {
        if self.skipped.is_empty() {
            return None;
        }
        Some(LoadError::PartialLoadFailure {
            failed: self.skipped.iter().map(|s| s.name.clone()).collect(),
        })
    }
}

impl MapDataStore for LogicalStore {
    fn bounding_box(&self) -> LatLngBounds {
        self.layout.as_data_store().bounding_box()
    }

    fn start_position(&self) -> Option<LatLng> {
        self.layout.as_data_store().start_position()
    }

    fn start_zoom_level(&self) -> Option<u8> {
        self.layout.as_data_store().start_zoom_level()
    }

    fn zoom_range(&self) -> Option<(u8, u8)> {
        self.layout.as_data_store().zoom_range()
    }

    fn members(&self) -> Vec<&SingleFileStore> {
        self.layout.as_data_store().members()
    }

    fn locate(&self, area: &LatLngBounds) -> Vec<&SingleFileStore> {
        self.layout.as_data_store().locate(area)
    }
}
