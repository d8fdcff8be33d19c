//! Shared trait abstractions
//!
//! `MapDataStore` is the query surface every store shape (single file,
//! composite, logical) exposes to the renderer. `MapAcquirer` is the seam for
//! whatever external component actually transfers map data onto the device.

use std::path::Path;

use crate::core::geo::{LatLng, LatLngBounds, TileCoord};
use crate::store::SingleFileStore;
use crate::LoadError;

/// Read-only view over one or more opened map files
pub trait MapDataStore: Send + Sync {
    /// Area covered by the store
    fn bounding_box(&self) -> LatLngBounds;

    /// Preferred initial camera position recorded by the map writer
    fn start_position(&self) -> Option<LatLng>;

    /// Preferred initial zoom level recorded by the map writer
    fn start_zoom_level(&self) -> Option<u8>;

    /// Lowest and highest zoom level with data
    fn zoom_range(&self) -> Option<(u8, u8)>;

    /// Opened files backing this store, in query order
    fn members(&self) -> Vec<&SingleFileStore>;

    /// Files able to serve `area`, subject to the store's merge policy
    fn locate(&self, area: &LatLngBounds) -> Vec<&SingleFileStore>;

    /// True when some member covers the tile at its zoom level
    fn supports_tile(&self, tile: TileCoord) -> bool {
        if !tile.is_valid() {
            return false;
        }
        if let Some((min, max)) = self.zoom_range() {
            if tile.z < min || tile.z > max {
                return false;
            }
        }
        !self.locate(&tile.bounds()).is_empty()
    }
}

/// Source of new offline map files.
///
/// The transfer protocol is up to the implementation (HTTP download, copy
/// from removable storage, ...). The lifecycle validates whatever lands in
/// `destination` before it becomes visible to scans.
#[async_trait::async_trait]
pub trait MapAcquirer: Send + Sync {
    /// Writes the map called `name` to `destination`, returning the byte count
    async fn acquire(&self, name: &str, destination: &Path) -> Result<u64, LoadError>;
}
