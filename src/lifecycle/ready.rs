use crate::core::geo::LatLng;
use crate::store::LogicalStore;
use crate::theme::ThemeHandle;
use crate::traits::MapDataStore;
use crate::LoadError;

/// Everything a rendering surface needs to show the offline maps
#[derive(Debug)]
pub struct ReadyOfflineMap {
    pub store: LogicalStore,
    pub theme: ThemeHandle,
    pub initial_center: LatLng,
    pub initial_zoom_level: u8,
    /// Non-fatal problems met on the way: scan issues and skipped members
    pub warnings: Vec<LoadError>,
}

impl ReadyOfflineMap {
    pub(crate) fn new(
        store: LogicalStore,
        theme: ThemeHandle,
        default_zoom_level: u8,
        warnings: Vec<LoadError>,
    ) -> Self {
        let initial_center = store
            .start_position()
            .unwrap_or_else(|| store.bounding_box().center());
        let initial_zoom_level = initial_zoom(&store, default_zoom_level);

        Self {
            store,
            theme,
            initial_center,
            initial_zoom_level,
            warnings,
        }
    }
}

/// Recorded start zoom, else the default, kept inside the zoom levels the store can serve
fn initial_zoom(store: &dyn MapDataStore, default_zoom_level: u8) -> u8 {
    let zoom = store.start_zoom_level().unwrap_or(default_zoom_level);
    match store.zoom_range() {
        // min can exceed max in a malformed header
        Some((min, max)) => zoom.max(min).min(max),
        None => zoom,
    }
}
