use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::catalog::header::{self, MapFileHeader};
use crate::catalog::MapFileDescriptor;
use crate::core::geo::{LatLng, LatLngBounds};
use crate::traits::MapDataStore;
use crate::LoadError;

/// A single opened map file.
///
/// Opening re-reads the header from disk instead of trusting the catalog,
/// since the file may have been replaced or truncated after the scan.
#[derive(Debug, Clone)]
pub struct SingleFileStore {
    descriptor: MapFileDescriptor,
    header: Arc<MapFileHeader>,
}

impl SingleFileStore {
    pub fn open(descriptor: &MapFileDescriptor, verify_file_size: bool) -> Result<Self, LoadError> {
        let path = descriptor.path();
        let len = fs::metadata(path).map_err(|e| LoadError::io(path, e))?.len();
        let expected_len = verify_file_size.then_some(len);

        let header = header::inspect_file(path, descriptor.compression(), expected_len)
            .map_err(|e| LoadError::invalid_map(path, e))?;

        log::debug!(
            "opened map file {} (v{}, {} zoom interval(s))",
            path.display(),
            header.file_version,
            header.zoom_intervals.len()
        );

        Ok(Self {
            descriptor: descriptor.clone(),
            header: Arc::new(header),
        })
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn path(&self) -> &Path {
        self.descriptor.path()
    }

    pub fn descriptor(&self) -> &MapFileDescriptor {
        &self.descriptor
    }

    pub fn header(&self) -> &MapFileHeader {
        &self.header
    }
}

impl MapDataStore for SingleFileStore {
    fn bounding_box(&self) -> LatLngBounds {
        self.header.bounding_box
    }

    fn start_position(&self) -> Option<LatLng> {
        self.header.start_position
    }

    fn start_zoom_level(&self) -> Option<u8> {
        self.header.start_zoom_level
    }

    fn zoom_range(&self) -> Option<(u8, u8)> {
        self.header.zoom_range()
    }

    fn members(&self) -> Vec<&SingleFileStore> {
        vec![self]
    }

    fn locate(&self, area: &LatLngBounds) -> Vec<&SingleFileStore> {
        if self.header.bounding_box.intersects(area) {
            vec![self]
        } else {
            Vec::new()
        }
    }
}
