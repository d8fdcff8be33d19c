//! Catalog of the map files found in an offline maps directory.

pub mod header;
pub mod index;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::geo::LatLngBounds;
use crate::LoadError;
use header::{Compression, MapFileHeader};

/// Whether a cataloged file's header could be decoded
#[derive(Debug, Clone, PartialEq)]
pub enum Readability {
    Readable(Arc<MapFileHeader>),
    Unreadable { reason: String },
}

/// One map file on disk, as seen by the last scan
#[derive(Debug, Clone, PartialEq)]
pub struct MapFileDescriptor {
    name: String,
    path: PathBuf,
    size_bytes: u64,
    compression: Compression,
    readability: Readability,
}

impl MapFileDescriptor {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        size_bytes: u64,
        compression: Compression,
        readability: Readability,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            size_bytes,
            compression,
            readability,
        }
    }

    /// File name with the map extension stripped (`berlin.map.gz` -> `berlin`)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn readability(&self) -> &Readability {
        &self.readability
    }

    pub fn header(&self) -> Option<&MapFileHeader> {
        match &self.readability {
            Readability::Readable(header) => Some(header),
            Readability::Unreadable { .. } => None,
        }
    }

    /// `None` for files whose header could not be read
    pub fn bounding_box(&self) -> Option<LatLngBounds> {
        self.header().map(|h| h.bounding_box)
    }

    pub fn is_readable(&self) -> bool {
        matches!(self.readability, Readability::Readable(_))
    }
}

/// Name-keyed set of descriptors produced by one scan.
///
/// Unreadable files stay listed so they can still be inspected and deleted;
/// `usable()` yields only the ones a store can be built from.
#[derive(Debug, Clone)]
pub struct OfflineCatalog {
    directory: PathBuf,
    entries: BTreeMap<String, MapFileDescriptor>,
    issues: Vec<LoadError>,
}

impl OfflineCatalog {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            entries: BTreeMap::new(),
            issues: Vec::new(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Adds `descriptor`, handing it back if its name is already taken
    pub fn insert(&mut self, descriptor: MapFileDescriptor) -> Result<(), MapFileDescriptor> {
        if self.entries.contains_key(descriptor.name()) {
            return Err(descriptor);
        }
        self.entries.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    pub(crate) fn record_issue(&mut self, issue: LoadError) {
        self.issues.push(issue);
    }

    pub fn get(&self, name: &str) -> Option<&MapFileDescriptor> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Descriptors in ascending name order
    pub fn descriptors(&self) -> impl Iterator<Item = &MapFileDescriptor> {
        self.entries.values()
    }

    pub fn usable(&self) -> impl Iterator<Item = &MapFileDescriptor> {
        self.descriptors().filter(|d| d.is_readable())
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Problems met while scanning; never fatal to the scan itself
    pub fn issues(&self) -> &[LoadError] {
        &self.issues
    }

    pub fn total_size_bytes(&self) -> u64 {
        self.descriptors().map(|d| d.size_bytes).sum()
    }

    /// Union of every readable file's bounding box
    pub fn coverage(&self) -> Option<LatLngBounds> {
        let boxes: Vec<LatLngBounds> = self.usable().filter_map(|d| d.bounding_box()).collect();
        LatLngBounds::union_all(&boxes)
    }

    pub fn into_descriptors(self) -> Vec<MapFileDescriptor> {
        self.entries.into_values().collect()
    }
}

/// Two catalogs are equal when they describe the same files; issues are diagnostics only.
impl PartialEq for OfflineCatalog {
    fn eq(&self, other: &Self) -> bool {
        self.directory == other.directory && self.entries == other.entries
    }
}
