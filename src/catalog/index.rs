//! Directory scanner that builds an [`OfflineCatalog`].

use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::header::{self, Compression};
use super::{MapFileDescriptor, OfflineCatalog, Readability};
use crate::core::config::OfflineConfig;
use crate::core::constants::{COMPRESSED_MAP_EXTENSION, MAP_EXTENSION};
use crate::LoadError;

/// Splits a file name into its catalog name and compression.
///
/// Returns `None` for files that are not offline maps.
pub fn classify(file_name: &str) -> Option<(&str, Compression)> {
    let (stem, compression) = if let Some(stem) = file_name.strip_suffix(COMPRESSED_MAP_EXTENSION)
    {
        (stem, Compression::Gzip)
    } else {
        (file_name.strip_suffix(MAP_EXTENSION)?, Compression::None)
    };

    if stem.is_empty() {
        None
    } else {
        Some((stem, compression))
    }
}

/// Scans a directory for map files and reads their headers.
///
/// Scanning never fails as a whole: unreadable files are cataloged as such and
/// the problem is recorded in [`OfflineCatalog::issues`].
#[derive(Debug, Clone)]
pub struct MapFileIndex {
    verify_file_size: bool,
}

impl MapFileIndex {
    pub fn new() -> Self {
        Self {
            verify_file_size: true,
        }
    }

    pub fn from_config(config: &OfflineConfig) -> Self {
        Self {
            verify_file_size: config.verify_file_size,
        }
    }

    pub fn with_verify_file_size(mut self, verify: bool) -> Self {
        self.verify_file_size = verify;
        self
    }

    /// Builds a fresh catalog of `directory`, creating the directory if it is missing
    pub fn scan(&self, directory: &Path) -> OfflineCatalog {
        let mut catalog = OfflineCatalog::new(directory);

        if let Err(e) = fs::create_dir_all(directory) {
            log::warn!("cannot create offline maps dir {}: {}", directory.display(), e);
            catalog.record_issue(LoadError::io(directory, e));
            return catalog;
        }

        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("cannot list offline maps dir {}: {}", directory.display(), e);
                catalog.record_issue(LoadError::io(directory, e));
                return catalog;
            }
        };

        let mut file_names = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(file_name) if classify(&file_name).is_some() => file_names.push(file_name),
                Ok(_) => {}
                Err(raw) => {
                    if classify(&raw.to_string_lossy()).is_some() {
                        log::warn!("map file name is not valid UTF-8: {}", path.display());
                        catalog.record_issue(LoadError::invalid_map(
                            &path,
                            "file name is not valid UTF-8",
                        ));
                    }
                }
            }
        }
        file_names.sort();

        for file_name in file_names {
            let path = directory.join(&file_name);
            let descriptor = match self.describe(&path) {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    log::warn!("skipping {}: {}", path.display(), e);
                    catalog.record_issue(e);
                    continue;
                }
            };

            let unreadable = match descriptor.readability() {
                Readability::Unreadable { reason } => Some(reason.clone()),
                Readability::Readable(_) => None,
            };
            match catalog.insert(descriptor) {
                Ok(()) => {
                    if let Some(reason) = unreadable {
                        log::warn!("unreadable map file {}: {}", path.display(), reason);
                        catalog.record_issue(LoadError::invalid_map(&path, reason));
                    }
                }
                Err(duplicate) => {
                    log::warn!(
                        "map name '{}' already cataloged, ignoring {}",
                        duplicate.name(),
                        path.display()
                    );
                    catalog.record_issue(LoadError::DuplicateName {
                        name: duplicate.name().to_string(),
                        path,
                    });
                }
            }
        }

        log::debug!(
            "scanned {}: {} map file(s), {} issue(s)",
            directory.display(),
            catalog.len(),
            catalog.issues().len()
        );
        catalog
    }

    /// Describes a single map file.
    ///
    /// A file with a bad header still yields a descriptor; only a path that is
    /// not a map file name or whose metadata cannot be read is an error.
    pub fn describe(&self, path: &Path) -> Result<MapFileDescriptor, LoadError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| LoadError::invalid_map(path, "file name is not valid UTF-8"))?;
        let (name, compression) = classify(file_name)
            .ok_or_else(|| LoadError::invalid_map(path, "not a recognized map file extension"))?;

        let size_bytes = fs::metadata(path)
            .map_err(|e| LoadError::io(path, e))?
            .len();

        let expected_len = self.verify_file_size.then_some(size_bytes);
        let readability = match header::inspect_file(path, compression, expected_len) {
            Ok(header) => Readability::Readable(Arc::new(header)),
            Err(e) => Readability::Unreadable {
                reason: e.to_string(),
            },
        };

        Ok(MapFileDescriptor::new(
            name,
            path,
            size_bytes,
            compression,
            readability,
        ))
    }
}

impl Default for MapFileIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::header::MapFileHeader;
    use crate::core::geo::LatLngBounds;

    fn write_map(dir: &Path, file_name: &str, bbox: LatLngBounds) {
        let bytes = MapFileHeader::new(bbox).to_standalone_file();
        fs::write(dir.join(file_name), bytes).unwrap();
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("berlin.map"), Some(("berlin", Compression::None)));
        assert_eq!(classify("berlin.map.gz"), Some(("berlin", Compression::Gzip)));
        assert_eq!(classify("default.xml"), None);
        assert_eq!(classify("berlin.map.partial"), None);
        assert_eq!(classify(".map"), None);
    }

    #[test]
    fn test_missing_directory_is_created_and_empty() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("offline_maps");

        let catalog = MapFileIndex::new().scan(&dir);
        assert!(catalog.is_empty());
        assert!(catalog.issues().is_empty());
        assert!(dir.is_dir());
    }

    #[test]
    fn test_scan_keeps_corrupt_files_listed() {
        let dir = tempfile::tempdir().unwrap();
        let bbox = LatLngBounds::from_coords(52.3, 13.0, 52.7, 13.7);
        write_map(dir.path(), "berlin.map", bbox);
        fs::write(dir.path().join("corrupt.map"), b"Mapsforge map file for corrupt").unwrap();
        fs::write(dir.path().join("notes.txt"), b"ignore me").unwrap();

        let catalog = MapFileIndex::new().scan(dir.path());

        assert_eq!(catalog.names(), vec!["berlin", "corrupt"]);
        assert_eq!(catalog.get("berlin").unwrap().bounding_box(), Some(bbox));
        assert!(!catalog.get("corrupt").unwrap().is_readable());
        assert_eq!(catalog.issues().len(), 1);
        assert!(matches!(catalog.issues()[0], LoadError::InvalidMapFile { .. }));
    }

    #[test]
    fn test_rescan_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        write_map(dir.path(), "a.map", LatLngBounds::from_coords(1.0, 1.0, 2.0, 2.0));
        write_map(dir.path(), "b.map", LatLngBounds::from_coords(3.0, 3.0, 4.0, 4.0));
        fs::write(dir.path().join("c.map"), b"junk").unwrap();

        let index = MapFileIndex::new();
        assert_eq!(index.scan(dir.path()), index.scan(dir.path()));
    }

    #[test]
    fn test_plain_file_wins_name_collision() {
        let dir = tempfile::tempdir().unwrap();
        let bbox = LatLngBounds::from_coords(52.3, 13.0, 52.7, 13.7);
        write_map(dir.path(), "berlin.map", bbox);
        write_map(dir.path(), "berlin.map.gz", bbox);

        let catalog = MapFileIndex::new().scan(dir.path());
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("berlin").unwrap().compression(), Compression::None);
        assert!(catalog
            .issues()
            .iter()
            .any(|issue| matches!(issue, LoadError::DuplicateName { name, .. } if name == "berlin")));
        // the losing file is not reported as corrupt on top of being a duplicate
        assert_eq!(catalog.issues().len(), 1);
    }

    #[test]
    fn test_size_check_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes =
            MapFileHeader::new(LatLngBounds::from_coords(1.0, 1.0, 2.0, 2.0)).to_standalone_file();
        bytes.extend_from_slice(&[0u8; 8]);
        fs::write(dir.path().join("padded.map"), bytes).unwrap();

        let strict = MapFileIndex::new().scan(dir.path());
        assert!(!strict.get("padded").unwrap().is_readable());

        let lenient = MapFileIndex::new().with_verify_file_size(false).scan(dir.path());
        assert!(lenient.get("padded").unwrap().is_readable());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_map_name_is_reported() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let bbox = LatLngBounds::from_coords(52.3, 13.0, 52.7, 13.7);
        write_map(dir.path(), "berlin.map", bbox);
        let raw = OsStr::from_bytes(b"k\xf6ln.map");
        fs::write(dir.path().join(raw), MapFileHeader::new(bbox).to_standalone_file()).unwrap();
        fs::write(dir.path().join(OsStr::from_bytes(b"n\xf6tes.txt")), b"").unwrap();

        let catalog = MapFileIndex::new().scan(dir.path());
        assert_eq!(catalog.names(), vec!["berlin"]);
        assert_eq!(catalog.issues().len(), 1);
        assert!(matches!(
            &catalog.issues()[0],
            LoadError::InvalidMapFile { reason, .. } if reason.contains("UTF-8")
        ));
    }
}
