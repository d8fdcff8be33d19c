use super::composite::CompositeStore;
use super::single::SingleFileStore;
use super::{LogicalStore, SkippedMember, StoreLayout};
use crate::catalog::OfflineCatalog;
use crate::core::config::{MergePolicy, OfflineConfig};
use crate::LoadError;

/// Opens every usable catalog entry and assembles the logical store.
///
/// Files that fail to open are skipped and recorded on the result. Only when
/// nothing at all opens does loading fail.
#[derive(Debug, Clone)]
pub struct StoreLoader {
    policy: MergePolicy,
    verify_file_size: bool,
}

impl StoreLoader {
    pub fn new(policy: MergePolicy) -> Self {
        Self {
            policy,
            verify_file_size: true,
        }
    }

    pub fn from_config(config: &OfflineConfig) -> Self {
        Self {
            policy: config.merge_policy,
            verify_file_size: config.verify_file_size,
        }
    }

    pub fn with_verify_file_size(mut self, verify: bool) -> Self {
        self.verify_file_size = verify;
        self
    }

    pub fn open(&self, catalog: &OfflineCatalog) -> Result<LogicalStore, LoadError> {
        let mut opened = Vec::new();
        let mut skipped = Vec::new();

        for descriptor in catalog.usable() {
            match SingleFileStore::open(descriptor, self.verify_file_size) {
                Ok(store) => opened.push(store),
                Err(error) => {
                    log::warn!("failed to open map '{}': {}", descriptor.name(), error);
                    skipped.push(SkippedMember {
                        name: descriptor.name().to_string(),
                        error,
                    });
                }
            }
        }

        let layout = match opened.len() {
            0 => {
                log::info!(
                    "no usable offline maps in {} ({} skipped)",
                    catalog.directory().display(),
                    skipped.len()
                );
                return Err(LoadError::NoDataAvailable);
            }
            1 => StoreLayout::Single(opened.remove(0)),
            n => {
                log::debug!("merging {} map files with {:?}", n, self.policy);
                StoreLayout::Composite(CompositeStore::new(opened, self.policy)?)
            }
        };

        Ok(LogicalStore { layout, skipped })
    }
}

impl Default for StoreLoader {
    fn default() -> Self {
        Self::new(MergePolicy::default())
    }
}
