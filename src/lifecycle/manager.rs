use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;

use super::ready::ReadyOfflineMap;
use super::state::LifecycleState;
use crate::catalog::header::{self, Compression};
use crate::catalog::index::MapFileIndex;
use crate::catalog::{MapFileDescriptor, OfflineCatalog};
use crate::core::config::OfflineConfig;
use crate::core::constants::{MAP_EXTENSION, STAGING_SUFFIX};
use crate::runtime::IoPool;
use crate::store::StoreLoader;
use crate::theme::RenderThemeResolver;
use crate::traits::MapAcquirer;
use crate::LoadError;

/// Orchestrates scanning, opening and theming of the offline maps directory.
///
/// Filesystem work runs on the [`IoPool`]. Only the most recent
/// [`prepare`](Self::prepare) may publish state; older calls still finish but
/// return [`LoadError::Superseded`]. Deleting and installing wait for
/// in-flight prepares to finish and block new ones until they are done.
#[derive(Debug)]
pub struct OfflineMapLifecycle {
    config: OfflineConfig,
    pool: IoPool,
    index: MapFileIndex,
    loader: StoreLoader,
    themes: Arc<RenderThemeResolver>,
    generation: AtomicU64,
    state: watch::Sender<LifecycleState>,
    catalog_lock: RwLock<()>,
}

impl OfflineMapLifecycle {
    pub fn new(config: OfflineConfig) -> Self {
        let (state, _) = watch::channel(LifecycleState::Idle);
        Self {
            index: MapFileIndex::from_config(&config),
            loader: StoreLoader::from_config(&config),
            config,
            pool: IoPool::ambient(),
            themes: RenderThemeResolver::global(),
            generation: AtomicU64::new(0),
            state,
            catalog_lock: RwLock::new(()),
        }
    }

    /// Lifecycle configured from a JSON file
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        Ok(Self::new(OfflineConfig::from_json_file(path)?))
    }

    pub fn with_pool(mut self, pool: IoPool) -> Self {
        self.pool = pool;
        self
    }

    /// Uses `themes` instead of the process-wide resolver
    pub fn with_theme_resolver(mut self, themes: Arc<RenderThemeResolver>) -> Self {
        self.themes = themes;
        self
    }

    pub fn config(&self) -> &OfflineConfig {
        &self.config
    }

    pub fn maps_dir(&self) -> &Path {
        &self.config.maps_dir
    }

    pub fn state(&self) -> LifecycleState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Scans the directory, opens every usable map and resolves the theme.
    ///
    /// Dropping the returned future while it is scanning or loading publishes
    /// `Idle`, unless a newer prepare has taken over in the meantime.
    pub async fn prepare(&self) -> Result<ReadyOfflineMap, LoadError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut in_flight = InFlightPrepare {
            lifecycle: self,
            generation,
            finished: false,
        };
        let result = self.run_prepare(generation).await;
        in_flight.finished = true;
        result
    }

    async fn run_prepare(&self, generation: u64) -> Result<ReadyOfflineMap, LoadError> {
        let _guard = self.catalog_lock.read().await;

        self.publish(generation, LifecycleState::Scanning)?;
        let catalog = match self.scan().await {
            Ok(catalog) => catalog,
            Err(e) => return Err(self.fail(generation, e)),
        };

        let mut warnings = catalog.issues().to_vec();
        if catalog.usable().next().is_none() {
            return Err(self.fail(generation, empty_catalog_error(&catalog)));
        }

        self.publish(generation, LifecycleState::Loading)?;
        let loader = self.loader.clone();
        let store = match self.pool.run(move || loader.open(&catalog)).await {
            Ok(store) => store,
            Err(e) => return Err(self.fail(generation, e)),
        };
        if let Some(partial) = store.partial_failure() {
            log::warn!("{}", partial);
            warnings.push(partial);
        }

        let themes = Arc::clone(&self.themes);
        let theme_path = self.config.theme_path();
        let theme = match self.pool.run(move || Ok(themes.resolve_at(&theme_path))).await {
            Ok(theme) => theme,
            Err(e) => return Err(self.fail(generation, e)),
        };

        let ready = ReadyOfflineMap::new(store, theme, self.config.default_zoom_level, warnings);
        self.publish(generation, LifecycleState::Ready)?;
        log::info!(
            "offline maps ready: {} member(s), centre {:?}, zoom {}",
            ready.store.member_names().len(),
            ready.initial_center,
            ready.initial_zoom_level
        );
        Ok(ready)
    }

    /// Runs [`prepare`](Self::prepare) as a detached task
    pub fn spawn_prepare(self: &Arc<Self>) -> JoinHandle<Result<ReadyOfflineMap, LoadError>> {
        let this = Arc::clone(self);
        self.pool.spawn(async move { this.prepare().await })
    }

    /// Every map file in the directory, from a fresh scan
    pub async fn list_available(&self) -> Result<Vec<MapFileDescriptor>, LoadError> {
        let _guard = self.catalog_lock.read().await;
        Ok(self.scan().await?.into_descriptors())
    }

    /// Combined on-disk size of all cataloged map files
    pub async fn total_size_bytes(&self) -> Result<u64, LoadError> {
        let _guard = self.catalog_lock.read().await;
        Ok(self.scan().await?.total_size_bytes())
    }

    /// Removes the map file cataloged as `name`
    pub async fn delete(&self, name: &str) -> Result<(), LoadError> {
        let _guard = self.catalog_lock.write().await;
        let catalog = self.scan().await?;
        let descriptor = catalog.get(name).ok_or_else(|| LoadError::NotFound {
            name: name.to_string(),
        })?;

        let path = descriptor.path().to_path_buf();
        self.pool
            .run(move || fs::remove_file(&path).map_err(|e| LoadError::io(path, e)))
            .await?;
        log::info!("deleted offline map '{}'", name);
        Ok(())
    }

    /// Removes every cataloged map file, returning how many were removed.
    ///
    /// Other files in the directory, the theme included, are left alone. A
    /// failed removal does not stop the others; the first failure is returned.
    pub async fn delete_all(&self) -> Result<usize, LoadError> {
        let _guard = self.catalog_lock.write().await;
        let catalog = self.scan().await?;

        let removed = self
            .pool
            .run(move || {
                let mut removed = 0;
                let mut first_error = None;
                for descriptor in catalog.descriptors() {
                    match fs::remove_file(descriptor.path()) {
                        Ok(()) => removed += 1,
                        Err(e) => {
                            log::warn!("cannot remove {}: {}", descriptor.path().display(), e);
                            first_error.get_or_insert_with(|| LoadError::io(descriptor.path(), e));
                        }
                    }
                }
                match first_error {
                    Some(e) => Err(e),
                    None => Ok(removed),
                }
            })
            .await?;

        log::info!("deleted all {} offline map(s)", removed);
        Ok(removed)
    }

    /// Fetches a new map through `acquirer` and adds it to the directory as `<name>.map`.
    ///
    /// The data is staged next to its final location and only renamed into
    /// place once its header validates, so a failed or bogus transfer never
    /// shows up in a scan. An existing plain map of the same name is replaced.
    pub async fn install(
        &self,
        name: &str,
        acquirer: &dyn MapAcquirer,
    ) -> Result<MapFileDescriptor, LoadError> {
        validate_name(name)?;
        let _guard = self.catalog_lock.write().await;

        let dir = self.config.maps_dir.clone();
        let target = dir.join(format!("{name}{MAP_EXTENSION}"));
        let staging = dir.join(format!("{name}{MAP_EXTENSION}{STAGING_SUFFIX}"));

        let create = dir.clone();
        self.pool
            .run(move || fs::create_dir_all(&create).map_err(|e| LoadError::io(create, e)))
            .await?;

        log::info!("acquiring offline map '{}'", name);
        if let Err(e) = acquirer.acquire(name, &staging).await {
            log::warn!("acquiring '{}' failed: {}", name, e);
            let stale = staging.clone();
            self.pool
                .run(move || {
                    let _ = fs::remove_file(stale);
                    Ok(())
                })
                .await?;
            return Err(e);
        }

        let verify_file_size = self.config.verify_file_size;
        let index = self.index.clone();
        let descriptor = self
            .pool
            .run(move || commit_staged(&staging, &target, verify_file_size, &index))
            .await?;

        log::info!(
            "installed offline map '{}' ({} bytes)",
            descriptor.name(),
            descriptor.size_bytes()
        );
        Ok(descriptor)
    }

    async fn scan(&self) -> Result<OfflineCatalog, LoadError> {
        let index = self.index.clone();
        let dir = self.config.maps_dir.clone();
        let catalog = self.pool.run(move || Ok(index.scan(&dir))).await?;
        for issue in catalog.issues() {
            log::debug!("scan issue: {}", issue);
        }
        Ok(catalog)
    }

    /// Publishes `next` unless a newer prepare has started
    fn publish(&self, generation: u64, next: LifecycleState) -> Result<(), LoadError> {
        let mut current = true;
        self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                current = false;
                return false;
            }
            log::debug!("lifecycle {} -> {}", state, next);
            *state = next;
            true
        });

        if current {
            Ok(())
        } else {
            Err(LoadError::Superseded)
        }
    }

    /// Publishes `Failed(error)` and returns the error the caller should see
    fn fail(&self, generation: u64, error: LoadError) -> LoadError {
        match self.publish(generation, LifecycleState::Failed(error.clone())) {
            Ok(()) => {
                log::warn!("prepare failed: {}", error);
                error
            }
            Err(superseded) => superseded,
        }
    }
}

/// Publishes `Idle` when a prepare is dropped mid-way through
struct InFlightPrepare<'a> {
    lifecycle: &'a OfflineMapLifecycle,
    generation: u64,
    finished: bool,
}

impl Drop for InFlightPrepare<'_> {
    fn drop(&mut self) {
        if self.finished || !self.lifecycle.state().is_busy() {
            return;
        }
        if self
            .lifecycle
            .publish(self.generation, LifecycleState::Idle)
            .is_ok()
        {
            log::debug!("prepare {} dropped before finishing", self.generation);
        }
    }
}

/// Error for a scan that produced nothing usable.
///
/// When the directory itself could not be created or listed that failure is
/// more useful than a bare `NoDataAvailable`.
fn empty_catalog_error(catalog: &OfflineCatalog) -> LoadError {
    catalog
        .issues()
        .iter()
        .find(|issue| matches!(issue, LoadError::Io { path, .. } if path == catalog.directory()))
        .cloned()
        .unwrap_or(LoadError::NoDataAvailable)
}

fn validate_name(name: &str) -> Result<(), LoadError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
        && name.trim() == name;
    if valid {
        Ok(())
    } else {
        Err(LoadError::InvalidName {
            name: name.to_string(),
        })
    }
}

/// Validates a staged download and renames it into place
fn commit_staged(
    staging: &Path,
    target: &Path,
    verify_file_size: bool,
    index: &MapFileIndex,
) -> Result<MapFileDescriptor, LoadError> {
    let discard = |error: LoadError| {
        let _ = fs::remove_file(staging);
        error
    };

    let len = fs::metadata(staging)
        .map_err(|e| LoadError::io(staging, e))
        .map_err(discard)?
        .len();
    header::inspect_file(staging, Compression::None, verify_file_size.then_some(len))
        .map_err(|e| discard(LoadError::invalid_map(PathBuf::from(staging), e)))?;

    fs::rename(staging, target)
        .map_err(|e| LoadError::io(target, e))
        .map_err(discard)?;
    index.describe(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("berlin").is_ok());
        assert!(validate_name("new-york_2024").is_ok());
        for bad in ["", ".hidden", "../escape", "a/b", "a\\b", " padded"] {
            assert!(
                matches!(validate_name(bad), Err(LoadError::InvalidName { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_empty_catalog_prefers_directory_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("offline_maps");
        fs::write(&blocker, b"").unwrap();

        let catalog = MapFileIndex::new().scan(&blocker);
        assert!(matches!(empty_catalog_error(&catalog), LoadError::Io { .. }));

        let empty = MapFileIndex::new().scan(dir.path());
        assert!(matches!(empty_catalog_error(&empty), LoadError::NoDataAvailable));
    }
}
