use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use fxhash::FxHashMap;
use once_cell::sync::Lazy;

use super::{ThemeHandle, BUNDLED_THEME};
use crate::core::constants::{DEFAULT_THEME_FILE, STAGING_SUFFIX};
use crate::LoadError;

static GLOBAL_RESOLVER: Lazy<Arc<RenderThemeResolver>> =
    Lazy::new(|| Arc::new(RenderThemeResolver::new()));

/// Finds or materializes the render theme for a maps directory.
///
/// Handles are cached per theme path, so the bundled theme is written at most
/// once per location for the lifetime of the resolver.
#[derive(Debug)]
pub struct RenderThemeResolver {
    theme_file: PathBuf,
    bundled: &'static [u8],
    resolved: Mutex<FxHashMap<PathBuf, ThemeHandle>>,
    copies: AtomicUsize,
}

impl RenderThemeResolver {
    pub fn new() -> Self {
        Self::with_theme_file(DEFAULT_THEME_FILE)
    }

    pub fn with_theme_file(theme_file: impl Into<PathBuf>) -> Self {
        Self {
            theme_file: theme_file.into(),
            bundled: BUNDLED_THEME,
            resolved: Mutex::new(FxHashMap::default()),
            copies: AtomicUsize::new(0),
        }
    }

    /// Replaces the theme written when a directory has none
    pub fn with_bundled_theme(mut self, bundled: &'static [u8]) -> Self {
        self.bundled = bundled;
        self
    }

    /// Process-wide resolver shared by lifecycles that were not given their own
    pub fn global() -> Arc<RenderThemeResolver> {
        Arc::clone(&GLOBAL_RESOLVER)
    }

    pub fn resolve(&self, directory: &Path) -> ThemeHandle {
        self.resolve_at(&directory.join(&self.theme_file))
    }

    /// Resolves the theme at an explicit file location
    pub fn resolve_at(&self, theme_path: &Path) -> ThemeHandle {
        let mut resolved = self
            .resolved
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(handle) = resolved.get(theme_path) {
            return handle.clone();
        }

        let handle = if theme_path.is_file() {
            log::debug!("using render theme {}", theme_path.display());
            ThemeHandle::External {
                path: theme_path.to_path_buf(),
            }
        } else {
            match self.materialize(theme_path) {
                Ok(()) => {
                    self.copies.fetch_add(1, Ordering::Relaxed);
                    log::info!("wrote bundled render theme to {}", theme_path.display());
                    ThemeHandle::External {
                        path: theme_path.to_path_buf(),
                    }
                }
                Err(e) => {
                    let warning = LoadError::ThemeUnavailable {
                        path: theme_path.to_path_buf(),
                        reason: e.to_string(),
                    };
                    log::warn!("{}; falling back to the built-in theme", warning);
                    ThemeHandle::BuiltIn {
                        reason: e.to_string(),
                    }
                }
            }
        };

        resolved.insert(theme_path.to_path_buf(), handle.clone());
        handle
    }

    /// Number of times the bundled theme has been written to disk
    pub fn materialized_count(&self) -> usize {
        self.copies.load(Ordering::Relaxed)
    }

    /// Drops every cached handle; the next resolve looks at the disk again
    pub fn clear(&self) {
        self.resolved
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    fn materialize(&self, theme_path: &Path) -> io::Result<()> {
        if let Some(parent) = theme_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut staging = theme_path.as_os_str().to_owned();
        staging.push(STAGING_SUFFIX);
        let staging = PathBuf::from(staging);

        fs::write(&staging, self.bundled)?;
        fs::rename(&staging, theme_path).map_err(|e| {
            let _ = fs::remove_file(&staging);
            e
        })
    }
}

impl Default for RenderThemeResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existing_theme_used_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let theme = dir.path().join("default.xml");
        fs::write(&theme, b"<rendertheme/>").unwrap();

        let resolver = RenderThemeResolver::new();
        let handle = resolver.resolve(dir.path());

        assert_eq!(handle.path(), Some(theme.as_path()));
        assert_eq!(resolver.materialized_count(), 0);
        assert_eq!(fs::read(&theme).unwrap(), b"<rendertheme/>");
    }

    #[test]
    fn test_bundled_theme_copied_once() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = RenderThemeResolver::new();

        let first = resolver.resolve(dir.path());
        let theme = dir.path().join("default.xml");
        assert_eq!(first.path(), Some(theme.as_path()));
        assert_eq!(fs::read(&theme).unwrap(), BUNDLED_THEME);

        // cached: removing the file does not trigger a second copy
        fs::remove_file(&theme).unwrap();
        let second = resolver.resolve(dir.path());
        assert_eq!(first, second);
        assert_eq!(resolver.materialized_count(), 1);
        assert!(!theme.exists());
    }

    #[test]
    fn test_unwritable_location_falls_back_to_built_in() {
        let dir = tempfile::tempdir().unwrap();
        // a regular file where the maps directory should be
        let blocker = dir.path().join("offline_maps");
        fs::write(&blocker, b"").unwrap();

        let resolver = RenderThemeResolver::new();
        let handle = resolver.resolve(&blocker);

        assert!(handle.is_built_in());
        assert_eq!(handle.path(), None);
        assert_eq!(resolver.materialized_count(), 0);
    }

    #[test]
    fn test_custom_theme_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let resolver =
            RenderThemeResolver::with_theme_file("themes/osmarender.xml").with_bundled_theme(b"<x/>");

        let handle = resolver.resolve(dir.path());
        let expected = dir.path().join("themes").join("osmarender.xml");
        assert_eq!(handle.path(), Some(expected.as_path()));
        assert_eq!(fs::read(expected).unwrap(), b"<x/>");
    }

    #[test]
    fn test_clear_forgets_cached_handles() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = RenderThemeResolver::new();
        resolver.resolve(dir.path());
        fs::remove_file(dir.path().join("default.xml")).unwrap();

        resolver.clear();
        resolver.resolve(dir.path());
        assert_eq!(resolver.materialized_count(), 2);
    }
}
