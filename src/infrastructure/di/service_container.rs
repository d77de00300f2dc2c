//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{CatalogService, HierarchyService};
use crate::config::Settings;
use crate::infrastructure::store::{CategoryStore, FileStore};
use crate::infrastructure::traits::{FileSystem, RealFileSystem};

/// Container holding the settings, the category store and the services
/// built on it.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Category store shared by all services
    pub store: Arc<dyn CategoryStore>,
}

impl ServiceContainer {
    /// Create a new service container backed by the configured catalog file.
    pub fn new(settings: Settings) -> Self {
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        let store = Arc::new(FileStore::new(fs.clone(), settings.data_file.clone()));
        Self::with_deps(settings, fs, store)
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        store: Arc<dyn CategoryStore>,
    ) -> Self {
        let settings = Arc::new(settings);

        Self { settings, fs, store }
    }

    /// Read-side hierarchy service.
    pub fn hierarchy(&self) -> HierarchyService {
        HierarchyService::new(self.store.clone())
    }

    /// Write-side catalog service.
    pub fn catalog(&self) -> CatalogService {
        CatalogService::new(self.store.clone())
    }
}
