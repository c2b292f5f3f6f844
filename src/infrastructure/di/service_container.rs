//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::CatalogService;
use crate::config::Settings;
use crate::infrastructure::traits::{FileSystem, RealFileSystem, Selector, SkimSelector};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Interactive selector used by `browse`
    pub selector: Arc<dyn Selector>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(settings, Arc::new(RealFileSystem), Arc::new(SkimSelector))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        selector: Arc<dyn Selector>,
    ) -> Self {
        let settings = Arc::new(settings);

        Self {
            settings,
            fs,
            selector,
        }
    }

    /// Catalog loader bound to the container's filesystem and settings.
    pub fn catalog_service(&self) -> CatalogService {
        CatalogService::new(Arc::clone(&self.fs), Arc::clone(&self.settings))
    }
}
