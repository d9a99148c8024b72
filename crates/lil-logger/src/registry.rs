use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::backend::Backend;
use crate::category;
use crate::config::{DirConfig, Mode};
use crate::logger::Logger;

/// One [`Logger`] per category, created on first request and kept for the
/// life of the registry.
///
/// Directory names are read on every lookup that has to compute a category.
/// Changing them with [`set_dirs`](Self::set_dirs) affects loggers created
/// afterwards; loggers already handed out keep their category. Call it once
/// during startup, before loggers are requested.
pub struct LoggerRegistry {
    mode: Mode,
    cwd: PathBuf,
    dirs: RwLock<DirConfig>,
    backend: Arc<dyn Backend>,
    loggers: RwLock<HashMap<String, Arc<Logger>>>,
}

impl LoggerRegistry {
    pub fn new(mode: Mode, cwd: PathBuf, dirs: DirConfig, backend: Arc<dyn Backend>) -> Self {
        Self {
            mode,
            cwd,
            dirs: RwLock::new(dirs),
            backend,
            loggers: RwLock::new(HashMap::new()),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn dirs(&self) -> DirConfig {
        self.dirs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the directory names used for categories computed from now on.
    /// Any strings are accepted, including empty ones.
    pub fn set_dirs(&self, dev_dir: impl Into<String>, prod_dir: impl Into<String>) {
        let dirs = DirConfig::new(dev_dir, prod_dir);
        debug!(dev_dir = %dirs.dev_dir, prod_dir = %dirs.prod_dir, "Logger directories set");
        *self.dirs.write().unwrap_or_else(PoisonError::into_inner) = dirs;
    }

    /// Category for a source file path under the current settings.
    pub fn category_for(&self, file_path: &Path) -> String {
        category::categorize(file_path, self.mode, &self.dirs(), &self.cwd)
    }

    /// Logger for the source file at `file_path`.
    pub fn get_logger(&self, file_path: impl AsRef<Path>) -> Arc<Logger> {
        let category = self.category_for(file_path.as_ref());
        self.get_or_create(category)
    }

    /// Logger for a `file://` module URL.
    pub fn get_logger_from_module_url(&self, module_url: &str) -> Arc<Logger> {
        let category =
            category::categorize_module_url(module_url, self.mode, &self.dirs(), &self.cwd);
        self.get_or_create(category)
    }

    /// Return the logger for `category`, creating it if this is the first
    /// request. Repeated calls return the same `Arc`.
    ///
    /// Creation happens under the write lock, so two threads racing on a new
    /// category both receive the instance that was inserted first.
    pub fn get_or_create(&self, category: impl Into<String>) -> Arc<Logger> {
        let category = category.into();

        if let Some(logger) = self
            .loggers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&category)
        {
            return Arc::clone(logger);
        }

        let mut loggers = self.loggers.write().unwrap_or_else(PoisonError::into_inner);
        let logger = loggers.entry(category).or_insert_with_key(|category| {
            debug!(category = %category, "Created logger");
            Arc::new(Logger::new(category.clone(), Arc::clone(&self.backend)))
        });
        Arc::clone(logger)
    }

    pub fn len(&self) -> usize {
        self.loggers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted snapshot of the categories created so far.
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self
            .loggers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        categories.sort();
        categories
    }
}

impl fmt::Debug for LoggerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerRegistry")
            .field("mode", &self.mode)
            .field("cwd", &self.cwd)
            .field("dirs", &self.dirs())
            .field("loggers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TracingBackend;

    fn registry(mode: Mode) -> LoggerRegistry {
        LoggerRegistry::new(
            mode,
            PathBuf::from("/app"),
            DirConfig::default(),
            Arc::new(TracingBackend),
        )
    }

    #[test]
    fn test_same_path_returns_same_instance() {
        let registry = registry(Mode::Development);
        let a = registry.get_logger("/app/src/jobs/worker.js");
        let b = registry.get_logger("/app/src/jobs/../jobs/worker.js");

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.category(), "jobs/worker.js");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_categories_are_distinct_instances() {
        let registry = registry(Mode::Development);
        let a = registry.get_logger("/app/src/a.rs");
        let b = registry.get_logger("/app/src/b.rs");

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.categories(), vec!["a.rs", "b.rs"]);
    }

    #[test]
    fn test_set_dirs_only_affects_new_loggers() {
        let registry = registry(Mode::Development);
        let before = registry.get_logger("/app/src/lib/x.rs");
        assert_eq!(before.category(), "lib/x.rs");

        registry.set_dirs("lib", "build");

        let again = registry.get_logger("/app/src/lib/x.rs");
        assert_eq!(again.category(), "../src/lib/x.rs");
        assert_eq!(before.category(), "lib/x.rs");

        let fresh = registry.get_logger("/app/lib/y.rs");
        assert_eq!(fresh.category(), "y.rs");
        assert_eq!(registry.dirs(), DirConfig::new("lib", "build"));
    }

    #[test]
    fn test_production_registry() {
        let registry = registry(Mode::Production);
        let logger = registry.get_logger("/app/dist/src/server.js");
        assert_eq!(logger.category(), "server.js");
        assert_eq!(registry.mode(), Mode::Production);
    }

    #[test]
    fn test_module_url_shares_cache_with_paths() {
        let registry = registry(Mode::Development);
        let from_path = registry.get_logger("/app/src/index.mjs");
        let from_url = registry.get_logger_from_module_url("file:///app/src/index.mjs");

        assert!(Arc::ptr_eq(&from_path, &from_url));
    }

    #[test]
    fn test_concurrent_first_requests_share_one_instance() {
        let registry = Arc::new(registry(Mode::Development));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.get_logger("/app/src/hot.rs"))
            })
            .collect();
        let loggers: Vec<Arc<Logger>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        for logger in &loggers[1..] {
            assert!(Arc::ptr_eq(&loggers[0], logger));
        }
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_empty_category_is_valid() {
        let registry = registry(Mode::Development);
        let logger = registry.get_logger("/app/src");
        assert_eq!(logger.category(), "");
        assert!(!registry.is_empty());
    }
}
