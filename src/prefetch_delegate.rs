use std::collections::HashMap;
use std::sync::Arc;
use futures::future::FutureExt;
use parking_lot::RwLock;
use tracing::{debug, warn};
use crate::error::{PrefetchError, Result};
use crate::module::{CourseModule, DownloadSize};
use crate::module_status::ModuleStatus;
use crate::prefetch_handler::{PrefetchEnv, PrefetchHandler};

/// Dispatch registry for prefetch handlers, keyed by module type name.
/// Prefetches run through the download tracker so concurrent requests for
/// one module share a single operation.
pub struct PrefetchDelegate {
    env: Arc<PrefetchEnv>,
    handlers: RwLock<HashMap<String, Arc<dyn PrefetchHandler>>>,
}

impl PrefetchDelegate {
    pub fn new(env: Arc<PrefetchEnv>) -> PrefetchDelegate {
        PrefetchDelegate {
            env,
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a handler under its module type name. A second registration
    /// for the same name is rejected.
    pub fn register_handler(&self, handler: Arc<dyn PrefetchHandler>) -> bool {
        let mut handlers = self.handlers.write();
        if handlers.contains_key(handler.mod_name()) {
            warn!(mod_name = handler.mod_name(), name = handler.name(), "handler already registered");
            return false;
        }
        debug!(mod_name = handler.mod_name(), name = handler.name(), "registered prefetch handler");
        handlers.insert(handler.mod_name().to_string(), handler);
        true
    }

    pub fn handler_for(&self, mod_name: &str) -> Option<Arc<dyn PrefetchHandler>> {
        self.handlers.read().get(mod_name).cloned()
    }

    pub async fn is_module_downloadable(&self, module: &CourseModule, course_id: u64) -> bool {
        match self.handler_for(&module.mod_name) {
            Some(handler) => {
                handler.is_enabled().await && handler.is_downloadable(module, course_id).await
            }
            None => false,
        }
    }

    pub async fn module_download_size(&self, module: &CourseModule, course_id: u64, single: bool) -> Result<DownloadSize> {
        let handler = self.require_handler(&module.mod_name)?;
        Ok(handler.download_size(module, course_id, single).await)
    }

    pub async fn module_downloaded_size(&self, module: &CourseModule, course_id: u64) -> Result<u64> {
        let handler = self.require_handler(&module.mod_name)?;
        Ok(handler.downloaded_size(module, course_id).await)
    }

    /// True if a prefetch of the module is in flight for the current site.
    pub fn is_module_downloading(&self, module: &CourseModule) -> bool {
        match self.handler_for(&module.mod_name) {
            Some(handler) => self
                .env
                .tracker
                .is_downloading(handler.component(), module.id, None),
            None => false,
        }
    }

    /// Prefetch a module through its handler. When a prefetch of the same
    /// module is already in flight the existing operation is awaited instead
    /// of starting a duplicate; the handler's prefetch runs once.
    pub async fn prefetch_module(&self, module: &CourseModule, course_id: u64, single: bool) -> Result<()> {
        let handler = self.require_handler(&module.mod_name)?;
        let tracker = &self.env.tracker;

        if tracker.is_downloading(handler.component(), module.id, None) {
            debug!(module = module.id, "prefetch already in flight, awaiting it");
            return tracker.get_ongoing_download(handler.component(), module.id, None).await;
        }

        let download = {
            let handler = Arc::clone(&handler);
            let module = module.clone();
            async move { handler.prefetch(&module, course_id, single).await }.boxed()
        };

        tracker
            .add_ongoing_download(handler.component(), module.id, download, None)
            .await
    }

    /// Derive the download status of a module for the current site.
    pub async fn module_status(&self, module: &CourseModule, course_id: u64) -> ModuleStatus {
        let handler = match self.handler_for(&module.mod_name) {
            Some(handler) => handler,
            None => return ModuleStatus::NotDownloadable,
        };
        if !handler.is_enabled().await || !handler.is_downloadable(module, course_id).await {
            return ModuleStatus::NotDownloadable;
        }
        if self.env.tracker.is_downloading(handler.component(), module.id, None) {
            return ModuleStatus::Downloading;
        }

        let files = match handler.get_files(module, course_id).await {
            Ok(files) => files,
            Err(_) => return ModuleStatus::NotDownloaded,
        };
        if files.is_empty() {
            return ModuleStatus::NotDownloaded;
        }

        let site_id = self.env.sites.current_site_id();
        let mut outdated = false;
        for file in &files {
            match self.env.file_pool.entry_by_url(&site_id, &file.file_url) {
                Some(entry) => {
                    if file.time_modified != 0 && entry.time_modified < file.time_modified {
                        outdated = true;
                    }
                }
                None => return ModuleStatus::NotDownloaded,
            }
        }

        match outdated {
            true => ModuleStatus::Outdated,
            false => ModuleStatus::Downloaded,
        }
    }

    /// Aggregate status for a list of modules, e.g. a course section.
    /// Modules without a handler or whose handler opts out of list status
    /// are ignored.
    pub async fn modules_status(&self, modules: &[CourseModule], course_id: u64) -> ModuleStatus {
        let mut result = ModuleStatus::NotDownloadable;
        for module in modules {
            let handler = match self.handler_for(&module.mod_name) {
                Some(handler) => handler,
                None => continue,
            };
            if handler.skip_list_status() {
                continue;
            }
            let status = self.module_status(module, course_id).await;
            result = combine_status(result, status);
        }
        result
    }

    /// Invalidate the module's prefetched content and its status caches.
    pub async fn invalidate_module_content(&self, module: &CourseModule, course_id: u64) -> Result<()> {
        let handler = self.require_handler(&module.mod_name)?;
        handler.invalidate_content(module.id, course_id).await?;
        handler.invalidate_module(module, course_id).await
    }

    pub async fn remove_module_files(&self, module: &CourseModule, course_id: u64) -> Result<()> {
        let handler = self.require_handler(&module.mod_name)?;
        handler.remove_files(module, course_id).await
    }

    fn require_handler(&self, mod_name: &str) -> Result<Arc<dyn PrefetchHandler>> {
        self.handler_for(mod_name)
            .ok_or_else(|| PrefetchError::NoHandler(mod_name.to_string()))
    }
}

/// Fold two module statuses into the status of the list containing both.
/// Downloading wins; a mix of downloaded and missing modules reads as
/// outdated, matching how a partially fetched section behaves.
fn combine_status(a: ModuleStatus, b: ModuleStatus) -> ModuleStatus {
    match (a, b) {
        (ModuleStatus::NotDownloadable, other) => other,
        (current, ModuleStatus::NotDownloadable) => current,
        (ModuleStatus::Downloading, _) | (_, ModuleStatus::Downloading) => ModuleStatus::Downloading,
        (ModuleStatus::Outdated, _) | (_, ModuleStatus::Outdated) => ModuleStatus::Outdated,
        (current, other) => {
            if current == other {
                current
            } else {
                ModuleStatus::Outdated
            }
        }
    }
}
