use std::sync::Arc;
use async_trait::async_trait;
use tracing::debug;
use crate::course_cache::CourseCache;
use crate::download_tracker::DownloadTracker;
use crate::error::Result;
use crate::file_pool::FilePool;
use crate::html_files;
use crate::module::{sum_file_sizes, CourseModule, DownloadSize, FileKind, ModuleFile};
use crate::site::SiteRegistry;

/// Collaborators handed to every prefetch handler.
pub struct PrefetchEnv {
    pub sites: Arc<SiteRegistry>,
    pub tracker: Arc<DownloadTracker>,
    pub file_pool: Arc<FilePool>,
    pub course_cache: Arc<CourseCache>,
}

impl PrefetchEnv {
    pub fn new(
        sites: Arc<SiteRegistry>,
        tracker: Arc<DownloadTracker>,
        file_pool: Arc<FilePool>,
        course_cache: Arc<CourseCache>,
    ) -> Arc<PrefetchEnv> {
        Arc::new(PrefetchEnv {
            sites,
            tracker,
            file_pool,
            course_cache,
        })
    }

    /// Store every file in the pool under (component, module id) for the
    /// current site. Stops at the first failure.
    pub async fn store_files(&self, component: &str, module_id: u64, files: &[ModuleFile]) -> Result<()> {
        let site_id = self.sites.current_site_id();
        for file in files {
            self.file_pool
                .download_url(&site_id, &file.file_url, component, module_id, file.time_modified)
                .await?;
        }
        Ok(())
    }
}

/// Per-module-type prefetch behavior. Every operation has a default matching
/// the shared orchestration layer's expectations; implementations override
/// what their module type needs.
///
/// Handlers are registered in a [`PrefetchDelegate`](crate::prefetch_delegate::PrefetchDelegate)
/// and selected by [`mod_name`](PrefetchHandler::mod_name).
#[async_trait]
pub trait PrefetchHandler: Send + Sync {
    /// Name of the handler, for logs.
    fn name(&self) -> &str;

    /// Module type name this handler serves; the dispatch key.
    fn mod_name(&self) -> &str;

    /// Component name prefixed to tracking keys and pool links.
    fn component(&self) -> &str;

    fn env(&self) -> &PrefetchEnv;

    /// When true the module is ignored while deriving the status of a list
    /// of modules. It is still downloaded with its section or course.
    fn skip_list_status(&self) -> bool {
        false
    }

    async fn is_enabled(&self) -> bool {
        true
    }

    /// Whether the module can be downloaded. Must not fail; report
    /// undownloadable instead.
    async fn is_downloadable(&self, _module: &CourseModule, _course_id: u64) -> bool {
        true
    }

    fn is_file_downloadable(&self, file: &ModuleFile) -> bool {
        file.kind == FileKind::File
    }

    /// The downloadable entries of the module contents listing.
    fn content_downloadable_files(&self, module: &CourseModule) -> Vec<ModuleFile> {
        module
            .contents
            .iter()
            .filter(|file| self.is_file_downloadable(file))
            .cloned()
            .collect()
    }

    /// Files to download for the module. Defaults to none.
    async fn get_files(&self, _module: &CourseModule, _course_id: u64) -> Result<Vec<ModuleFile>> {
        Ok(Vec::new())
    }

    /// Files embedded in the module description HTML.
    fn intro_files_from_description(&self, module: &CourseModule) -> Vec<ModuleFile> {
        match &module.description {
            Some(description) => html_files::extract_downloadable_files(description),
            None => Vec::new(),
        }
    }

    async fn intro_files(&self, module: &CourseModule, _course_id: u64) -> Result<Vec<ModuleFile>> {
        Ok(self.intro_files_from_description(module))
    }

    /// Size of everything `get_files` would download. Never fails; when the
    /// file list cannot be determined the size is unknown and not total.
    async fn download_size(&self, module: &CourseModule, course_id: u64, _single: bool) -> DownloadSize {
        match self.get_files(module, course_id).await {
            Ok(files) => sum_file_sizes(&files),
            Err(_) => DownloadSize::unknown(),
        }
    }

    /// Bytes already stored for the module in the file pool.
    async fn downloaded_size(&self, module: &CourseModule, _course_id: u64) -> u64 {
        let site_id = self.env().sites.current_site_id();
        self.env()
            .file_pool
            .files_size_by_component(&site_id, self.component(), module.id)
    }

    async fn download(&self, module: &CourseModule, course_id: u64) -> Result<()> {
        self.prefetch(module, course_id, true).await
    }

    /// Prefetch the module content. Defaults to nothing; module types that
    /// download files override this.
    async fn prefetch(&self, _module: &CourseModule, _course_id: u64, _single: bool) -> Result<()> {
        Ok(())
    }

    /// Invalidate the prefetched content.
    async fn invalidate_content(&self, _module_id: u64, _course_id: u64) -> Result<()> {
        Ok(())
    }

    /// Invalidate the cached data needed to determine the module status.
    /// It should not invalidate downloaded files.
    async fn invalidate_module(&self, module: &CourseModule, _course_id: u64) -> Result<()> {
        let site_id = self.env().sites.current_site_id();
        self.env().course_cache.invalidate_module(&site_id, module.id);
        Ok(())
    }

    /// Fill `module.contents` from the course cache when not loaded already.
    async fn load_contents(&self, module: &mut CourseModule, _course_id: u64) -> Result<()> {
        if !module.contents.is_empty() {
            return Ok(());
        }
        let site_id = self.env().sites.current_site_id();
        if let Some(contents) = self.env().course_cache.contents(&site_id, module.id) {
            debug!(module = module.id, "loaded cached module contents");
            module.contents = contents;
        }
        Ok(())
    }

    /// Remove the module's downloaded files from the pool.
    async fn remove_files(&self, module: &CourseModule, _course_id: u64) -> Result<()> {
        let site_id = self.env().sites.current_site_id();
        self.env()
            .file_pool
            .remove_files_by_component(&site_id, self.component(), module.id)
            .await
    }
}
