use std::sync::Arc;
use async_trait::async_trait;
use tracing::info;
use crate::error::Result;
use crate::module::{CourseModule, ModuleFile};
use crate::prefetch_handler::{PrefetchEnv, PrefetchHandler};

/// Handler for page modules. The page body is delivered through the contents
/// listing; files referenced from the body HTML are prefetched too so the
/// page renders offline.
pub struct PagePrefetchHandler {
    env: Arc<PrefetchEnv>,
}

impl PagePrefetchHandler {
    pub fn new(env: Arc<PrefetchEnv>) -> PagePrefetchHandler {
        PagePrefetchHandler {
            env,
        }
    }
}

#[async_trait]
impl PrefetchHandler for PagePrefetchHandler {
    fn name(&self) -> &str {
        "PagePrefetchHandler"
    }

    fn mod_name(&self) -> &str {
        "page"
    }

    fn component(&self) -> &str {
        "mod_page"
    }

    fn env(&self) -> &PrefetchEnv {
        &self.env
    }

    async fn get_files(&self, module: &CourseModule, course_id: u64) -> Result<Vec<ModuleFile>> {
        let mut files = self.intro_files(module, course_id).await?;
        for file in self.content_downloadable_files(module) {
            if !files.iter().any(|known| known.file_url == file.file_url) {
                files.push(file);
            }
        }
        Ok(files)
    }

    async fn prefetch(&self, module: &CourseModule, course_id: u64, _single: bool) -> Result<()> {
        let files = self.get_files(module, course_id).await?;
        info!(module = module.id, files = files.len(), "prefetching page");
        self.env.store_files(self.component(), module.id, &files).await
    }

    async fn invalidate_content(&self, module_id: u64, _course_id: u64) -> Result<()> {
        let site_id = self.env.sites.current_site_id();
        self.env.course_cache.invalidate_module(&site_id, module_id);
        Ok(())
    }
}
