use std::sync::Arc;
use async_trait::async_trait;
use tracing::info;
use crate::error::Result;
use crate::module::{CourseModule, ModuleFile};
use crate::prefetch_handler::{PrefetchEnv, PrefetchHandler};

/// Handler for single-file resource modules. Everything to download is in
/// the module contents listing plus the description intro files.
pub struct ResourcePrefetchHandler {
    env: Arc<PrefetchEnv>,
}

impl ResourcePrefetchHandler {
    pub fn new(env: Arc<PrefetchEnv>) -> ResourcePrefetchHandler {
        ResourcePrefetchHandler {
            env,
        }
    }
}

#[async_trait]
impl PrefetchHandler for ResourcePrefetchHandler {
    fn name(&self) -> &str {
        "ResourcePrefetchHandler"
    }

    fn mod_name(&self) -> &str {
        "resource"
    }

    fn component(&self) -> &str {
        "mod_resource"
    }

    fn env(&self) -> &PrefetchEnv {
        &self.env
    }

    async fn is_downloadable(&self, module: &CourseModule, _course_id: u64) -> bool {
        !self.content_downloadable_files(module).is_empty()
    }

    async fn get_files(&self, module: &CourseModule, course_id: u64) -> Result<Vec<ModuleFile>> {
        let mut files = self.intro_files(module, course_id).await?;
        files.extend(self.content_downloadable_files(module));
        Ok(files)
    }

    async fn prefetch(&self, module: &CourseModule, course_id: u64, _single: bool) -> Result<()> {
        let files = self.get_files(module, course_id).await?;
        info!(module = module.id, files = files.len(), "prefetching resource");
        self.env.store_files(self.component(), module.id, &files).await
    }
}
