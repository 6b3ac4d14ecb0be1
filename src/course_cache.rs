use std::collections::HashMap;
use chrono::Utc;
use parking_lot::RwLock;
use crate::module::ModuleFile;

struct CachedContents {
    contents: Vec<ModuleFile>,
    fetched_time: i64,
}

/// Per-site cache of module contents listings, standing in for the remote
/// course web services. Invalidation drops the entry so the next
/// `load_contents` sees nothing cached.
pub struct CourseCache {
    modules: RwLock<HashMap<String, HashMap<u64, CachedContents>>>,
}

impl CourseCache {
    pub fn new() -> CourseCache {
        CourseCache {
            modules: RwLock::new(HashMap::new()),
        }
    }

    pub fn store_contents(&self, site_id: &str, module_id: u64, contents: Vec<ModuleFile>) {
        let cached = CachedContents {
            contents,
            fetched_time: Utc::now().timestamp(),
        };
        self.modules
            .write()
            .entry(site_id.to_string())
            .or_default()
            .insert(module_id, cached);
    }

    pub fn contents(&self, site_id: &str, module_id: u64) -> Option<Vec<ModuleFile>> {
        self.modules
            .read()
            .get(site_id)
            .and_then(|site_modules| site_modules.get(&module_id))
            .map(|cached| cached.contents.clone())
    }

    pub fn fetched_time(&self, site_id: &str, module_id: u64) -> Option<i64> {
        self.modules
            .read()
            .get(site_id)
            .and_then(|site_modules| site_modules.get(&module_id))
            .map(|cached| cached.fetched_time)
    }

    pub fn invalidate_module(&self, site_id: &str, module_id: u64) {
        if let Some(site_modules) = self.modules.write().get_mut(site_id) {
            site_modules.remove(&module_id);
        }
    }

    pub fn clear_site(&self, site_id: &str) {
        self.modules.write().remove(site_id);
    }
}

impl Default for CourseCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use crate::course_cache::CourseCache;
    use crate::module::ModuleFile;

    #[test]
    fn test_store_and_invalidate() {
        let cache = CourseCache::new();
        let contents = vec![ModuleFile::new("a.pdf", "http://example.com/a.pdf")];

        cache.store_contents("site-a", 1, contents.clone());
        assert_eq!(cache.contents("site-a", 1), Some(contents));
        assert!(cache.fetched_time("site-a", 1).is_some());
        assert_eq!(cache.contents("site-b", 1), None);

        cache.invalidate_module("site-a", 1);
        assert_eq!(cache.contents("site-a", 1), None);
    }

    #[test]
    fn test_clear_site() {
        let cache = CourseCache::new();
        cache.store_contents("site-a", 1, Vec::new());
        cache.store_contents("site-a", 2, Vec::new());
        cache.clear_site("site-a");
        assert_eq!(cache.contents("site-a", 1), None);
        assert_eq!(cache.contents("site-a", 2), None);
    }
}
