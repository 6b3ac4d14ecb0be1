#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Url,
}

/// A downloadable content entry as returned by the course contents listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleFile {
    pub kind: FileKind,
    pub file_name: String,
    pub file_url: String,
    /// Declared size in bytes. `None` when the listing does not carry one.
    pub file_size: Option<u64>,
    /// Unix timestamp of the last remote modification, 0 when unknown.
    pub time_modified: i64,
}

impl ModuleFile {
    pub fn new(file_name: impl Into<String>, file_url: impl Into<String>) -> ModuleFile {
        ModuleFile {
            kind: FileKind::File,
            file_name: file_name.into(),
            file_url: file_url.into(),
            file_size: None,
            time_modified: 0,
        }
    }

    pub fn with_size(mut self, size: u64) -> ModuleFile {
        self.file_size = Some(size);
        self
    }

    pub fn with_time_modified(mut self, time_modified: i64) -> ModuleFile {
        self.time_modified = time_modified;
        self
    }
}

/// A course module instance as handed to prefetch handlers.
#[derive(Debug, Clone)]
pub struct CourseModule {
    pub id: u64,
    pub course_id: u64,
    /// Module type name, matches the handler dispatch key ("resource", "page", ...).
    pub mod_name: String,
    pub name: String,
    pub description: Option<String>,
    pub contents: Vec<ModuleFile>,
}

impl CourseModule {
    pub fn new(id: u64, course_id: u64, mod_name: impl Into<String>, name: impl Into<String>) -> CourseModule {
        CourseModule {
            id,
            course_id,
            mod_name: mod_name.into(),
            name: name.into(),
            description: None,
            contents: Vec::new(),
        }
    }
}

/// Result of a download size computation. `total` is false when at least one
/// file had no declared size, so `size` is only a lower bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownloadSize {
    pub size: u64,
    pub total: bool,
}

impl DownloadSize {
    pub fn unknown() -> DownloadSize {
        DownloadSize {
            size: 0,
            total: false,
        }
    }
}

pub fn sum_file_sizes(files: &[ModuleFile]) -> DownloadSize {
    let mut size = 0u64;
    let mut total = true;
    for file in files {
        match file.file_size {
            Some(file_size) => size += file_size,
            None => total = false,
        }
    }
    DownloadSize {
        size,
        total,
    }
}

#[cfg(test)]
mod test {
    use crate::module::{sum_file_sizes, ModuleFile};

    #[test]
    fn test_sum_file_sizes() {
        let files = vec![
            ModuleFile::new("a.pdf", "http://example.com/a.pdf").with_size(100),
            ModuleFile::new("b.pdf", "http://example.com/b.pdf").with_size(250),
        ];
        let size = sum_file_sizes(&files);
        assert_eq!(size.size, 350);
        assert!(size.total);
    }

    #[test]
    fn test_sum_file_sizes_unknown_entry() {
        let files = vec![
            ModuleFile::new("a.pdf", "http://example.com/a.pdf").with_size(100),
            ModuleFile::new("b.pdf", "http://example.com/b.pdf"),
        ];
        let size = sum_file_sizes(&files);
        assert_eq!(size.size, 100);
        assert!(!size.total);
    }
}
