use regex::Regex;
use crate::module::ModuleFile;

/// Scan a fragment of description HTML for embedded downloadable files and
/// return them as synthetic file entries with unknown size.
///
/// Only `src`/`href` targets whose path ends in a file extension are kept,
/// so plain page links don't show up as downloads. Duplicates are removed,
/// first occurrence wins.
pub fn extract_downloadable_files(html: &str) -> Vec<ModuleFile> {
    let pattern = match Regex::new(r#"(?:src|href)\s*=\s*["']([^"']+)["']"#) {
        Ok(pattern) => pattern,
        Err(_) => return Vec::new(),
    };

    let mut files: Vec<ModuleFile> = Vec::new();
    for captures in pattern.captures_iter(html) {
        let url = captures[1].trim().to_string();
        if !looks_like_file(&url) {
            continue;
        }
        if files.iter().any(|file| file.file_url == url) {
            continue;
        }
        let file_name = file_name_of(&url);
        files.push(ModuleFile::new(file_name, url));
    }
    files
}

fn looks_like_file(url: &str) -> bool {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return false;
    }
    let path = url.split(&['?', '#'][..]).next().unwrap_or(url);
    let last_segment = path.rsplit('/').next().unwrap_or("");
    match last_segment.rsplit_once('.') {
        Some((stem, extension)) => {
            !stem.is_empty() && !extension.is_empty() && extension.len() <= 5
        }
        None => false,
    }
}

fn file_name_of(url: &str) -> String {
    let path = url.split(&['?', '#'][..]).next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path).to_string()
}

#[cfg(test)]
mod test {
    use crate::html_files::extract_downloadable_files;

    #[test]
    fn test_extract_src_and_href() {
        let html = r#"<p>intro</p>
            <img src="https://cdn.example.com/pic.png">
            <a href="https://files.example.com/handout.pdf">handout</a>"#;
        let files = extract_downloadable_files(html);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].file_name, "pic.png");
        assert_eq!(files[1].file_url, "https://files.example.com/handout.pdf");
        assert_eq!(files[1].file_size, None);
    }

    #[test]
    fn test_skips_plain_links_and_duplicates() {
        let html = r#"<a href="https://example.com/course/view">view</a>
            <img src="https://cdn.example.com/pic.png">
            <img src="https://cdn.example.com/pic.png">"#;
        let files = extract_downloadable_files(html);
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_query_string_does_not_hide_extension() {
        let html = r#"<a href="https://files.example.com/notes.pdf?forcedownload=1">notes</a>"#;
        let files = extract_downloadable_files(html);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name, "notes.pdf");
    }
}
