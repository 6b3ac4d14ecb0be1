use std::collections::HashMap;
use std::path::PathBuf;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use parking_lot::RwLock;
use reqwest::Client;
use tokio::fs;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use xxhash_rust::xxh64::xxh64;
use crate::error::{PrefetchError, Result};
use crate::pool_configuration::FilePoolConfiguration;

/// Metadata for one stored file.
#[derive(Debug, Clone)]
pub struct PoolEntry {
    pub file_id: String,
    pub url: String,
    pub path: PathBuf,
    pub size: u64,
    /// Unix timestamp of when the file was stored.
    pub downloaded_time: i64,
    /// Remote modification time the stored copy corresponds to, 0 when unknown.
    pub time_modified: i64,
}

type EntryMap = HashMap<String, HashMap<String, PoolEntry>>;
type LinkMap = HashMap<String, HashMap<String, Vec<String>>>;

/// Disk-backed pool of downloaded files, one copy per (site, url), linked to
/// the (component, id) pairs that requested them. A file is deleted only
/// when its last link is removed.
pub struct FilePool {
    root: PathBuf,
    hash_seed: u64,
    client: Client,
    shutdown_token: CancellationToken,
    entries: RwLock<EntryMap>,
    links: RwLock<LinkMap>,
}

impl FilePool {
    pub fn new(config: FilePoolConfiguration) -> FilePool {
        let root = config.root.expect("pool root not set");
        FilePool {
            root,
            hash_seed: config.hash_seed,
            client: Client::new(),
            shutdown_token: CancellationToken::new(),
            entries: RwLock::new(EntryMap::new()),
            links: RwLock::new(LinkMap::new()),
        }
    }

    /// Cancel in-flight downloads and refuse new ones.
    pub fn shutdown(&self) {
        self.shutdown_token.cancel();
    }

    /// Stable file id for a url: xxh64 of the url, keeping the extension so
    /// stored files stay recognizable.
    pub fn file_id(&self, url: &str) -> String {
        let digest = xxh64(url.as_bytes(), self.hash_seed);
        match url_extension(url) {
            Some(extension) => format!("{:016x}.{}", digest, extension),
            None => format!("{:016x}", digest),
        }
    }

    /// Store the file at `url` for (component, id), reusing the existing copy
    /// when it is not older than `time_modified`. Returns the stored path.
    pub async fn download_url(
        &self,
        site_id: &str,
        url: &str,
        component: &str,
        id: u64,
        time_modified: i64,
    ) -> Result<PathBuf> {
        let file_id = self.file_id(url);

        let existing = self
            .entries
            .read()
            .get(site_id)
            .and_then(|site_entries| site_entries.get(&file_id))
            .cloned();
        if let Some(entry) = existing {
            if time_modified == 0 || entry.time_modified >= time_modified {
                self.link(site_id, component, id, &file_id);
                debug!(site = %site_id, %url, "reusing pooled file");
                return Ok(entry.path);
            }
            debug!(site = %site_id, %url, "pooled file outdated, downloading again");
        }

        if self.shutdown_token.is_cancelled() {
            return Err(PrefetchError::Cancelled);
        }

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(_) => return Err(PrefetchError::Request),
        };
        if !response.status().is_success() {
            warn!(site = %site_id, %url, status = response.status().as_u16(), "download rejected");
            return Err(PrefetchError::Response(response.status().as_u16()));
        }

        let mut remote_modified = 0i64;
        if let Some(last_modified) = response.headers().get("last-modified") {
            if let Ok(last_modified_str) = last_modified.to_str() {
                if let Ok(last_modified_datetime) = DateTime::parse_from_rfc2822(last_modified_str) {
                    remote_modified = last_modified_datetime.timestamp();
                }
            }
        }

        let site_dir = self.root.join(site_id);
        if fs::create_dir_all(&site_dir).await.is_err() {
            return Err(PrefetchError::CreateDirectory);
        }
        let path = site_dir.join(&file_id);

        let mut file = match OpenOptions::new().create(true).write(true).truncate(true).open(&path).await {
            Ok(file) => file,
            Err(_e) => return Err(PrefetchError::OpenOrCreateFile),
        };

        let mut stream = response.bytes_stream();
        let mut size = 0u64;
        loop {
            tokio::select! {
                chunk = stream.next() => {
                    match chunk {
                        Some(Ok(bytes)) => {
                            if let Err(_e) = file.write_all(&bytes).await {
                                drop(file);
                                let _ = fs::remove_file(&path).await;
                                return Err(PrefetchError::FileWrite);
                            }
                            size += bytes.len() as u64;
                        }
                        Some(Err(_)) => {
                            drop(file);
                            let _ = fs::remove_file(&path).await;
                            return Err(PrefetchError::ResponseChunk);
                        }
                        None => break,
                    }
                }
                _ = self.shutdown_token.cancelled() => {
                    drop(file);
                    let _ = fs::remove_file(&path).await;
                    return Err(PrefetchError::Cancelled);
                }
            }
        }

        if let Err(_e) = file.flush().await {
            return Err(PrefetchError::FileFlush);
        }

        let entry = PoolEntry {
            file_id: file_id.clone(),
            url: url.to_string(),
            path: path.clone(),
            size,
            downloaded_time: Utc::now().timestamp(),
            time_modified: match remote_modified {
                0 => time_modified,
                _ => remote_modified,
            },
        };
        self.entries
            .write()
            .entry(site_id.to_string())
            .or_default()
            .insert(file_id.clone(), entry);
        self.link(site_id, component, id, &file_id);

        debug!(site = %site_id, %url, size, "stored file in pool");
        Ok(path)
    }

    /// Total stored size of the files linked to (component, id).
    pub fn files_size_by_component(&self, site_id: &str, component: &str, id: u64) -> u64 {
        let entries = self.entries.read();
        let links = self.links.read();

        let site_entries = match entries.get(site_id) {
            Some(site_entries) => site_entries,
            None => return 0,
        };
        let file_ids = links
            .get(site_id)
            .and_then(|site_links| site_links.get(&component_key(component, id)));

        match file_ids {
            Some(file_ids) => file_ids
                .iter()
                .filter_map(|file_id| site_entries.get(file_id))
                .map(|entry| entry.size)
                .sum(),
            None => 0,
        }
    }

    /// Entries linked to (component, id).
    pub fn component_files(&self, site_id: &str, component: &str, id: u64) -> Vec<PoolEntry> {
        let entries = self.entries.read();
        let links = self.links.read();

        let site_entries = match entries.get(site_id) {
            Some(site_entries) => site_entries,
            None => return Vec::new(),
        };
        match links.get(site_id).and_then(|site_links| site_links.get(&component_key(component, id))) {
            Some(file_ids) => file_ids
                .iter()
                .filter_map(|file_id| site_entries.get(file_id))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// The stored entry for a url, if any.
    pub fn entry_by_url(&self, site_id: &str, url: &str) -> Option<PoolEntry> {
        let file_id = self.file_id(url);
        self.entries
            .read()
            .get(site_id)
            .and_then(|site_entries| site_entries.get(&file_id))
            .cloned()
    }

    /// Unlink every file of (component, id); delete the files no other
    /// component still links.
    pub async fn remove_files_by_component(&self, site_id: &str, component: &str, id: u64) -> Result<()> {
        let orphaned: Vec<PoolEntry> = {
            // Same acquisition order as the read paths: entries, then links.
            let mut entries = self.entries.write();
            let mut links = self.links.write();

            let site_links = match links.get_mut(site_id) {
                Some(site_links) => site_links,
                None => return Ok(()),
            };
            let file_ids = match site_links.remove(&component_key(component, id)) {
                Some(file_ids) => file_ids,
                None => return Ok(()),
            };

            let mut orphaned = Vec::new();
            for file_id in file_ids {
                let still_linked = site_links
                    .values()
                    .any(|linked| linked.iter().any(|linked_id| linked_id == &file_id));
                if still_linked {
                    continue;
                }
                if let Some(site_entries) = entries.get_mut(site_id) {
                    if let Some(entry) = site_entries.remove(&file_id) {
                        orphaned.push(entry);
                    }
                }
            }
            orphaned
        };

        for entry in orphaned {
            if let Err(_e) = fs::remove_file(&entry.path).await {
                warn!(site = %site_id, path = %entry.path.display(), "could not delete pooled file");
                return Err(PrefetchError::DeleteFile);
            }
        }

        Ok(())
    }

    fn link(&self, site_id: &str, component: &str, id: u64, file_id: &str) {
        let mut links = self.links.write();
        let linked = links
            .entry(site_id.to_string())
            .or_default()
            .entry(component_key(component, id))
            .or_default();
        if !linked.iter().any(|linked_id| linked_id == file_id) {
            linked.push(file_id.to_string());
        }
    }
}

fn component_key(component: &str, id: u64) -> String {
    format!("{}#{}", component, id)
}

fn url_extension(url: &str) -> Option<&str> {
    let path = url.split(&['?', '#'][..]).next().unwrap_or(url);
    let last_segment = path.rsplit('/').next()?;
    match last_segment.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() && !extension.is_empty() && extension.len() <= 5 => {
            Some(extension)
        }
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use crate::error::PrefetchError;
    use crate::file_pool::FilePool;
    use crate::pool_configuration::FilePoolConfiguration;

    fn pool(root: &std::path::Path) -> FilePool {
        let config = FilePoolConfiguration::new()
            .set_root(root)
            .create_dir(true)
            .build();
        FilePool::new(config)
    }

    #[test]
    fn test_file_id_keeps_extension() {
        let dir = tempfile::tempdir().unwrap();
        let pool = pool(dir.path());
        let file_id = pool.file_id("https://files.example.com/a/notes.pdf?forcedownload=1");
        assert!(file_id.ends_with(".pdf"));
        assert_eq!(file_id, pool.file_id("https://files.example.com/a/notes.pdf?forcedownload=1"));
        assert_ne!(file_id, pool.file_id("https://files.example.com/b/notes.pdf"));
    }

    #[tokio::test]
    async fn test_download_and_reuse() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/notes.pdf")
            .with_status(200)
            .with_header("last-modified", "Wed, 21 Oct 2015 07:28:00 GMT")
            .with_body("hello")
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let pool = pool(dir.path());
        let url = format!("{}/notes.pdf", server.url());

        let path = pool.download_url("site-a", &url, "mod_resource", 1, 0).await.unwrap();
        assert!(path.exists());
        assert_eq!(pool.files_size_by_component("site-a", "mod_resource", 1), 5);

        // Second request for the same url is served from the pool.
        let again = pool.download_url("site-a", &url, "mod_resource", 1, 0).await.unwrap();
        assert_eq!(again, path);
        mock.assert_async().await;

        let entry = pool.entry_by_url("site-a", &url).unwrap();
        assert_eq!(entry.size, 5);
        assert_ne!(entry.time_modified, 0);

        let linked = pool.component_files("site-a", "mod_resource", 1);
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].path, path);
    }

    #[tokio::test]
    async fn test_outdated_copy_is_downloaded_again() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/notes.pdf")
            .with_status(200)
            .with_header("last-modified", "Wed, 21 Oct 2015 07:28:00 GMT")
            .with_body("hello")
            .expect(2)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let pool = pool(dir.path());
        let url = format!("{}/notes.pdf", server.url());

        pool.download_url("site-a", &url, "mod_resource", 1, 0).await.unwrap();
        // A declared modification time newer than the stored copy forces a refetch.
        pool.download_url("site-a", &url, "mod_resource", 1, 1700000000).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_remove_keeps_files_linked_elsewhere() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/shared.png")
            .with_status(200)
            .with_body("img")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let pool = pool(dir.path());
        let url = format!("{}/shared.png", server.url());

        let path = pool.download_url("site-a", &url, "mod_resource", 1, 0).await.unwrap();
        pool.download_url("site-a", &url, "mod_page", 2, 0).await.unwrap();

        pool.remove_files_by_component("site-a", "mod_resource", 1).await.unwrap();
        assert!(path.exists());
        assert_eq!(pool.files_size_by_component("site-a", "mod_resource", 1), 0);

        pool.remove_files_by_component("site-a", "mod_page", 2).await.unwrap();
        assert!(!path.exists());
        assert!(pool.entry_by_url("site-a", &url).is_none());
    }

    #[tokio::test]
    async fn test_failed_response_stores_nothing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing.pdf")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let pool = pool(dir.path());
        let url = format!("{}/missing.pdf", server.url());

        let result = pool.download_url("site-a", &url, "mod_resource", 1, 0).await;
        assert_eq!(result, Err(PrefetchError::Response(404)));
        assert!(pool.entry_by_url("site-a", &url).is_none());
    }

    #[tokio::test]
    async fn test_shutdown_refuses_new_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let pool = pool(dir.path());
        pool.shutdown();

        let result = pool.download_url("site-a", "http://unreachable.invalid/a.pdf", "mod_resource", 1, 0).await;
        assert_eq!(result, Err(PrefetchError::Cancelled));
    }
}
