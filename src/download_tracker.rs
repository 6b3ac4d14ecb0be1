use std::collections::HashMap;
use std::sync::Arc;
use futures::future;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::debug;
use crate::error::{PrefetchError, Result};
use crate::site::SiteRegistry;

/// A download operation shared between every caller waiting on it.
/// The underlying future runs at most once; every holder observes the same
/// outcome.
pub type OngoingDownload = Shared<BoxFuture<'static, Result<()>>>;

type DownloadMap = HashMap<String, HashMap<String, OngoingDownload>>;

/// Tracks in-flight downloads per site so a content unit is never fetched
/// twice concurrently. Keys are derived from a component name and a numeric
/// id via [`DownloadTracker::unique_id`]; entries retire themselves when the
/// operation completes, whatever the outcome.
///
/// The tracker is an explicit value owned by the orchestration layer, not a
/// process-wide singleton; create as many independent trackers as needed.
pub struct DownloadTracker {
    sites: Arc<SiteRegistry>,
    downloads: Arc<Mutex<DownloadMap>>,
}

impl DownloadTracker {
    pub fn new(sites: Arc<SiteRegistry>) -> DownloadTracker {
        DownloadTracker {
            sites,
            downloads: Arc::new(Mutex::new(DownloadMap::new())),
        }
    }

    /// Create the tracking key for an id within a component.
    pub fn unique_id(component: &str, id: u64) -> String {
        format!("{}#{}", component, id)
    }

    /// Register an ongoing download under (site, component#id). When the
    /// future completes the entry is removed. Returns the shared operation;
    /// chaining on the returned value does not affect cleanup.
    ///
    /// Registering a key that is already in flight replaces the stored entry
    /// (last writer wins). Callers are expected to check
    /// [`is_downloading`](DownloadTracker::is_downloading) first.
    pub fn add_ongoing_download(
        &self,
        component: &str,
        id: u64,
        download: BoxFuture<'static, Result<()>>,
        site_id: Option<&str>,
    ) -> OngoingDownload {
        let site_id = self.sites.resolve(site_id);
        let unique_id = Self::unique_id(component, id);

        debug!(site = %site_id, key = %unique_id, "tracking ongoing download");

        let operation = {
            let downloads = Arc::clone(&self.downloads);
            let site_id = site_id.clone();
            let unique_id = unique_id.clone();
            async move {
                let result = download.await;
                let mut downloads = downloads.lock();
                if let Some(site_downloads) = downloads.get_mut(&site_id) {
                    site_downloads.remove(&unique_id);
                    if site_downloads.is_empty() {
                        downloads.remove(&site_id);
                    }
                }
                result
            }
            .boxed()
            .shared()
        };

        self.downloads
            .lock()
            .entry(site_id)
            .or_default()
            .insert(unique_id, operation.clone());

        operation
    }

    /// The ongoing download for (site, component#id) if one is in flight,
    /// otherwise an already-resolved no-op operation. Never fails.
    pub fn get_ongoing_download(&self, component: &str, id: u64, site_id: Option<&str>) -> OngoingDownload {
        let site_id = self.sites.resolve(site_id);
        let unique_id = Self::unique_id(component, id);

        let downloads = self.downloads.lock();
        if let Some(operation) = downloads.get(&site_id).and_then(|site_downloads| site_downloads.get(&unique_id)) {
            return operation.clone();
        }

        future::ready(Ok::<(), PrefetchError>(())).boxed().shared()
    }

    /// True if a download for (site, component#id) is in flight.
    pub fn is_downloading(&self, component: &str, id: u64, site_id: Option<&str>) -> bool {
        let site_id = self.sites.resolve(site_id);
        let unique_id = Self::unique_id(component, id);

        self.downloads
            .lock()
            .get(&site_id)
            .map(|site_downloads| site_downloads.contains_key(&unique_id))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use futures::future::FutureExt;
    use tokio::sync::oneshot;
    use crate::download_tracker::DownloadTracker;
    use crate::error::PrefetchError;
    use crate::site::SiteRegistry;

    fn tracker() -> DownloadTracker {
        let sites = Arc::new(SiteRegistry::new());
        sites.set_current_site("site-a");
        DownloadTracker::new(sites)
    }

    #[test]
    fn test_unique_id() {
        assert_eq!(DownloadTracker::unique_id("mod_resource", 7), "mod_resource#7");
        assert_eq!(
            DownloadTracker::unique_id("mod_resource", 1),
            DownloadTracker::unique_id("mod_resource", 1)
        );
        assert_ne!(
            DownloadTracker::unique_id("mod_resource", 1),
            DownloadTracker::unique_id("mod_resource", 2)
        );
    }

    #[tokio::test]
    async fn test_nothing_in_flight_initially() {
        let tracker = tracker();
        assert!(!tracker.is_downloading("mod_resource", 1, None));

        // Absent key resolves immediately with no error.
        let operation = tracker.get_ongoing_download("mod_resource", 1, None);
        assert_eq!(operation.await, Ok(()));
    }

    #[tokio::test]
    async fn test_shared_operation_runs_once() {
        let tracker = tracker();
        let runs = Arc::new(AtomicUsize::new(0));
        let (release, wait) = oneshot::channel::<()>();

        let download = {
            let runs = Arc::clone(&runs);
            async move {
                runs.fetch_add(1, Ordering::SeqCst);
                let _ = wait.await;
                Ok(())
            }
            .boxed()
        };

        let registered = tracker.add_ongoing_download("mod_resource", 1, download, None);
        assert!(tracker.is_downloading("mod_resource", 1, None));

        let looked_up = tracker.get_ongoing_download("mod_resource", 1, None);

        release.send(()).unwrap();
        let (first, second) = tokio::join!(registered, looked_up);
        assert_eq!(first, Ok(()));
        assert_eq!(second, Ok(()));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!tracker.is_downloading("mod_resource", 1, None));
    }

    #[tokio::test]
    async fn test_failed_download_is_retired_and_retryable() {
        let tracker = tracker();

        let operation = tracker.add_ongoing_download(
            "mod_resource",
            2,
            async { Err(PrefetchError::Request) }.boxed(),
            None,
        );
        assert_eq!(operation.await, Err(PrefetchError::Request));
        assert!(!tracker.is_downloading("mod_resource", 2, None));

        // The failed entry no longer blocks a retry for the same key.
        let retry = tracker.add_ongoing_download("mod_resource", 2, async { Ok(()) }.boxed(), None);
        assert_eq!(retry.await, Ok(()));
        assert!(!tracker.is_downloading("mod_resource", 2, None));
    }

    #[tokio::test]
    async fn test_sites_are_independent() {
        let tracker = tracker();
        let (release, wait) = oneshot::channel::<()>();

        let first = tracker.add_ongoing_download("mod_resource", 3, async { Ok(()) }.boxed(), Some("s1"));
        tracker.add_ongoing_download(
            "mod_resource",
            3,
            async move {
                let _ = wait.await;
                Ok(())
            }
            .boxed(),
            Some("s2"),
        );

        assert_eq!(first.await, Ok(()));
        assert!(!tracker.is_downloading("mod_resource", 3, Some("s1")));
        assert!(tracker.is_downloading("mod_resource", 3, Some("s2")));
        release.send(()).unwrap();
    }

    #[tokio::test]
    async fn test_omitted_site_uses_current_site() {
        let sites = Arc::new(SiteRegistry::new());
        sites.set_current_site("site-a");
        let tracker = DownloadTracker::new(Arc::clone(&sites));

        let (release, wait) = oneshot::channel::<()>();
        tracker.add_ongoing_download(
            "mod_page",
            9,
            async move {
                let _ = wait.await;
                Ok(())
            }
            .boxed(),
            None,
        );

        assert!(tracker.is_downloading("mod_page", 9, Some("site-a")));
        sites.set_current_site("site-b");
        assert!(!tracker.is_downloading("mod_page", 9, None));
        release.send(()).unwrap();
    }
}
