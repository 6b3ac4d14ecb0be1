use parking_lot::RwLock;

/// Holds the id of the currently active site. Components that accept an
/// optional site id fall back to this registry when the caller omits it.
pub struct SiteRegistry {
    current: RwLock<Option<String>>,
}

impl SiteRegistry {
    pub fn new() -> SiteRegistry {
        SiteRegistry {
            current: RwLock::new(None),
        }
    }

    pub fn set_current_site(&self, site_id: impl Into<String>) {
        *self.current.write() = Some(site_id.into());
    }

    pub fn clear_current_site(&self) {
        *self.current.write() = None;
    }

    /// The current site id, or the empty id when no site is active.
    /// Downloads tracked while logged out partition under the empty id like
    /// any other scope.
    pub fn current_site_id(&self) -> String {
        self.current.read().clone().unwrap_or_default()
    }

    /// Resolve an optional explicit site id against the current site.
    pub fn resolve(&self, site_id: Option<&str>) -> String {
        match site_id {
            Some(site_id) => site_id.to_string(),
            None => self.current_site_id(),
        }
    }
}

impl Default for SiteRegistry {
    fn default() -> Self {
        Self::new()
    }
}
