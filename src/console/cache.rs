use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use crate::error::Result;
use crate::observe::lock;

/// Identifies one cached view of backend data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewKey {
    ClientProfile(String),
    UsageHistory(String),
    QueryHistory(String),
    PlanCatalog,
}

impl ViewKey {
    /// How long a fetched value is served without refetching. `None` means
    /// until invalidated.
    #[must_use]
    pub fn fresh_for(&self) -> Option<Duration> {
        match self {
            Self::ClientProfile(_) => Some(Duration::from_secs(60)),
            Self::PlanCatalog => Some(Duration::from_secs(5 * 60)),
            Self::UsageHistory(_) | Self::QueryHistory(_) => None,
        }
    }

    #[must_use]
    pub fn workspace(&self) -> Option<&str> {
        match self {
            Self::ClientProfile(id) | Self::UsageHistory(id) | Self::QueryHistory(id) => Some(id),
            Self::PlanCatalog => None,
        }
    }
}

struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    fetched_at: Instant,
    invalidated: bool,
}

impl Entry {
    fn is_fresh(&self, key: &ViewKey) -> bool {
        if self.invalidated {
            return false;
        }
        match key.fresh_for() {
            Some(ttl) => self.fetched_at.elapsed() < ttl,
            None => true,
        }
    }
}

/// Keyed cache of fetched views with per-key freshness.
#[derive(Default)]
pub struct ViewCache {
    entries: Mutex<HashMap<ViewKey, Entry>>,
}

impl ViewCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value while fresh, otherwise runs `fetch` and
    /// stores its result. Failed fetches leave the previous entry alone.
    pub async fn get_or_fetch<T, F, Fut>(&self, key: ViewKey, fetch: F) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.fresh::<T>(&key) {
            return Ok(value);
        }

        tracing::debug!(?key, "fetching view");
        let value = Arc::new(fetch().await?);
        lock(&self.entries).insert(
            key,
            Entry {
                value: Arc::clone(&value) as Arc<dyn Any + Send + Sync>,
                fetched_at: Instant::now(),
                invalidated: false,
            },
        );
        Ok(value)
    }

    /// Last stored value, fresh or not.
    #[must_use]
    pub fn peek<T: Send + Sync + 'static>(&self, key: &ViewKey) -> Option<Arc<T>> {
        let entries = lock(&self.entries);
        let entry = entries.get(key)?;
        Arc::clone(&entry.value).downcast::<T>().ok()
    }

    /// Marks a view stale; the next `get_or_fetch` refetches it.
    pub fn invalidate(&self, key: &ViewKey) {
        if let Some(entry) = lock(&self.entries).get_mut(key) {
            entry.invalidated = true;
        }
    }

    /// Stales the views a finished query changes: usage and query history.
    pub fn invalidate_workspace_activity(&self, client_id: &str) {
        self.invalidate(&ViewKey::UsageHistory(client_id.to_string()));
        self.invalidate(&ViewKey::QueryHistory(client_id.to_string()));
    }

    #[must_use]
    pub fn is_fresh(&self, key: &ViewKey) -> bool {
        lock(&self.entries)
            .get(key)
            .is_some_and(|entry| entry.is_fresh(key))
    }

    fn fresh<T: Send + Sync + 'static>(&self, key: &ViewKey) -> Option<Arc<T>> {
        let entries = lock(&self.entries);
        let entry = entries.get(key).filter(|entry| entry.is_fresh(key))?;
        Arc::clone(&entry.value).downcast::<T>().ok()
    }
}
