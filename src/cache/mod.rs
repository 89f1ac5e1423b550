//! Page store for deferred generation
//!
//! Rendered pages are kept in memory with the time they were generated.
//! A page requested before it exists is `Pending` while a single background
//! task generates it. Pages older than the revalidation interval keep being
//! served while one background task regenerates them.
//!
//! Unknown keys come from request paths, so the store is bounded: only a
//! limited number of generations may be pending at once, and only the most
//! recent `NotFound` results are remembered.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Generation state of a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStatus<T> {
    /// Requested but not generated yet
    Pending,
    /// Generated
    Ready(T),
    /// The CMS has no such document
    NotFound,
}

impl<T> From<Option<T>> for PageStatus<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => PageStatus::Ready(value),
            None => PageStatus::NotFound,
        }
    }
}

impl<T> PageStatus<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> PageStatus<U> {
        match self {
            PageStatus::Pending => PageStatus::Pending,
            PageStatus::Ready(value) => PageStatus::Ready(f(value)),
            PageStatus::NotFound => PageStatus::NotFound,
        }
    }

    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<PageStatus<U>, E> {
        Ok(match self {
            PageStatus::Pending => PageStatus::Pending,
            PageStatus::Ready(value) => PageStatus::Ready(f(value)?),
            PageStatus::NotFound => PageStatus::NotFound,
        })
    }
}

#[derive(Debug)]
struct CacheEntry {
    status: PageStatus<String>,
    generated_at: Instant,
    /// A generation task currently owns this entry
    regenerating: bool,
}

/// Generations allowed to run at the same time
pub const DEFAULT_MAX_PENDING: usize = 32;
/// `NotFound` results remembered before the oldest is evicted
pub const DEFAULT_MAX_NOT_FOUND: usize = 256;

/// Rendered pages keyed by route
#[derive(Debug)]
pub struct PageCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    revalidate: Duration,
    max_pending: usize,
    max_not_found: usize,
}

impl PageCache {
    pub fn new(revalidate: Duration) -> Self {
        Self::with_limits(revalidate, DEFAULT_MAX_PENDING, DEFAULT_MAX_NOT_FOUND)
    }

    pub fn with_limits(revalidate: Duration, max_pending: usize, max_not_found: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            revalidate,
            max_pending,
            max_not_found,
        }
    }

    /// Current status of a page and whether it is due for regeneration
    pub fn get(&self, key: &str) -> Option<(PageStatus<String>, bool)> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .map(|entry| (entry.status.clone(), self.is_stale(entry)))
    }

    /// Claim the right to generate `key`.
    ///
    /// Returns `true` when the caller must start a generation: the page is
    /// unknown (it becomes `Pending`) or stale with no task running. At most
    /// one claim per key is outstanding until [`PageCache::complete`] or
    /// [`PageCache::abandon`] is called.
    ///
    /// An unknown key is not claimed while too many generations are pending;
    /// [`PageCache::get`] keeps returning `None` for it.
    pub fn claim(&self, key: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get_mut(key) {
            None => {
                let pending = entries
                    .values()
                    .filter(|e| matches!(e.status, PageStatus::Pending))
                    .count();
                if pending >= self.max_pending {
                    tracing::debug!("Not claiming {:?}: {} generations pending", key, pending);
                    return false;
                }
                entries.insert(
                    key.to_string(),
                    CacheEntry {
                        status: PageStatus::Pending,
                        generated_at: Instant::now(),
                        regenerating: true,
                    },
                );
                true
            }
            Some(entry) if entry.regenerating => false,
            Some(entry) if self.is_stale(entry) => {
                entry.regenerating = true;
                true
            }
            Some(_) => false,
        }
    }

    /// Store a freshly generated page and release the claim
    pub fn complete(&self, key: &str, status: PageStatus<String>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if matches!(status, PageStatus::NotFound) {
            self.evict_not_found(&mut entries, key);
        }
        entries.insert(
            key.to_string(),
            CacheEntry {
                status,
                generated_at: Instant::now(),
                regenerating: false,
            },
        );
    }

    /// Release a claim after a failed generation.
    /// A pending page is forgotten so the next request retries; a stale page
    /// stays in place.
    pub fn abandon(&self, key: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let pending = matches!(
            entries.get(key).map(|e| &e.status),
            Some(PageStatus::Pending)
        );
        if pending {
            entries.remove(key);
        } else if let Some(entry) = entries.get_mut(key) {
            entry.regenerating = false;
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make room for one more `NotFound` entry besides `key`
    fn evict_not_found(&self, entries: &mut HashMap<String, CacheEntry>, key: &str) {
        let mut missing: Vec<(Instant, String)> = entries
            .iter()
            .filter(|(k, e)| k.as_str() != key && matches!(e.status, PageStatus::NotFound))
            .map(|(k, e)| (e.generated_at, k.clone()))
            .collect();

        let limit = self.max_not_found.max(1);
        if missing.len() < limit {
            return;
        }

        missing.sort();
        let excess = missing.len() + 1 - limit;
        for (_, oldest) in missing.into_iter().take(excess) {
            entries.remove(&oldest);
        }
    }

    fn is_stale(&self, entry: &CacheEntry) -> bool {
        !matches!(entry.status, PageStatus::Pending)
            && entry.generated_at.elapsed() >= self.revalidate
    }
}
