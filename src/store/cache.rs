//! Keyed entity cache with request de-duplication and explicit invalidation.
//!
//! Each key holds at most one fresh value and at most one in-flight fetch.
//! Concurrent readers of the same key join the outstanding fetch instead of
//! issuing their own request. Invalidation drops the fresh value and bumps a
//! generation counter, so a fetch that was already in flight still delivers
//! to its waiters but is not stored.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;

/// Identity of a fetchable collection or entity. Keys with different parent
/// ids never share a slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Projects,
    Project(String),
    Jobs(String),
    Indexes(String),
    JobContent(String),
}

/// Outcome broadcast to readers that joined an in-flight fetch. Errors are
/// flattened to their message so the outcome stays cheaply cloneable.
type FetchOutcome<T> = std::result::Result<Arc<T>, String>;

struct InFlight<T> {
    tx: broadcast::Sender<FetchOutcome<T>>,
}

struct Slot<T> {
    value: Option<Arc<T>>,
    generation: u64,
    inflight: Option<InFlight<T>>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            value: None,
            generation: 0,
            inflight: None,
        }
    }
}

enum Plan<T> {
    Hit(Arc<T>),
    Join(broadcast::Receiver<FetchOutcome<T>>),
    Run { generation: u64 },
}

pub struct Cache<T> {
    slots: Mutex<HashMap<CacheKey, Slot<T>>>,
}

impl<T: Send + Sync> Cache<T> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, Slot<T>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the cached value for `key`, or run `fetch` to populate it.
    /// Readers arriving while a fetch is outstanding join its result.
    pub async fn get_or_fetch<F, Fut>(&self, key: &CacheKey, fetch: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.fetch_inner(key, fetch, false).await
    }

    /// Fetch unconditionally, bypassing any fresh value, but still joining
    /// an already-outstanding fetch. A failed refresh leaves the previous
    /// value in place.
    pub async fn refresh<F, Fut>(&self, key: &CacheKey, fetch: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.fetch_inner(key, fetch, true).await
    }

    async fn fetch_inner<F, Fut>(&self, key: &CacheKey, fetch: F, force: bool) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let plan = {
            let mut slots = self.lock();
            let slot = slots.entry(key.clone()).or_default();
            if let Some(inflight) = &slot.inflight {
                Plan::Join(inflight.tx.subscribe())
            } else {
                let cached = if force { None } else { slot.value.clone() };
                match cached {
                    Some(value) => Plan::Hit(value),
                    None => {
                        let (tx, _) = broadcast::channel(1);
                        slot.inflight = Some(InFlight { tx });
                        Plan::Run {
                            generation: slot.generation,
                        }
                    }
                }
            }
        };

        match plan {
            Plan::Hit(value) => Ok(value),
            Plan::Join(mut rx) => match rx.recv().await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(message)) => Err(Error::Other(message)),
                Err(_) => Err(Error::Other("shared fetch was cancelled".to_string())),
            },
            Plan::Run { generation } => {
                let outcome = fetch().await;
                let mut slots = self.lock();
                let slot = slots.entry(key.clone()).or_default();
                match outcome {
                    Ok(value) => {
                        let value = Arc::new(value);
                        // Results of a fetch that raced an invalidation are
                        // delivered but never stored.
                        if slot.generation == generation {
                            slot.value = Some(value.clone());
                        }
                        if let Some(inflight) = slot.inflight.take() {
                            let _ = inflight.tx.send(Ok(value.clone()));
                        }
                        Ok(value)
                    }
                    Err(e) => {
                        if let Some(inflight) = slot.inflight.take() {
                            let _ = inflight.tx.send(Err(e.to_string()));
                        }
                        Err(e)
                    }
                }
            }
        }
    }

    /// Mark `key` stale: the next read fetches instead of serving the
    /// memoized value. An in-flight fetch is not cancelled.
    pub fn invalidate(&self, key: &CacheKey) {
        let mut slots = self.lock();
        if let Some(slot) = slots.get_mut(key) {
            slot.value = None;
            slot.generation += 1;
        }
    }

    /// Last known good value without touching the network.
    pub fn peek(&self, key: &CacheKey) -> Option<Arc<T>> {
        self.lock().get(key).and_then(|slot| slot.value.clone())
    }
}
