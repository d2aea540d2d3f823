//! Conditional auto-refresh for collections in a transient state.
//!
//! The service performs ingestion and sync asynchronously and offers no push
//! channel, so the only way to surface completion is bounded polling. After
//! every tracked fetch the collection is inspected; while any entry is still
//! transient (jobs `parsing`/`processing`, indexes `syncing`) a per-key task
//! re-fetches on a fixed interval. The task exits as soon as nothing is
//! transient, and restarts when a later read observes a transient entry
//! again. Subscriptions are reference-counted per key: the first subscriber
//! arms the key, dropping the last one aborts its timer.

use super::cache::CacheKey;
use super::EntityStore;
use crate::config::PollConfig;
use crate::error::Result;
use crate::models::{Job, ProjectIndex};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

struct WatchState {
    subscribers: usize,
    task: Option<JoinHandle<()>>,
}

type WatchMap = Arc<Mutex<HashMap<CacheKey, WatchState>>>;

pub struct PollScheduler {
    store: Arc<EntityStore>,
    jobs_interval: Duration,
    indexes_interval: Duration,
    watchers: WatchMap,
}

/// Keeps polling alive for one key. Dropping the last subscription for a
/// key aborts its timer immediately.
pub struct PollSubscription {
    watchers: WatchMap,
    key: CacheKey,
}

impl PollScheduler {
    pub fn new(store: Arc<EntityStore>, poll: &PollConfig) -> Self {
        Self {
            store,
            jobs_interval: Duration::from_secs(poll.jobs_interval_secs),
            indexes_interval: Duration::from_secs(poll.indexes_interval_secs),
            watchers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register interest in a key. Polling only ever runs for keys with at
    /// least one live subscription.
    pub fn subscribe(&self, key: CacheKey) -> PollSubscription {
        let mut watchers = lock(&self.watchers);
        let state = watchers.entry(key.clone()).or_insert(WatchState {
            subscribers: 0,
            task: None,
        });
        state.subscribers += 1;
        PollSubscription {
            watchers: Arc::clone(&self.watchers),
            key,
        }
    }

    /// Tracked read of a project's jobs: serve through the cache, then
    /// re-evaluate the polling rule on the result.
    pub async fn jobs(&self, project_id: &str) -> Result<Arc<Vec<Job>>> {
        let jobs = self.store.jobs(project_id).await?;
        if jobs.iter().any(|j| j.status.is_transient()) {
            self.arm(CacheKey::Jobs(project_id.to_string()));
        }
        Ok(jobs)
    }

    /// Tracked read of a project's indexes.
    pub async fn indexes(&self, project_id: &str) -> Result<Arc<Vec<ProjectIndex>>> {
        let indexes = self.store.indexes(project_id).await?;
        if indexes.iter().any(|i| i.status.is_transient()) {
            self.arm(CacheKey::Indexes(project_id.to_string()));
        }
        Ok(indexes)
    }

    /// Start the per-key refresh task if the key has subscribers and no
    /// timer is already running.
    fn arm(&self, key: CacheKey) {
        let interval = match &key {
            CacheKey::Jobs(_) => self.jobs_interval,
            CacheKey::Indexes(_) => self.indexes_interval,
            _ => return,
        };

        let mut watchers = lock(&self.watchers);
        let Some(state) = watchers.get_mut(&key) else {
            // Nobody is observing this key; no timer.
            return;
        };
        if state.subscribers == 0 || state.task.is_some() {
            return;
        }

        debug!("Starting poll timer for {:?}", key);
        let store = Arc::clone(&self.store);
        let watchers_ref = Arc::clone(&self.watchers);
        let task_key = key.clone();
        state.task = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                // A failed tick keeps the previous data and keeps ticking;
                // only an all-terminal collection stops the timer.
                let transient = match &task_key {
                    CacheKey::Jobs(project_id) => match store.refresh_jobs(project_id).await {
                        Ok(jobs) => jobs.iter().any(|j| j.status.is_transient()),
                        Err(e) => {
                            warn!("Job poll for project {} failed: {}", project_id, e);
                            true
                        }
                    },
                    CacheKey::Indexes(project_id) => {
                        match store.refresh_indexes(project_id).await {
                            Ok(indexes) => indexes.iter().any(|i| i.status.is_transient()),
                            Err(e) => {
                                warn!("Index poll for project {} failed: {}", project_id, e);
                                true
                            }
                        }
                    }
                    _ => false,
                };
                if !transient {
                    break;
                }
            }

            debug!("Poll timer for {:?} finished", task_key);
            let mut watchers = lock(&watchers_ref);
            if let Some(state) = watchers.get_mut(&task_key) {
                state.task = None;
            }
        }));
    }
}

impl Drop for PollSubscription {
    fn drop(&mut self) {
        let mut watchers = lock(&self.watchers);
        if let Some(state) = watchers.get_mut(&self.key) {
            state.subscribers = state.subscribers.saturating_sub(1);
            if state.subscribers == 0 {
                if let Some(task) = state.task.take() {
                    debug!("Last subscriber for {:?} gone, stopping poll", self.key);
                    task.abort();
                }
                watchers.remove(&self.key);
            }
        }
    }
}

fn lock(watchers: &WatchMap) -> std::sync::MutexGuard<'_, HashMap<CacheKey, WatchState>> {
    watchers.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::{index, job, FakeApi};
    use crate::models::{IndexStatus, JobStatus};
    use std::sync::atomic::Ordering;

    const EPSILON: Duration = Duration::from_millis(10);

    fn scheduler(api: Arc<FakeApi>) -> (PollScheduler, Arc<EntityStore>) {
        let store = Arc::new(EntityStore::new(api));
        let poll = PollConfig::default();
        (PollScheduler::new(Arc::clone(&store), &poll), store)
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_terminal_jobs_schedule_no_further_fetch() {
        let api = Arc::new(FakeApi::new());
        api.set_jobs(vec![
            job("j-1", "p-1", JobStatus::Completed),
            job("j-2", "p-1", JobStatus::Failed),
        ]);
        let (scheduler, _store) = scheduler(api.clone());

        let _sub = scheduler.subscribe(CacheKey::Jobs("p-1".to_string()));
        scheduler.jobs("p-1").await.unwrap();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(api.list_jobs_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_job_triggers_one_fetch_per_interval() {
        let api = Arc::new(FakeApi::new());
        api.set_jobs(vec![job("j-1", "p-1", JobStatus::Processing)]);
        let (scheduler, _store) = scheduler(api.clone());

        let _sub = scheduler.subscribe(CacheKey::Jobs("p-1".to_string()));
        scheduler.jobs("p-1").await.unwrap();
        assert_eq!(api.list_jobs_calls.load(Ordering::SeqCst), 1);

        // One tick, exactly one refetch, rule re-evaluated on its result.
        tokio::time::sleep(Duration::from_secs(3) + EPSILON).await;
        assert_eq!(api.list_jobs_calls.load(Ordering::SeqCst), 2);

        // The job completes server-side; the next tick observes it and the
        // timer stops without any manual cancellation.
        api.set_jobs(vec![job("j-1", "p-1", JobStatus::Completed)]);
        tokio::time::sleep(Duration::from_secs(3) + EPSILON).await;
        assert_eq!(api.list_jobs_calls.load(Ordering::SeqCst), 3);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(api.list_jobs_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_syncing_index_polls_on_index_interval() {
        let api = Arc::new(FakeApi::new());
        api.set_indexes(vec![index("i-1", "p-1", IndexStatus::Syncing)]);
        let (scheduler, _store) = scheduler(api.clone());

        let _sub = scheduler.subscribe(CacheKey::Indexes("p-1".to_string()));
        scheduler.indexes("p-1").await.unwrap();
        assert_eq!(api.list_indexes_calls.load(Ordering::SeqCst), 1);

        // Indexes poll every 5s, not 3s.
        tokio::time::sleep(Duration::from_secs(3) + EPSILON).await;
        assert_eq!(api.list_indexes_calls.load(Ordering::SeqCst), 1);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(api.list_indexes_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsubscribing_stops_polling() {
        let api = Arc::new(FakeApi::new());
        api.set_jobs(vec![job("j-1", "p-1", JobStatus::Processing)]);
        let (scheduler, _store) = scheduler(api.clone());

        let sub = scheduler.subscribe(CacheKey::Jobs("p-1".to_string()));
        scheduler.jobs("p-1").await.unwrap();
        drop(sub);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(api.list_jobs_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_subscriber_means_no_timer() {
        let api = Arc::new(FakeApi::new());
        api.set_jobs(vec![job("j-1", "p-1", JobStatus::Processing)]);
        let (scheduler, _store) = scheduler(api.clone());

        scheduler.jobs("p-1").await.unwrap();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(api.list_jobs_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_tick_keeps_polling_and_previous_data() {
        let api = Arc::new(FakeApi::new());
        api.set_jobs(vec![job("j-1", "p-1", JobStatus::Processing)]);
        let (scheduler, store) = scheduler(api.clone());

        let _sub = scheduler.subscribe(CacheKey::Jobs("p-1".to_string()));
        scheduler.jobs("p-1").await.unwrap();

        api.fail_next_list_jobs.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(3) + EPSILON).await;
        assert_eq!(api.list_jobs_calls.load(Ordering::SeqCst), 2);
        // The failed tick left the last good snapshot in place.
        assert_eq!(store.peek_jobs("p-1").unwrap().len(), 1);

        // The timer survived the failure and keeps re-checking.
        tokio::time::sleep(Duration::from_secs(3) + EPSILON).await;
        assert_eq!(api.list_jobs_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_resumes_after_invalidating_mutation() {
        let api = Arc::new(FakeApi::new());
        api.set_jobs(vec![job("j-1", "p-1", JobStatus::Completed)]);
        let (scheduler, store) = scheduler(api.clone());

        let _sub = scheduler.subscribe(CacheKey::Jobs("p-1".to_string()));
        scheduler.jobs("p-1").await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(api.list_jobs_calls.load(Ordering::SeqCst), 1);

        // A new scrape kicks off a transient job and invalidates the key;
        // the next tracked read refetches and re-arms the timer.
        api.set_jobs(vec![
            job("j-1", "p-1", JobStatus::Completed),
            job("j-2", "p-1", JobStatus::Parsing),
        ]);
        store.scrape_url("p-1", "https://example.com/docs").await.unwrap();

        scheduler.jobs("p-1").await.unwrap();
        assert_eq!(api.list_jobs_calls.load(Ordering::SeqCst), 2);
        tokio::time::sleep(Duration::from_secs(3) + EPSILON).await;
        assert_eq!(api.list_jobs_calls.load(Ordering::SeqCst), 3);
    }
}
