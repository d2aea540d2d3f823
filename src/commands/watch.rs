//! Watch command implementation
//!
//! CLI counterpart of background auto-refresh: subscribe to a project's
//! jobs and indexes, let the scheduler poll while anything is transient,
//! and return once every entity has settled.

use crate::error::Result;
use crate::models::{IndexStatus, Job, JobStatus, ProjectIndex};
use crate::progress::add_spinner;
use crate::store::{CacheKey, PollScheduler};
use serde::Serialize;
use std::time::Duration;
use tracing::info;

const REDRAW_INTERVAL: Duration = Duration::from_secs(1);

/// Final state of the watched project after everything settled.
#[derive(Debug, Clone, Serialize)]
pub struct WatchSummary {
    pub jobs: Vec<Job>,
    pub indexes: Vec<ProjectIndex>,
}

impl WatchSummary {
    pub fn failed_jobs(&self) -> usize {
        self.jobs
            .iter()
            .filter(|j| j.status == JobStatus::Failed)
            .count()
    }

    pub fn failed_indexes(&self) -> usize {
        self.indexes
            .iter()
            .filter(|i| matches!(i.status, IndexStatus::Failed | IndexStatus::SyncFailed))
            .count()
    }
}

/// Follow a project until no job is processing and no index is syncing.
pub async fn cmd_watch(scheduler: &PollScheduler, project_id: &str) -> Result<WatchSummary> {
    info!("Watching project {}", project_id);

    // Keeping the subscriptions alive for the whole loop is what lets the
    // scheduler's timers run; they stop when these guards drop.
    let _jobs_sub = scheduler.subscribe(CacheKey::Jobs(project_id.to_string()));
    let _indexes_sub = scheduler.subscribe(CacheKey::Indexes(project_id.to_string()));

    let spinner = add_spinner("Watching...");

    loop {
        let (jobs, indexes) =
            futures::try_join!(scheduler.jobs(project_id), scheduler.indexes(project_id))?;

        let pending_jobs = jobs.iter().filter(|j| j.status.is_transient()).count();
        let pending_indexes = indexes.iter().filter(|i| i.status.is_transient()).count();

        if pending_jobs == 0 && pending_indexes == 0 {
            spinner.finish_and_clear();
            return Ok(WatchSummary {
                jobs: jobs.as_ref().clone(),
                indexes: indexes.as_ref().clone(),
            });
        }

        spinner.set_message(format!(
            "{} document(s) processing, {} index(es) syncing",
            pending_jobs, pending_indexes
        ));
        tokio::time::sleep(REDRAW_INTERVAL).await;
    }
}

pub fn print_watch_summary(summary: &WatchSummary) {
    let failed_jobs = summary.failed_jobs();
    let failed_indexes = summary.failed_indexes();

    if failed_jobs == 0 && failed_indexes == 0 {
        println!("✓ All documents and indexes settled");
    } else {
        println!(
            "⚠ Settled with failures: {} document(s), {} index(es)",
            failed_jobs, failed_indexes
        );
    }
    println!(
        "  Documents: {}, Indexes: {}",
        summary.jobs.len(),
        summary.indexes.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PollConfig;
    use crate::store::testing::{index, job, FakeApi};
    use crate::store::EntityStore;
    use std::sync::Arc;

    fn scheduler(api: Arc<FakeApi>) -> PollScheduler {
        let store = Arc::new(EntityStore::new(api));
        PollScheduler::new(store, &PollConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_returns_immediately_when_settled() {
        let api = Arc::new(FakeApi::new());
        api.set_jobs(vec![job("j-1", "p-1", JobStatus::Completed)]);
        api.set_indexes(vec![index("i-1", "p-1", IndexStatus::Synced)]);
        let scheduler = scheduler(api);

        let summary = cmd_watch(&scheduler, "p-1").await.unwrap();
        assert_eq!(summary.jobs.len(), 1);
        assert_eq!(summary.failed_jobs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_follows_job_to_completion() {
        let api = Arc::new(FakeApi::new());
        api.set_jobs(vec![job("j-1", "p-1", JobStatus::Processing)]);
        let scheduler = Arc::new(scheduler(api.clone()));

        let watcher = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { cmd_watch(&scheduler, "p-1").await })
        };

        // The job finishes server-side; the next poll tick picks it up and
        // the watch loop unblocks.
        api.set_jobs(vec![job("j-1", "p-1", JobStatus::Completed)]);

        let summary = watcher.await.unwrap().unwrap();
        assert_eq!(summary.jobs[0].status, JobStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_reports_failures_in_summary() {
        let api = Arc::new(FakeApi::new());
        api.set_jobs(vec![
            job("j-1", "p-1", JobStatus::Completed),
            job("j-2", "p-1", JobStatus::Failed),
        ]);
        api.set_indexes(vec![index("i-1", "p-1", IndexStatus::SyncFailed)]);
        let scheduler = scheduler(api);

        let summary = cmd_watch(&scheduler, "p-1").await.unwrap();
        assert_eq!(summary.failed_jobs(), 1);
        assert_eq!(summary.failed_indexes(), 1);
    }
}
