//! Entity store: cached reads and invalidating mutations.
//!
//! Presentation code never calls the API client directly; it goes through
//! [`EntityStore`], which shares fetched collections across consumers,
//! de-duplicates concurrent reads, and declares the cache keys each mutating
//! operation invalidates. One store per application instance; tests build a
//! fresh one.

mod cache;
mod poll;

pub use cache::{Cache, CacheKey};
pub use poll::{PollScheduler, PollSubscription};

use crate::api::{KnowledgeBaseApi, SyncParams};
use crate::error::{Error, Result};
use crate::models::{Job, Project, ProjectIndex, SearchResult};
use std::sync::Arc;
use tracing::debug;

/// An index references at least one and at most five completed jobs.
pub const MAX_INDEX_JOBS: usize = 5;

pub struct EntityStore {
    api: Arc<dyn KnowledgeBaseApi>,
    projects: Cache<Vec<Project>>,
    project: Cache<Option<Project>>,
    jobs: Cache<Vec<Job>>,
    indexes: Cache<Vec<ProjectIndex>>,
    content: Cache<String>,
}

impl EntityStore {
    pub fn new(api: Arc<dyn KnowledgeBaseApi>) -> Self {
        Self {
            api,
            projects: Cache::new(),
            project: Cache::new(),
            jobs: Cache::new(),
            indexes: Cache::new(),
            content: Cache::new(),
        }
    }

    // --- Reads (cache-backed) ---

    pub async fn projects(&self) -> Result<Arc<Vec<Project>>> {
        let api = Arc::clone(&self.api);
        self.projects
            .get_or_fetch(&CacheKey::Projects, move || async move {
                api.list_projects().await
            })
            .await
    }

    /// `None` inside the Arc means the project does not exist; absence is a
    /// cacheable state, not an error.
    pub async fn project(&self, project_id: &str) -> Result<Arc<Option<Project>>> {
        let api = Arc::clone(&self.api);
        let id = project_id.to_string();
        self.project
            .get_or_fetch(&CacheKey::Project(project_id.to_string()), move || {
                async move { api.get_project(&id).await }
            })
            .await
    }

    pub async fn jobs(&self, project_id: &str) -> Result<Arc<Vec<Job>>> {
        let api = Arc::clone(&self.api);
        let id = project_id.to_string();
        self.jobs
            .get_or_fetch(&CacheKey::Jobs(project_id.to_string()), move || async move {
                api.list_jobs(&id).await
            })
            .await
    }

    pub async fn indexes(&self, project_id: &str) -> Result<Arc<Vec<ProjectIndex>>> {
        let api = Arc::clone(&self.api);
        let id = project_id.to_string();
        self.indexes
            .get_or_fetch(&CacheKey::Indexes(project_id.to_string()), move || {
                async move { api.list_indexes(&id).await }
            })
            .await
    }

    pub async fn job_content(&self, job_id: &str) -> Result<Arc<String>> {
        let api = Arc::clone(&self.api);
        let id = job_id.to_string();
        self.content
            .get_or_fetch(&CacheKey::JobContent(job_id.to_string()), move || {
                async move { api.get_job_content(&id).await }
            })
            .await
    }

    // --- Forced refreshes (poll scheduler) ---

    pub async fn refresh_jobs(&self, project_id: &str) -> Result<Arc<Vec<Job>>> {
        let api = Arc::clone(&self.api);
        let id = project_id.to_string();
        self.jobs
            .refresh(&CacheKey::Jobs(project_id.to_string()), move || async move {
                api.list_jobs(&id).await
            })
            .await
    }

    pub async fn refresh_indexes(&self, project_id: &str) -> Result<Arc<Vec<ProjectIndex>>> {
        let api = Arc::clone(&self.api);
        let id = project_id.to_string();
        self.indexes
            .refresh(&CacheKey::Indexes(project_id.to_string()), move || {
                async move { api.list_indexes(&id).await }
            })
            .await
    }

    /// Cached jobs without touching the network.
    pub fn peek_jobs(&self, project_id: &str) -> Option<Arc<Vec<Job>>> {
        self.jobs.peek(&CacheKey::Jobs(project_id.to_string()))
    }

    pub fn peek_indexes(&self, project_id: &str) -> Option<Arc<Vec<ProjectIndex>>> {
        self.indexes.peek(&CacheKey::Indexes(project_id.to_string()))
    }

    // --- Mutations (invalidate after success, never before issuing) ---

    pub async fn create_project(&self, name: &str, description: &str) -> Result<Project> {
        let project = self.api.create_project(name, description).await?;
        self.invalidate(&CacheKey::Projects);
        Ok(project)
    }

    /// Deletion cascades invalidation to the project's child keys so a
    /// later read of its jobs or indexes cannot serve stale data.
    pub async fn delete_project(&self, project_id: &str) -> Result<()> {
        self.api.delete_project(project_id).await?;
        self.invalidate(&CacheKey::Projects);
        self.invalidate(&CacheKey::Project(project_id.to_string()));
        self.invalidate(&CacheKey::Jobs(project_id.to_string()));
        self.invalidate(&CacheKey::Indexes(project_id.to_string()));
        Ok(())
    }

    pub async fn upload_pdf(
        &self,
        project_id: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<()> {
        self.api.upload_pdf(project_id, filename, bytes).await?;
        self.invalidate(&CacheKey::Jobs(project_id.to_string()));
        Ok(())
    }

    pub async fn scrape_url(&self, project_id: &str, url: &str) -> Result<()> {
        self.api.scrape_url(project_id, url).await?;
        self.invalidate(&CacheKey::Jobs(project_id.to_string()));
        Ok(())
    }

    pub async fn add_manual_content(
        &self,
        project_id: &str,
        title: &str,
        content: &str,
    ) -> Result<()> {
        self.api.add_manual_content(project_id, title, content).await?;
        self.invalidate(&CacheKey::Jobs(project_id.to_string()));
        Ok(())
    }

    pub async fn delete_job(&self, project_id: &str, job_id: &str) -> Result<()> {
        self.api.delete_job(job_id).await?;
        self.invalidate(&CacheKey::Jobs(project_id.to_string()));
        self.invalidate(&CacheKey::JobContent(job_id.to_string()));
        Ok(())
    }

    /// Create an index over 1-5 completed jobs. The cardinality bound is
    /// enforced locally; nothing is sent when it fails.
    pub async fn create_index(
        &self,
        project_id: &str,
        name: &str,
        description: &str,
        job_ids: &[String],
    ) -> Result<ProjectIndex> {
        if job_ids.is_empty() || job_ids.len() > MAX_INDEX_JOBS {
            return Err(Error::Validation(format!(
                "an index references between 1 and {} documents ({} selected)",
                MAX_INDEX_JOBS,
                job_ids.len()
            )));
        }

        let index = self
            .api
            .create_index(project_id, name, description, job_ids)
            .await?;
        self.invalidate(&CacheKey::Indexes(project_id.to_string()));
        // The project record carries derived counts.
        self.invalidate(&CacheKey::Project(project_id.to_string()));
        Ok(index)
    }

    pub async fn sync_index(
        &self,
        project_id: &str,
        index_id: &str,
        params: &SyncParams,
    ) -> Result<()> {
        self.api.sync_index(index_id, params).await?;
        self.invalidate(&CacheKey::Indexes(project_id.to_string()));
        Ok(())
    }

    pub async fn delete_index(&self, project_id: &str, index_id: &str) -> Result<()> {
        self.api.delete_index(index_id).await?;
        self.invalidate(&CacheKey::Indexes(project_id.to_string()));
        self.invalidate(&CacheKey::Project(project_id.to_string()));
        Ok(())
    }

    /// Query an index. Results are ephemeral and bypass the cache entirely.
    pub async fn query(
        &self,
        index_id: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        self.api.query_index(index_id, query, top_k).await
    }

    pub fn invalidate(&self, key: &CacheKey) {
        debug!("Invalidating cache key {:?}", key);
        match key {
            CacheKey::Projects => self.projects.invalidate(key),
            CacheKey::Project(_) => self.project.invalidate(key),
            CacheKey::Jobs(_) => self.jobs.invalidate(key),
            CacheKey::Indexes(_) => self.indexes.invalidate(key),
            CacheKey::JobContent(_) => self.content.invalidate(key),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::models::{IndexStatus, JobStatus};
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_job_reads_issue_one_request() {
        let api = Arc::new(FakeApi::with_delay(Duration::from_millis(50)));
        api.set_jobs(vec![job("j-1", "p-1", JobStatus::Completed)]);
        let store = EntityStore::new(api.clone());

        let (a, b) = tokio::join!(store.jobs("p-1"), store.jobs("p-1"));
        assert_eq!(a.unwrap().len(), 1);
        assert_eq!(b.unwrap().len(), 1);
        assert_eq!(api.list_jobs_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_delete_index_invalidates_parent_indexes_key() {
        let api = Arc::new(FakeApi::new());
        api.set_indexes(vec![index("i-1", "p-1", IndexStatus::Synced)]);
        let store = EntityStore::new(api.clone());

        assert_eq!(store.indexes("p-1").await.unwrap().len(), 1);
        assert_eq!(api.list_indexes_calls.load(Ordering::SeqCst), 1);

        store.delete_index("p-1", "i-1").await.unwrap();

        // The next read must hit the network, not the memoized collection.
        assert!(store.indexes("p-1").await.unwrap().is_empty());
        assert_eq!(api.list_indexes_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cached_reads_do_not_refetch() {
        let api = Arc::new(FakeApi::new());
        api.set_jobs(vec![job("j-1", "p-1", JobStatus::Completed)]);
        let store = EntityStore::new(api.clone());

        store.jobs("p-1").await.unwrap();
        store.jobs("p-1").await.unwrap();
        store.jobs("p-1").await.unwrap();
        assert_eq!(api.list_jobs_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_delete_project_cascades_invalidation() {
        let api = Arc::new(FakeApi::new());
        api.projects.lock().unwrap().push(project("p-1", "Docs"));
        api.set_jobs(vec![job("j-1", "p-1", JobStatus::Completed)]);
        api.set_indexes(vec![index("i-1", "p-1", IndexStatus::Synced)]);
        let store = EntityStore::new(api.clone());

        store.projects().await.unwrap();
        store.jobs("p-1").await.unwrap();
        store.indexes("p-1").await.unwrap();

        store.delete_project("p-1").await.unwrap();

        store.projects().await.unwrap();
        store.jobs("p-1").await.unwrap();
        store.indexes("p-1").await.unwrap();
        assert_eq!(api.list_projects_calls.load(Ordering::SeqCst), 2);
        assert_eq!(api.list_jobs_calls.load(Ordering::SeqCst), 2);
        assert_eq!(api.list_indexes_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_create_index_rejects_more_than_five_jobs_locally() {
        let api = Arc::new(FakeApi::new());
        let store = EntityStore::new(api.clone());

        let job_ids: Vec<String> = (0..6).map(|i| format!("j-{}", i)).collect();
        let err = store
            .create_index("p-1", "big", "", &job_ids)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        // Nothing was sent to the server.
        assert_eq!(api.create_index_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_create_index_rejects_empty_selection() {
        let api = Arc::new(FakeApi::new());
        let store = EntityStore::new(api.clone());

        let err = store.create_index("p-1", "empty", "", &[]).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(api.create_index_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_project_absence_is_cached_not_an_error() {
        let api = Arc::new(FakeApi::new());
        let store = EntityStore::new(api.clone());

        let project = store.project("missing").await.unwrap();
        assert!(project.is_none());
    }

    #[tokio::test]
    async fn test_create_project_invalidates_projects_collection() {
        let api = Arc::new(FakeApi::new());
        let store = EntityStore::new(api.clone());

        assert!(store.projects().await.unwrap().is_empty());
        store.create_project("Docs", "d").await.unwrap();

        let projects = store.projects().await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "Docs");
        assert_eq!(projects[0].jobs_count, 0);
        assert_eq!(api.list_projects_calls.load(Ordering::SeqCst), 2);
    }
}
