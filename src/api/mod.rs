//! HTTP client for the knowledge base service.
//!
//! All fifteen service operations live behind the [`KnowledgeBaseApi`]
//! trait; [`ApiClient`] is the reqwest implementation. The cache layer only
//! ever talks to the trait, so tests can swap in an in-process fake.

mod wire;

use crate::config::{Config, SyncConfig};
use crate::error::{Error, Result};
use crate::models::{Job, Project, ProjectIndex, SearchResult};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;
use wire::*;

/// Parameters for triggering an index sync.
#[derive(Debug, Clone)]
pub struct SyncParams {
    pub embedding_model: String,
    pub chunk_ratio: f64,
    pub overlap_ratio: f64,
}

impl From<&SyncConfig> for SyncParams {
    fn from(config: &SyncConfig) -> Self {
        Self {
            embedding_model: config.embedding_model.clone(),
            chunk_ratio: config.chunk_ratio,
            overlap_ratio: config.overlap_ratio,
        }
    }
}

/// The full operation surface of the knowledge base service.
///
/// Implementors return normalized `crate::models` types; wire quirks never
/// escape this boundary.
#[async_trait]
pub trait KnowledgeBaseApi: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<Project>>;
    async fn create_project(&self, name: &str, description: &str) -> Result<Project>;
    /// `Ok(None)` when the project does not exist; errors are reserved for
    /// transport and API failures.
    async fn get_project(&self, project_id: &str) -> Result<Option<Project>>;
    async fn delete_project(&self, project_id: &str) -> Result<()>;

    async fn list_jobs(&self, project_id: &str) -> Result<Vec<Job>>;
    async fn upload_pdf(&self, project_id: &str, filename: &str, bytes: Vec<u8>) -> Result<()>;
    async fn scrape_url(&self, project_id: &str, url: &str) -> Result<()>;
    async fn add_manual_content(&self, project_id: &str, title: &str, content: &str)
        -> Result<()>;
    async fn get_job_content(&self, job_id: &str) -> Result<String>;
    async fn delete_job(&self, job_id: &str) -> Result<()>;

    async fn list_indexes(&self, project_id: &str) -> Result<Vec<ProjectIndex>>;
    async fn create_index(
        &self,
        project_id: &str,
        name: &str,
        description: &str,
        job_ids: &[String],
    ) -> Result<ProjectIndex>;
    async fn sync_index(&self, index_id: &str, params: &SyncParams) -> Result<()>;
    async fn query_index(&self, index_id: &str, query: &str, top_k: usize)
        -> Result<Vec<SearchResult>>;
    async fn delete_index(&self, index_id: &str) -> Result<()>;
}

/// reqwest-backed client for the service's JSON-over-HTTPS API.
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.service_url,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("Invalid service URL: {}", e)))
    }

    /// Send a request and decode the response envelope.
    ///
    /// The envelope's own `status` field decides success, independent of the
    /// HTTP status code; a non-2xx response without a decodable envelope is
    /// a transport failure.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Envelope<T>> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        match serde_json::from_slice::<Envelope<T>>(&body) {
            Ok(envelope) => Ok(envelope),
            Err(_) if !status.is_success() => {
                Err(Error::Transport(format!("Service returned HTTP {}", status)))
            }
            Err(e) => Err(Error::Json(e)),
        }
    }
}

#[async_trait]
impl KnowledgeBaseApi for ApiClient {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        let url = self.endpoint("/api/projects/")?;
        let envelope: Envelope<Vec<WireProject>> = self.execute(self.client.get(url)).await?;
        let projects = envelope.into_data()?;
        Ok(projects.into_iter().map(WireProject::into_model).collect())
    }

    async fn create_project(&self, name: &str, description: &str) -> Result<Project> {
        let url = self.endpoint("/api/projects/")?;
        let body = CreateProjectRequest { name, description };
        let envelope: Envelope<WireProject> =
            self.execute(self.client.post(url).json(&body)).await?;
        Ok(envelope.into_data()?.into_model())
    }

    async fn get_project(&self, project_id: &str) -> Result<Option<Project>> {
        let url = self.endpoint(&format!("/api/projects/{}", project_id))?;
        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let status = response.status();
        let body = response.bytes().await?;
        let envelope: Envelope<WireProject> = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(Error::Transport(format!("Service returned HTTP {}", status)))
            }
            Err(e) => return Err(Error::Json(e)),
        };
        Ok(Some(envelope.into_data()?.into_model()))
    }

    async fn delete_project(&self, project_id: &str) -> Result<()> {
        let url = self.endpoint(&format!("/api/projects/{}", project_id))?;
        let envelope: Envelope<serde_json::Value> = self.execute(self.client.delete(url)).await?;
        envelope.into_ack()
    }

    async fn list_jobs(&self, project_id: &str) -> Result<Vec<Job>> {
        let url = self.endpoint(&format!("/api/projects/{}/jobs", project_id))?;
        let envelope: Envelope<JobsPayload> = self.execute(self.client.get(url)).await?;
        let payload = envelope.into_data()?;
        Ok(payload.jobs.into_iter().map(WireJob::into_model).collect())
    }

    async fn upload_pdf(&self, project_id: &str, filename: &str, bytes: Vec<u8>) -> Result<()> {
        let url = self.endpoint(&format!("/api/documents/{}/upload", project_id))?;
        let mime = mime_guess::from_path(filename).first_or_octet_stream();
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime.essence_str())?;
        let form = reqwest::multipart::Form::new().part("file", part);
        let envelope: Envelope<serde_json::Value> =
            self.execute(self.client.post(url).multipart(form)).await?;
        envelope.into_ack()
    }

    async fn scrape_url(&self, project_id: &str, url_to_scrape: &str) -> Result<()> {
        let url = self.endpoint("/api/documents/scrap-url")?;
        let body = ScrapeUrlRequest {
            project_id,
            url: url_to_scrape,
        };
        let envelope: Envelope<serde_json::Value> =
            self.execute(self.client.post(url).json(&body)).await?;
        envelope.into_ack()
    }

    async fn add_manual_content(
        &self,
        project_id: &str,
        title: &str,
        content: &str,
    ) -> Result<()> {
        let url = self.endpoint("/api/documents/content")?;
        let body = ManualContentRequest {
            project_id,
            title,
            content,
        };
        let envelope: Envelope<serde_json::Value> =
            self.execute(self.client.post(url).json(&body)).await?;
        envelope.into_ack()
    }

    async fn get_job_content(&self, job_id: &str) -> Result<String> {
        let url = self.endpoint(&format!("/api/documents/jobs/{}/content", job_id))?;
        let envelope: Envelope<ContentPayload> = self.execute(self.client.get(url)).await?;
        Ok(envelope.into_data()?.content)
    }

    async fn delete_job(&self, job_id: &str) -> Result<()> {
        let url = self.endpoint(&format!("/api/documents/jobs/{}", job_id))?;
        let envelope: Envelope<serde_json::Value> = self.execute(self.client.delete(url)).await?;
        envelope.into_ack()
    }

    async fn list_indexes(&self, project_id: &str) -> Result<Vec<ProjectIndex>> {
        let url = self.endpoint(&format!("/api/indexes/{}/", project_id))?;
        let envelope: Envelope<IndexesPayload> = self.execute(self.client.get(url)).await?;
        let payload = envelope.into_data()?;
        Ok(payload
            .indexes
            .into_iter()
            .map(WireIndex::into_model)
            .collect())
    }

    async fn create_index(
        &self,
        project_id: &str,
        name: &str,
        description: &str,
        job_ids: &[String],
    ) -> Result<ProjectIndex> {
        let url = self.endpoint(&format!("/api/indexes/{}/create", project_id))?;
        let body = CreateIndexRequest {
            name,
            description,
            job_ids,
        };
        let envelope: Envelope<WireIndex> = self.execute(self.client.post(url).json(&body)).await?;
        Ok(envelope.into_data()?.into_model())
    }

    async fn sync_index(&self, index_id: &str, params: &SyncParams) -> Result<()> {
        let url = self.endpoint("/api/indexes/sync")?;
        let body = SyncIndexRequest {
            index_id,
            embedding_model: &params.embedding_model,
            chunk_ratio: params.chunk_ratio,
            overlap_ratio: params.overlap_ratio,
        };
        let envelope: Envelope<serde_json::Value> =
            self.execute(self.client.post(url).json(&body)).await?;
        envelope.into_ack()
    }

    async fn query_index(
        &self,
        index_id: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let url = self.endpoint("/api/indexes/query")?;
        let body = QueryIndexRequest {
            index_id,
            query,
            top_k,
        };
        let envelope: Envelope<QueryPayload> =
            self.execute(self.client.post(url).json(&body)).await?;
        // Server order is relevance order; never re-sort.
        Ok(envelope.into_data()?.results)
    }

    async fn delete_index(&self, index_id: &str) -> Result<()> {
        let url = self.endpoint(&format!("/api/indexes/{}", index_id))?;
        let envelope: Envelope<serde_json::Value> = self.execute(self.client.delete(url)).await?;
        envelope.into_ack()
    }
}
