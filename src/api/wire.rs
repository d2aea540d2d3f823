//! Wire-level request and response shapes for the knowledge base service.
//!
//! Every response is wrapped in a `{status, data?, error?}` envelope; a
//! non-"success" status is a logical failure regardless of the HTTP status
//! code. The raw record shapes are normalized into `crate::models` here and
//! nowhere else.

use crate::error::{Error, Result};
use crate::models::{IndexStatus, Job, JobStatus, JobType, Project, ProjectIndex, SearchResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub(crate) struct Envelope<T> {
    pub status: String,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn into_data(self) -> Result<T> {
        if self.status == "success" {
            self.data
                .ok_or_else(|| Error::Api("Response envelope is missing data".to_string()))
        } else {
            Err(Error::Api(self.error.unwrap_or_else(|| {
                "An unknown API error occurred".to_string()
            })))
        }
    }

    /// Acknowledge-only responses may omit `data` entirely.
    pub fn into_ack(self) -> Result<()> {
        if self.status == "success" {
            Ok(())
        } else {
            Err(Error::Api(self.error.unwrap_or_else(|| {
                "An unknown API error occurred".to_string()
            })))
        }
    }
}

// --- Response records ---

/// Project record as returned by the service. Note `project_id`, not `id`.
#[derive(Debug, Deserialize)]
pub(crate) struct WireProject {
    pub project_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub jobs_count: u64,
    #[serde(default)]
    pub indexes_count: u64,
}

impl WireProject {
    pub fn into_model(self) -> Project {
        Project {
            id: self.project_id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            jobs_count: self.jobs_count,
            indexes_count: self.indexes_count,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireJob {
    pub id: String,
    pub project_id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub file_size: u64,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub markdown_size: u64,
    #[serde(default)]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WireJob {
    pub fn into_model(self) -> Job {
        // A job record without a status has failed in a way the service
        // could not report; a record without a type is manual content.
        let status = match self.status.as_deref() {
            Some(raw) => JobStatus::parse(raw),
            None => JobStatus::Failed,
        };
        let kind = match self.kind.as_deref() {
            Some(raw) => JobType::parse(raw),
            None => JobType::Manual,
        };
        Job {
            id: self.id,
            project_id: self.project_id,
            filename: self.filename,
            status,
            file_size: self.file_size,
            kind,
            markdown_size: self.markdown_size,
            error: self.error,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireIndex {
    pub id: String,
    pub project_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub job_ids: Vec<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub synced: bool,
    #[serde(default)]
    pub embedding_model: Option<String>,
    #[serde(default)]
    pub chunks_count: u64,
    #[serde(default)]
    pub embedding_dimension: Option<u64>,
    #[serde(default)]
    pub sync_started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sync_completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sync_failed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sync_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WireIndex {
    pub fn into_model(self) -> ProjectIndex {
        let status = IndexStatus::normalize(
            self.status.as_deref().unwrap_or("created"),
            self.sync_error.as_deref(),
        );
        ProjectIndex {
            id: self.id,
            project_id: self.project_id,
            name: self.name,
            description: self.description,
            job_ids: self.job_ids,
            status,
            synced: self.synced,
            embedding_model: self.embedding_model,
            chunks_count: self.chunks_count,
            embedding_dimension: self.embedding_dimension,
            sync_started_at: self.sync_started_at,
            sync_completed_at: self.sync_completed_at,
            sync_failed_at: self.sync_failed_at,
            sync_error: self.sync_error,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

// --- Collection payloads ---

#[derive(Debug, Deserialize)]
pub(crate) struct JobsPayload {
    #[serde(default)]
    pub jobs: Vec<WireJob>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IndexesPayload {
    #[serde(default)]
    pub indexes: Vec<WireIndex>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentPayload {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueryPayload {
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

// --- Request bodies ---

#[derive(Debug, Serialize)]
pub(crate) struct CreateProjectRequest<'a> {
    pub name: &'a str,
    pub description: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ScrapeUrlRequest<'a> {
    pub project_id: &'a str,
    pub url: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ManualContentRequest<'a> {
    pub project_id: &'a str,
    pub title: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateIndexRequest<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub job_ids: &'a [String],
}

#[derive(Debug, Serialize)]
pub(crate) struct SyncIndexRequest<'a> {
    pub index_id: &'a str,
    pub embedding_model: &'a str,
    pub chunk_ratio: f64,
    pub overlap_ratio: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct QueryIndexRequest<'a> {
    pub index_id: &'a str,
    pub query: &'a str,
    pub top_k: usize,
}
