//! Normalized entity types for the knowledge base service.
//!
//! The wire shapes returned by the service are inconsistent across its
//! evolving API (mixed-case statuses, legacy type names, a `failed` status
//! that may or may not mean a failed sync). All of that is absorbed here so
//! the rest of the crate only ever sees these types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Processing status of an ingestion job. Transitions happen server-side
/// only; the client never writes a status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Completed,
    Parsing,
    Processing,
    Failed,
    /// An unrecognized wire value, case-folded and carried as-is.
    /// Never transient, never a crash.
    #[serde(untagged)]
    Other(String),
}

impl JobStatus {
    /// Case-fold a wire status into the known vocabulary.
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "completed" => JobStatus::Completed,
            "parsing" => JobStatus::Parsing,
            "processing" => JobStatus::Processing,
            "failed" => JobStatus::Failed,
            other => JobStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Completed => "completed",
            JobStatus::Parsing => "parsing",
            JobStatus::Processing => "processing",
            JobStatus::Failed => "failed",
            JobStatus::Other(s) => s,
        }
    }

    /// Server-side work still in progress?
    pub fn is_transient(&self) -> bool {
        matches!(self, JobStatus::Parsing | JobStatus::Processing)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            JobStatus::Completed => "✓",
            JobStatus::Parsing | JobStatus::Processing => "⟳",
            JobStatus::Failed => "✗",
            JobStatus::Other(_) => "?",
        }
    }
}

/// Kind of ingested document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Pdf,
    Web,
    Manual,
}

impl JobType {
    /// `file` is the legacy wire name for PDF uploads; anything
    /// unrecognized defaults to manual content.
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "file" | "pdf" => JobType::Pdf,
            "web" => JobType::Web,
            _ => JobType::Manual,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Pdf => "pdf",
            JobType::Web => "web",
            JobType::Manual => "manual",
        }
    }
}

/// Sync status of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStatus {
    Created,
    Syncing,
    Synced,
    Failed,
    SyncFailed,
}

impl IndexStatus {
    /// Derive the effective status from the raw wire value.
    ///
    /// Unrecognized values collapse to `created`. A raw `failed` with a
    /// sync error message present means an attempted sync errored out, which
    /// is reported as `sync_failed` to distinguish it from an index that
    /// never synced successfully for other reasons.
    pub fn normalize(raw: &str, sync_error: Option<&str>) -> Self {
        let status = match raw.to_ascii_lowercase().as_str() {
            "created" => IndexStatus::Created,
            "syncing" => IndexStatus::Syncing,
            "synced" => IndexStatus::Synced,
            "failed" => IndexStatus::Failed,
            "sync_failed" => IndexStatus::SyncFailed,
            _ => IndexStatus::Created,
        };

        if status == IndexStatus::Failed && sync_error.is_some_and(|e| !e.is_empty()) {
            return IndexStatus::SyncFailed;
        }
        status
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IndexStatus::Created => "created",
            IndexStatus::Syncing => "syncing",
            IndexStatus::Synced => "synced",
            IndexStatus::Failed => "failed",
            IndexStatus::SyncFailed => "sync_failed",
        }
    }

    /// A sync is still running server-side?
    pub fn is_transient(&self) -> bool {
        matches!(self, IndexStatus::Syncing)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            IndexStatus::Created => "•",
            IndexStatus::Syncing => "⟳",
            IndexStatus::Synced => "✓",
            IndexStatus::Failed | IndexStatus::SyncFailed => "✗",
        }
    }
}

/// A project groups ingestion jobs and searchable indexes.
/// Counts are server-computed snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub jobs_count: u64,
    pub indexes_count: u64,
}

/// One ingested source document undergoing asynchronous processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub project_id: String,
    pub filename: String,
    pub status: JobStatus,
    pub file_size: u64,
    pub kind: JobType,
    pub markdown_size: u64,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A named collection of up to 5 completed jobs, queryable once synced.
/// `job_ids` membership is fixed at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectIndex {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub description: String,
    pub job_ids: Vec<String>,
    pub status: IndexStatus,
    pub synced: bool,
    pub embedding_model: Option<String>,
    pub chunks_count: u64,
    pub embedding_dimension: Option<u64>,
    pub sync_started_at: Option<DateTime<Utc>>,
    pub sync_completed_at: Option<DateTime<Utc>>,
    pub sync_failed_at: Option<DateTime<Utc>>,
    pub sync_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One semantic search hit, highest relevance first in server order.
/// Ephemeral; never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub score: f32,
    pub text: String,
    pub document_source: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_case_folding() {
        assert_eq!(JobStatus::parse("Processing"), JobStatus::Processing);
        assert_eq!(JobStatus::parse("COMPLETED"), JobStatus::Completed);
        assert_eq!(JobStatus::parse("parsing"), JobStatus::Parsing);
        assert!(JobStatus::parse("Processing").is_transient());
        assert!(!JobStatus::parse("Failed").is_transient());
    }

    #[test]
    fn test_job_status_unknown_is_carried_and_non_transient() {
        let status = JobStatus::parse("Queued");
        assert_eq!(status, JobStatus::Other("queued".to_string()));
        assert_eq!(status.as_str(), "queued");
        assert!(!status.is_transient());
    }

    #[test]
    fn test_job_status_parse_is_idempotent() {
        for raw in ["Completed", "PARSING", "processing", "failed", "weird"] {
            let once = JobStatus::parse(raw);
            let twice = JobStatus::parse(once.as_str());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_job_type_legacy_file_maps_to_pdf() {
        assert_eq!(JobType::parse("file"), JobType::Pdf);
        assert_eq!(JobType::parse("PDF"), JobType::Pdf);
        assert_eq!(JobType::parse("Web"), JobType::Web);
        assert_eq!(JobType::parse("something-new"), JobType::Manual);
    }

    #[test]
    fn test_index_status_failed_with_sync_error_remaps() {
        assert_eq!(
            IndexStatus::normalize("failed", Some("embedding backend down")),
            IndexStatus::SyncFailed
        );
        assert_eq!(IndexStatus::normalize("failed", None), IndexStatus::Failed);
        assert_eq!(
            IndexStatus::normalize("failed", Some("")),
            IndexStatus::Failed
        );
    }

    #[test]
    fn test_index_status_unknown_defaults_to_created() {
        assert_eq!(IndexStatus::normalize("pending", None), IndexStatus::Created);
        assert_eq!(IndexStatus::normalize("", None), IndexStatus::Created);
    }

    #[test]
    fn test_index_status_normalize_is_idempotent() {
        // A second pass over an already-normalized record must not remap
        // sync_failed any further, even though sync_error is still present.
        let once = IndexStatus::normalize("failed", Some("boom"));
        let twice = IndexStatus::normalize(once.as_str(), Some("boom"));
        assert_eq!(once, twice);

        for raw in ["created", "syncing", "synced", "failed", "sync_failed", "??"] {
            let once = IndexStatus::normalize(raw, None);
            assert_eq!(once, IndexStatus::normalize(once.as_str(), None));
        }
    }

    #[test]
    fn test_index_status_case_folding() {
        assert_eq!(IndexStatus::normalize("Syncing", None), IndexStatus::Syncing);
        assert!(IndexStatus::normalize("SYNCING", None).is_transient());
        assert!(!IndexStatus::normalize("Synced", None).is_transient());
    }
}
