//! Index commands implementation

use crate::api::SyncParams;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{JobStatus, ProjectIndex};
use crate::store::EntityStore;
use tracing::info;

/// Overrides for `kbctl index sync`; unset fields fall back to config.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub embedding_model: Option<String>,
    pub chunk_ratio: Option<f64>,
    pub overlap_ratio: Option<f64>,
}

impl SyncOptions {
    pub fn resolve(self, config: &Config) -> SyncParams {
        let mut params = SyncParams::from(&config.sync);
        if let Some(model) = self.embedding_model {
            params.embedding_model = model;
        }
        if let Some(ratio) = self.chunk_ratio {
            params.chunk_ratio = ratio;
        }
        if let Some(ratio) = self.overlap_ratio {
            params.overlap_ratio = ratio;
        }
        params
    }
}

pub async fn cmd_list_indexes(store: &EntityStore, project_id: &str) -> Result<Vec<ProjectIndex>> {
    info!("Listing indexes for project {}", project_id);
    let indexes = store.indexes(project_id).await?;
    Ok(indexes.as_ref().clone())
}

/// Create an index over completed documents. Job ids are checked against the
/// project's document list so the server never sees an unparsed selection.
pub async fn cmd_create_index(
    store: &EntityStore,
    project_id: &str,
    name: &str,
    description: &str,
    job_ids: &[String],
) -> Result<ProjectIndex> {
    if name.trim().is_empty() {
        return Err(Error::Validation("index name cannot be empty".to_string()));
    }

    let jobs = store.jobs(project_id).await?;
    for job_id in job_ids {
        match jobs.iter().find(|j| &j.id == job_id) {
            Some(job) if job.status == JobStatus::Completed => {}
            Some(job) => {
                return Err(Error::Validation(format!(
                    "document {} is not completed (status: {})",
                    job_id,
                    job.status.as_str()
                )))
            }
            None => {
                return Err(Error::Validation(format!(
                    "document {} does not exist in project {}",
                    job_id, project_id
                )))
            }
        }
    }

    info!("Creating index '{}' over {} documents", name, job_ids.len());
    store.create_index(project_id, name, description, job_ids).await
}

pub async fn cmd_sync_index(
    store: &EntityStore,
    config: &Config,
    project_id: &str,
    index_id: &str,
    options: SyncOptions,
) -> Result<()> {
    let params = options.resolve(config);
    info!(
        "Syncing index {} with model {}",
        index_id, params.embedding_model
    );
    store.sync_index(project_id, index_id, &params).await
}

pub async fn cmd_delete_index(
    store: &EntityStore,
    project_id: &str,
    index_id: &str,
) -> Result<()> {
    info!("Deleting index {}", index_id);
    store.delete_index(project_id, index_id).await
}

/// Print index list to console
pub fn print_indexes(indexes: &[ProjectIndex]) {
    println!("\n🗂  Indexes\n");

    if indexes.is_empty() {
        println!("No indexes. Use 'kbctl index create' to build one from completed documents.");
        return;
    }

    for index in indexes {
        println!(
            "{} {} [{}]",
            index.status.symbol(),
            index.name,
            index.status.as_str()
        );
        println!("  ID: {}", index.id);
        println!("  Documents: {}", index.job_ids.len());
        if let Some(model) = &index.embedding_model {
            println!("  Model: {} ({} chunks)", model, index.chunks_count);
        }
        if let Some(error) = &index.sync_error {
            println!("  Sync error: {}", error);
        }
        if let Some(at) = &index.sync_completed_at {
            println!("  Last synced: {}", at.format("%Y-%m-%d %H:%M"));
        }
        println!();
    }
}
