//! Status command implementation

use crate::config::Config;
use crate::error::Result;
use crate::store::EntityStore;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Status information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusInfo {
    pub config_path: String,
    pub service_url: String,
    pub service_reachable: bool,
    pub project_count: usize,
    pub document_count: u64,
    pub index_count: u64,
}

/// Check service reachability and summarize the account's contents.
pub async fn cmd_status(config: &Config, store: &EntityStore) -> Result<StatusInfo> {
    info!("Getting status");

    let (service_reachable, project_count, document_count, index_count) =
        match store.projects().await {
            Ok(projects) => {
                let documents = projects.iter().map(|p| p.jobs_count).sum();
                let indexes = projects.iter().map(|p| p.indexes_count).sum();
                (true, projects.len(), documents, indexes)
            }
            Err(e) => {
                tracing::debug!("Service unreachable: {:?}", e);
                (false, 0, 0, 0)
            }
        };

    Ok(StatusInfo {
        config_path: config.paths.config_file.display().to_string(),
        service_url: config.service_url.clone(),
        service_reachable,
        project_count,
        document_count,
        index_count,
    })
}

/// Print status to console
pub fn print_status(status: &StatusInfo) {
    println!("\n📊 kbctl Status\n");
    println!("Configuration: {}", status.config_path);
    println!("\nService:");
    println!("  URL: {}", status.service_url);

    let connection_status = if status.service_reachable {
        "✓ Reachable"
    } else {
        "✗ Not reachable"
    };
    println!("  Status: {}", connection_status);

    if status.service_reachable {
        println!("\nContents:");
        println!("  Projects: {}", status.project_count);
        println!("  Documents: {}", status.document_count);
        println!("  Indexes: {}", status.index_count);
    }
}
