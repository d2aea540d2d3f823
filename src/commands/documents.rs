//! Document (ingestion job) commands implementation

use crate::error::{Error, Result};
use crate::models::Job;
use crate::store::EntityStore;
use std::path::Path;
use tracing::info;
use url::Url;

pub async fn cmd_list_jobs(store: &EntityStore, project_id: &str) -> Result<Vec<Job>> {
    info!("Listing documents for project {}", project_id);
    let jobs = store.jobs(project_id).await?;
    Ok(jobs.as_ref().clone())
}

/// Upload a local PDF. The server parses it asynchronously; the new job
/// shows up in the next document listing.
pub async fn cmd_upload_pdf(store: &EntityStore, project_id: &str, path: &Path) -> Result<String> {
    let is_pdf = path
        .extension()
        .map_or(false, |e| e.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        return Err(Error::Validation(format!(
            "only PDF files can be uploaded: {}",
            path.display()
        )));
    }

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::Validation(format!("invalid file name: {}", path.display())))?
        .to_string();

    info!("Uploading {} to project {}", filename, project_id);
    let bytes = tokio::fs::read(path).await?;
    store.upload_pdf(project_id, &filename, bytes).await?;
    Ok(filename)
}

pub async fn cmd_scrape_url(store: &EntityStore, project_id: &str, url: &str) -> Result<()> {
    Url::parse(url)?;
    info!("Scraping {} into project {}", url, project_id);
    store.scrape_url(project_id, url).await
}

pub async fn cmd_add_manual(
    store: &EntityStore,
    project_id: &str,
    title: &str,
    content: &str,
) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::Validation("content title cannot be empty".to_string()));
    }
    info!("Adding manual content '{}' to project {}", title, project_id);
    store.add_manual_content(project_id, title, content).await
}

/// Extracted markdown for a completed job.
pub async fn cmd_job_content(store: &EntityStore, job_id: &str) -> Result<String> {
    info!("Fetching content for job {}", job_id);
    let content = store.job_content(job_id).await?;
    Ok(content.as_ref().clone())
}

pub async fn cmd_delete_job(store: &EntityStore, project_id: &str, job_id: &str) -> Result<()> {
    info!("Deleting job {} from project {}", job_id, project_id);
    store.delete_job(project_id, job_id).await
}

/// Print document list to console
pub fn print_jobs(jobs: &[Job]) {
    println!("\n📄 Documents\n");

    if jobs.is_empty() {
        println!("No documents. Use 'kbctl doc upload|scrape|add' to ingest one.");
        return;
    }

    for job in jobs {
        println!(
            "{} {} [{}] {}",
            job.status.symbol(),
            job.filename,
            job.kind.as_str(),
            job.status.as_str()
        );
        println!("  ID: {}", job.id);
        println!(
            "  Size: {}, Markdown: {}",
            format_size(job.file_size),
            format_size(job.markdown_size)
        );
        if let Some(error) = &job.error {
            println!("  Error: {}", error);
        }
        println!("  Updated: {}", job.updated_at.format("%Y-%m-%d %H:%M"));
        println!();
    }
}

pub fn format_size(bytes: u64) -> String {
    if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::FakeApi;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_upload_rejects_non_pdf() {
        let store = EntityStore::new(Arc::new(FakeApi::new()));
        let err = cmd_upload_pdf(&store, "p-1", Path::new("notes.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_scrape_rejects_malformed_url() {
        let store = EntityStore::new(Arc::new(FakeApi::new()));
        let err = cmd_scrape_url(&store, "p-1", "example dot com")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UrlParse(_)));
    }

    #[tokio::test]
    async fn test_manual_content_requires_title() {
        let store = EntityStore::new(Arc::new(FakeApi::new()));
        let err = cmd_add_manual(&store, "p-1", "", "body").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_format_size_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3_145_728), "3.0 MB");
    }
}
