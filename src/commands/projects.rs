//! Project commands implementation

use crate::error::{Error, Result};
use crate::models::Project;
use crate::store::EntityStore;
use tracing::info;

pub async fn cmd_list_projects(store: &EntityStore) -> Result<Vec<Project>> {
    info!("Listing projects");
    let projects = store.projects().await?;
    Ok(projects.as_ref().clone())
}

pub async fn cmd_create_project(
    store: &EntityStore,
    name: &str,
    description: &str,
) -> Result<Project> {
    if name.trim().is_empty() {
        return Err(Error::Validation("project name cannot be empty".to_string()));
    }
    info!("Creating project '{}'", name);
    store.create_project(name, description).await
}

/// Look up one project; a missing id is an error at the CLI surface even
/// though the store models absence as a cacheable `None`.
pub async fn cmd_show_project(store: &EntityStore, project_id: &str) -> Result<Project> {
    info!("Fetching project {}", project_id);
    let project = store.project(project_id).await?;
    project
        .as_ref()
        .clone()
        .ok_or_else(|| Error::ProjectNotFound(project_id.to_string()))
}

pub async fn cmd_delete_project(store: &EntityStore, project_id: &str) -> Result<()> {
    info!("Deleting project {}", project_id);
    store.delete_project(project_id).await
}

/// Print projects list to console
pub fn print_projects(projects: &[Project]) {
    println!("\n📁 Projects\n");

    if projects.is_empty() {
        println!("No projects yet. Use 'kbctl project create <name>' to add one.");
        return;
    }

    for project in projects {
        println!("• {} ({})", project.name, project.id);
        if !project.description.is_empty() {
            println!("  {}", project.description);
        }
        println!(
            "  Documents: {}, Indexes: {}",
            project.jobs_count, project.indexes_count
        );
        println!("  Created: {}", project.created_at.format("%Y-%m-%d %H:%M"));
        println!();
    }
}

pub fn print_project(project: &Project) {
    println!("\n📁 {}\n", project.name);
    println!("ID: {}", project.id);
    if !project.description.is_empty() {
        println!("Description: {}", project.description);
    }
    println!("Documents: {}", project.jobs_count);
    println!("Indexes: {}", project.indexes_count);
    println!("Created: {}", project.created_at.format("%Y-%m-%d %H:%M"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::FakeApi;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_show_missing_project_is_not_found() {
        let store = EntityStore::new(Arc::new(FakeApi::new()));
        let err = cmd_show_project(&store, "p-missing").await.unwrap_err();
        assert!(matches!(err, Error::ProjectNotFound(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let store = EntityStore::new(Arc::new(FakeApi::new()));
        let err = cmd_create_project(&store, "  ", "").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_created_project_appears_in_list() {
        let store = EntityStore::new(Arc::new(FakeApi::new()));
        cmd_create_project(&store, "Docs", "product docs").await.unwrap();

        let projects = cmd_list_projects(&store).await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "Docs");
    }
}
