//! Query command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::SearchResult;
use crate::store::EntityStore;
use serde::Serialize;
use tracing::info;

/// Query options
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Number of results to return
    pub limit: Option<usize>,
}

/// Query result for CLI display
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub index_id: String,
    pub query: String,
    pub results: Vec<SearchResult>,
}

/// Execute a semantic query against a synced index. An empty result set is
/// a successful outcome, not an error.
pub async fn cmd_query(
    store: &EntityStore,
    config: &Config,
    index_id: &str,
    query: &str,
    options: QueryOptions,
) -> Result<QueryOutcome> {
    if query.trim().is_empty() {
        return Err(Error::Validation("query text cannot be empty".to_string()));
    }

    let top_k = options.limit.unwrap_or(config.query.default_top_k);
    info!("Querying index {} (top {})", index_id, top_k);

    let results = store.query(index_id, query, top_k).await?;
    info!("Returning {} results", results.len());

    Ok(QueryOutcome {
        index_id: index_id.to_string(),
        query: query.to_string(),
        results,
    })
}

/// Print query results to console
pub fn print_query_results(outcome: &QueryOutcome) {
    println!("\n🔍 Results for: {}\n", outcome.query);

    if outcome.results.is_empty() {
        println!("No results found.");
        return;
    }

    for (i, result) in outcome.results.iter().enumerate() {
        println!(
            "{}. [score: {:.3}] {}",
            i + 1,
            result.score,
            result.document_source
        );

        let preview: String = result.text.chars().take(300).collect();
        println!("   {}", preview.replace('\n', "\n   "));
        if result.text.chars().count() > 300 {
            println!("   ...");
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::FakeApi;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_empty_results_are_success() {
        let store = EntityStore::new(Arc::new(FakeApi::new()));
        let config = Config::default();

        let outcome = cmd_query(&store, &config, "i-1", "how do I deploy?", QueryOptions::default())
            .await
            .unwrap();
        assert!(outcome.results.is_empty());
    }

    #[tokio::test]
    async fn test_blank_query_rejected_locally() {
        let store = EntityStore::new(Arc::new(FakeApi::new()));
        let config = Config::default();

        let err = cmd_query(&store, &config, "i-1", "   ", QueryOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
