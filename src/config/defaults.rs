//! Default values for configuration

/// Default knowledge base service base URL
pub fn default_service_url() -> String {
    std::env::var("KB_SERVICE_URL")
        .unwrap_or_else(|_| "https://abubasith86-knowledgebase-service.hf.space".to_string())
}

/// Default request timeout in seconds
pub fn default_request_timeout() -> u64 {
    30
}

/// Default poll interval for job collections (seconds)
pub fn default_jobs_poll_interval() -> u64 {
    3
}

/// Default poll interval for index collections (seconds)
pub fn default_indexes_poll_interval() -> u64 {
    5
}

/// Default embedding model requested when triggering an index sync
pub fn default_sync_embedding_model() -> String {
    "nvidia/llama-3.2-nv-embedqa-1b-v2".to_string()
}

/// Default chunk ratio for index sync
pub fn default_sync_chunk_ratio() -> f64 {
    0.8
}

/// Default overlap ratio for index sync
pub fn default_sync_overlap_ratio() -> f64 {
    0.2
}

/// Default number of query results
pub fn default_query_top_k() -> usize {
    5
}
