//! kbctl - administrative client for a remote knowledge base service
//!
//! Projects group ingested documents (jobs) and searchable indexes; the
//! service does all parsing, chunking, and embedding behind its HTTP API.
//! This crate provides the typed client, an invalidating entity cache with
//! request de-duplication, a status-driven poll scheduler, and the CLI on
//! top of them.

pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod progress;
pub mod store;
