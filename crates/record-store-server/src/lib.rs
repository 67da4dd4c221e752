// crates/record-store-server/src/lib.rs
// ============================================================================
// Module: Record Store Server
// Description: HTTP JSON service exposing the record store verbs.
// Purpose: Wire configuration, backend selection, and verb dispatch together.
// Dependencies: axum, record-store-core, record-store-sqlite, tokio
// ============================================================================

//! ## Overview
//! The server crate binds the core record store to an HTTP transport: one
//! POST route per verb, a uniform response envelope, and a storage backend
//! (single file or `SQLite`) chosen once at startup from the environment.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod server;
pub mod service;
pub mod wire;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::BackendSelection;
pub use config::ConfigError;
pub use config::ServerConfig;
pub use server::ServerError;
pub use server::build_record_store;
pub use server::serve;
pub use service::StoreService;
pub use wire::ResponseEnvelope;
pub use wire::StoreRequest;
