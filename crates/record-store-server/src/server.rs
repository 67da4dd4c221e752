// crates/record-store-server/src/server.rs
// ============================================================================
// Module: HTTP Server
// Description: Axum transport exposing the store verbs over JSON.
// Purpose: Parse untrusted bodies, dispatch verbs, and map errors uniformly.
// Dependencies: axum, record-store-core, record-store-sqlite, serde_json, thiserror, tokio
// ============================================================================

//! ## Overview
//! The server exposes one POST route per verb under `/data/store/v1/`.
//! Request bodies are untrusted: size is checked before parsing, parse
//! failures return 400, and every backend failure surfaces as a generic 500
//! with the stable code `server_error` and no operation-specific
//! diagnostics. The backend is chosen once at startup from configuration and
//! injected into the service; handlers never branch on backend type.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::post;
use record_store_core::FileRecordStore;
use record_store_core::SharedRecordStore;
use record_store_core::StoreError;
use record_store_sqlite::SqliteRecordStore;
use record_store_sqlite::SqliteStoreConfig;
use thiserror::Error;

use crate::config::BackendSelection;
use crate::config::ServerConfig;
use crate::service::OperationOutput;
use crate::service::StoreService;
use crate::wire::ErrorBody;
use crate::wire::ResponseEnvelope;
use crate::wire::StoreRequest;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Server startup and transport errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Backend initialization failed.
    #[error("store initialization failed: {0}")]
    Store(String),
    /// The transport could not bind or serve.
    #[error("transport failed: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Shared state for the verb handlers.
#[derive(Clone)]
struct ServerState {
    /// Verb implementations over the injected backend.
    service: StoreService,
    /// Maximum allowed request body size.
    max_body_bytes: usize,
}

/// Builds the storage backend selected by configuration.
///
/// # Errors
///
/// Returns [`ServerError`] when the backend cannot be initialized.
pub fn build_record_store(selection: &BackendSelection) -> Result<SharedRecordStore, ServerError> {
    match selection {
        BackendSelection::File(path) => {
            Ok(SharedRecordStore::from_store(FileRecordStore::open(path.clone())))
        }
        BackendSelection::Sqlite(path) => {
            let store = SqliteRecordStore::new(&SqliteStoreConfig::new(path.clone()))
                .map_err(|err| ServerError::Store(err.to_string()))?;
            Ok(SharedRecordStore::from_store(store))
        }
    }
}

/// Builds the verb router over the given state.
fn build_router(state: Arc<ServerState>) -> Router {
    Router::new().route("/data/store/v1/{verb}", post(handle_verb)).with_state(state)
}

/// Runs the server until the listener fails.
///
/// # Errors
///
/// Returns [`ServerError`] when the backend cannot be initialized or the
/// listener cannot bind.
pub async fn serve(config: ServerConfig) -> Result<(), ServerError> {
    let store = build_record_store(&config.backend)?;
    let state = Arc::new(ServerState {
        service: StoreService::new(store),
        max_body_bytes: config.max_body_bytes,
    });
    let app = build_router(state);
    emit_startup_notes(&config);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|err| ServerError::Transport(format!("bind failed: {err}")))?;
    axum::serve(listener, app)
        .await
        .map_err(|_| ServerError::Transport("http server failed".to_string()))
}

/// Reports the listen address and backend selection on stderr.
fn emit_startup_notes(config: &ServerConfig) {
    let _ = write_stderr_line(&format!("record-store: listening on {}", config.bind));
    let note = match &config.backend {
        BackendSelection::File(path) => {
            format!("record-store: using local file store at {}", path.display())
        }
        BackendSelection::Sqlite(path) => {
            format!("record-store: using sqlite store at {}", path.display())
        }
    };
    let _ = write_stderr_line(&note);
}

/// Writes one line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Handles one verb request end to end.
async fn handle_verb(
    State(state): State<Arc<ServerState>>,
    Path(verb): Path<String>,
    bytes: Bytes,
) -> Response {
    handle_request(&state, &verb, &bytes)
}

/// Parses, dispatches, and encodes one request.
fn handle_request(state: &ServerState, verb: &str, bytes: &Bytes) -> Response {
    if bytes.len() > state.max_body_bytes {
        return error_response(StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large");
    }
    let Ok(request) = serde_json::from_slice::<StoreRequest>(bytes.as_ref()) else {
        return error_response(StatusCode::BAD_REQUEST, "invalid_request");
    };
    let Some(outcome) = dispatch_with_blocking(&state.service, verb, &request) else {
        return error_response(StatusCode::NOT_FOUND, "unknown_operation");
    };
    match outcome {
        Ok((records, page)) => {
            (StatusCode::OK, axum::Json(ResponseEnvelope::from_records(&records, page)))
                .into_response()
        }
        Err(err) => {
            let _ = write_stderr_line(&format!("record-store: request failed: {err}"));
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "server_error")
        }
    }
}

/// Builds a non-2xx response with a stable error code.
fn error_response(status: StatusCode, code: &'static str) -> Response {
    (
        status,
        axum::Json(ErrorBody {
            error: code,
        }),
    )
        .into_response()
}

/// Dispatches a verb, shifting to a blocking context when available.
///
/// Store backends do synchronous I/O, so on a multi-threaded runtime the
/// call moves off the async worker.
fn dispatch_with_blocking(
    service: &StoreService,
    verb: &str,
    request: &StoreRequest,
) -> Option<Result<OperationOutput, StoreError>> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| dispatch(service, verb, request))
        }
        _ => dispatch(service, verb, request),
    }
}

/// Routes a verb name to its service implementation.
fn dispatch(
    service: &StoreService,
    verb: &str,
    request: &StoreRequest,
) -> Option<Result<OperationOutput, StoreError>> {
    match verb {
        "all" => Some(service.all(request)),
        "insert" => Some(service.insert(request)),
        "get" => Some(service.get(request)),
        "set" => Some(service.set(request)),
        "delete" => Some(service.delete(request)),
        "mget" => Some(service.mget(request)),
        "mset" => Some(service.mset(request)),
        "list" => Some(service.list(request)),
        "increase_counter" => Some(service.increase_counter(request)),
        "purge" => Some(service.purge(request)),
        "count_ranked_list" => Some(service.count_ranked_list(request)),
        _ => None,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
