// crates/record-store-server/src/main.rs
// ============================================================================
// Module: Server Entry Point
// Description: Process entry for the record store server.
// Purpose: Load configuration from the environment and run the server.
// Dependencies: record-store-server, tokio
// ============================================================================

//! ## Overview
//! Loads configuration from environment variables and serves until the
//! transport fails. Errors are reported on stderr with a failure exit code.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::process::ExitCode;

use record_store_server::ServerConfig;
use record_store_server::serve;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Server entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            let mut stderr = std::io::stderr();
            let _ = writeln!(&mut stderr, "record-store: {message}");
            ExitCode::FAILURE
        }
    }
}

/// Loads configuration and runs the server.
async fn run() -> Result<(), String> {
    let config = ServerConfig::from_env().map_err(|err| err.to_string())?;
    serve(config).await.map_err(|err| err.to_string())
}
