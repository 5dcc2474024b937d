//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! This binary is useful for development and debugging. The workspace's main `codebridge-run`
//! binary serves the same router.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{core_config_from_env, router, AppState, DEFAULT_REST_ADDR};
use codebridge_core::ConversionService;

/// Main entry point for the CodeBridge REST API server
///
/// # Environment Variables
/// - `CODEBRIDGE_REST_ADDR`: Server address (default: "0.0.0.0:5000")
/// - `BUNDLE_DATA_DIR`, `UPLOAD_DIR`, `CODEBRIDGE_MAPPING_FILE`, `CODEBRIDGE_DEFAULT_COUNTRY`,
///   `CODEBRIDGE_LINK_SUBJECTS`, `CODEBRIDGE_SYSTEM_<KEY>`: see [`core_config_from_env`]
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration is invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("codebridge_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("CODEBRIDGE_REST_ADDR").unwrap_or_else(|_| DEFAULT_REST_ADDR.into());

    tracing::info!("-- Starting CodeBridge REST API on {}", addr);

    let cfg = Arc::new(core_config_from_env()?);
    let service = ConversionService::load(cfg);
    let app = router(AppState::new(service));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
