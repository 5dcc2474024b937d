use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{core_config_from_env, router, AppState, DEFAULT_REST_ADDR};
use codebridge_core::ConversionService;

/// Main entry point for the CodeBridge application
///
/// Loads the terminology table once, then serves the REST API (with Swagger UI at
/// `/swagger-ui`) on `CODEBRIDGE_REST_ADDR` (default: "0.0.0.0:5000").
///
/// # Environment Variables
/// - `CODEBRIDGE_REST_ADDR`: REST server address
/// - `BUNDLE_DATA_DIR`: Directory for bundle files (default: "bundles")
/// - `UPLOAD_DIR`: Directory for uploaded tables (default: "uploads")
/// - `CODEBRIDGE_MAPPING_FILE`: Terminology source tried before the built-in candidates
/// - `CODEBRIDGE_DEFAULT_COUNTRY`: Address country when the input has none (default: "US")
/// - `CODEBRIDGE_LINK_SUBJECTS`: Point subject references at the row's Patient
/// - `CODEBRIDGE_SYSTEM_<KEY>`: Override a code system URI
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration, startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("codebridge_run=info".parse()?)
                .add_directive("codebridge_core=info".parse()?)
                .add_directive("codebridge_terminology=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr =
        std::env::var("CODEBRIDGE_REST_ADDR").unwrap_or_else(|_| DEFAULT_REST_ADDR.into());

    let cfg = Arc::new(core_config_from_env()?);
    tracing::info!(
        bundle_dir = %cfg.bundle_data_dir().display(),
        upload_dir = %cfg.upload_dir().display(),
        "++ Configuration resolved"
    );

    let service = ConversionService::load(cfg);
    if !service.mapper().has_table() {
        tracing::warn!("Terminology table unavailable; condition codings will carry the primary entry only");
    }

    tracing::info!("++ Starting CodeBridge REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, router(AppState::new(service))).await?;

    Ok(())
}
