//! # API REST
//!
//! REST API implementation for CodeBridge.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, multipart upload, CORS)
//!
//! Conversion work runs on the blocking pool; the terminology table and configuration are
//! shared read-only through [`AppState`].

#![warn(rust_2018_idioms)]

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path as AxumPath, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use codebridge_core::{
    config::{
        code_systems_from_env_vars, default_country_from_env_value,
        subject_linking_from_env_value, terminology_candidates_from_env_value,
    },
    constants::{DEFAULT_BUNDLE_DATA_DIR, DEFAULT_UPLOAD_DIR},
    CodeSystem, ConversionOutcome, ConversionService, CoreConfig, CoreError, CoreResult,
    MappingQuery, PatientForm, PreviewRow, SkippedRow, MAX_TABLE_FILE_SIZE,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

/// Default listen address of the REST server.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:5000";

/// Request body limit: the largest accepted table plus room for multipart framing.
const MAX_REQUEST_BODY: usize = MAX_TABLE_FILE_SIZE as usize + 64 * 1024;

/// Application state for the REST API server
///
/// Contains shared state that needs to be accessible to all request handlers.
#[derive(Clone)]
pub struct AppState {
    service: Arc<ConversionService>,
}

impl AppState {
    pub fn new(service: ConversionService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct HealthRes {
    status: String,
    timestamp: String,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorRes {
    error: String,
}

#[derive(Serialize, ToSchema)]
pub struct SkippedRowRes {
    row: usize,
    reason: String,
}

#[derive(Serialize, ToSchema)]
pub struct UploadRes {
    success: bool,
    message: String,
    bundle_id: String,
    resource_count: usize,
    skipped_rows: Vec<SkippedRowRes>,
    /// First rows of the uploaded table, keyed by normalised column name.
    #[schema(value_type = Vec<Object>)]
    data_preview: Vec<PreviewRow>,
}

#[derive(Deserialize, Default, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PatientReq {
    first_name: Option<String>,
    last_name: Option<String>,
    gender: Option<String>,
    birth_date: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
    city: Option<String>,
    state: Option<String>,
    postal_code: Option<String>,
    country: Option<String>,
    condition: Option<String>,
    snomed_code: Option<String>,
    observation: Option<String>,
    /// Measurement value, as text or as a JSON number.
    #[serde(deserialize_with = "text_or_number")]
    value: Option<String>,
    unit: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Int(i64),
    Float(f64),
}

fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(
        Option::<TextOrNumber>::deserialize(deserializer)?.map(|value| match value {
            TextOrNumber::Text(text) => text,
            TextOrNumber::Int(i) => i.to_string(),
            TextOrNumber::Float(f) => f.to_string(),
        }),
    )
}

#[derive(Serialize, ToSchema)]
pub struct PatientRes {
    success: bool,
    message: String,
    bundle_id: String,
    #[schema(value_type = Vec<Object>)]
    resources: Vec<fhir::Resource>,
}

#[derive(Deserialize, Default, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct MapCodesReq {
    disease: Option<String>,
    snomed_code: Option<String>,
    icd11_code: Option<String>,
    ayurveda_code: Option<String>,
    siddha_code: Option<String>,
    unani_code: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct MapCodesRes {
    success: bool,
    #[schema(value_type = Object)]
    mappings: codebridge_core::MappingResult,
    systems: BTreeMap<String, String>,
    #[schema(value_type = Object)]
    condition: codebridge_core::MappedCondition,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        upload,
        create_patient,
        get_bundle,
        download_bundle,
        export_csv,
        map_codes,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        SkippedRowRes,
        UploadRes,
        PatientReq,
        PatientRes,
        MapCodesReq,
        MapCodesRes,
    ))
)]
pub struct ApiDoc;

type ApiError = (StatusCode, Json<ErrorRes>);
type ApiResult<T> = Result<T, ApiError>;

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorRes {
            error: message.into(),
        }),
    )
}

/// Map a core error onto a status code. Input problems are the caller's; the rest are ours.
fn core_error(e: CoreError) -> ApiError {
    match e {
        CoreError::InvalidInput(_) | CoreError::Ingest(_) | CoreError::Uuid(_) => {
            tracing::warn!("Rejected request: {}", e);
            api_error(StatusCode::BAD_REQUEST, e.to_string())
        }
        other => {
            tracing::error!("Request failed: {:?}", other);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

/// Run blocking conversion work off the async runtime.
async fn run_blocking<T, F>(work: F) -> ApiResult<T>
where
    F: FnOnce() -> CoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result.map_err(core_error),
        Err(e) => {
            tracing::error!("Blocking task failed: {:?}", e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal error"))
        }
    }
}

fn not_found() -> ApiError {
    api_error(StatusCode::NOT_FOUND, "Bundle not found")
}

fn skipped_rows(skipped: Vec<SkippedRow>) -> Vec<SkippedRowRes> {
    skipped
        .into_iter()
        .map(|s| SkippedRowRes {
            row: s.row,
            reason: s.reason,
        })
        .collect()
}

/// Build the full application router, Swagger UI included.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/upload", post(upload))
        .route("/api/patient", post(create_patient))
        .route("/api/bundle/:id", get(get_bundle))
        .route("/api/download/:id", get(download_bundle))
        .route("/api/export/:id/csv", get(export_csv))
        .route("/api/map-codes", post(map_codes))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Resolve [`CoreConfig`] from process environment variables.
///
/// Intended to be called once at startup by the server binaries.
pub fn core_config_from_env() -> anyhow::Result<CoreConfig> {
    let bundle_dir =
        std::env::var("BUNDLE_DATA_DIR").unwrap_or_else(|_| DEFAULT_BUNDLE_DATA_DIR.into());
    let upload_dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| DEFAULT_UPLOAD_DIR.into());

    let cfg = CoreConfig::new(
        PathBuf::from(bundle_dir),
        PathBuf::from(upload_dir),
        terminology_candidates_from_env_value(std::env::var("CODEBRIDGE_MAPPING_FILE").ok()),
        code_systems_from_env_vars(std::env::vars()),
        default_country_from_env_value(std::env::var("CODEBRIDGE_DEFAULT_COUNTRY").ok()),
        subject_linking_from_env_value(std::env::var("CODEBRIDGE_LINK_SUBJECTS").ok())?,
    )?;
    Ok(cfg)
}

#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
#[axum::debug_handler]
async fn health() -> Json<HealthRes> {
    Json(HealthRes {
        status: "healthy".into(),
        timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
    })
}

#[utoipa::path(
    post,
    path = "/api/upload",
    request_body(content = String, description = "Multipart form with a `file` field", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Table converted", body = UploadRes),
        (status = 400, description = "Missing file, unsupported type or unreadable table", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Upload a spreadsheet or delimited file and convert every row.
///
/// # Errors
/// Returns `400 Bad Request` if:
/// - no `file` field is present or its name is empty,
/// - the extension is not a supported table format, or
/// - the table cannot be read or yields no resources.
#[axum::debug_handler]
async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadRes>> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
        upload = Some((file_name, bytes));
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "No file provided"))?;
    if file_name.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "No file selected"));
    }

    let service = state.service.clone();
    let outcome: ConversionOutcome = run_blocking(move || {
        let path = service.store_upload(&file_name, &bytes)?;
        service.convert_file(&path)
    })
    .await?;

    let count = outcome.resource_count();
    Ok(Json(UploadRes {
        success: true,
        message: format!("Processed {count} resources"),
        bundle_id: outcome.bundle.id.to_string(),
        resource_count: count,
        skipped_rows: skipped_rows(outcome.skipped),
        data_preview: outcome.preview,
    }))
}

#[utoipa::path(
    post,
    path = "/api/patient",
    request_body = PatientReq,
    responses(
        (status = 200, description = "Patient converted", body = PatientRes),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Convert one manually entered patient into a bundle.
#[axum::debug_handler]
async fn create_patient(
    State(state): State<AppState>,
    Json(req): Json<PatientReq>,
) -> ApiResult<Json<PatientRes>> {
    let form = PatientForm {
        first_name: req.first_name,
        last_name: req.last_name,
        gender: req.gender,
        birth_date: req.birth_date,
        phone: req.phone,
        email: req.email,
        address: req.address,
        city: req.city,
        state: req.state,
        postal_code: req.postal_code,
        country: req.country,
        condition: req.condition,
        snomed_code: req.snomed_code,
        observation: req.observation,
        value: req.value,
        unit: req.unit,
    };

    let service = state.service.clone();
    let outcome = run_blocking(move || service.submit_patient(&form)).await?;

    Ok(Json(PatientRes {
        success: true,
        message: "Patient created successfully".into(),
        bundle_id: outcome.bundle.id.to_string(),
        resources: outcome
            .bundle
            .entry
            .into_iter()
            .map(|e| e.resource)
            .collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/bundle/{id}",
    params(("id" = String, Path, description = "Bundle id")),
    responses(
        (status = 200, description = "Bundle JSON", content_type = "application/json"),
        (status = 400, description = "Malformed bundle id", body = ErrorRes),
        (status = 404, description = "Bundle not found", body = ErrorRes)
    )
)]
/// Fetch a stored bundle.
#[axum::debug_handler]
async fn get_bundle(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<fhir::Bundle>> {
    let service = state.service.clone();
    run_blocking(move || service.bundle(&id))
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

#[utoipa::path(
    get,
    path = "/api/download/{id}",
    params(("id" = String, Path, description = "Bundle id")),
    responses(
        (status = 200, description = "Bundle file attachment", content_type = "application/json"),
        (status = 400, description = "Malformed bundle id", body = ErrorRes),
        (status = 404, description = "Bundle not found", body = ErrorRes)
    )
)]
/// Download a stored bundle as a JSON file.
#[axum::debug_handler]
async fn download_bundle(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Response> {
    let service = state.service.clone();
    let bundle = run_blocking(move || service.bundle(&id))
        .await?
        .ok_or_else(not_found)?;
    let body = bundle.render().map_err(|e| core_error(e.into()))?;

    let disposition = format!("attachment; filename=\"fhir_bundle_{}.json\"", bundle.id);
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/api/export/{id}/csv",
    params(("id" = String, Path, description = "Bundle id")),
    responses(
        (status = 200, description = "CSV summary attachment", content_type = "text/csv"),
        (status = 400, description = "Malformed bundle id", body = ErrorRes),
        (status = 404, description = "Bundle not found", body = ErrorRes)
    )
)]
/// Export a stored bundle as a CSV summary.
#[axum::debug_handler]
async fn export_csv(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Response> {
    let service = state.service.clone();
    let file_id = id.clone();
    let csv = run_blocking(move || service.export_csv(&id))
        .await?
        .ok_or_else(not_found)?;

    let disposition = format!("attachment; filename=\"fhir_export_{file_id}.csv\"");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

#[utoipa::path(
    post,
    path = "/api/map-codes",
    request_body = MapCodesReq,
    responses(
        (status = 200, description = "Mapping found", body = MapCodesRes),
        (status = 400, description = "No lookup key supplied", body = ErrorRes),
        (status = 404, description = "No mapping found", body = ErrorRes)
    )
)]
/// Map a disease name or any supported code to its equivalents in every system.
#[axum::debug_handler]
async fn map_codes(
    State(state): State<AppState>,
    Json(req): Json<MapCodesReq>,
) -> ApiResult<Json<MapCodesRes>> {
    let query = MappingQuery::new()
        .disease(req.disease)
        .code(CodeSystem::Snomed, req.snomed_code)
        .code(CodeSystem::Icd11, req.icd11_code)
        .code(CodeSystem::Ayurveda, req.ayurveda_code)
        .code(CodeSystem::Siddha, req.siddha_code)
        .code(CodeSystem::Unani, req.unani_code);
    if query.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Provide at least one of disease/snomedCode/icd11Code/ayurvedaCode/siddhaCode/unaniCode",
        ));
    }

    let mapping = state
        .service
        .map_codes(&query)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "No mapping found"))?;

    Ok(Json(MapCodesRes {
        success: true,
        mappings: mapping.mappings,
        systems: mapping
            .systems
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
        condition: mapping.condition,
    }))
}
