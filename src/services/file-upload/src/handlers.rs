//! HTTP handlers for the standalone upload server
//!
//! The upload itself happens in [`crate::upload_middleware`]; these handlers
//! only report what the middleware stored.

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::{
    middleware_upload::upload_middleware,
    models::{StoredFile, UploadedFiles},
    services::UploadHandler,
};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub destination: String,
}

/// Upload response
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub files: Vec<StoredFile>,
    pub fields: HashMap<String, String>,
    pub total_size_bytes: u64,
}

/// Create the application router
pub fn create_router(handler: UploadHandler, max_request_size: usize) -> Router {
    let uploads = Router::new()
        .route("/api/v1/uploads", post(upload_files))
        .route_layer(middleware::from_fn_with_state(
            handler.clone(),
            upload_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(uploads)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(max_request_size)),
        )
        .with_state(handler)
}

/// Report the files stored for this request
pub async fn upload_files(uploads: UploadedFiles) -> impl IntoResponse {
    info!(
        "Accepted {} files ({} bytes)",
        uploads.len(),
        uploads.total_size()
    );

    let total_size_bytes = uploads.total_size();
    (
        StatusCode::CREATED,
        Json(UploadResponse {
            files: uploads.files,
            fields: uploads.fields,
            total_size_bytes,
        }),
    )
}

/// Health check endpoint
pub async fn health_check(State(handler): State<UploadHandler>) -> impl IntoResponse {
    let destination = handler.destination();
    let healthy = tokio::fs::metadata(destination)
        .await
        .map(|metadata| metadata.is_dir())
        .unwrap_or(false);

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if healthy {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        destination: destination.display().to_string(),
    };

    (status_code, Json(response))
}
