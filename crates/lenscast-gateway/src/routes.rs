//! HTTP surface of the gateway.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use lenscast_protocol::codec::{decode_payload, declared_format, CodecError};
use lenscast_protocol::{rpc, AnalysisResult, HealthStatus, ProcessImageRequest};

use crate::backend::AnalysisBackend;
use crate::error::{GatewayError, GatewayResult};

/// Shared handler state. Holds no per-request data.
#[derive(Clone)]
pub struct GatewayState {
    backend: Arc<dyn AnalysisBackend>,
}

pub fn router(backend: Arc<dyn AnalysisBackend>, body_limit: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/process-image", post(process_image))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(GatewayState { backend })
}

async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

async fn process_image(
    State(state): State<GatewayState>,
    body: Bytes,
) -> GatewayResult<Json<AnalysisResult>> {
    let request = translate_request(&body)?;
    debug!(
        "Forwarding {} bytes ({}) to analysis backend",
        request.image_data.len(),
        request.image_format
    );

    let response = state.backend.process_image(request).await.map_err(|status| {
        error!("gRPC error: {status}");
        GatewayError::from(status)
    })?;

    Ok(Json(response.into()))
}

/// Validate the JSON body and turn it into the backend's request message.
fn translate_request(body: &[u8]) -> GatewayResult<rpc::ImageRequest> {
    let request: ProcessImageRequest =
        serde_json::from_slice(body).map_err(|e| GatewayError::InvalidBody(e.to_string()))?;

    let image_data = match request.image_data.as_deref() {
        Some(data) if !data.is_empty() => data,
        _ => return Err(GatewayError::MissingImageData),
    };

    let image_data = decode_payload(image_data).map_err(|e| match e {
        CodecError::Empty => GatewayError::MissingImageData,
        other => GatewayError::InvalidImageData(other.to_string()),
    })?;

    Ok(rpc::ImageRequest {
        image_data,
        image_format: declared_format(request.image_format.as_deref()),
    })
}
