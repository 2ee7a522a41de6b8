use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use lenscast_protocol::StatusBody;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Missing image_data field")]
    MissingImageData,

    #[error("Invalid JSON body: {0}")]
    InvalidBody(String),

    #[error("Invalid image_data: {0}")]
    InvalidImageData(String),

    #[error("gRPC error: {0}")]
    Backend(String),

    #[error("Invalid backend address: {0}")]
    InvalidBackendAddress(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingImageData | Self::InvalidBody(_) | Self::InvalidImageData(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<tonic::Status> for GatewayError {
    fn from(status: tonic::Status) -> Self {
        let detail = if status.message().is_empty() {
            status.code().description().to_string()
        } else {
            status.message().to_string()
        };
        Self::Backend(detail)
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(StatusBody::error(self.to_string()))).into_response()
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
