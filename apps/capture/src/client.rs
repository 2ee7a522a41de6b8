//! Remote analysis client: one JSON round trip to the gateway per frame.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use lenscast_protocol::{encode_payload, AnalysisResult, ProcessImageRequest, StatusBody};

use crate::video::CaptureRequest;

/// Default gateway base URL.
pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:3000";

/// Path of the analysis endpoint on the gateway.
pub const PROCESS_IMAGE_PATH: &str = "/api/process-image";

/// Failure to complete the exchange. A reachable backend answering
/// `success: false` is not a transport error.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to reach gateway: {0}")]
    Connect(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Gateway returned {status}: {message}")]
    Gateway { status: u16, message: String },

    #[error("Invalid response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Connect(e.to_string())
        }
    }
}

/// Sends one encoded frame for analysis. Implementations must not retry.
pub trait AnalysisClient: Send + Sync + 'static {
    fn analyze(
        &self,
        request: CaptureRequest,
    ) -> impl Future<Output = Result<AnalysisResult, TransportError>> + Send;
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub gateway_url: String,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Analysis client talking JSON over HTTP to the gateway.
#[derive(Debug, Clone)]
pub struct HttpAnalysisClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpAnalysisClient {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            endpoint: format!("{}{}", config.gateway_url.trim_end_matches('/'), PROCESS_IMAGE_PATH),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl AnalysisClient for HttpAnalysisClient {
    async fn analyze(&self, request: CaptureRequest) -> Result<AnalysisResult, TransportError> {
        let body = ProcessImageRequest {
            image_data: Some(encode_payload(&request.image_bytes)),
            image_format: Some(request.format.as_str().to_string()),
        };

        debug!(
            "Sending {}x{} {} frame ({} bytes) to {}",
            request.width,
            request.height,
            request.format,
            request.image_bytes.len(),
            self.endpoint
        );

        let response = self.http.post(&self.endpoint).json(&body).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<StatusBody>(&bytes)
                .map(|b| b.message)
                .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
            return Err(TransportError::Gateway {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode(e.to_string()))
    }
}
