//! HTTP-to-gRPC gateway in front of the image analysis backend.
//!
//! Accepts `POST /api/process-image` with a base64 JSON payload, forwards it
//! as `image_service.ImageProcessor/ProcessImage` and translates the reply
//! back to JSON. `GET /health` serves liveness checks.

pub mod backend;
pub mod client;
pub mod error;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::info;

pub use backend::{AnalysisBackend, GrpcBackend};
pub use error::{GatewayError, GatewayResult};
pub use routes::router;

/// Default gRPC address of the analysis backend.
pub const DEFAULT_BACKEND_ADDR: &str = "http://localhost:50051";
/// Default HTTP listen port.
pub const DEFAULT_PORT: u16 = 3000;

/// Runtime configuration of the gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub listen_addr: SocketAddr,
    pub backend_addr: String,
    pub backend_timeout: Duration,
    pub body_limit: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            backend_addr: DEFAULT_BACKEND_ADDR.to_string(),
            backend_timeout: Duration::from_secs(30),
            body_limit: lenscast_protocol::codec::MAX_BODY_BYTES,
        }
    }
}

/// Serve the gateway until Ctrl-C.
pub async fn serve(config: GatewayConfig, backend: Arc<dyn AnalysisBackend>) -> GatewayResult<()> {
    let app = router(backend, config.body_limit);
    let listener = TcpListener::bind(config.listen_addr).await?;

    info!("Gateway listening on http://{}", listener.local_addr()?);
    info!("Forwarding to analysis backend at {}", config.backend_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await?;

    Ok(())
}
