use std::time::Duration;

use tonic::transport::Endpoint;
use tonic::Status;
use tracing::info;

use lenscast_protocol::rpc::{ImageRequest, ImageResponse};

use crate::client::ImageProcessorClient;
use crate::error::{GatewayError, GatewayResult};

/// The analysis service behind the gateway.
#[tonic::async_trait]
pub trait AnalysisBackend: Send + Sync + 'static {
    async fn process_image(&self, request: ImageRequest) -> Result<ImageResponse, Status>;
}

/// Analysis backend reached over a lazily connected gRPC channel.
#[derive(Debug, Clone)]
pub struct GrpcBackend {
    client: ImageProcessorClient,
}

impl GrpcBackend {
    /// Build the channel without connecting, so the gateway can come up
    /// before the backend does. Must be called inside a tokio runtime.
    pub fn connect_lazy(addr: &str, timeout: Duration) -> GatewayResult<Self> {
        let endpoint = Endpoint::from_shared(addr.to_string())
            .map_err(|e| GatewayError::InvalidBackendAddress(format!("{addr}: {e}")))?
            .connect_timeout(timeout)
            .timeout(timeout);

        info!("gRPC backend channel configured for {}", addr);
        Ok(Self {
            client: ImageProcessorClient::new(endpoint.connect_lazy()),
        })
    }
}

#[tonic::async_trait]
impl AnalysisBackend for GrpcBackend {
    async fn process_image(&self, request: ImageRequest) -> Result<ImageResponse, Status> {
        // Channel clones share one connection; each request gets its own handle.
        let mut client = self.client.clone();
        let response = client.process_image(request).await?;
        Ok(response.into_inner())
    }
}
