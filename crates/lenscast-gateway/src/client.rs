//! Unary gRPC client for `image_service.ImageProcessor`.

use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Channel;
use tonic::{IntoRequest, Response, Status};

use lenscast_protocol::rpc::{self, ImageRequest, ImageResponse};

#[derive(Debug, Clone)]
pub struct ImageProcessorClient {
    inner: tonic::client::Grpc<Channel>,
}

impl ImageProcessorClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    pub async fn process_image(
        &mut self,
        request: impl IntoRequest<ImageRequest>,
    ) -> Result<Response<ImageResponse>, Status> {
        self.inner
            .ready()
            .await
            .map_err(|e| Status::unavailable(format!("Service was not ready: {e}")))?;

        let codec: ProstCodec<ImageRequest, ImageResponse> = ProstCodec::default();
        let path = PathAndQuery::from_static(rpc::PROCESS_IMAGE_PATH);
        self.inner.unary(request.into_request(), path, codec).await
    }
}
