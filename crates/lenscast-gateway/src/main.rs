use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use lenscast_gateway::{GatewayConfig, GrpcBackend, DEFAULT_BACKEND_ADDR, DEFAULT_PORT};
use lenscast_protocol::codec::MAX_BODY_BYTES;

#[derive(Parser, Debug)]
#[command(name = "lenscast-gateway", about = "HTTP to gRPC gateway for the image analysis backend")]
struct Args {
    /// Address to bind the HTTP listener to
    #[arg(long, env = "LENSCAST_GATEWAY_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// HTTP listen port
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// gRPC address of the analysis backend
    #[arg(long, env = "LENSCAST_BACKEND_ADDR", default_value = DEFAULT_BACKEND_ADDR)]
    backend_addr: String,

    /// Deadline for each backend call, in milliseconds
    #[arg(long, env = "LENSCAST_BACKEND_TIMEOUT_MS", default_value_t = 30_000)]
    backend_timeout_ms: u64,

    /// Maximum accepted request body, in bytes
    #[arg(long, env = "LENSCAST_BODY_LIMIT", default_value_t = MAX_BODY_BYTES)]
    body_limit: usize,
}

impl From<Args> for GatewayConfig {
    fn from(args: Args) -> Self {
        Self {
            listen_addr: SocketAddr::new(args.host, args.port),
            backend_addr: args.backend_addr,
            backend_timeout: Duration::from_millis(args.backend_timeout_ms),
            body_limit: args.body_limit,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lenscast_gateway=info,tower_http=info".into()),
        )
        .init();

    let config = GatewayConfig::from(Args::parse());
    let backend = GrpcBackend::connect_lazy(&config.backend_addr, config.backend_timeout)?;

    lenscast_gateway::serve(config, Arc::new(backend)).await?;
    Ok(())
}
