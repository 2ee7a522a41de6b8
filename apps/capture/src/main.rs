use clap::Parser;

use lenscast_capture::config::CaptureArgs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    lenscast_capture::init_tracing();
    lenscast_capture::run(CaptureArgs::parse()).await
}
