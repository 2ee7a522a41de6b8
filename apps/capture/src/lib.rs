//! Capture console: snapshots frames on a timer, sends them to the analysis
//! gateway and shows the latest result with throughput statistics.

pub mod client;
pub mod commands;
pub mod config;
pub mod managers;
pub mod present;
pub mod video;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{info, warn};

use client::HttpAnalysisClient;
use commands::Command;
use config::CaptureArgs;
use managers::capture_manager::CaptureManager;
use managers::session::{CaptureMode, SessionHandle, SessionState};

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lenscast_capture=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Print each new result and mode change as the session publishes it.
async fn render_updates(mut rx: watch::Receiver<SessionState>) {
    let mut last_mode = rx.borrow().mode;
    let mut last_processed = rx.borrow().stats.processed_count;

    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();

        if state.mode != last_mode {
            match state.mode {
                CaptureMode::Running => println!("-- capture running --"),
                CaptureMode::Stopped => println!("-- capture stopped --"),
            }
            last_mode = state.mode;
        }

        if state.stats.processed_count != last_processed {
            last_processed = state.stats.processed_count;
            if let Some(result) = &state.current {
                println!("{}", present::render_result(result));
                println!("{}", present::render_stats(&state.stats));
            }
        }
    }
}

fn report(outcome: Result<String, String>) {
    match outcome {
        Ok(message) => println!("{message}"),
        Err(message) => eprintln!("{message}"),
    }
}

/// Run the console until `quit` or Ctrl-C.
pub async fn run(args: CaptureArgs) -> anyhow::Result<()> {
    let client = HttpAnalysisClient::new(&args.client_config())?;
    let source = args.build_source()?;
    info!("Using {} source, sending frames to {}", source.name(), client.endpoint());

    let manager = CaptureManager::new(args.scheduler_config(), source, client, SessionHandle::new());
    let renderer = tokio::spawn(render_updates(manager.session().subscribe()));

    if !args.manual_start {
        report(commands::session::start_capture(&manager).await);
    }
    println!("{}", commands::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
            line = lines.next_line(), if stdin_open => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        info!("stdin closed, running until Ctrl-C");
                        stdin_open = false;
                        continue;
                    }
                    Err(e) => {
                        warn!("Failed to read stdin: {e}");
                        stdin_open = false;
                        continue;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(Command::Quit) => break,
                    Ok(command) => report(commands::execute(&manager, command).await),
                    Err(message) => eprintln!("{message}"),
                }
            }
        }
    }

    manager.shutdown();
    renderer.abort();
    Ok(())
}
