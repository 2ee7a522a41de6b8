//! Console commands read from stdin, one per line.

pub mod session;

use std::str::FromStr;

use crate::client::AnalysisClient;
use crate::managers::capture_manager::CaptureManager;

pub const HELP: &str = "Commands: start, stop, toggle, status, help, quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Toggle,
    Status,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        match line.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "toggle" | "t" => Ok(Self::Toggle),
            "status" | "s" => Ok(Self::Status),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(format!("Unknown command '{other}'. {HELP}")),
        }
    }
}

/// Run one command. `Quit` is left to the caller, which owns shutdown.
pub async fn execute<C: AnalysisClient>(manager: &CaptureManager<C>, command: Command) -> Result<String, String> {
    match command {
        Command::Start => session::start_capture(manager).await,
        Command::Stop => session::stop_capture(manager),
        Command::Toggle => session::toggle_capture(manager).await,
        Command::Status => session::capture_status(manager),
        Command::Help => Ok(HELP.to_string()),
        Command::Quit => Ok("Shutting down".to_string()),
    }
}
