//! Command implementations.

pub mod completions;
pub mod pull;
pub mod push;
pub mod status;
pub mod version;

use std::io::{IsTerminal, Write};

use colored::Colorize;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::progress::{ProgressEvent, ProgressReceiver};
use crate::remote::{HttpClient, HttpClientConfig};
use crate::sync::{CancelFlag, RunStatus};

/// Output switches shared by every command.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    /// Live progress is drawn only for humans watching a terminal.
    fn shows_progress(self) -> bool {
        !self.json && !self.quiet && std::io::stderr().is_terminal()
    }
}

fn runtime() -> Result<Runtime> {
    Runtime::new().map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))
}

fn http_client(config: &SyncConfig) -> Result<HttpClient> {
    let token = config.require_token()?;
    Ok(HttpClient::new(HttpClientConfig::new(
        &config.api_base_url,
        token,
    ))?)
}

/// Cancel the run on Ctrl-C. Cancellation takes effect between items.
fn cancel_on_ctrl_c(cancel: CancelFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling after the current item...");
            cancel.cancel();
        }
    });
}

/// Draw progress events until every sender is dropped.
fn spawn_progress(mut rx: ProgressReceiver, output: Output) -> JoinHandle<()> {
    let show = output.shows_progress();
    tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            if !show {
                continue;
            }
            match update.event {
                ProgressEvent::Progress { processed, total } => {
                    eprint!(
                        "\r  {} {processed}/{total}",
                        update.kind.label().cyan()
                    );
                    let _ = std::io::stderr().flush();
                }
                // The run logger prints the step result.
                ProgressEvent::StepSucceeded { .. } | ProgressEvent::StepFailed { .. } => {
                    eprint!("\r\x1b[2K");
                }
            }
        }
    })
}

/// Map a finished run onto the process result.
fn run_result(status: RunStatus, cancelled: bool) -> Result<()> {
    if cancelled {
        return Err(Error::Cancelled);
    }
    match status {
        RunStatus::Succeeded => Ok(()),
        other => Err(Error::RunIncomplete {
            status: other.to_string(),
        }),
    }
}

fn status_label(status: RunStatus) -> colored::ColoredString {
    match status {
        RunStatus::Succeeded => status.as_str().green().bold(),
        RunStatus::PartiallyFailed => status.as_str().yellow().bold(),
        RunStatus::Failed => status.as_str().red().bold(),
    }
}

fn mode_label(preview: bool) -> &'static str {
    if preview { "preview" } else { "live" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_result() {
        assert!(run_result(RunStatus::Succeeded, false).is_ok());
        assert!(matches!(
            run_result(RunStatus::PartiallyFailed, false),
            Err(Error::RunIncomplete { ref status }) if status == "partially_failed"
        ));
        assert!(matches!(
            run_result(RunStatus::Succeeded, true),
            Err(Error::Cancelled)
        ));
    }

    #[test]
    fn test_http_client_requires_token() {
        let config = SyncConfig::resolve(
            &crate::config::Overrides::default(),
            crate::config::FileConfig::default(),
            |_| None,
        );
        assert!(matches!(http_client(&config), Err(Error::Config(_))));
    }
}
