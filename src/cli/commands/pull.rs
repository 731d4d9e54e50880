//! Pull command implementation.

use colored::Colorize;

use super::{
    Output, cancel_on_ctrl_c, http_client, mode_label, run_result, runtime, spawn_progress,
    status_label,
};
use crate::cli::PullArgs;
use crate::config::SyncConfig;
use crate::error::Result;
use crate::log::{RunLogger, TerminalSink};
use crate::progress::ProgressReporter;
use crate::sync::{CancelFlag, PullRequest, PullSummary, RunContext, StepStatus, pull_instance};
use crate::validate::{parse_kinds, validate_instance_id, validate_non_empty};

/// Execute the pull command.
///
/// # Errors
///
/// Returns an error for invalid arguments or configuration, or when the run
/// does not finish with status `succeeded`.
pub fn execute(args: &PullArgs, config: &SyncConfig, output: Output) -> Result<()> {
    let request = PullRequest {
        source: validate_instance_id(&args.source)?,
        locale: validate_non_empty(
            "locale",
            args.locale.as_deref().unwrap_or(&config.default_locale),
        )?,
        channel: validate_non_empty(
            "channel",
            args.channel.as_deref().unwrap_or(&config.default_channel),
        )?,
        preview: args.mode.is_preview(),
        kinds: parse_kinds(&args.kinds)?,
        force_overwrite: args.force,
    };
    let client = http_client(config)?;
    let root = config.store_root();

    let rt = runtime()?;
    let (summary, cancelled) = rt.block_on(async {
        let (reporter, rx) = ProgressReporter::channel();
        let renderer = spawn_progress(rx, output);
        let cancel = CancelFlag::new();
        cancel_on_ctrl_c(cancel.clone());

        let logger = RunLogger::new().with_sink(TerminalSink::new(output.quiet || output.json));
        let run = RunContext::new(logger, reporter, cancel.clone());
        let summary = pull_instance(&client, &root, &request, run).await;
        let _ = renderer.await;
        summary.map(|s| (s, cancel.is_cancelled()))
    })?;

    if output.json {
        println!("{}", serde_json::to_string(&summary)?);
    } else if !output.quiet {
        print_summary(&summary);
    }

    run_result(summary.status, cancelled)
}

fn print_summary(summary: &PullSummary) {
    println!();
    println!(
        "Pull {} ({}, {}, channel {})",
        summary.source,
        summary.locale,
        mode_label(summary.preview),
        summary.channel
    );
    println!(
        "  {:<14} {:>8} {:>8} {:>9} {:>8} {:>7}",
        "Kind", "Total", "Written", "Unchanged", "Removed", "Errors"
    );
    for step in &summary.steps {
        let label = format!("{:<14}", step.kind.label());
        let label = match step.status {
            StepStatus::Success => label.normal(),
            StepStatus::Error => label.red(),
        };
        if step.skipped {
            println!("  {label} {}", "already populated (use --force)".dimmed());
            continue;
        }
        if let Some(error) = &step.step_error {
            println!("  {label} {}", error.red());
            continue;
        }
        println!(
            "  {label} {:>8} {:>8} {:>9} {:>8} {:>7}",
            step.total,
            step.written,
            step.unchanged,
            step.removed,
            step.errors.len()
        );
    }
    println!();
    println!("  Status:   {}", status_label(summary.status));
    println!("  Location: {}", summary.base_path.display());
    if let Some(log) = &summary.log_file {
        println!("  Log:      {}", log.display());
    }
}
