//! Push command implementation.

use colored::Colorize;

use super::{
    Output, cancel_on_ctrl_c, http_client, mode_label, run_result, runtime, spawn_progress,
    status_label,
};
use crate::cli::PushArgs;
use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::log::{RunLogger, TerminalSink};
use crate::progress::ProgressReporter;
use crate::sync::{CancelFlag, PushRequest, PushSummary, RunContext, StepStatus, push_instance};
use crate::validate::{parse_kinds, validate_instance_id, validate_non_empty};

/// Execute the push command.
///
/// # Errors
///
/// Returns an error for invalid arguments or configuration, when nothing was
/// pulled for the source, or when any step ends in `error`.
pub fn execute(args: &PushArgs, config: &SyncConfig, output: Output) -> Result<()> {
    let source = validate_instance_id(&args.source)?;
    let target = validate_instance_id(&args.target)?;
    if source == target {
        return Err(Error::InvalidArgument(
            "source and target must be different instances".to_string(),
        ));
    }
    let request = PushRequest {
        source,
        target,
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
        dry_run: args.dry_run,
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
        let summary = push_instance(&client, &root, &request, run).await;
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

fn print_summary(summary: &PushSummary) {
    println!();
    println!(
        "Push {} → {} ({}, {}){}",
        summary.source,
        summary.target,
        summary.locale,
        mode_label(summary.preview),
        if summary.dry_run { " [dry run]" } else { "" }
    );
    println!(
        "  {:<14} {:>7} {:>7} {:>8} {:>9} {:>10} {:>10}",
        "Kind", "Pushed", "Failed", "Skipped", "Mismatch", "NotOnSrc", "NotOnDest"
    );
    for step in &summary.steps {
        let label = format!("{:<14}", step.kind.label());
        let label = match step.status {
            StepStatus::Success => label.normal(),
            StepStatus::Error => label.red(),
        };
        if let Some(error) = &step.step_error {
            println!("  {label} {}", error.red());
            continue;
        }
        let c = step.counters;
        println!(
            "  {label} {:>7} {:>7} {:>8} {:>9} {:>10} {:>10}",
            c.successful_items,
            c.failed_items,
            c.skipped,
            c.model_mismatch,
            c.not_on_source,
            c.not_on_destination
        );
    }

    let totals = summary.totals();
    println!();
    println!(
        "  Total:    {} pushed, {} failed, {} skipped",
        totals.successful_items, totals.failed_items, totals.skipped
    );
    println!("  Status:   {}", status_label(summary.status));
    if let Some(log) = &summary.log_file {
        println!("  Log:      {}", log.display());
    }
}
