//! cms-sync CLI entry point.

use clap::Parser;
use cms_sync::cli::commands::{self, Output};
use cms_sync::cli::{Cli, Commands};
use cms_sync::config::{Overrides, SyncConfig};
use cms_sync::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    // Set up tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    // Resolve effective JSON mode: --json OR non-TTY stdout
    let json = cli.json || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    match run(&cli, json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn,cms_sync=off"),
            1 => EnvFilter::new("cms_sync=info"),
            2 => EnvFilter::new("debug,hyper=info,reqwest=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli, json: bool) -> Result<(), Error> {
    let output = Output {
        json,
        quiet: cli.quiet,
    };

    match &cli.command {
        Commands::Completions { shell } => return commands::completions::execute(shell),
        Commands::Pull(_) | Commands::Push(_) | Commands::Status(_) | Commands::Version => {}
    }

    let config = SyncConfig::load(&Overrides {
        root: cli.root.clone(),
        legacy_folders: cli.legacy_folders,
    })?;

    match &cli.command {
        Commands::Pull(args) => commands::pull::execute(args, &config, output),
        Commands::Push(args) => commands::push::execute(args, &config, output),
        Commands::Status(args) => commands::status::execute(args, &config, output),
        Commands::Version => commands::version::execute(&config, json),
        Commands::Completions { .. } => Ok(()),
    }
}
