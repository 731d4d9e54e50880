//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// cms-sync - Pull and push the full content graph of a headless CMS instance
#[derive(Parser, Debug)]
#[command(name = "cms-sync", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Local store root (default: ./cms-files)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Write directly under the root instead of {instance}/{locale}/{mode}
    #[arg(long, global = true)]
    pub legacy_folders: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pull an instance into the local store
    Pull(PullArgs),

    /// Push the local snapshot of one instance into another
    Push(PushArgs),

    /// Show what the local store holds for an instance
    Status(StatusArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show version information
    Version,
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Preview/live selection shared by every command.
#[derive(Args, Debug, Clone, Copy)]
pub struct ModeArgs {
    /// Use the preview (unpublished) view
    #[arg(long, conflicts_with = "live")]
    pub preview: bool,

    /// Use the live (published) view [default]
    #[arg(long)]
    pub live: bool,
}

impl ModeArgs {
    #[must_use]
    pub fn is_preview(&self) -> bool {
        self.preview && !self.live
    }
}

#[derive(Args, Debug)]
pub struct PullArgs {
    /// Source instance GUID
    #[arg(long, env = "CMS_SYNC_SOURCE")]
    pub source: String,

    /// Locale code (default from config, else en-us)
    #[arg(long)]
    pub locale: Option<String>,

    /// Sitemap channel (default from config, else website)
    #[arg(long)]
    pub channel: Option<String>,

    #[command(flatten)]
    pub mode: ModeArgs,

    /// Kinds to pull (comma separated; default: all)
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub kinds: Vec<String>,

    /// Re-download populated folders and drop documents no longer on the source
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct PushArgs {
    /// Source instance GUID (whose local snapshot is pushed)
    #[arg(long, env = "CMS_SYNC_SOURCE")]
    pub source: String,

    /// Target instance GUID
    #[arg(long, env = "CMS_SYNC_TARGET")]
    pub target: String,

    /// Locale code (default from config, else en-us)
    #[arg(long)]
    pub locale: Option<String>,

    /// Sitemap channel used to match existing pages (default from config)
    #[arg(long)]
    pub channel: Option<String>,

    #[command(flatten)]
    pub mode: ModeArgs,

    /// Kinds to push (comma separated; default: all)
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub kinds: Vec<String>,

    /// Resolve everything without writing to the target
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Instance GUID
    #[arg(long, env = "CMS_SYNC_SOURCE")]
    pub source: String,

    /// Locale code (default from config, else en-us)
    #[arg(long)]
    pub locale: Option<String>,

    #[command(flatten)]
    pub mode: ModeArgs,
}
