//! Command-line interface definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Folder-watching HandBrake pipeline with preset-driven French audio and subtitle selection.
#[derive(Parser, Debug)]
#[command(name = "vf-encode", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(
        short,
        long,
        default_value = "/etc/vf-encode/config.yaml",
        env = "CONFIG_PATH",
        global = true
    )]
    pub config: PathBuf,

    /// Increase logging verbosity (-v, -vv). Overrides `global.log_level`.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Log level forced by `-v` flags, if any.
    pub fn verbosity_level(&self) -> Option<&'static str> {
        match self.verbose {
            0 => None,
            1 => Some("debug"),
            _ => Some("trace"),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch the configured folders and encode new files.
    Run(RunArgs),

    /// Validate the configuration file without starting.
    #[command(name = "config-validate")]
    ConfigValidate,

    /// Display the parsed configuration.
    #[command(name = "config-show")]
    ConfigShow,

    /// List the track-selection presets in effect.
    Presets,

    /// Show how a preset would select tracks for one file.
    Select(SelectArgs),

    /// Report the French subtitle analysis for one file.
    Analyze(AnalyzeArgs),

    /// List files waiting for manual review.
    #[command(name = "manual-list")]
    ManualList,

    /// Remove a file from the manual review list.
    #[command(name = "manual-remove")]
    ManualRemove {
        /// File path as shown by `manual-list`.
        file: PathBuf,
    },

    /// Show the most recent successful encodes.
    History {
        /// Number of entries to show.
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Log the HandBrakeCLI commands instead of running them.
    #[arg(long)]
    pub dry_run: bool,

    /// Also enqueue files already present in the watch folders.
    #[arg(long)]
    pub process_existing: bool,

    /// Re-enqueue the jobs saved by the previous shutdown.
    #[arg(long)]
    pub resume: bool,
}

#[derive(Args, Debug)]
pub struct SelectArgs {
    /// Video file to inspect.
    pub file: PathBuf,

    /// Preset name (exact, case-sensitive).
    #[arg(short, long)]
    pub preset: String,

    /// Use a saved `HandBrakeCLI --scan --json` document instead of scanning the file.
    #[arg(long)]
    pub scan_json: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Video file to inspect.
    pub file: PathBuf,

    /// Use a saved `mediainfo --Output=JSON` report instead of running mediainfo.
    #[arg(long)]
    pub mediainfo_json: Option<PathBuf>,

    /// Preset whose keywords drive the classification. Defaults to the first
    /// analyzer-based preset.
    #[arg(short, long)]
    pub preset: Option<String>,
}
