//! vf-encode - a folder-watching HandBrake pipeline.
//!
//! Watch folders are bound to presets. Each preset decides which audio tracks (French
//! first) and which French subtitles are kept, and which subtitle is burned in. Files the
//! rules cannot decide on go to a manual-review list instead of being encoded.

pub mod cli;
pub mod config;
pub mod encoder;
pub mod error;
pub mod media;
pub mod notify;
pub mod presets;
pub mod queue;
pub mod validation;
pub mod watcher;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use crate::cli::{AnalyzeArgs, Cli, Commands, RunArgs, SelectArgs};
use crate::config::model::{default_mediainfo_path, HandBrakeConfig};
use crate::config::{AppConfig, ConfigManager};
use crate::encoder::EncodeWorker;
use crate::error::ConfigError;
use crate::media::audio::score_audio_tracks;
use crate::media::scan::extract_title_set;
use crate::media::track::SubtitleDetails;
use crate::media::{
    analyze_subtitles, mediainfo, select_tracks, HandBrakeScanner, TrackDescriptor, TrackScanner,
};
use crate::notify::DiscordNotifier;
use crate::presets::{PresetRule, PresetTable, SubtitleStrategy};
use crate::queue::{EncodeHistory, ManualReviewList, StateFile, WorkQueue};
use crate::validation::report::format_report;
use crate::validation::{validate_config, SystemCapabilities};
use crate::watcher::WatcherManager;

/// Runs the command selected on the command line.
pub async fn run(cli: Cli) -> Result<()> {
    // Logging settings come from the config when it parses; the command reloads it properly.
    let early_config = config::loader::load_from_path(&cli.config).ok();
    let level = cli
        .verbosity_level()
        .map(str::to_string)
        .or_else(|| early_config.as_ref().map(|c| c.global.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let log_dir = early_config.as_ref().and_then(|c| c.global.log_dir.clone());
    let _guard = setup_logging(&level, log_dir.as_deref())?;

    match cli.command {
        Commands::Run(args) => run_pipeline(args, &cli.config).await,
        Commands::ConfigValidate => validate_config_file(&cli.config),
        Commands::ConfigShow => show_config(&cli.config),
        Commands::Presets => list_presets(&cli.config),
        Commands::Select(args) => select_command(args, &cli.config).await,
        Commands::Analyze(args) => analyze_command(args, &cli.config).await,
        Commands::ManualList => manual_list(&cli.config),
        Commands::ManualRemove { file } => manual_remove(&cli.config, &file),
        Commands::History { limit } => show_history(&cli.config, limit),
    }
}

/// Initializes JSON logging on stderr, plus a daily-rolling file when `log_dir` is set.
///
/// The returned guard flushes the file writer and must live as long as the process.
fn setup_logging(level: &str, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console = fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory '{}'", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "vf-encode.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}

/// Runs the watchers and the encode worker until Ctrl+C or SIGTERM.
async fn run_pipeline(args: RunArgs, config_path: &Path) -> Result<()> {
    info!(dry_run = args.dry_run, "Starting vf-encode pipeline");

    let bootstrap = config::loader::load_from_path(config_path)?;
    let capabilities = SystemCapabilities::detect(
        &bootstrap.global.handbrake.path,
        bootstrap.global.mediainfo_path.as_deref(),
    );
    info!(
        handbrake = ?capabilities.handbrake_version,
        mediainfo = capabilities.mediainfo_available,
        "Detected system capabilities"
    );

    let manager = ConfigManager::new(config_path, &capabilities)?;
    let config = manager.config().clone();
    let presets = manager.presets();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let queue = WorkQueue::new();

    restore_interrupted_queue(&config, &presets, &queue, args.resume).await;

    let mediainfo = config
        .global
        .mediainfo_path
        .clone()
        .filter(|_| capabilities.mediainfo_available);
    let scanner: Arc<dyn TrackScanner> =
        Arc::new(HandBrakeScanner::new(config.global.handbrake.path.clone(), mediainfo));

    let notifier = config
        .global
        .notifications
        .discord
        .as_ref()
        .map(|discord| Arc::new(DiscordNotifier::new(discord)));

    let mut watchers = WatcherManager::new(
        &config,
        queue.clone(),
        Arc::clone(&presets),
        shutdown_rx.clone(),
    )?;
    watchers.start_watching()?;
    if args.process_existing {
        watchers.queue_existing();
    }
    let watcher_task = tokio::spawn(watchers.run());

    let worker = EncodeWorker::new(queue.clone(), presets, scanner, &config.global, shutdown_rx)
        .with_notifier(notifier)
        .with_dry_run(args.dry_run);
    let worker_task = tokio::spawn(worker.run());

    let queued = queue.queue_length().await;
    info!(
        watch_folders = config.watch_folders.len(),
        queued,
        "Pipeline is running. Press Ctrl+C to stop."
    );

    shutdown_signal().await;
    info!("Shutdown signal received");
    let _ = shutdown_tx.send(true);

    match watcher_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "Watcher manager failed"),
        Err(e) => error!(error = %e, "Watcher task panicked"),
    }
    match worker_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "Encode worker failed"),
        Err(e) => error!(error = %e, "Encode worker panicked"),
    }

    info!("Pipeline stopped");
    Ok(())
}

/// Re-enqueues the jobs saved at the last shutdown when `resume` is set.
///
/// Jobs whose preset is no longer in `presets` are dropped. Returns how many were enqueued.
async fn restore_interrupted_queue(
    config: &AppConfig,
    presets: &PresetTable,
    queue: &WorkQueue,
    resume: bool,
) -> usize {
    let state_file = StateFile::new(config.global.queue_state_path());

    let state = match state_file.load() {
        Ok(Some(state)) => state,
        Ok(None) => {
            if resume {
                info!("No interrupted queue to resume");
            }
            return 0;
        }
        Err(e) => {
            warn!(error = %e, "Cannot read interrupted queue");
            return 0;
        }
    };

    if !resume {
        warn!(
            saved_at = %state.saved_at,
            jobs = state.pending.len() + usize::from(state.current.is_some()),
            "An interrupted queue was saved; start with --resume to re-enqueue it"
        );
        return 0;
    }

    let mut restored = 0;
    for job in state.into_resumable_jobs() {
        if !job.input_path.exists() {
            warn!(file = %job.input_path.display(), "Interrupted file no longer exists, skipping");
            continue;
        }
        if let Err(e) = presets.resolve(&job.preset_name) {
            error!(
                file = %job.input_path.display(),
                error = %e,
                "Interrupted job has an unknown preset, skipping"
            );
            continue;
        }
        if queue.enqueue(job).await {
            restored += 1;
        }
    }
    info!(jobs = restored, "Resumed interrupted queue");

    if let Err(e) = state_file.clear() {
        warn!(error = %e, "Failed to clear interrupted queue file");
    }
    restored
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
                return;
            }
            Err(e) => warn!(error = %e, "Cannot listen for SIGTERM"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Cannot listen for Ctrl+C");
    }
}

/// Validates the configuration file and prints the report.
fn validate_config_file(config_path: &Path) -> Result<()> {
    let config = config::loader::load_from_path(config_path)?;
    let capabilities = SystemCapabilities::detect(
        &config.global.handbrake.path,
        config.global.mediainfo_path.as_deref(),
    );

    let result = validate_config(&config, &capabilities);
    print!("{}", format_report(&result));

    if !result.is_valid() {
        anyhow::bail!(ConfigError::ValidationFailed {
            error_count: result.error_count()
        });
    }

    let presets = PresetTable::from_config_or_builtin(&config.presets)?;
    println!("{} preset(s), {} watch folder(s):", presets.len(), config.watch_folders.len());
    for folder in &config.watch_folders {
        println!("  - {} -> {}", folder.path.display(), folder.preset);
    }

    Ok(())
}

/// Displays the parsed configuration.
fn show_config(config_path: &Path) -> Result<()> {
    let config = config::loader::load_from_path(config_path)?;
    println!("{}", serde_yaml::to_string(&config)?);
    Ok(())
}

/// Lists the presets in effect: the configured ones, or the stock table.
fn list_presets(config_path: &Path) -> Result<()> {
    let config = load_optional_config(config_path)?;
    let presets = preset_table(config.as_ref())?;

    for rule in presets.rules() {
        let bounds = match (rule.min_audio_tracks, rule.max_audio_tracks) {
            (None, None) => String::new(),
            (min, max) => format!(
                " [{}..{}]",
                min.map(|m| m.to_string()).unwrap_or_default(),
                max.map(|m| m.to_string()).unwrap_or_default()
            ),
        };
        println!(
            "{}\n  audio: {}{}\n  subtitles: {} ({})",
            rule.name,
            rule.audio_mode,
            bounds,
            rule.subtitle_mode,
            strategy_name(rule.subtitle_strategy)
        );
    }

    Ok(())
}

/// Scans one file and prints the scores, the analysis and the resulting options.
async fn select_command(args: SelectArgs, config_path: &Path) -> Result<()> {
    let config = load_optional_config(config_path)?;
    let presets = preset_table(config.as_ref())?;
    let rule = presets.resolve(&args.preset)?.clone();
    let (handbrake, mediainfo) = tool_paths(config.as_ref());

    let descriptor = match &args.scan_json {
        Some(scan_json) => {
            let content = std::fs::read_to_string(scan_json)
                .with_context(|| format!("Failed to read '{}'", scan_json.display()))?;
            let mut descriptor = TrackDescriptor::from_scan_json(extract_title_set(&content)?)?;
            if let Some(mediainfo) = mediainfo.filter(|_| args.file.exists()) {
                match mediainfo::probe_subtitles(&mediainfo, &args.file) {
                    Ok(details) => descriptor.apply_subtitle_details(&details),
                    Err(e) => warn!(error = %e, "mediainfo unavailable"),
                }
            }
            descriptor
        }
        None => {
            let scanner = HandBrakeScanner::new(handbrake.path, mediainfo);
            let file = args.file.clone();
            tokio::task::spawn_blocking(move || scanner.scan(&file)).await??
        }
    };

    print!("{}", describe_selection(&descriptor, &rule));

    match select_tracks(&descriptor, &rule) {
        Ok(options) => {
            println!("\nHandBrake options: {}", options);
            Ok(())
        }
        Err(e) => {
            println!("\nManual review: {}", e);
            Err(e.into())
        }
    }
}

/// Prints the French subtitle analysis built from mediainfo data.
async fn analyze_command(args: AnalyzeArgs, config_path: &Path) -> Result<()> {
    let config = load_optional_config(config_path)?;
    let presets = preset_table(config.as_ref())?;

    let rule = match &args.preset {
        Some(name) => presets.resolve(name)?.clone(),
        None => presets
            .rules()
            .find(|r| r.subtitle_strategy == SubtitleStrategy::Analyzer)
            .or_else(|| presets.rules().next())
            .cloned()
            .context("No preset available")?,
    };

    let details: Vec<SubtitleDetails> = match &args.mediainfo_json {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read '{}'", path.display()))?;
            let json: serde_json::Value =
                serde_json::from_str(&content).context("Failed to parse mediainfo JSON")?;
            mediainfo::parse_subtitle_details(&json)?
        }
        None => {
            let (_, mediainfo_path) = tool_paths(config.as_ref());
            let mediainfo_path =
                mediainfo_path.context("mediainfo is disabled in the configuration")?;
            let file = args.file.clone();
            tokio::task::spawn_blocking(move || {
                mediainfo::probe_subtitles(&mediainfo_path, &file)
            })
            .await??
        }
    };

    let descriptor = TrackDescriptor::from_subtitle_details(&details);
    let analysis = analyze_subtitles(&descriptor, &rule);

    println!("{} (preset: {})\n", args.file.display(), rule.name);
    print!("{}", analysis.summary());
    Ok(())
}

fn manual_list(config_path: &Path) -> Result<()> {
    let config = config::loader::load_from_path(config_path)?;
    let list = ManualReviewList::new(config.global.manual_review_path());
    let entries = list.list()?;

    if entries.is_empty() {
        println!("No file waiting for manual review.");
        return Ok(());
    }

    println!("Manual review ({} file(s)):", entries.len());
    for entry in entries {
        match entry.preset {
            Some(preset) => println!("  {} [{}]", entry.file.display(), preset),
            None => println!("  {}", entry.file.display()),
        }
    }
    Ok(())
}

fn manual_remove(config_path: &Path, file: &Path) -> Result<()> {
    let config = config::loader::load_from_path(config_path)?;
    let list = ManualReviewList::new(config.global.manual_review_path());
    let removed = list.remove(file)?;
    println!(
        "Removed {} entr{} for {}.",
        removed,
        if removed == 1 { "y" } else { "ies" },
        file.display()
    );
    Ok(())
}

fn show_history(config_path: &Path, limit: usize) -> Result<()> {
    let config = config::loader::load_from_path(config_path)?;
    let history = EncodeHistory::new(config.global.history_path());
    let records = history.latest(limit)?;

    if records.is_empty() {
        println!("No encode recorded yet.");
        return Ok(());
    }

    for record in records {
        println!(
            "{}  {}  {:.2} MB  [{}]",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.filename,
            record.file_size_mb,
            record.preset
        );
    }
    Ok(())
}

/// Audio scores and subtitle listing for the `select` command.
fn describe_selection(descriptor: &TrackDescriptor, rule: &PresetRule) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Preset: {} (audio: {}, subtitles: {})\n",
        rule.name, rule.audio_mode, rule.subtitle_mode
    );

    let _ = writeln!(out, "Audio tracks (best first):");
    for scored in score_audio_tracks(descriptor, rule) {
        let _ = writeln!(
            out,
            "  #{} {:<4} {:<30} score {:>4}{}",
            scored.track.track_number,
            scored.track.language_code,
            format!("\"{}\"", scored.track.name),
            scored.score,
            if scored.excluded { "  excluded" } else { "" }
        );
    }

    let _ = writeln!(out, "\nSubtitle tracks:");
    if descriptor.subtitle_tracks.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for track in &descriptor.subtitle_tracks {
        let mut flags = Vec::new();
        if track.is_forced {
            flags.push("forced");
        }
        if track.is_default {
            flags.push("default");
        }
        let _ = writeln!(
            out,
            "  #{} {:<4} \"{}\" {}",
            track.track_number,
            track.language_code,
            track.name,
            flags.join(" ")
        );
    }

    if rule.subtitle_strategy == SubtitleStrategy::Analyzer {
        let _ = writeln!(out, "\n{}", analyze_subtitles(descriptor, rule).summary());
    }

    out
}

fn strategy_name(strategy: SubtitleStrategy) -> &'static str {
    match strategy {
        SubtitleStrategy::Keyword => "keyword",
        SubtitleStrategy::Analyzer => "analyzer",
    }
}

/// Loads the config when the file exists; inspection commands also work without one.
fn load_optional_config(config_path: &Path) -> Result<Option<AppConfig>> {
    if !config_path.exists() {
        info!(path = %config_path.display(), "No configuration file, using stock presets");
        return Ok(None);
    }
    Ok(Some(config::loader::load_from_path(config_path)?))
}

fn preset_table(config: Option<&AppConfig>) -> Result<PresetTable> {
    Ok(match config {
        Some(config) => PresetTable::from_config_or_builtin(&config.presets)?,
        None => PresetTable::builtin(),
    })
}

fn tool_paths(config: Option<&AppConfig>) -> (HandBrakeConfig, Option<PathBuf>) {
    match config {
        Some(config) => (config.global.handbrake.clone(), config.global.mediainfo_path.clone()),
        None => (HandBrakeConfig::default(), default_mediainfo_path()),
    }
}
