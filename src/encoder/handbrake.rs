//! HandBrakeCLI subprocess wrapper.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::sync::OnceLock;

use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::model::HandBrakeConfig;
use crate::error::EncoderError;
use crate::media::EncodeOptions;

/// Lines of stderr kept for the failure message.
const STDERR_TAIL_LINES: usize = 20;

/// One HandBrakeCLI invocation.
#[derive(Debug, Clone)]
pub struct EncodeRequest<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub preset: &'a str,
    pub options: &'a EncodeOptions,
}

/// Builds the HandBrakeCLI argument list for a request.
///
/// Order: preset import file, input, output, preset name, track selection, extra args.
pub fn build_args(config: &HandBrakeConfig, request: &EncodeRequest<'_>) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();

    if let Some(presets_file) = &config.presets_file {
        args.push("--preset-import-file".into());
        args.push(presets_file.into());
    }

    args.push("-i".into());
    args.push(request.input.into());
    args.push("-o".into());
    args.push(request.output.into());
    args.push("--preset".into());
    args.push(request.preset.into());

    args.extend(request.options.to_args().into_iter().map(OsString::from));
    args.extend(config.extra_args.iter().map(OsString::from));

    args
}

/// Renders the full command line for logs and dry runs.
pub fn command_line(config: &HandBrakeConfig, request: &EncodeRequest<'_>) -> String {
    let mut parts = vec![config.path.display().to_string()];
    for arg in build_args(config, request) {
        let arg = arg.to_string_lossy().into_owned();
        if arg.contains(' ') {
            parts.push(format!("\"{}\"", arg));
        } else {
            parts.push(arg);
        }
    }
    parts.join(" ")
}

fn progress_regex() -> Option<&'static Regex> {
    static PROGRESS: OnceLock<Option<Regex>> = OnceLock::new();
    PROGRESS
        .get_or_init(|| Regex::new(r"Encoding:.*?(\d+\.\d+)\s?%").ok())
        .as_ref()
}

/// Extracts the last progress percentage from a chunk of HandBrakeCLI output.
pub fn parse_progress(text: &str) -> Option<f32> {
    progress_regex()?
        .captures_iter(text)
        .last()
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f32>().ok())
}

/// Runs HandBrakeCLI to completion.
///
/// Progress percentages are sent on `progress_tx`. When `shutdown` flips to true the
/// child is killed and [`EncoderError::Cancelled`] is returned.
pub async fn encode(
    config: &HandBrakeConfig,
    request: &EncodeRequest<'_>,
    progress_tx: Option<mpsc::Sender<f32>>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), EncoderError> {
    if let Some(parent) = request.output.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            EncoderError::SpawnFailed(format!("cannot create '{}': {}", parent.display(), e))
        })?;
    }

    let mut cmd = Command::new(&config.path);
    cmd.args(build_args(config, request))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    info!(
        input = %request.input.display(),
        output = %request.output.display(),
        preset = request.preset,
        tracks = %request.options,
        "Starting HandBrakeCLI"
    );
    debug!(command = %command_line(config, request), "HandBrakeCLI command");

    let mut child = cmd
        .spawn()
        .map_err(|e| EncoderError::SpawnFailed(format!("{}: {}", config.path.display(), e)))?;

    // HandBrakeCLI rewrites its progress line with carriage returns.
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(forward_progress(stdout, progress_tx));
    }

    let stderr_task = child.stderr.take().map(|stderr| tokio::spawn(collect_tail(stderr)));

    let status = tokio::select! {
        status = child.wait() => status.map_err(|e| EncoderError::SpawnFailed(e.to_string()))?,
        _ = shutdown_requested(&mut shutdown) => {
            warn!(input = %request.input.display(), "Shutdown requested, stopping HandBrakeCLI");
            if let Err(e) = child.kill().await {
                warn!(error = %e, "Failed to kill HandBrakeCLI");
            }
            return Err(EncoderError::Cancelled);
        }
    };

    let stderr = match stderr_task {
        Some(task) => task.await.unwrap_or_default(),
        None => String::new(),
    };

    if !status.success() {
        return Err(EncoderError::HandBrakeFailed {
            code: status.code().unwrap_or(-1),
            stderr,
        });
    }

    verify_output(request.output)?;

    info!(output = %request.output.display(), "HandBrakeCLI encode completed");
    Ok(())
}

/// Checks that HandBrakeCLI actually produced a non-empty file.
fn verify_output(output: &Path) -> Result<(), EncoderError> {
    match std::fs::metadata(output) {
        Ok(meta) if meta.len() > 0 => Ok(()),
        Ok(_) => Err(EncoderError::VerificationFailed(format!(
            "'{}' is empty",
            output.display()
        ))),
        Err(e) => Err(EncoderError::VerificationFailed(format!(
            "'{}' missing: {}",
            output.display(),
            e
        ))),
    }
}

/// Resolves once the shutdown flag is set. Never resolves if the sender is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn forward_progress<R: AsyncRead + Unpin>(stdout: R, progress_tx: Option<mpsc::Sender<f32>>) {
    let mut segments = BufReader::new(stdout).split(b'\r');
    let mut last_reported = -1.0_f32;

    while let Ok(Some(segment)) = segments.next_segment().await {
        let text = String::from_utf8_lossy(&segment);
        let Some(percent) = parse_progress(&text) else {
            continue;
        };

        // One update per whole percent is plenty.
        if percent.floor() <= last_reported {
            continue;
        }
        last_reported = percent.floor();
        debug!(percent, "HandBrakeCLI progress");

        if let Some(tx) = &progress_tx {
            let _ = tx.send(percent).await;
        }
    }
}

async fn collect_tail<R: AsyncRead + Unpin>(stderr: R) -> String {
    let mut lines = BufReader::new(stderr).lines();
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);

    while let Ok(Some(line)) = lines.next_line().await {
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }

    tail.into_iter().collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{AudioSelection, SubtitleSelection};
    use std::path::PathBuf;

    fn config() -> HandBrakeConfig {
        HandBrakeConfig {
            path: PathBuf::from("HandBrakeCLI"),
            presets_file: Some(PathBuf::from("/presets/presets.json")),
            extra_args: vec!["--aencoder=aac".to_string(), "--ab=192".to_string()],
        }
    }

    fn options() -> EncodeOptions {
        EncodeOptions::new(
            &AudioSelection { tracks: vec![1] },
            &SubtitleSelection {
                tracks: vec![2],
                burn: Some(2),
            },
        )
    }

    #[test]
    fn args_follow_handbrake_order() {
        let options = options();
        let request = EncodeRequest {
            input: Path::new("/in/Film.mkv"),
            output: Path::new("/out/Film_encoded.mkv"),
            preset: "1080p HD-Light 1500kbps",
            options: &options,
        };

        let args: Vec<String> = build_args(&config(), &request)
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            args,
            vec![
                "--preset-import-file",
                "/presets/presets.json",
                "-i",
                "/in/Film.mkv",
                "-o",
                "/out/Film_encoded.mkv",
                "--preset",
                "1080p HD-Light 1500kbps",
                "--audio=1",
                "--subtitle=2",
                "--subtitle-burned=1",
                "--aencoder=aac",
                "--ab=192",
            ]
        );
    }

    #[test]
    fn command_line_quotes_spaces() {
        let options = options();
        let request = EncodeRequest {
            input: Path::new("/in/Film.mkv"),
            output: Path::new("/out/Film_encoded.mkv"),
            preset: "DVD 800kbps",
            options: &options,
        };
        assert!(command_line(&config(), &request).contains("--preset \"DVD 800kbps\""));
    }

    #[test]
    fn progress_is_parsed_from_encoding_lines() {
        assert_eq!(
            parse_progress(
                "Encoding: task 1 of 1, 42.17 % (87.45 fps, avg 90.12 fps, ETA 00h12m03s)"
            ),
            Some(42.17)
        );
        assert_eq!(parse_progress("Encoding: task 1 of 1, 5.00%"), Some(5.0));
        assert_eq!(parse_progress("Muxing: this may take awhile..."), None);
    }

    #[test]
    fn last_progress_in_chunk_wins() {
        let chunk = "Encoding: task 1 of 1, 10.00 %\nEncoding: task 1 of 1, 11.50 %";
        assert_eq!(parse_progress(chunk), Some(11.5));
    }

    #[test]
    fn missing_output_fails_verification() {
        let err = verify_output(Path::new("/nonexistent/out.mkv")).unwrap_err();
        assert!(matches!(err, EncoderError::VerificationFailed(_)));
    }
}
