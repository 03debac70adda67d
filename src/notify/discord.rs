//! Discord webhook notifications.

use serde::Serialize;
use tracing::{error, info};

use crate::config::model::{DiscordConfig, DiscordEvents};
use crate::error::NotificationError;
use crate::queue::job::EncodeJob;

const GREEN: u32 = 0x2ECC71;
const RED: u32 = 0xE74C3C;
const ORANGE: u32 = 0xE67E22;
const BLUE: u32 = 0x3498DB;

/// Discord caps embed field values at 1024 characters.
const FIELD_LIMIT: usize = 1024;

/// Sends pipeline events to a Discord webhook.
pub struct DiscordNotifier {
    webhook_url: String,
    events: DiscordEvents,
    /// User or role mention prepended to failure and manual-review messages.
    mention_on_failure: Option<String>,
    client: reqwest::Client,
}

impl DiscordNotifier {
    pub fn new(config: &DiscordConfig) -> Self {
        Self {
            webhook_url: config.webhook_url.clone(),
            events: config.events.clone(),
            mention_on_failure: config.mention_on_failure.clone(),
            client: reqwest::Client::new(),
        }
    }

    /// Notifies about a completed encode.
    pub async fn notify_encode_success(&self, job: &EncodeJob) -> Result<(), NotificationError> {
        if !self.events.on_encode_success {
            return Ok(());
        }
        self.send(success_embed(job), None).await
    }

    /// Notifies about a HandBrake failure.
    pub async fn notify_encode_failure(&self, job: &EncodeJob) -> Result<(), NotificationError> {
        if !self.events.on_encode_failure {
            return Ok(());
        }
        self.send(failure_embed(job), self.mention_on_failure.as_deref()).await
    }

    /// Notifies that a file needs a human decision.
    pub async fn notify_manual_review(&self, job: &EncodeJob) -> Result<(), NotificationError> {
        if !self.events.on_manual_review {
            return Ok(());
        }
        self.send(manual_review_embed(job), self.mention_on_failure.as_deref()).await
    }

    /// Notifies that the queue drained.
    pub async fn notify_queue_empty(&self, processed: usize) -> Result<(), NotificationError> {
        if !self.events.on_queue_empty {
            return Ok(());
        }
        self.send(queue_empty_embed(processed), None).await
    }

    async fn send(
        &self,
        embed: DiscordEmbed,
        content: Option<&str>,
    ) -> Result<(), NotificationError> {
        let payload = DiscordPayload {
            content: content.map(str::to_string),
            embeds: vec![embed],
        };

        let response = self.client.post(&self.webhook_url).json(&payload).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!(status = %status, body = %text, "Discord webhook failed");
            return Err(NotificationError::DiscordFailed(format!("HTTP {}: {}", status, text)));
        }

        info!("Discord notification sent");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct DiscordPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    embeds: Vec<DiscordEmbed>,
}

#[derive(Debug, Serialize)]
struct DiscordEmbed {
    title: String,
    color: u32,
    fields: Vec<EmbedField>,
}

impl DiscordEmbed {
    fn new(title: &str, color: u32) -> Self {
        Self {
            title: title.to_string(),
            color,
            fields: Vec::new(),
        }
    }

    fn field(mut self, name: &str, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.to_string(),
            value: truncate(&value.into(), FIELD_LIMIT),
            inline,
        });
        self
    }
}

#[derive(Debug, Serialize)]
struct EmbedField {
    name: String,
    value: String,
    inline: bool,
}

fn success_embed(job: &EncodeJob) -> DiscordEmbed {
    let mut embed = DiscordEmbed::new("Encode Complete", GREEN)
        .field("File", job.file_name(), false)
        .field("Preset", job.preset_name.clone(), true);

    if let Some(metadata) = &job.result_metadata {
        embed = embed
            .field("Size", format!("{:.1} MB", metadata.output_size_mb()), true)
            .field("Reduction", format!("{:.1}%", metadata.size_reduction_percent()), true)
            .field("Duration", format_duration(metadata.encode_duration_secs), true);
    }

    embed
}

fn failure_embed(job: &EncodeJob) -> DiscordEmbed {
    DiscordEmbed::new("Encode Failed", RED)
        .field("File", job.file_name(), false)
        .field("Preset", job.preset_name.clone(), true)
        .field("Attempt", job.attempt_count.to_string(), true)
        .field("Error", job.error_message.as_deref().unwrap_or("Unknown error"), false)
}

fn manual_review_embed(job: &EncodeJob) -> DiscordEmbed {
    DiscordEmbed::new("Manual Review Needed", ORANGE)
        .field("File", job.file_name(), false)
        .field("Preset", job.preset_name.clone(), true)
        .field("Reason", job.error_message.as_deref().unwrap_or("Unknown reason"), false)
}

fn queue_empty_embed(processed: usize) -> DiscordEmbed {
    DiscordEmbed::new("Queue Empty", BLUE).field(
        "Status",
        format!("All queued files processed ({} since the queue last emptied).", processed),
        false,
    )
}

/// Formats seconds as `1h 2m 3s`, dropping leading zero units.
fn format_duration(secs: f64) -> String {
    let total = secs.max(0.0) as u64;
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Truncates to at most `max_chars` characters, marking the cut with `...`.
fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::job::EncodeResultMetadata;
    use std::path::{Path, PathBuf};

    fn job() -> EncodeJob {
        EncodeJob::for_file(
            PathBuf::from("/in/Le Film.mkv"),
            Path::new("/out"),
            "1080p HD-Light 1500kbps".to_string(),
        )
    }

    #[test]
    fn success_embed_includes_sizes() {
        let mut job = job();
        job.start();
        job.complete(EncodeResultMetadata {
            input_size: 4_000_000_000,
            output_size: 1_048_576_000,
            encode_duration_secs: 3725.0,
        });

        let embed = success_embed(&job);
        let values: Vec<&str> = embed.fields.iter().map(|f| f.value.as_str()).collect();
        assert_eq!(embed.title, "Encode Complete");
        assert!(values.contains(&"Le Film.mkv"));
        assert!(values.contains(&"1000.0 MB"));
        assert!(values.contains(&"1h 2m 5s"));
    }

    #[test]
    fn manual_review_embed_carries_reason() {
        let mut job = job();
        job.manual_review("no usable French audio track (excluded or missing)".to_string());

        let embed = manual_review_embed(&job);
        assert_eq!(embed.color, ORANGE);
        assert_eq!(
            embed.fields.last().map(|f| f.value.as_str()),
            Some("no usable French audio track (excluded or missing)")
        );
    }

    #[test]
    fn payload_omits_empty_content() {
        let payload = DiscordPayload {
            content: None,
            embeds: vec![queue_empty_embed(3)],
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("content").is_none());
        assert_eq!(json["embeds"][0]["title"], "Queue Empty");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let long = "é".repeat(2000);
        let cut = truncate(&long, FIELD_LIMIT);
        assert_eq!(cut.chars().count(), FIELD_LIMIT);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate("court", FIELD_LIMIT), "court");
    }

    #[test]
    fn durations_drop_zero_units() {
        assert_eq!(format_duration(59.9), "59s");
        assert_eq!(format_duration(61.0), "1m 1s");
    }
}
