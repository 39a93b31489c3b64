use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::{CaptionTrackRef, SubtitleStrategy};
use crate::config::YtDlpConfig;
use crate::credentials::{CookieFile, CredentialBundle};
use crate::transcript::{decoder, Segment};
use crate::utils::{VideoId, ENGLISH_VARIANTS};
use crate::SubtitleError;

/// Subtitle format requested from yt-dlp
const SUBTITLE_FORMAT: &str = "json3";

/// Subset of the `--dump-single-json` output we care about
#[derive(Debug, Default, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub subtitles: HashMap<String, Vec<SubtitleFormat>>,

    #[serde(default)]
    pub automatic_captions: HashMap<String, Vec<SubtitleFormat>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubtitleFormat {
    #[serde(default)]
    pub ext: String,
    pub url: Option<String>,
}

/// Caption extraction through yt-dlp's subtitle metadata
pub struct YtDlpStrategy {
    config: YtDlpConfig,
    client: reqwest::Client,
}

impl YtDlpStrategy {
    pub fn new(config: YtDlpConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// Get subtitle metadata using yt-dlp, with cookies if any
    async fn get_video_info(
        &self,
        video_id: &VideoId,
        credentials: &CredentialBundle,
    ) -> Result<VideoInfo, SubtitleError> {
        // Deleted when this function returns, whichever way it returns
        let cookie_file = CookieFile::materialize(credentials)?;

        let sub_langs = ENGLISH_VARIANTS.join(",");
        let mut command = Command::new(&self.config.path);
        command
            .args([
                "--dump-single-json",
                "--skip-download",
                "--no-playlist",
                "--no-warnings",
                "--write-subs",
                "--write-auto-subs",
                "--sub-langs",
                sub_langs.as_str(),
                "--sub-format",
                SUBTITLE_FORMAT,
            ])
            .kill_on_drop(true)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(file) = &cookie_file {
            command.arg("--cookies").arg(file.path());
        }
        command.arg(video_id.watch_url());

        tracing::debug!("Extracting subtitle metadata for: {}", video_id);

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let output = tokio::time::timeout(timeout, command.output())
            .await
            .map_err(|_| SubtitleError::Timeout(self.config.timeout_secs))?
            .map_err(|e| SubtitleError::ToolUnavailable {
                tool: "yt-dlp",
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(SubtitleError::Tool(format!("yt-dlp failed: {}", error.trim())));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| SubtitleError::Tool(format!("yt-dlp returned invalid JSON: {}", e)))
    }
}

#[async_trait]
impl SubtitleStrategy for YtDlpStrategy {
    fn name(&self) -> &'static str {
        "yt_dlp"
    }

    async fn attempt(
        &self,
        video_id: &VideoId,
        credentials: &CredentialBundle,
    ) -> Result<Vec<Segment>, SubtitleError> {
        let info = self.get_video_info(video_id, credentials).await?;

        if info.subtitles.is_empty() && info.automatic_captions.is_empty() {
            return Err(SubtitleError::NoCaptions(
                "yt-dlp reported no subtitles or automatic captions".to_string(),
            ));
        }

        let track = select_track(&info).ok_or_else(|| {
            SubtitleError::NoCaptions(format!(
                "no {} track in languages {}",
                SUBTITLE_FORMAT,
                ENGLISH_VARIANTS.join(", ")
            ))
        })?;
        tracing::info!(
            "yt-dlp selected {} track (auto-generated: {})",
            track.language_code,
            track.is_generated
        );

        decoder::fetch_and_decode(&self.client, &track.url).await
    }
}

/// Manual subtitles before automatic captions; languages in priority order;
/// first json3 entry within the chosen language
pub fn select_track(info: &VideoInfo) -> Option<CaptionTrackRef> {
    [(&info.subtitles, false), (&info.automatic_captions, true)]
        .into_iter()
        .find_map(|(tracks, is_generated)| {
            let (lang, formats) = ENGLISH_VARIANTS
                .iter()
                .find_map(|lang| tracks.get(*lang).map(|formats| (*lang, formats)))?;

            formats
                .iter()
                .find(|f| f.ext == SUBTITLE_FORMAT)
                .and_then(|f| f.url.clone())
                .map(|url| CaptionTrackRef {
                    language_code: lang.to_string(),
                    is_generated,
                    url,
                })
        })
}
