use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// YouTube watch page base URL
pub const WATCH_URL: &str = "https://www.youtube.com/watch";

/// Desktop Chrome user agent shared by the browser session and the HTTP client
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Preferred caption languages, in priority order
pub const ENGLISH_VARIANTS: [&str; 3] = ["en", "en-US", "en-GB"];

/// The 11-character token naming a video
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch page for this video
    pub fn watch_url(&self) -> String {
        format!("{}?v={}", WATCH_URL, urlencoding::encode(&self.0))
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn video_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"v=([a-zA-Z0-9_-]{11})").expect("static regex"))
}

/// Extract the video identifier following a `v=` marker
pub fn extract_video_id(url: &str) -> Option<VideoId> {
    video_id_pattern()
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| VideoId(m.as_str().to_string()))
}

/// Render seconds as `H:MM:SS`, or `M:SS` below one hour
pub fn format_timestamp(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Count whitespace-delimited tokens
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Check if the current environment has the tools the strategies shell out to
pub async fn check_dependencies(yt_dlp_path: &str, node_path: &str) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(yt_dlp_path).await {
        missing.push(format!("{} - required by the yt-dlp strategy", yt_dlp_path));
    }

    if !check_command_available(node_path).await {
        missing.push(format!(
            "{} - required by the browser strategy (with the playwright package)",
            node_path
        ));
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg("--version")
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}
