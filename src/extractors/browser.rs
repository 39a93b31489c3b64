//! Headless-browser strategy.
//!
//! Drives Chromium through Node.js + Playwright: the watch page is loaded with the
//! session cookies, and the caption track list is read from the player response the
//! page exposes as `window.ytInitialPlayerResponse`.

use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{CaptionTrackRef, SubtitleStrategy};
use crate::config::BrowserConfig;
use crate::credentials::CredentialBundle;
use crate::transcript::{decoder, Segment};
use crate::utils::VideoId;
use crate::SubtitleError;

/// Slack on top of navigation + settle time before the Node process is killed
const HARD_TIMEOUT_SLACK: Duration = Duration::from_secs(15);

// stdout carries exactly one JSON object; the browser is closed in `finally`.
const JS: &str = r#"
const fs = require('fs');

function ok(obj) { process.stdout.write(JSON.stringify(obj)); }
function bad(code, message) { ok({ ok: false, error: { code, message } }); }

async function main() {
  let req;
  try { req = JSON.parse(fs.readFileSync(0, 'utf8')); } catch (e) { return bad('invalid_params', 'bad JSON args'); }

  let pw;
  try { pw = require('playwright'); } catch (e) {
    return bad('not_configured', 'require("playwright") failed; install it with `npm i -g playwright && npx playwright install chromium`');
  }

  let browser;
  try {
    browser = await pw.chromium.launch({ headless: true });
    const context = await browser.newContext({
      userAgent: req.user_agent,
      viewport: { width: 1920, height: 1080 },
      locale: 'en-US',
    });
    if (req.cookies && req.cookies.length > 0) {
      await context.addCookies(req.cookies);
    }

    const page = await context.newPage();
    try {
      await page.goto(req.url, { waitUntil: 'networkidle', timeout: req.timeout_ms });
    } catch (e) {
      if (e && e.name === 'TimeoutError') return bad('timeout', String(e.message || e));
      throw e;
    }
    await page.waitForTimeout(req.settle_ms);

    const tracks = await page.evaluate(() => {
      const pr = window.ytInitialPlayerResponse;
      if (!pr) return null;
      const renderer = pr.captions && pr.captions.playerCaptionsTracklistRenderer;
      const list = (renderer && renderer.captionTracks) || [];
      return list.map((t) => ({
        language_code: t.languageCode || '',
        kind: t.kind || '',
        base_url: t.baseUrl || '',
      }));
    });
    if (tracks === null) return bad('no_player_response', 'ytInitialPlayerResponse not found on page');

    ok({ ok: true, tracks });
  } catch (e) {
    bad('failed', String(e && e.message ? e.message : e));
  } finally {
    try { if (browser) await browser.close(); } catch (_) {}
  }
}

main().catch((e) => bad('failed', String(e && e.message ? e.message : e)));
"#;

#[derive(Debug, Deserialize)]
struct ScriptOutput {
    ok: bool,
    #[serde(default)]
    tracks: Vec<ScriptTrack>,
    error: Option<ScriptError>,
}

#[derive(Debug, Deserialize)]
struct ScriptTrack {
    language_code: String,
    #[serde(default)]
    kind: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ScriptError {
    code: String,
    message: String,
}

/// Caption extraction through a disposable headless browser session
pub struct BrowserStrategy {
    config: BrowserConfig,
    client: reqwest::Client,
}

impl BrowserStrategy {
    pub fn new(config: BrowserConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// Load the watch page and list its caption tracks
    async fn list_tracks(
        &self,
        video_id: &VideoId,
        credentials: &CredentialBundle,
    ) -> Result<Vec<CaptionTrackRef>, SubtitleError> {
        let args = serde_json::json!({
            "url": video_id.watch_url(),
            "user_agent": self.config.user_agent,
            "timeout_ms": self.config.navigation_timeout_secs * 1000,
            "settle_ms": self.config.settle_delay_ms,
            "cookies": playwright_cookies(credentials),
        })
        .to_string();

        let mut child = Command::new(&self.config.node_path)
            .arg("-e")
            .arg(JS)
            .kill_on_drop(true)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SubtitleError::ToolUnavailable {
                tool: "node",
                reason: e.to_string(),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A failed write surfaces as a bad-args error from the script
            if let Err(e) = stdin.write_all(args.as_bytes()).await {
                tracing::debug!("Failed to write browser script args: {}", e);
            }
            if let Err(e) = stdin.shutdown().await {
                tracing::debug!("Failed to close browser script stdin: {}", e);
            }
        }

        let hard_timeout = Duration::from_secs(self.config.navigation_timeout_secs)
            + Duration::from_millis(self.config.settle_delay_ms)
            + HARD_TIMEOUT_SLACK;

        // Dropping the wait future drops the child, and kill_on_drop tears the browser down
        let output = match tokio::time::timeout(hard_timeout, child.wait_with_output()).await {
            Ok(output) => output.map_err(|e| SubtitleError::Tool(format!("node failed: {}", e)))?,
            Err(_) => return Err(SubtitleError::Timeout(hard_timeout.as_secs())),
        };

        if !output.stderr.is_empty() {
            tracing::debug!(
                "Browser script stderr: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        parse_script_output(&output.stdout, self.config.navigation_timeout_secs)
    }
}

#[async_trait]
impl SubtitleStrategy for BrowserStrategy {
    fn name(&self) -> &'static str {
        "browser_automation"
    }

    async fn attempt(
        &self,
        video_id: &VideoId,
        credentials: &CredentialBundle,
    ) -> Result<Vec<Segment>, SubtitleError> {
        let tracks = self.list_tracks(video_id, credentials).await?;
        tracing::debug!("Browser found {} caption tracks", tracks.len());

        let track = select_track(&tracks).ok_or_else(|| {
            SubtitleError::NoCaptions("player response has no caption tracks".to_string())
        })?;
        tracing::info!(
            "Browser selected {} track (auto-generated: {})",
            track.language_code,
            track.is_generated
        );

        decoder::fetch_and_decode(&self.client, &track.url).await
    }
}

/// Translate the Netscape cookie lines into Playwright cookie objects
pub fn playwright_cookies(credentials: &CredentialBundle) -> Vec<serde_json::Value> {
    credentials
        .cookies()
        .into_iter()
        .map(|cookie| {
            let expires = if cookie.expires > 0 {
                cookie.expires as f64
            } else {
                -1.0
            };
            serde_json::json!({
                "name": cookie.name,
                "value": cookie.value,
                "domain": cookie.domain,
                "path": cookie.path,
                "expires": expires,
                "httpOnly": cookie.http_only,
                "secure": cookie.secure,
            })
        })
        .collect()
}

/// Prefer an English track, else take the first one
pub fn select_track(tracks: &[CaptionTrackRef]) -> Option<&CaptionTrackRef> {
    tracks
        .iter()
        .find(|t| t.language_code.starts_with("en"))
        .or_else(|| tracks.first())
}

fn parse_script_output(
    stdout: &[u8],
    navigation_timeout_secs: u64,
) -> Result<Vec<CaptionTrackRef>, SubtitleError> {
    let output: ScriptOutput = serde_json::from_slice(stdout).map_err(|e| {
        SubtitleError::Tool(format!("browser script returned invalid JSON: {}", e))
    })?;

    if !output.ok {
        let (code, message) = output
            .error
            .map(|e| (e.code, e.message))
            .unwrap_or_else(|| ("failed".to_string(), "browser script failed".to_string()));

        return Err(match code.as_str() {
            "not_configured" => SubtitleError::ToolUnavailable {
                tool: "playwright",
                reason: message,
            },
            "timeout" => SubtitleError::Timeout(navigation_timeout_secs),
            "no_player_response" => SubtitleError::NoCaptions(message),
            _ => SubtitleError::Tool(message),
        });
    }

    Ok(output
        .tracks
        .into_iter()
        .filter(|t| !t.base_url.is_empty())
        .map(|t| CaptionTrackRef {
            language_code: t.language_code,
            is_generated: t.kind == "asr",
            url: t.base_url,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(lang: &str, generated: bool) -> CaptionTrackRef {
        CaptionTrackRef {
            language_code: lang.to_string(),
            is_generated: generated,
            url: format!("https://www.youtube.com/api/timedtext?lang={}", lang),
        }
    }

    #[test]
    fn test_select_track_prefers_english() {
        let tracks = vec![track("de", false), track("en", true), track("fr", false)];
        assert_eq!(select_track(&tracks).unwrap().language_code, "en");

        let tracks = vec![track("de", false), track("en-GB", false)];
        assert_eq!(select_track(&tracks).unwrap().language_code, "en-GB");
    }

    #[test]
    fn test_select_track_falls_back_to_first() {
        let tracks = vec![track("ja", false), track("ko", false)];
        assert_eq!(select_track(&tracks).unwrap().language_code, "ja");
        assert!(select_track(&[]).is_none());
    }

    #[test]
    fn test_playwright_cookies() {
        let bundle = CredentialBundle::new(
            "# comment\n.youtube.com\tTRUE\t/\tTRUE\t1999999999\tSID\tabc\nbroken\n#HttpOnly_.youtube.com\tTRUE\t/\tFALSE\t0\tPREF\tx\n",
        );
        let cookies = playwright_cookies(&bundle);
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0]["name"], "SID");
        assert_eq!(cookies[0]["domain"], ".youtube.com");
        assert_eq!(cookies[0]["secure"], true);
        assert_eq!(cookies[0]["expires"], 1999999999.0);
        assert_eq!(cookies[0]["httpOnly"], false);
        assert_eq!(cookies[1]["expires"], -1.0);
        assert_eq!(cookies[1]["httpOnly"], true);
        assert_eq!(cookies[1]["domain"], ".youtube.com");
    }

    #[test]
    fn test_parse_script_output_tracks() {
        let stdout = br#"{"ok": true, "tracks": [
            {"language_code": "en", "kind": "asr", "base_url": "https://example.com/a"},
            {"language_code": "de", "kind": "", "base_url": ""}
        ]}"#;
        let tracks = parse_script_output(stdout, 30).unwrap();
        assert_eq!(tracks, vec![CaptionTrackRef {
            language_code: "en".to_string(),
            is_generated: true,
            url: "https://example.com/a".to_string(),
        }]);
    }

    #[test]
    fn test_parse_script_output_errors() {
        let err = parse_script_output(
            br#"{"ok": false, "error": {"code": "timeout", "message": "Timeout 30000ms exceeded"}}"#,
            30,
        )
        .unwrap_err();
        assert!(matches!(err, SubtitleError::Timeout(30)));

        let err = parse_script_output(
            br#"{"ok": false, "error": {"code": "no_player_response", "message": "missing"}}"#,
            30,
        )
        .unwrap_err();
        assert!(matches!(err, SubtitleError::NoCaptions(_)));

        let err = parse_script_output(b"", 30).unwrap_err();
        assert!(matches!(err, SubtitleError::Tool(_)));
    }

    #[tokio::test]
    async fn test_missing_node_binary() {
        let config = BrowserConfig {
            node_path: "definitely-not-a-real-node-binary".to_string(),
            ..BrowserConfig::default()
        };
        let strategy = BrowserStrategy::new(config, reqwest::Client::new());
        let video_id = crate::utils::extract_video_id("v=dQw4w9WgXcQ").unwrap();

        let err = strategy
            .attempt(&video_id, &CredentialBundle::empty())
            .await
            .unwrap_err();
        assert!(matches!(err, SubtitleError::ToolUnavailable { tool: "node", .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_attempt_without_tracks_is_no_captions() {
        use crate::extractors::test_support::{client, fake_tool};

        let dir = tempfile::tempdir().unwrap();
        let script = r#"cat > /dev/null
printf '%s' '{"ok":true,"tracks":[]}'"#;
        let config = BrowserConfig {
            node_path: fake_tool(dir.path(), "node", script).to_string_lossy().into_owned(),
            ..BrowserConfig::default()
        };
        let strategy = BrowserStrategy::new(config, client());
        let video_id = crate::utils::extract_video_id("v=dQw4w9WgXcQ").unwrap();

        let err = strategy
            .attempt(&video_id, &CredentialBundle::empty())
            .await
            .unwrap_err();
        assert!(matches!(err, SubtitleError::NoCaptions(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_attempt_passes_cookies_and_fetches_track() {
        use crate::extractors::test_support::{client, fake_tool, serve_captions, JSON3_PAYLOAD};

        let track_url = serve_captions(JSON3_PAYLOAD).await;
        let stdout = serde_json::json!({
            "ok": true,
            "tracks": [
                {"language_code": "de", "kind": "", "base_url": "http://127.0.0.1:9/unused"},
                {"language_code": "en", "kind": "asr", "base_url": track_url}
            ]
        });

        let dir = tempfile::tempdir().unwrap();
        let args_record = dir.path().join("args.json");
        let script = format!(
            "cat > \"{}\"\nprintf '%s' '{}'",
            args_record.display(),
            stdout
        );
        let config = BrowserConfig {
            node_path: fake_tool(dir.path(), "node", &script).to_string_lossy().into_owned(),
            ..BrowserConfig::default()
        };
        let strategy = BrowserStrategy::new(config, client());
        let video_id = crate::utils::extract_video_id("v=dQw4w9WgXcQ").unwrap();
        let credentials =
            CredentialBundle::new("#HttpOnly_.youtube.com\tTRUE\t/\tTRUE\t0\tSID\tabc\n");

        let segments = strategy.attempt(&video_id, &credentials).await.unwrap();
        assert_eq!(segments, vec![Segment::new("Hello world", 1.0, 2.0)]);

        let args: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&args_record).unwrap()).unwrap();
        assert_eq!(args["url"], "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(args["cookies"][0]["name"], "SID");
        assert_eq!(args["cookies"][0]["httpOnly"], true);
    }
}
