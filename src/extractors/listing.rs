//! Transcript listing through the innertube player API.
//!
//! The player endpoint lists every caption track of a video; the selected track is then
//! downloaded as timed-text XML, which already carries one cue per element.

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;

use super::SubtitleStrategy;
use crate::config::TranscriptApiConfig;
use crate::credentials::CredentialBundle;
use crate::transcript::Segment;
use crate::utils::{VideoId, ENGLISH_VARIANTS};
use crate::SubtitleError;

const PLAYER_URL: &str = "https://www.youtube.com/youtubei/v1/player?prettyPrint=false";
const YOUTUBE_HOST: &str = "www.youtube.com";
const YOUTUBE_REFERER: &str = "https://www.youtube.com/";
const CLIENT_NAME: &str = "ANDROID";
const CLIENT_VERSION: &str = "20.10.38";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Captions {
    player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TracklistRenderer {
    #[serde(default)]
    caption_tracks: Vec<CaptionTrack>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: String,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    name: Option<TrackName>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackName {
    simple_text: Option<String>,
    #[serde(default)]
    runs: Vec<TextRun>,
}

#[derive(Debug, Deserialize)]
struct TextRun {
    text: String,
}

/// One transcript available for a video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptListing {
    pub language_code: String,
    pub name: String,
    pub is_generated: bool,
    pub base_url: String,
}

/// Caption extraction through the transcript listing
pub struct TranscriptListingStrategy {
    config: TranscriptApiConfig,
    client: reqwest::Client,
}

impl TranscriptListingStrategy {
    pub fn new(config: TranscriptApiConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    /// List all transcripts of a video, in the order the player reports them
    pub async fn list_transcripts(
        &self,
        video_id: &VideoId,
        credentials: &CredentialBundle,
    ) -> Result<Vec<TranscriptListing>, SubtitleError> {
        let body = serde_json::json!({
            "context": {
                "client": {
                    "clientName": CLIENT_NAME,
                    "clientVersion": CLIENT_VERSION,
                    "hl": "en"
                }
            },
            "videoId": video_id.as_str()
        });

        let mut request = self
            .client
            .post(PLAYER_URL)
            .timeout(self.timeout())
            .header(reqwest::header::REFERER, YOUTUBE_REFERER)
            .json(&body);
        if let Some(cookies) = credentials.cookie_header(YOUTUBE_HOST) {
            request = request.header(reqwest::header::COOKIE, cookies);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SubtitleError::Fetch(e.to_string()))?;
        if !response.status().is_success() {
            return Err(SubtitleError::Fetch(format!(
                "player API returned HTTP {}",
                response.status()
            )));
        }

        let player: PlayerResponse = response
            .json()
            .await
            .map_err(|e| SubtitleError::MalformedPayload(e.to_string()))?;

        listings_from_player(player)
    }

    /// Download one transcript as structured segments
    pub async fn fetch_transcript(
        &self,
        listing: &TranscriptListing,
        credentials: &CredentialBundle,
    ) -> Result<Vec<Segment>, SubtitleError> {
        let url = strip_format_param(&listing.base_url);

        let mut request = self.client.get(&url).timeout(self.timeout());
        if let Some(cookies) = credentials.cookie_header(YOUTUBE_HOST) {
            request = request.header(reqwest::header::COOKIE, cookies);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SubtitleError::Fetch(e.to_string()))?;
        if !response.status().is_success() {
            return Err(SubtitleError::Fetch(format!("HTTP {}", response.status())));
        }

        let xml = response
            .text()
            .await
            .map_err(|e| SubtitleError::Fetch(e.to_string()))?;
        if xml.trim().is_empty() {
            return Err(SubtitleError::Fetch("empty transcript body".to_string()));
        }

        parse_timed_text_xml(&xml)
    }
}

#[async_trait]
impl SubtitleStrategy for TranscriptListingStrategy {
    fn name(&self) -> &'static str {
        "transcript_api"
    }

    async fn attempt(
        &self,
        video_id: &VideoId,
        credentials: &CredentialBundle,
    ) -> Result<Vec<Segment>, SubtitleError> {
        let listings = self.list_transcripts(video_id, credentials).await?;
        tracing::debug!(
            "Available transcripts: {:?}",
            listings.iter().map(|l| l.language_code.as_str()).collect::<Vec<_>>()
        );

        let listing = select_transcript(&listings)
            .ok_or_else(|| SubtitleError::NoCaptions("transcript list is empty".to_string()))?;
        tracing::info!(
            "Transcript API selected {} ({})",
            listing.language_code,
            listing.name
        );

        self.fetch_transcript(listing, credentials).await
    }
}

fn listings_from_player(player: PlayerResponse) -> Result<Vec<TranscriptListing>, SubtitleError> {
    let tracks = player
        .captions
        .and_then(|c| c.player_captions_tracklist_renderer)
        .map(|r| r.caption_tracks)
        .unwrap_or_default();

    if tracks.is_empty() {
        let reason = player
            .playability_status
            .filter(|p| p.status.as_deref() != Some("OK"))
            .map(|p| {
                p.reason
                    .or(p.status)
                    .unwrap_or_else(|| "video unplayable".to_string())
            })
            .unwrap_or_else(|| "transcripts are disabled for this video".to_string());
        return Err(SubtitleError::NoCaptions(reason));
    }

    Ok(tracks
        .into_iter()
        .map(|track| {
            let name = track
                .name
                .map(|n| {
                    n.simple_text
                        .unwrap_or_else(|| n.runs.into_iter().map(|r| r.text).collect())
                })
                .unwrap_or_else(|| track.language_code.clone());

            TranscriptListing {
                is_generated: track.kind.as_deref() == Some("asr"),
                language_code: track.language_code,
                name,
                base_url: track.base_url,
            }
        })
        .collect())
}

/// First English variant, otherwise the first transcript listed
pub fn select_transcript(listings: &[TranscriptListing]) -> Option<&TranscriptListing> {
    let english = listings
        .iter()
        .find(|l| ENGLISH_VARIANTS.contains(&l.language_code.as_str()));

    if english.is_none() {
        if let Some(first) = listings.first() {
            tracing::warn!(
                "No English transcript, falling back to {} ({})",
                first.language_code,
                first.name
            );
        }
    }

    english.or_else(|| listings.first())
}

fn strip_format_param(url: &str) -> String {
    static FMT_PARAM: OnceLock<Regex> = OnceLock::new();
    let fmt_param = FMT_PARAM.get_or_init(|| Regex::new(r"&fmt=[^&]*").expect("static regex"));
    fmt_param.replace_all(url, "").into_owned()
}

/// Parse `<transcript><text start=".." dur="..">..</text></transcript>`
pub fn parse_timed_text_xml(xml: &str) -> Result<Vec<Segment>, SubtitleError> {
    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    let mut seen_root = false;
    // start, dur and accumulated text of the open <text> element
    let mut cue: Option<(f64, f64, String)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"transcript" => seen_root = true,
                b"text" => cue = Some((attr_secs(&e, b"start"), attr_secs(&e, b"dur"), String::new())),
                _ => {}
            },
            // A self-closing <text/> carries no words
            Ok(Event::Empty(e)) => {
                if e.name().as_ref() == b"transcript" {
                    seen_root = true;
                }
            }
            Ok(Event::Text(t)) => {
                if let Some((_, _, text)) = cue.as_mut() {
                    match t.unescape() {
                        Ok(chunk) => text.push_str(&chunk),
                        Err(_) => text.push_str(&String::from_utf8_lossy(&t)),
                    }
                }
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"text" {
                    if let Some((start, dur, raw)) = cue.take() {
                        let text = clean_cue_text(&raw);
                        if !text.is_empty() {
                            segments.push(Segment::new(text, start, dur));
                        }
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                return Err(SubtitleError::MalformedPayload(format!(
                    "invalid timed-text XML at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }

    if !seen_root {
        return Err(SubtitleError::MalformedPayload(
            "missing <transcript> element".to_string(),
        ));
    }

    Ok(segments)
}

fn attr_secs(element: &BytesStart, key: &[u8]) -> f64 {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().and_then(|v| v.trim().parse().ok()))
        .unwrap_or(0.0)
}

/// Cue text arrives escaped twice; markup such as `<font>` only shows up after the second pass
fn clean_cue_text(raw: &str) -> String {
    static TAG: OnceLock<Regex> = OnceLock::new();
    let tag_re = TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("static regex"));

    let unescaped = quick_xml::escape::unescape_with(raw, |entity| match entity {
        "nbsp" => Some(" "),
        other => quick_xml::escape::resolve_predefined_entity(other),
    })
    .unwrap_or(std::borrow::Cow::Borrowed(raw));

    tag_re.replace_all(&unescaped, "").trim().to_string()
}
