//! Decoder for YouTube's event-based timed-text format (`fmt=json3`)

use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

use super::Segment;
use crate::SubtitleError;

#[derive(Debug, Deserialize)]
struct TimedTextPayload {
    events: Option<Vec<TimedTextEvent>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimedTextEvent {
    #[serde(default)]
    t_start_ms: f64,
    #[serde(default)]
    d_duration_ms: f64,
    segs: Option<Vec<TimedTextSeg>>,
}

#[derive(Debug, Deserialize)]
struct TimedTextSeg {
    #[serde(default)]
    utf8: String,
}

/// Decode a json3 payload into segments.
///
/// Events without visible text (window/style events, bare newlines) are dropped.
pub fn decode(payload: &[u8]) -> Result<Vec<Segment>, SubtitleError> {
    let parsed: TimedTextPayload = serde_json::from_slice(payload)
        .map_err(|e| SubtitleError::MalformedPayload(e.to_string()))?;

    let events = parsed
        .events
        .ok_or_else(|| SubtitleError::MalformedPayload("missing `events` array".to_string()))?;

    let segments = events
        .into_iter()
        .filter_map(|event| {
            let segs = event.segs?;
            let text = segs
                .iter()
                .map(|seg| seg.utf8.as_str())
                .collect::<String>();
            let text = text.trim();
            if text.is_empty() {
                return None;
            }

            Some(Segment::new(
                text,
                event.t_start_ms / 1000.0,
                event.d_duration_ms / 1000.0,
            ))
        })
        .collect();

    Ok(segments)
}

/// Force the json3 format on a caption track URL
pub fn json3_url(track_url: &str) -> String {
    static FMT_PARAM: OnceLock<Regex> = OnceLock::new();
    let fmt_param = FMT_PARAM.get_or_init(|| Regex::new(r"([?&])fmt=[^&]*").expect("static regex"));

    let url = track_url.replace("\\u0026", "&");
    if fmt_param.is_match(&url) {
        fmt_param.replace(&url, "${1}fmt=json3").into_owned()
    } else if url.contains('?') {
        format!("{}&fmt=json3", url)
    } else {
        format!("{}?fmt=json3", url)
    }
}

/// Fetch a caption track and decode it
pub async fn fetch_and_decode(
    client: &reqwest::Client,
    track_url: &str,
) -> Result<Vec<Segment>, SubtitleError> {
    let url = json3_url(track_url);
    tracing::debug!("Fetching caption track: {}", url);

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| SubtitleError::Fetch(e.to_string()))?;

    if !response.status().is_success() {
        return Err(SubtitleError::Fetch(format!("HTTP {}", response.status())));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| SubtitleError::Fetch(e.to_string()))?;

    if body.is_empty() {
        return Err(SubtitleError::Fetch("empty response body".to_string()));
    }

    decode(&body)
}
