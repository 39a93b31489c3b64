use serde::{Deserialize, Serialize};

use crate::utils::{format_timestamp, word_count, VideoId};

pub mod decoder;

/// One timed caption cue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Cue text
    pub text: String,

    /// Start time in seconds
    pub start: f64,

    /// Duration in seconds (0 for instantaneous cues)
    pub duration: f64,
}

impl Segment {
    pub fn new(text: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            text: text.into(),
            start: start.max(0.0),
            duration: duration.max(0.0),
        }
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Segment as returned to clients, with id, end time and rendered timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedSegment {
    pub segment_id: String,
    pub start: f64,
    pub duration: f64,
    pub end: f64,
    pub timestamp: String,
    pub text: String,
}

impl FormattedSegment {
    fn from_segment(index: usize, segment: &Segment) -> Self {
        Self {
            segment_id: format!("seg_{:04}", index),
            start: segment.start,
            duration: segment.duration,
            end: segment.end(),
            timestamp: format_timestamp(segment.start),
            text: segment.text.clone(),
        }
    }
}

/// Summary statistics of a transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMeta {
    pub segment_count: usize,
    pub word_count: usize,
    pub duration_seconds: f64,
    pub duration_formatted: String,

    /// Name of the strategy that produced the segments
    pub source: String,
}

/// Successful extraction result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptResult {
    pub video_id: VideoId,

    /// All segment texts joined by single spaces
    #[serde(skip_serializing, default)]
    pub full_text: String,

    pub transcript: Vec<FormattedSegment>,

    pub meta: TranscriptMeta,
}

impl TranscriptResult {
    /// Build the client-facing result from the raw segments of one strategy
    pub fn from_segments(video_id: VideoId, segments: &[Segment], source: &str) -> Self {
        let full_text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let transcript = segments
            .iter()
            .enumerate()
            .map(|(idx, seg)| FormattedSegment::from_segment(idx, seg))
            .collect::<Vec<_>>();

        let duration_seconds = total_duration(segments);

        Self {
            meta: TranscriptMeta {
                segment_count: transcript.len(),
                word_count: word_count(&full_text),
                duration_seconds,
                duration_formatted: format_timestamp(duration_seconds),
                source: source.to_string(),
            },
            video_id,
            full_text,
            transcript,
        }
    }
}

/// End of the last segment, or 0 for an empty transcript
pub fn total_duration(segments: &[Segment]) -> f64 {
    segments.last().map(Segment::end).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::extract_video_id;

    fn video_id() -> VideoId {
        extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap()
    }

    fn sample_segments() -> Vec<Segment> {
        vec![
            Segment::new("Never gonna give", 0.0, 5.0),
            Segment::new("you up", 5.0, 6.0),
            Segment::new("never gonna let you down", 12.0, 3.0),
        ]
    }

    #[test]
    fn test_totals() {
        let result = TranscriptResult::from_segments(video_id(), &sample_segments(), "yt_dlp");
        assert_eq!(result.meta.duration_seconds, 15.0);
        assert_eq!(result.meta.duration_formatted, "0:15");
        assert_eq!(result.meta.word_count, 3 + 2 + 5);
        assert_eq!(result.meta.segment_count, 3);
        assert_eq!(result.meta.source, "yt_dlp");
        assert_eq!(
            result.full_text,
            "Never gonna give you up never gonna let you down"
        );
    }

    #[test]
    fn test_formatted_segments() {
        let result = TranscriptResult::from_segments(video_id(), &sample_segments(), "yt_dlp");
        let second = &result.transcript[1];
        assert_eq!(result.transcript[0].segment_id, "seg_0000");
        assert_eq!(second.segment_id, "seg_0001");
        assert_eq!(second.end, 11.0);
        assert_eq!(second.timestamp, "0:05");
    }

    #[test]
    fn test_empty_transcript() {
        let result = TranscriptResult::from_segments(video_id(), &[], "browser_automation");
        assert_eq!(result.meta.duration_seconds, 0.0);
        assert_eq!(result.meta.word_count, 0);
        assert!(result.transcript.is_empty());
    }

    #[test]
    fn test_serialized_shape() {
        let result = TranscriptResult::from_segments(video_id(), &sample_segments(), "yt_dlp");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["video_id"], "dQw4w9WgXcQ");
        assert_eq!(json["transcript"][2]["segment_id"], "seg_0002");
        assert_eq!(json["meta"]["segment_count"], 3);
        assert!(json.get("full_text").is_none());
    }
}
