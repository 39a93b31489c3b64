use anyhow::Result;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::http::handlers::ExtractResponse;
use crate::transcript::TranscriptResult;

/// Render a transcript in the requested format
pub fn render(result: &TranscriptResult, format: &OutputFormat) -> Result<String> {
    let content = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&ExtractResponse {
            success: true,
            result: result.clone(),
        })?,
        OutputFormat::Text => format_as_text(result),
    };
    Ok(content)
}

/// Save transcript to file
pub fn save_to_file(result: &TranscriptResult, path: &Path, format: &OutputFormat) -> Result<()> {
    fs_err::write(path, render(result, format)?)?;
    Ok(())
}

/// Print transcript to console
pub fn print_to_console(result: &TranscriptResult, format: &OutputFormat) -> Result<()> {
    println!("{}", render(result, format)?);
    Ok(())
}

fn format_as_text(result: &TranscriptResult) -> String {
    let mut out = format!(
        "Video: {}\nSegments: {} | Words: {} | Duration: {} | Source: {}\n\n",
        result.video_id,
        result.meta.segment_count,
        result.meta.word_count,
        result.meta.duration_formatted,
        result.meta.source
    );

    for segment in &result.transcript {
        out.push_str(&format!("[{}] {}\n", segment.timestamp, segment.text));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Segment;
    use crate::utils::extract_video_id;

    fn result() -> TranscriptResult {
        let video_id = extract_video_id("v=dQw4w9WgXcQ").unwrap();
        TranscriptResult::from_segments(
            video_id,
            &[Segment::new("hello", 0.0, 1.0), Segment::new("again", 65.0, 2.0)],
            "yt_dlp",
        )
    }

    #[test]
    fn test_text_output() {
        let text = render(&result(), &OutputFormat::Text).unwrap();
        assert!(text.contains("Video: dQw4w9WgXcQ"));
        assert!(text.contains("[0:00] hello\n"));
        assert!(text.contains("[1:05] again\n"));
        assert!(text.contains("Duration: 1:07"));
    }

    #[test]
    fn test_json_output_matches_http_shape() {
        let json: serde_json::Value =
            serde_json::from_str(&render(&result(), &OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["meta"]["segment_count"], 2);
    }

    #[test]
    fn test_save_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.txt");
        save_to_file(&result(), &path, &OutputFormat::Text).unwrap();
        assert!(std::fs::read_to_string(path).unwrap().contains("hello"));
    }
}
