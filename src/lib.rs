//! DeepRead Subtitle API - timestamped YouTube transcripts over HTTP
//!
//! This library resolves a video URL to its captions by trying several independent
//! acquisition strategies in priority order (headless browser, yt-dlp, the innertube
//! caption listing) and normalizing whatever comes back into one segment model.

pub mod cli;
pub mod config;
pub mod credentials;
pub mod extractors;
pub mod http;
pub mod output;
pub mod pipeline;
pub mod transcript;
pub mod utils;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use credentials::CredentialBundle;
pub use extractors::{StrategyRegistry, SubtitleStrategy};
pub use pipeline::{PipelineError, StrategyFailure, TranscriptPipeline};
pub use transcript::{FormattedSegment, Segment, TranscriptMeta, TranscriptResult};
pub use utils::VideoId;

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Failure of a single acquisition step
#[derive(thiserror::Error, Debug)]
pub enum SubtitleError {
    #[error("Invalid YouTube URL")]
    InvalidUrl,

    #[error("Failed to fetch caption payload: {0}")]
    Fetch(String),

    #[error("Malformed caption payload: {0}")]
    MalformedPayload(String),

    #[error("No captions found: {0}")]
    NoCaptions(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("{tool} is not available: {reason}")]
    ToolUnavailable { tool: &'static str, reason: String },

    #[error("{0}")]
    Tool(String),

    #[error("Credential file error: {0}")]
    Credentials(String),
}
