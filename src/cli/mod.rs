use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "subtitle-api",
    about = "DeepRead Subtitle API - timestamped YouTube transcripts over HTTP",
    version,
    long_about = "Extracts YouTube captions by trying a headless browser, yt-dlp and the innertube transcript listing in turn, and serves the normalized transcript as JSON."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Bind address (overrides config and SUBTITLE_API_HOST)
        #[arg(long, value_name = "HOST")]
        host: Option<String>,

        /// Bind port (overrides config and SUBTITLE_API_PORT)
        #[arg(short, long, value_name = "PORT")]
        port: Option<u16>,
    },

    /// Extract the transcript of one video and print it
    Extract {
        /// YouTube watch URL
        #[arg(value_name = "URL")]
        url: String,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// List enabled extraction strategies in the order they are tried
    Strategies,

    /// Show the effective configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// JSON, as returned by POST /extract
    Json,
    /// Plain text with timestamps
    Text,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Text => write!(f, "text"),
        }
    }
}
