use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use subtitle_api::http::{create_router, AppState};
use subtitle_api::{output, utils, Cli, Commands, Config, TranscriptPipeline};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "subtitle_api=debug,tower_http=debug"
    } else {
        "subtitle_api=info,tower_http=info"
    };

    let json_logs = std::env::var("SUBTITLE_API_LOG_FORMAT").is_ok_and(|v| v == "json");

    // Logs go to stderr so `extract` output stays pipeable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(json_logs.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    let mut config = Config::load()?;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;
            warn_missing_dependencies(&config).await;

            let pipeline = TranscriptPipeline::new(&config)?;
            tracing::info!("Extraction strategies: {}", pipeline.strategies().join(" -> "));

            let state = Arc::new(AppState::new(pipeline));
            let app = create_router(state);

            let addr = config.socket_addr();
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;

            tracing::info!("Subtitle API listening on http://{}", addr);
            axum::serve(listener, app).await.context("Server error")?;
        }
        Commands::Extract {
            url,
            output: output_path,
            format,
        } => {
            warn_missing_dependencies(&config).await;
            let pipeline = TranscriptPipeline::new(&config)?;

            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg}")
                    .context("Invalid spinner template")?,
            );
            spinner.set_message(format!("Extracting subtitles from {}", url));
            spinner.enable_steady_tick(Duration::from_millis(100));

            let outcome = pipeline.extract(&url).await;
            spinner.finish_and_clear();
            let result = outcome?;

            match output_path {
                Some(path) => {
                    output::save_to_file(&result, &path, &format)?;
                    println!("Transcript saved to: {}", path.display());
                }
                None => output::print_to_console(&result, &format)?,
            }
        }
        Commands::Strategies => {
            let pipeline = TranscriptPipeline::new(&config)?;
            let strategies = pipeline.strategies();

            if strategies.is_empty() {
                println!("No extraction strategies are enabled");
            } else {
                println!("Extraction strategies (in order):");
                for (i, name) in strategies.iter().enumerate() {
                    println!("  {}. {}", i + 1, name);
                }
            }
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                println!("Use `subtitle-api config --show` to print the effective configuration.");
                println!("Settings are read from ./config.yaml or the user config directory,");
                println!("then overridden by SUBTITLE_API_* and YOUTUBE_COOKIES* environment variables.");
            }
        }
    }

    Ok(())
}

async fn warn_missing_dependencies(config: &Config) {
    let missing = utils::check_dependencies(
        &config.strategies.yt_dlp.path,
        &config.strategies.browser.node_path,
    )
    .await;

    for dep in missing {
        tracing::warn!("Dependency not available: {}", dep);
    }
}
