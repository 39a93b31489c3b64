use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod browser;
pub mod listing;
pub mod ytdlp;

use crate::config::Config;
use crate::credentials::CredentialBundle;
use crate::transcript::Segment;
use crate::utils::{VideoId, USER_AGENT};
use crate::SubtitleError;

/// One available subtitle track, before its text is fetched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionTrackRef {
    /// Language code (en, en-US, ...)
    pub language_code: String,

    /// True for automatic speech recognition tracks
    pub is_generated: bool,

    /// Track URL
    pub url: String,
}

/// A self-contained method of acquiring captions for a video
#[async_trait]
pub trait SubtitleStrategy: Send + Sync {
    /// Stable identifier, reported as the transcript source
    fn name(&self) -> &'static str;

    /// Try to produce the caption segments of a video
    async fn attempt(
        &self,
        video_id: &VideoId,
        credentials: &CredentialBundle,
    ) -> Result<Vec<Segment>, SubtitleError>;
}

/// Priority-ordered list of strategies
pub struct StrategyRegistry {
    strategies: Vec<Box<dyn SubtitleStrategy>>,
}

impl StrategyRegistry {
    /// Create an empty registry
    pub fn empty() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Create the default chain: browser, yt-dlp, transcript listing
    pub fn from_config(config: &Config, client: reqwest::Client) -> Self {
        let mut registry = Self::empty();
        let strategies = &config.strategies;

        if strategies.browser.enabled {
            registry.register(Box::new(browser::BrowserStrategy::new(
                strategies.browser.clone(),
                client.clone(),
            )));
        }
        if strategies.yt_dlp.enabled {
            registry.register(Box::new(ytdlp::YtDlpStrategy::new(
                strategies.yt_dlp.clone(),
                client.clone(),
            )));
        }
        if strategies.transcript_api.enabled {
            registry.register(Box::new(listing::TranscriptListingStrategy::new(
                strategies.transcript_api.clone(),
                client,
            )));
        }

        registry
    }

    /// Register a strategy at the lowest priority
    pub fn register(&mut self, strategy: Box<dyn SubtitleStrategy>) {
        self.strategies.push(strategy);
    }

    /// Strategies in the order they are tried
    pub fn iter(&self) -> impl Iterator<Item = &dyn SubtitleStrategy> {
        self.strategies.iter().map(|boxed| boxed.as_ref())
    }

    /// Names of all registered strategies
    pub fn list_strategies(&self) -> Vec<&'static str> {
        self.strategies
            .iter()
            .map(|strategy| strategy.name())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

/// Build the HTTP client shared by all strategies
pub fn build_http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
}
