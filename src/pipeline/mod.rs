use std::fmt;

use crate::config::Config;
use crate::credentials::CredentialBundle;
use crate::extractors::{build_http_client, StrategyRegistry, SubtitleStrategy};
use crate::transcript::{Segment, TranscriptResult};
use crate::utils::{extract_video_id, VideoId};
use crate::SubtitleError;

/// Why one strategy did not produce segments
#[derive(Debug)]
pub struct StrategyFailure {
    pub strategy: &'static str,
    pub cause: SubtitleError,
}

impl fmt::Display for StrategyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.cause)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Invalid YouTube URL")]
    InvalidUrl,

    #[error("No transcript available. {}", join_failures(.0))]
    AllFailed(Vec<StrategyFailure>),
}

fn join_failures(failures: &[StrategyFailure]) -> String {
    if failures.is_empty() {
        return "No extraction strategies are enabled".to_string();
    }
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Progress of one extraction run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    NotStarted,
    Trying(&'static str),
    Succeeded(&'static str),
    AllFailed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::NotStarted => write!(f, "not started"),
            PipelineState::Trying(name) => write!(f, "trying {}", name),
            PipelineState::Succeeded(name) => write!(f, "succeeded via {}", name),
            PipelineState::AllFailed => write!(f, "all strategies failed"),
        }
    }
}

/// Main extraction pipeline: strategies in priority order, first success wins
pub struct TranscriptPipeline {
    registry: StrategyRegistry,
    credentials: CredentialBundle,
}

impl TranscriptPipeline {
    /// Build the default strategy chain from configuration
    pub fn new(config: &Config) -> crate::Result<Self> {
        let client = build_http_client(std::time::Duration::from_secs(
            config.strategies.http_timeout_secs,
        ))?;

        let credentials = config.credential_bundle();
        if credentials.is_empty() {
            tracing::info!("No cookie bundle configured; extracting anonymously");
        } else {
            tracing::info!("Loaded cookie bundle with {} cookies", credentials.cookies().len());
        }

        Ok(Self::with_registry(
            StrategyRegistry::from_config(config, client),
            credentials,
        ))
    }

    /// Build a pipeline over an explicit strategy list
    pub fn with_registry(registry: StrategyRegistry, credentials: CredentialBundle) -> Self {
        Self {
            registry,
            credentials,
        }
    }

    /// Names of the strategies, in the order they are tried
    pub fn strategies(&self) -> Vec<&'static str> {
        self.registry.list_strategies()
    }

    /// Extract a transcript from a free-form URL
    pub async fn extract(&self, url: &str) -> Result<TranscriptResult, PipelineError> {
        let video_id = extract_video_id(url).ok_or(PipelineError::InvalidUrl)?;
        self.extract_video(video_id).await
    }

    /// Extract a transcript for a known video id
    pub async fn extract_video(&self, video_id: VideoId) -> Result<TranscriptResult, PipelineError> {
        tracing::info!("Extracting subtitles for video {}", video_id);

        let (segments, source) = self.run(&video_id).await?;
        let result = TranscriptResult::from_segments(video_id, &segments, source);

        tracing::info!(
            "Extracted {} segments, {} words, duration {} (source: {})",
            result.meta.segment_count,
            result.meta.word_count,
            result.meta.duration_formatted,
            result.meta.source
        );

        Ok(result)
    }

    /// Try each strategy in turn until one yields segments
    pub async fn run(
        &self,
        video_id: &VideoId,
    ) -> Result<(Vec<Segment>, &'static str), PipelineError> {
        let mut state = PipelineState::NotStarted;
        let mut failures = Vec::new();

        for strategy in self.registry.iter() {
            state = transition(state, PipelineState::Trying(strategy.name()));

            match self.attempt(strategy, video_id).await {
                Ok(segments) => {
                    transition(state, PipelineState::Succeeded(strategy.name()));
                    return Ok((segments, strategy.name()));
                }
                Err(cause) => {
                    tracing::warn!("Strategy {} failed: {}", strategy.name(), cause);
                    failures.push(StrategyFailure {
                        strategy: strategy.name(),
                        cause,
                    });
                }
            }
        }

        transition(state, PipelineState::AllFailed);
        Err(PipelineError::AllFailed(failures))
    }

    async fn attempt(
        &self,
        strategy: &dyn SubtitleStrategy,
        video_id: &VideoId,
    ) -> Result<Vec<Segment>, SubtitleError> {
        let segments = strategy.attempt(video_id, &self.credentials).await?;
        if segments.is_empty() {
            return Err(SubtitleError::NoCaptions(
                "caption track contained no text".to_string(),
            ));
        }
        Ok(segments)
    }
}

fn transition(from: PipelineState, to: PipelineState) -> PipelineState {
    tracing::debug!("Pipeline state: {} -> {}", from, to);
    to
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;

    mock! {
        pub Strategy {}

        #[async_trait]
        impl SubtitleStrategy for Strategy {
            fn name(&self) -> &'static str;
            async fn attempt(
                &self,
                video_id: &VideoId,
                credentials: &CredentialBundle,
            ) -> Result<Vec<Segment>, SubtitleError>;
        }
    }

    fn named(name: &'static str) -> MockStrategy {
        let mut strategy = MockStrategy::new();
        strategy.expect_name().return_const(name);
        strategy
    }

    fn succeeding(name: &'static str) -> MockStrategy {
        let mut strategy = named(name);
        strategy
            .expect_attempt()
            .times(1)
            .returning(|_, _| Ok(vec![Segment::new("hello world", 0.0, 1.5)]));
        strategy
    }

    fn failing(name: &'static str, message: &'static str) -> MockStrategy {
        let mut strategy = named(name);
        strategy
            .expect_attempt()
            .times(1)
            .returning(move |_, _| Err(SubtitleError::Tool(message.to_string())));
        strategy
    }

    fn never_called(name: &'static str) -> MockStrategy {
        let mut strategy = named(name);
        strategy.expect_attempt().times(0);
        strategy
    }

    fn pipeline(strategies: Vec<MockStrategy>) -> TranscriptPipeline {
        let mut registry = StrategyRegistry::empty();
        for strategy in strategies {
            registry.register(Box::new(strategy));
        }
        TranscriptPipeline::with_registry(registry, CredentialBundle::empty())
    }

    fn video_id() -> VideoId {
        extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap()
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let pipeline = pipeline(vec![
            succeeding("browser_automation"),
            never_called("yt_dlp"),
            never_called("transcript_api"),
        ]);

        let (segments, source) = pipeline.run(&video_id()).await.unwrap();
        assert_eq!(source, "browser_automation");
        assert_eq!(segments.len(), 1);
    }

    #[tokio::test]
    async fn test_falls_through_to_later_strategy() {
        let pipeline = pipeline(vec![
            failing("browser_automation", "navigation timeout"),
            failing("yt_dlp", "no subtitles"),
            succeeding("transcript_api"),
        ]);

        let result = pipeline
            .extract("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
            .await
            .unwrap();
        assert_eq!(result.meta.source, "transcript_api");
        assert_eq!(result.meta.word_count, 2);
        assert_eq!(result.transcript[0].segment_id, "seg_0000");
    }

    #[tokio::test]
    async fn test_all_failed_keeps_causes_in_order() {
        let pipeline = pipeline(vec![
            failing("browser_automation", "navigation timeout"),
            failing("yt_dlp", "no subtitles"),
            failing("transcript_api", "transcript list is empty"),
        ]);

        let err = pipeline.run(&video_id()).await.unwrap_err();
        let PipelineError::AllFailed(failures) = &err else {
            panic!("expected AllFailed, got {:?}", err);
        };
        let names: Vec<_> = failures.iter().map(|f| f.strategy).collect();
        assert_eq!(names, vec!["browser_automation", "yt_dlp", "transcript_api"]);

        let message = err.to_string();
        assert!(message.contains("browser_automation: navigation timeout"));
        assert!(message.contains("yt_dlp: no subtitles"));
        assert!(message.contains("transcript_api: transcript list is empty"));
    }

    #[tokio::test]
    async fn test_empty_segments_count_as_failure() {
        let mut empty = named("browser_automation");
        empty.expect_attempt().times(1).returning(|_, _| Ok(Vec::new()));

        let pipeline = pipeline(vec![empty, succeeding("yt_dlp")]);
        let (_, source) = pipeline.run(&video_id()).await.unwrap();
        assert_eq!(source, "yt_dlp");
    }

    #[tokio::test]
    async fn test_invalid_url_attempts_nothing() {
        let pipeline = pipeline(vec![never_called("browser_automation")]);
        let err = pipeline.extract("https://example.com/video").await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidUrl));
    }

    #[tokio::test]
    async fn test_no_strategies_enabled() {
        let pipeline = pipeline(Vec::new());
        let err = pipeline.run(&video_id()).await.unwrap_err();
        assert!(err.to_string().contains("No extraction strategies are enabled"));
    }
}
