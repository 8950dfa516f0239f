use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::Config;
use crate::sources::{
    DirectSource, InnertubeClient, ProxiedScrapeSource, ScraperProxy, SourceError, TranscriptSource,
};
use crate::transcript::{self, NormalizedTranscript};
use crate::utils;
use crate::video_id::{self, InvalidUrl, VideoId};

/// Stable failure categories callers can branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidUrl,
    TranscriptsDisabled,
    NoTranscriptFound,
    UpstreamParseError,
    TransportError,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidUrl => "invalid_url",
            ErrorKind::TranscriptsDisabled => "transcripts_disabled",
            ErrorKind::NoTranscriptFound => "no_transcript_found",
            ErrorKind::UpstreamParseError => "upstream_parse_error",
            ErrorKind::TransportError => "transport_error",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// HTTP status a web layer should answer with
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::InvalidUrl | ErrorKind::TranscriptsDisabled | ErrorKind::NoTranscriptFound => 400,
            ErrorKind::UpstreamParseError | ErrorKind::TransportError => 502,
            ErrorKind::Unknown => 500,
        }
    }

    /// Whether repeating the whole operation later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::TransportError | ErrorKind::UpstreamParseError | ErrorKind::Unknown)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one transcript fetch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchResult {
    Success {
        content_id: VideoId,
        transcript: NormalizedTranscript,
    },
    Failure {
        content_id: Option<VideoId>,
        error_kind: ErrorKind,
        message: String,
    },
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchResult::Success { .. })
    }

    /// Video identifier, whenever the URL could be parsed
    pub fn content_id(&self) -> Option<&VideoId> {
        match self {
            FetchResult::Success { content_id, .. } => Some(content_id),
            FetchResult::Failure { content_id, .. } => content_id.as_ref(),
        }
    }
}

/// Map a source failure to a stable category.
///
/// Upstream wording varies between versions, so the message is matched on a few
/// case-insensitive fragments before falling back to the failure variant.
pub fn classify(err: &SourceError) -> ErrorKind {
    let message = err.to_string().to_lowercase();

    if message.contains("disabled") || message.contains("turned off") {
        return ErrorKind::TranscriptsDisabled;
    }
    if message.contains("not found") || message.contains("no transcript") {
        return ErrorKind::NoTranscriptFound;
    }
    if message.contains("xml") || message.contains("parse") || message.contains("unparsable") {
        return ErrorKind::UpstreamParseError;
    }

    match err {
        SourceError::Transport(_) => ErrorKind::TransportError,
        SourceError::MalformedResponse(_) => ErrorKind::UpstreamParseError,
        SourceError::NotAvailable(_) | SourceError::Blocked(_) => ErrorKind::Unknown,
    }
}

/// Advisory request counters of one source
#[derive(Debug, Default)]
struct SourceStats {
    attempted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

/// Counter values of one source at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceStatsSnapshot {
    pub source: &'static str,
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
}

struct RegisteredSource {
    source: Arc<dyn TranscriptSource>,
    stats: SourceStats,
}

/// Turns a video URL into a transcript, trying each source in order
pub struct TranscriptFetcher {
    sources: Vec<RegisteredSource>,
    preferred_languages: Vec<String>,
}

impl TranscriptFetcher {
    /// Create a fetcher without sources
    pub fn new(preferred_languages: Vec<String>) -> Self {
        Self {
            sources: Vec::new(),
            preferred_languages,
        }
    }

    /// Build the production source chain.
    ///
    /// The proxied scraper goes first when a proxy credential is configured; the
    /// direct source is always present.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = utils::build_http_client(config.request_timeout(), &config.fetch.user_agent)?;
        let mut fetcher = Self::new(config.fetch.preferred_languages.clone());

        match config.active_proxy_key() {
            Some(api_key) => {
                let proxy = ScraperProxy::new(client.clone(), config.fetch.proxy.endpoint.clone(), api_key);
                fetcher.register(Arc::new(ProxiedScrapeSource::new(Arc::new(proxy))));
            }
            None => tracing::debug!("No proxy credential configured, proxied source disabled"),
        }

        fetcher.register(Arc::new(DirectSource::new(Arc::new(InnertubeClient::new(client)))));

        Ok(fetcher)
    }

    /// Append a source to the fallback chain
    pub fn register(&mut self, source: Arc<dyn TranscriptSource>) {
        self.sources.push(RegisteredSource {
            source,
            stats: SourceStats::default(),
        });
    }

    /// Builder-style `register`
    pub fn with_source(mut self, source: Arc<dyn TranscriptSource>) -> Self {
        self.register(source);
        self
    }

    /// Names of the configured sources, in priority order
    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|entry| entry.source.name()).collect()
    }

    pub fn preferred_languages(&self) -> &[String] {
        &self.preferred_languages
    }

    /// Current request counters per source
    pub fn source_stats(&self) -> Vec<SourceStatsSnapshot> {
        self.sources
            .iter()
            .map(|entry| SourceStatsSnapshot {
                source: entry.source.name(),
                attempted: entry.stats.attempted.load(Ordering::Relaxed),
                succeeded: entry.stats.succeeded.load(Ordering::Relaxed),
                failed: entry.stats.failed.load(Ordering::Relaxed),
            })
            .collect()
    }

    /// Parse the video identifier without touching the network
    pub fn extract_video_id(&self, url: &str) -> Result<VideoId, InvalidUrl> {
        video_id::extract_video_id(url)
    }

    /// Fetch and normalize the transcript of the video behind `url`.
    ///
    /// Never fails: every problem ends up in a `FetchResult::Failure`.
    pub async fn fetch_transcript(&self, url: &str) -> FetchResult {
        match self.extract_video_id(url) {
            Ok(content_id) => self.fetch_for_id(content_id).await,
            Err(err) => {
                tracing::info!("Rejected URL: {}", err);
                FetchResult::Failure {
                    content_id: None,
                    error_kind: ErrorKind::InvalidUrl,
                    message: err.to_string(),
                }
            }
        }
    }

    /// Fetch and normalize the transcript of an already extracted video
    pub async fn fetch_for_id(&self, content_id: VideoId) -> FetchResult {
        tracing::info!("Fetching transcript for {}", content_id);

        let mut last_error: Option<SourceError> = None;

        for entry in &self.sources {
            let name = entry.source.name();
            entry.stats.attempted.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Trying source {} for {}", name, content_id);

            let outcome = match entry.source.fetch(&content_id, &self.preferred_languages).await {
                Ok(payload) if payload.is_empty() => Err(SourceError::NotAvailable(format!(
                    "No transcript found: {} returned an empty transcript",
                    name
                ))),
                other => other,
            };

            match outcome {
                Ok(payload) => {
                    entry.stats.succeeded.fetch_add(1, Ordering::Relaxed);
                    let transcript = transcript::normalize(&payload);
                    tracing::info!(
                        "Fetched transcript for {} via {} ({} segments)",
                        content_id,
                        name,
                        transcript.segment_count
                    );
                    return FetchResult::Success {
                        content_id,
                        transcript,
                    };
                }
                Err(err) => {
                    entry.stats.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!("Source {} failed for {}: {}", name, content_id, err);
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(err) => FetchResult::Failure {
                content_id: Some(content_id),
                error_kind: classify(&err),
                message: err.to_string(),
            },
            None => FetchResult::Failure {
                content_id: Some(content_id),
                error_kind: ErrorKind::Unknown,
                message: "No transcript sources are configured".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{test_server, MockTranscriptSource, TranscriptClient};
    use crate::transcript::{Snippet, TranscriptPayload};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    fn source(name: &'static str, result: Result<TranscriptPayload, SourceError>) -> Arc<dyn TranscriptSource> {
        let mut mock = MockTranscriptSource::new();
        mock.expect_name().return_const(name);
        mock.expect_fetch().times(1).returning(move |_, _| result.clone());
        Arc::new(mock)
    }

    fn unused_source(name: &'static str) -> Arc<dyn TranscriptSource> {
        let mut mock = MockTranscriptSource::new();
        mock.expect_name().return_const(name);
        mock.expect_fetch().never();
        Arc::new(mock)
    }

    fn hello_world() -> TranscriptPayload {
        TranscriptPayload::StringList(vec!["Hello".to_string(), "world".to_string()])
    }

    fn en() -> Vec<String> {
        vec!["en".to_string()]
    }

    #[tokio::test]
    async fn test_invalid_url_never_touches_sources() {
        let fetcher = TranscriptFetcher::new(en()).with_source(unused_source("direct"));

        let result = fetcher.fetch_transcript("https://vimeo.com/123").await;
        match result {
            FetchResult::Failure { content_id, error_kind, .. } => {
                assert_eq!(content_id, None);
                assert_eq!(error_kind, ErrorKind::InvalidUrl);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_falls_back_after_transport_error() {
        let fetcher = TranscriptFetcher::new(en())
            .with_source(source("direct", Err(SourceError::Transport("timed out".to_string()))))
            .with_source(source("proxied-scrape", Ok(hello_world())));

        let result = fetcher.fetch_transcript("https://youtu.be/abc12345678").await;
        match result {
            FetchResult::Success { content_id, transcript } => {
                assert_eq!(content_id.as_str(), "abc12345678");
                assert_eq!(transcript.text, "Hello world");
                assert_eq!(transcript.segment_count, 2);
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let stats = fetcher.source_stats();
        assert_eq!(
            stats,
            vec![
                SourceStatsSnapshot { source: "direct", attempted: 1, succeeded: 0, failed: 1 },
                SourceStatsSnapshot { source: "proxied-scrape", attempted: 1, succeeded: 1, failed: 0 },
            ]
        );
    }

    #[tokio::test]
    async fn test_first_success_stops_the_chain() {
        let fetcher = TranscriptFetcher::new(en())
            .with_source(source("proxied-scrape", Ok(hello_world())))
            .with_source(unused_source("direct"));

        assert!(fetcher.fetch_transcript("https://youtu.be/abc12345678").await.is_success());
    }

    #[tokio::test]
    async fn test_empty_payload_falls_through() {
        let fetcher = TranscriptFetcher::new(en())
            .with_source(source("proxied-scrape", Ok(TranscriptPayload::StringList(vec![]))))
            .with_source(source("direct", Ok(hello_world())));

        let result = fetcher.fetch_transcript("https://youtu.be/abc12345678").await;
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_all_sources_exhausted() {
        let fetcher = TranscriptFetcher::new(en())
            .with_source(source("proxied-scrape", Err(SourceError::Blocked("captcha".to_string()))))
            .with_source(source("direct", Err(SourceError::Transport("connection refused".to_string()))));

        let result = fetcher.fetch_transcript("https://www.youtube.com/watch?v=abc12345678").await;
        assert_eq!(
            result,
            FetchResult::Failure {
                content_id: Some(VideoId::parse("abc12345678").unwrap()),
                error_kind: ErrorKind::TransportError,
                message: "Transport error: connection refused".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_empty_everywhere_is_no_transcript_found() {
        let fetcher = TranscriptFetcher::new(en())
            .with_source(source("direct", Ok(TranscriptPayload::Unknown)));

        match fetcher.fetch_transcript("https://youtu.be/abc12345678").await {
            FetchResult::Failure { error_kind, content_id, .. } => {
                assert_eq!(error_kind, ErrorKind::NoTranscriptFound);
                assert!(content_id.is_some());
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_sources_configured() {
        let fetcher = TranscriptFetcher::new(en());
        match fetcher.fetch_transcript("https://youtu.be/abc12345678").await {
            FetchResult::Failure { error_kind, .. } => assert_eq!(error_kind, ErrorKind::Unknown),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_classify() {
        let cases = [
            (SourceError::NotAvailable("Transcripts are disabled for this video".into()), ErrorKind::TranscriptsDisabled),
            (SourceError::NotAvailable("Subtitles are TURNED OFF".into()), ErrorKind::TranscriptsDisabled),
            (SourceError::NotAvailable("No transcripts were found for en".into()), ErrorKind::NoTranscriptFound),
            (SourceError::Transport("watch page returned HTTP 404 Not Found".into()), ErrorKind::NoTranscriptFound),
            (SourceError::MalformedResponse("bad XML".into()), ErrorKind::UpstreamParseError),
            (SourceError::NotAvailable("could not parse page".into()), ErrorKind::UpstreamParseError),
            (SourceError::MalformedResponse("unexpected shape".into()), ErrorKind::UpstreamParseError),
            (SourceError::Transport("timed out".into()), ErrorKind::TransportError),
            (SourceError::Blocked("captcha".into()), ErrorKind::Unknown),
            (SourceError::NotAvailable("something odd".into()), ErrorKind::Unknown),
        ];

        for (err, expected) in cases {
            assert_eq!(classify(&err), expected, "error: {}", err);
        }
    }

    #[test]
    fn test_error_kind_http_status() {
        assert_eq!(ErrorKind::InvalidUrl.http_status(), 400);
        assert_eq!(ErrorKind::TranscriptsDisabled.http_status(), 400);
        assert_eq!(ErrorKind::NoTranscriptFound.http_status(), 400);
        assert_eq!(ErrorKind::TransportError.http_status(), 502);
        assert_eq!(ErrorKind::Unknown.http_status(), 500);
        assert!(ErrorKind::TransportError.is_retryable());
        assert!(!ErrorKind::InvalidUrl.is_retryable());
    }

    #[test]
    fn test_fetch_result_serializes_with_status_tag() {
        let result = FetchResult::Failure {
            content_id: None,
            error_kind: ErrorKind::InvalidUrl,
            message: "bad".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"status": "failure", "content_id": null, "error_kind": "invalid_url", "message": "bad"})
        );
    }

    /// Provider stub answering like the upstream library
    struct StubClient;

    #[async_trait]
    impl TranscriptClient for StubClient {
        async fn fetch(&self, _video_id: &VideoId, _languages: &[String]) -> Result<Value, SourceError> {
            Ok(json!({
                "snippets": [{"text": "Hi", "start": 0.0}, {"text": "there", "start": 1.2}],
                "language_code": "en",
                "is_generated": true
            }))
        }
    }

    #[tokio::test]
    async fn test_end_to_end_with_direct_source() {
        let fetcher = TranscriptFetcher::new(en()).with_source(Arc::new(DirectSource::new(Arc::new(StubClient))));

        let result = fetcher
            .fetch_transcript("  https://www.youtube.com/watch?v=abc12345678&t=5s  ")
            .await;

        assert_eq!(
            result,
            FetchResult::Success {
                content_id: VideoId::parse("abc12345678").unwrap(),
                transcript: NormalizedTranscript {
                    text: "Hi there".to_string(),
                    segment_count: 2,
                    language: Some("en".to_string()),
                    is_generated: Some(true),
                },
            }
        );
    }

    #[tokio::test]
    async fn test_timed_out_source_is_transport_error() {
        let client = utils::build_http_client(std::time::Duration::from_secs(1), "stash-test").unwrap();
        let proxy = ScraperProxy::new(client, test_server::silent().await, "k3y");
        let fetcher = TranscriptFetcher::new(en())
            .with_source(Arc::new(ProxiedScrapeSource::new(Arc::new(proxy))));

        match fetcher.fetch_transcript("https://youtu.be/abc12345678").await {
            FetchResult::Failure { content_id, error_kind, message } => {
                assert_eq!(content_id, VideoId::parse("abc12345678"));
                assert_eq!(error_kind, ErrorKind::TransportError);
                assert!(message.contains("timed out"));
                assert!(!message.contains("k3y"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_from_config_orders_sources() {
        let mut config = Config::default();
        let fetcher = TranscriptFetcher::from_config(&config).unwrap();
        assert_eq!(fetcher.source_names(), vec!["direct"]);

        config.fetch.proxy.api_key = Some("k".to_string());
        let fetcher = TranscriptFetcher::from_config(&config).unwrap();
        assert_eq!(fetcher.source_names(), vec!["proxied-scrape", "direct"]);
    }

    #[test]
    fn test_snippet_payload_metadata_survives() {
        let payload = TranscriptPayload::from_track(vec![Snippet::new("x")], Some("de".into()), Some(false));
        assert_eq!(transcript::normalize(&payload).language.as_deref(), Some("de"));
    }
}
