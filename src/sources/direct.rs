use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::youtube::{self, CaptionTrack};
use super::{SourceError, TranscriptSource};
use crate::transcript::{Snippet, TranscriptPayload};
use crate::video_id::VideoId;

const INNERTUBE_PLAYER_URL: &str = "https://www.youtube.com/youtubei/v1/player";
const INNERTUBE_CLIENT_NAME: &str = "ANDROID";
const INNERTUBE_CLIENT_VERSION: &str = "20.10.38";

/// Upstream transcript provider.
///
/// Providers answer with untyped JSON; the direct source classifies its shape.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptClient: Send + Sync {
    async fn fetch(&self, video_id: &VideoId, languages: &[String]) -> Result<Value, SourceError>;
}

/// Source that asks the transcript provider directly, without a proxy
pub struct DirectSource {
    client: Arc<dyn TranscriptClient>,
}

impl DirectSource {
    pub fn new(client: Arc<dyn TranscriptClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TranscriptSource for DirectSource {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn fetch(
        &self,
        video_id: &VideoId,
        preferred_languages: &[String],
    ) -> Result<TranscriptPayload, SourceError> {
        let raw = self.client.fetch(video_id, preferred_languages).await?;
        Ok(TranscriptPayload::detect(&raw))
    }
}

/// Track as returned by the innertube client
#[derive(Debug, Serialize)]
struct FetchedTrack {
    video_id: String,
    language: Option<String>,
    language_code: String,
    is_generated: bool,
    snippets: Vec<Snippet>,
}

/// Transcript provider talking to YouTube's innertube player API
pub struct InnertubeClient {
    client: Client,
}

impl InnertubeClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetch the watch page, which carries the innertube API key
    async fn fetch_watch_page(&self, video_id: &VideoId) -> Result<String, SourceError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US"));

        let response = self
            .client
            .get(video_id.watch_url())
            .headers(headers)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::from_status(response.status(), "watch page"));
        }

        let html = response.text().await?;
        youtube::check_for_block(&html)?;

        Ok(html)
    }

    /// Ask the player endpoint for the video's metadata, captions included
    async fn fetch_player_response(&self, video_id: &VideoId, api_key: &str) -> Result<Value, SourceError> {
        let body = json!({
            "context": {
                "client": {
                    "clientName": INNERTUBE_CLIENT_NAME,
                    "clientVersion": INNERTUBE_CLIENT_VERSION
                }
            },
            "videoId": video_id.as_str()
        });

        let response = self
            .client
            .post(INNERTUBE_PLAYER_URL)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::from_status(response.status(), "innertube player"));
        }

        let player_response: Value = response.json().await?;
        Ok(player_response)
    }

    /// Download and parse one caption track
    async fn fetch_track(&self, track: &CaptionTrack) -> Result<Vec<Snippet>, SourceError> {
        let url = track
            .base_url
            .as_deref()
            .ok_or_else(|| SourceError::NotAvailable(format!("caption track {} has no URL", track.language_code)))?;

        // Protected tracks need a proof-of-origin token this client cannot produce
        if url.contains("&exp=xpe") {
            return Err(SourceError::Blocked(
                "caption track requires a proof-of-origin token".to_string(),
            ));
        }

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(SourceError::from_status(response.status(), "caption track"));
        }

        let xml = response.text().await?;
        youtube::parse_timed_text(&xml)
    }
}

#[async_trait]
impl TranscriptClient for InnertubeClient {
    async fn fetch(&self, video_id: &VideoId, languages: &[String]) -> Result<Value, SourceError> {
        tracing::debug!("Fetching watch page for {}", video_id);
        let html = self.fetch_watch_page(video_id).await?;
        let api_key = youtube::extract_innertube_api_key(&html)?;

        let player_response = self.fetch_player_response(video_id, &api_key).await?;
        youtube::assert_playability(&player_response)?;

        let tracks = youtube::parse_caption_tracks(&player_response)?;
        let track = youtube::select_track(&tracks, languages)
            .ok_or_else(|| SourceError::NotAvailable("No transcript found for this video".to_string()))?;

        tracing::debug!(
            "Selected {} caption track ({})",
            track.language_code,
            if track.is_generated { "generated" } else { "authored" }
        );

        let snippets = self.fetch_track(track).await?;

        let fetched = FetchedTrack {
            video_id: video_id.to_string(),
            language: track.name.clone(),
            language_code: track.language_code.clone(),
            is_generated: track.is_generated,
            snippets,
        };

        serde_json::to_value(fetched).map_err(|e| SourceError::MalformedResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::test_server;

    fn video() -> VideoId {
        VideoId::parse("abc12345678").unwrap()
    }

    #[tokio::test]
    async fn test_direct_source_passes_languages_and_detects_shape() {
        let mut client = MockTranscriptClient::new();
        client
            .expect_fetch()
            .withf(|id, languages| id.as_str() == "abc12345678" && languages.len() == 1 && languages[0] == "en")
            .times(1)
            .returning(|_, _| {
                Ok(json!({
                    "snippets": [{"text": "Hi", "start": 0.0}, {"text": "there", "start": 1.0}],
                    "language_code": "en",
                    "is_generated": true
                }))
            });

        let source = DirectSource::new(Arc::new(client));
        let payload = source.fetch(&video(), &["en".to_string()]).await.unwrap();

        assert_eq!(payload.len(), 2);
        assert!(matches!(
            payload,
            TranscriptPayload::SnippetList { ref language, is_generated: Some(true), .. }
                if language.as_deref() == Some("en")
        ));
    }

    #[tokio::test]
    async fn test_direct_source_accepts_record_lists() {
        let mut client = MockTranscriptClient::new();
        client
            .expect_fetch()
            .withf(|id, _| *id == video())
            .returning(|_, _| Ok(json!([{"text": "Hello"}, {"text": "world"}])));

        let source = DirectSource::new(Arc::new(client));
        let payload = source.fetch(&video(), &["en".to_string()]).await.unwrap();
        assert!(matches!(payload, TranscriptPayload::RecordList(ref records) if records.len() == 2));
    }

    #[tokio::test]
    async fn test_direct_source_forwards_errors() {
        let mut client = MockTranscriptClient::new();
        client
            .expect_fetch()
            .returning(|_, _| Err(SourceError::Transport("connection reset".to_string())));

        let source = DirectSource::new(Arc::new(client));
        let err = source.fetch(&video(), &[]).await.unwrap_err();
        assert_eq!(err, SourceError::Transport("connection reset".to_string()));
    }

    fn track(base_url: String) -> CaptionTrack {
        CaptionTrack {
            language_code: "en".to_string(),
            name: Some("English".to_string()),
            is_generated: false,
            base_url: Some(base_url),
        }
    }

    fn innertube() -> InnertubeClient {
        InnertubeClient::new(
            crate::utils::build_http_client(std::time::Duration::from_secs(1), "stash-test").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_caption_download_timeout_is_transport() {
        let url = test_server::silent().await;

        let err = innertube().fetch_track(&track(url)).await.unwrap_err();
        assert!(matches!(err, SourceError::Transport(ref message) if message.contains("timed out")));
    }

    #[tokio::test]
    async fn test_caption_download_forbidden_is_blocked() {
        let url = test_server::status("403 Forbidden").await;

        let err = innertube().fetch_track(&track(url)).await.unwrap_err();
        assert!(matches!(err, SourceError::Blocked(_)));
    }

    #[tokio::test]
    async fn test_protected_caption_track_is_blocked() {
        let err = innertube()
            .fetch_track(&track("https://captions.test/en?v=1&exp=xpe".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Blocked(_)));
    }

    #[test]
    fn test_fetched_track_serializes_as_snippet_payload() {
        let fetched = FetchedTrack {
            video_id: "abc12345678".to_string(),
            language: Some("English".to_string()),
            language_code: "en".to_string(),
            is_generated: false,
            snippets: vec![Snippet::timed("Hi", 0.0, 1.0)],
        };

        let payload = TranscriptPayload::detect(&serde_json::to_value(fetched).unwrap());
        assert_eq!(
            payload,
            TranscriptPayload::from_track(
                vec![Snippet::timed("Hi", 0.0, 1.0)],
                Some("en".to_string()),
                Some(false)
            )
        );
    }
}
