use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;

use super::youtube;
use super::{SourceError, TranscriptSource};
use crate::transcript::TranscriptPayload;
use crate::video_id::VideoId;

/// Fetch capability of an HTTP scraping proxy
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProxyFetch: Send + Sync {
    /// Fetch `target_url` through the proxy and return the response body
    async fn fetch_via_proxy(&self, target_url: &str) -> Result<String, SourceError>;
}

/// Scraping proxy that takes the target URL as a query parameter
pub struct ScraperProxy {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl ScraperProxy {
    pub fn new(client: Client, endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    /// Proxy request URL for a target
    fn request_url(&self, target_url: &str) -> String {
        let separator = if self.endpoint.contains('?') { '&' } else { '?' };
        format!(
            "{}{}api_key={}&url={}",
            self.endpoint,
            separator,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(target_url)
        )
    }
}

#[async_trait]
impl ProxyFetch for ScraperProxy {
    async fn fetch_via_proxy(&self, target_url: &str) -> Result<String, SourceError> {
        tracing::debug!("Fetching via proxy: {}", target_url);

        let response = self.client.get(self.request_url(target_url)).send().await?;
        if !response.status().is_success() {
            return Err(SourceError::from_status(response.status(), "proxy"));
        }

        Ok(response.text().await?)
    }
}

/// Source that scrapes the watch page and caption file through a proxy
pub struct ProxiedScrapeSource {
    proxy: Arc<dyn ProxyFetch>,
}

impl ProxiedScrapeSource {
    pub fn new(proxy: Arc<dyn ProxyFetch>) -> Self {
        Self { proxy }
    }
}

#[async_trait]
impl TranscriptSource for ProxiedScrapeSource {
    fn name(&self) -> &'static str {
        "proxied-scrape"
    }

    async fn fetch(
        &self,
        video_id: &VideoId,
        preferred_languages: &[String],
    ) -> Result<TranscriptPayload, SourceError> {
        let html = self.proxy.fetch_via_proxy(&video_id.watch_url()).await?;
        youtube::check_for_block(&html)?;

        let player_response = youtube::extract_player_response(&html)?;
        youtube::assert_playability(&player_response)?;

        let tracks = youtube::parse_caption_tracks(&player_response)?;
        let track = youtube::select_track(&tracks, preferred_languages)
            .ok_or_else(|| SourceError::NotAvailable("No transcript found for this video".to_string()))?;

        let caption_url = track.base_url.as_deref().ok_or_else(|| {
            SourceError::NotAvailable(format!("caption track {} has no URL", track.language_code))
        })?;

        tracing::debug!(
            "Selected {} caption track ({})",
            track.language_code,
            if track.is_generated { "generated" } else { "authored" }
        );

        let xml = self.proxy.fetch_via_proxy(caption_url).await?;
        let snippets = youtube::parse_timed_text(&xml)?;

        Ok(TranscriptPayload::from_track(
            snippets,
            Some(track.language_code.clone()),
            Some(track.is_generated),
        ))
    }
}
