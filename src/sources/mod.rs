use async_trait::async_trait;

pub mod direct;
pub mod proxy;
pub mod youtube;

pub use direct::{DirectSource, InnertubeClient, TranscriptClient};
pub use proxy::{ProxiedScrapeSource, ProxyFetch, ScraperProxy};

use crate::transcript::TranscriptPayload;
use crate::video_id::VideoId;

/// Failure modes a transcript source reports to the orchestrator
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("{0}")]
    NotAvailable(String),

    #[error("Request blocked by upstream: {0}")]
    Blocked(String),

    #[error("Malformed upstream response: {0}")]
    MalformedResponse(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl SourceError {
    /// Map a non-success HTTP status to the matching failure
    pub fn from_status(status: reqwest::StatusCode, what: &str) -> Self {
        match status.as_u16() {
            403 | 429 => SourceError::Blocked(format!("{} returned HTTP {}", what, status)),
            _ => SourceError::Transport(format!("{} returned HTTP {}", what, status)),
        }
    }
}

impl From<reqwest::Error> for SourceError {
    /// The request URL is dropped from the message: proxy URLs carry the credential.
    fn from(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_decode() {
            SourceError::MalformedResponse(err.to_string())
        } else if err.is_timeout() {
            SourceError::Transport(format!("request timed out: {}", err))
        } else {
            SourceError::Transport(err.to_string())
        }
    }
}

/// One strategy for obtaining raw caption data for a video
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Short name used in logs and stats
    fn name(&self) -> &'static str;

    /// Fetch captions, trying `preferred_languages` first
    async fn fetch(
        &self,
        video_id: &VideoId,
        preferred_languages: &[String],
    ) -> Result<TranscriptPayload, SourceError>;
}

/// Local HTTP endpoints for exercising the clients without the network
#[cfg(test)]
pub(crate) mod test_server {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accepts connections and never answers
    pub async fn silent() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });
        format!("http://{}/", addr)
    }

    /// Answers every request with `status_line` (e.g. "403 Forbidden") and an empty body
    pub async fn status(status_line: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match stream.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }
                    let response = format!(
                        "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                        status_line
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });
        format!("http://{}/", addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status() {
        assert!(matches!(
            SourceError::from_status(StatusCode::TOO_MANY_REQUESTS, "watch page"),
            SourceError::Blocked(_)
        ));
        assert!(matches!(
            SourceError::from_status(StatusCode::FORBIDDEN, "proxy"),
            SourceError::Blocked(_)
        ));
        assert_eq!(
            SourceError::from_status(StatusCode::BAD_GATEWAY, "proxy"),
            SourceError::Transport("proxy returned HTTP 502 Bad Gateway".to_string())
        );
    }

    #[test]
    fn test_display_keeps_message() {
        let err = SourceError::NotAvailable("Transcripts are disabled for this video".to_string());
        assert_eq!(err.to_string(), "Transcripts are disabled for this video");
    }
}
