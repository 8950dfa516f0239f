use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

const SHORT_LINK_HOST: &str = "youtu.be";

/// Path prefixes that carry the identifier as the next segment
const ID_PATH_PREFIXES: &[&str] = &["embed", "shorts", "live", "v"];

/// Length of a bare YouTube video identifier
const BARE_ID_LEN: usize = 11;

/// Canonical identifier of a video on YouTube
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Validate a raw token as a video identifier.
    ///
    /// Identifiers are non-empty and restricted to ASCII letters, digits, `-` and `_`,
    /// which keeps them safe to embed in upstream URLs and store keys.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if !raw.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_')) {
            return None;
        }

        Some(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch page for this video
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The input matched none of the recognized YouTube URL forms
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Please use a standard YouTube URL (got: {0:?})")]
pub struct InvalidUrl(pub String);

/// Extract the video identifier from a YouTube URL.
///
/// Structured URL parsing runs first. A bare 11-character identifier is accepted as is.
/// Only when neither recognizes the input does the string-split fallback run, so inputs
/// that older releases accepted keep resolving to the same identifier.
pub fn extract_video_id(url: &str) -> Result<VideoId, InvalidUrl> {
    let input = url.trim();

    from_structured_url(input)
        .or_else(|| from_bare_token(input))
        .or_else(|| from_split_fallback(input))
        .ok_or_else(|| InvalidUrl(input.to_string()))
}

/// Check whether the URL points at a YouTube host
pub fn can_handle(url: &str) -> bool {
    let url_lower = url.to_lowercase();
    url_lower.contains("youtube.com") || url_lower.contains("youtu.be")
}

fn from_structured_url(input: &str) -> Option<VideoId> {
    // Accept scheme-less inputs such as "youtu.be/ID" or "www.youtube.com/watch?v=ID"
    let candidate = if input.starts_with("http://") || input.starts_with("https://") {
        input.to_string()
    } else if can_handle(input) {
        format!("https://{}", input)
    } else {
        input.to_string()
    };

    let parsed = Url::parse(&candidate).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    let is_youtube_host = host == "youtube.com"
        || host.ends_with(".youtube.com")
        || host == "youtube-nocookie.com"
        || host.ends_with(".youtube-nocookie.com");

    // Short link: the first path segment is the identifier
    if host == SHORT_LINK_HOST || host == format!("www.{}", SHORT_LINK_HOST) {
        return parsed
            .path_segments()
            .and_then(|mut segments| segments.next())
            .and_then(VideoId::parse);
    }

    // Canonical watch URL: the `v` query parameter, wherever it sits
    if is_youtube_host || parsed.path().ends_with("/watch") {
        let from_query = parsed
            .query_pairs()
            .find(|(key, _)| key == "v")
            .and_then(|(_, value)| VideoId::parse(&value));
        if from_query.is_some() {
            return from_query;
        }
    }

    if is_youtube_host {
        let segments: Vec<&str> = parsed.path_segments()?.collect();
        if segments.len() >= 2 && ID_PATH_PREFIXES.contains(&segments[0]) {
            return VideoId::parse(segments[1]);
        }
    }

    None
}

fn from_bare_token(input: &str) -> Option<VideoId> {
    if input.len() != BARE_ID_LEN {
        return None;
    }
    VideoId::parse(input)
}

fn from_split_fallback(input: &str) -> Option<VideoId> {
    if let Some((_, rest)) = input.split_once("youtu.be/") {
        let token = rest.split(['?', '/', '#']).next().unwrap_or(rest);
        return VideoId::parse(token);
    }

    // `v=` must start a parameter name, not end one such as `dev=`
    let param = input.match_indices("v=").map(|(index, _)| index).find(|&index| {
        input[..index]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_ascii_alphanumeric())
    })?;

    let rest = &input[param + 2..];
    let token = rest.split(['&', '#']).next().unwrap_or(rest);
    VideoId::parse(token)
}
