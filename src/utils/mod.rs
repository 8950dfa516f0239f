use anyhow::{Context, Result};
use std::time::Duration;

/// Build the HTTP client shared by the upstream clients.
///
/// Every request made through it is bounded by `timeout`.
pub fn build_http_client(timeout: Duration, user_agent: &str) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .user_agent(user_agent)
        .build()
        .context("Failed to build HTTP client")
}

/// Cut `text` to at most `max_chars` characters, respecting char boundaries
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Cut `text` to `max_chars` characters and mark the cut with "..."
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    let truncated = truncate_chars(text, max_chars);
    if truncated.len() < text.len() {
        format!("{}...", truncated)
    } else {
        text.to_string()
    }
}

/// Parse a comma separated language list ("en, de,,fr") into codes
pub fn parse_language_list(input: &str) -> Vec<String> {
    let mut languages: Vec<String> = Vec::new();
    for code in input.split(',').map(|code| code.trim().to_string()) {
        if !code.is_empty() && !languages.contains(&code) {
            languages.push(code);
        }
    }
    languages
}

/// Collapse runs of whitespace (including newlines) into single spaces
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
