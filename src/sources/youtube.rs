//! YouTube page and caption helpers shared by the transcript sources.
//!
//! Everything here is coupled to YouTube's page structure, which changes without
//! notice. Failures surface as `SourceError`s so a drifted page only takes down the
//! source that hit it.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use super::SourceError;
use crate::transcript::Snippet;

/// Caption track kind YouTube uses for speech-recognition captions
const ASR_KIND: &str = "asr";

/// One caption stream listed in the player response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionTrack {
    pub language_code: String,
    pub name: Option<String>,
    pub is_generated: bool,
    pub base_url: Option<String>,
}

impl CaptionTrack {
    /// Position in the selection order; lower wins
    fn rank(&self, preferred_languages: &[String]) -> u8 {
        let preferred = preferred_languages.iter().any(|lang| *lang == self.language_code);
        match (preferred, self.is_generated) {
            (true, false) => 0,
            (true, true) => 1,
            (false, false) => 2,
            (false, true) => 3,
        }
    }
}

/// Pick the caption track to download.
///
/// Authored tracks in a preferred language come first, then generated ones in a
/// preferred language, then authored and generated tracks in other languages.
/// Ties go to the lexicographically smallest language code.
pub fn select_track<'a>(tracks: &'a [CaptionTrack], preferred_languages: &[String]) -> Option<&'a CaptionTrack> {
    tracks
        .iter()
        .min_by(|a, b| {
            a.rank(preferred_languages)
                .cmp(&b.rank(preferred_languages))
                .then_with(|| a.language_code.cmp(&b.language_code))
        })
}

/// Fail early on bot-check interstitials
pub fn check_for_block(html: &str) -> Result<(), SourceError> {
    if html.contains("g-recaptcha") {
        return Err(SourceError::Blocked("YouTube answered with a captcha page".to_string()));
    }
    Ok(())
}

/// Locate and parse the `ytInitialPlayerResponse` assignment embedded in a watch page
pub fn extract_player_response(html: &str) -> Result<Value, SourceError> {
    static ASSIGNMENT: OnceLock<Regex> = OnceLock::new();
    let assignment = ASSIGNMENT.get_or_init(|| {
        Regex::new(r"ytInitialPlayerResponse\s*=\s*").expect("valid player response pattern")
    });

    let start = assignment
        .find(html)
        .ok_or_else(|| {
            SourceError::MalformedResponse("could not locate ytInitialPlayerResponse in page".to_string())
        })?
        .end();

    // The blob is followed by arbitrary script, so read exactly one JSON value
    let mut values = serde_json::Deserializer::from_str(&html[start..]).into_iter::<Value>();
    match values.next() {
        Some(Ok(value @ Value::Object(_))) => Ok(value),
        Some(Ok(_)) => Err(SourceError::MalformedResponse(
            "ytInitialPlayerResponse is not a JSON object".to_string(),
        )),
        Some(Err(err)) => Err(SourceError::MalformedResponse(format!(
            "failed to parse ytInitialPlayerResponse: {}",
            err
        ))),
        None => Err(SourceError::MalformedResponse(
            "ytInitialPlayerResponse is empty".to_string(),
        )),
    }
}

/// Extract the innertube API key from a watch page
pub fn extract_innertube_api_key(html: &str) -> Result<String, SourceError> {
    static API_KEY: OnceLock<Regex> = OnceLock::new();
    let api_key = API_KEY.get_or_init(|| {
        Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).expect("valid api key pattern")
    });

    api_key
        .captures(html)
        .and_then(|captures| captures.get(1))
        .map(|key| key.as_str().to_string())
        .ok_or_else(|| SourceError::MalformedResponse("could not parse INNERTUBE_API_KEY from page".to_string()))
}

/// Reject player responses for videos that cannot be played
pub fn assert_playability(player_response: &Value) -> Result<(), SourceError> {
    let Some(playability) = player_response.get("playabilityStatus") else {
        return Ok(());
    };

    let status = playability.get("status").and_then(Value::as_str).unwrap_or("OK");
    let reason = playability.get("reason").and_then(Value::as_str).unwrap_or_default();

    match status {
        "OK" => Ok(()),
        "LOGIN_REQUIRED" if reason.contains("not a bot") => Err(SourceError::Blocked(reason.to_string())),
        "ERROR" if reason.to_lowercase().contains("unavailable") => {
            Err(SourceError::NotAvailable(format!("Video not found: {}", reason)))
        }
        _ => Err(SourceError::NotAvailable(format!("Video is unplayable ({}): {}", status, reason))),
    }
}

/// List the caption tracks of a player response
pub fn parse_caption_tracks(player_response: &Value) -> Result<Vec<CaptionTrack>, SourceError> {
    let renderer = player_response
        .get("captions")
        .and_then(|captions| captions.get("playerCaptionsTracklistRenderer"))
        .ok_or_else(|| SourceError::NotAvailable("Transcripts are disabled for this video".to_string()))?;

    let tracks: Vec<CaptionTrack> = renderer
        .get("captionTracks")
        .and_then(Value::as_array)
        .map(|tracks| tracks.iter().filter_map(caption_track_from_value).collect())
        .unwrap_or_default();

    if tracks.is_empty() {
        return Err(SourceError::NotAvailable(
            "No transcript found: the video lists no caption tracks".to_string(),
        ));
    }

    Ok(tracks)
}

fn caption_track_from_value(value: &Value) -> Option<CaptionTrack> {
    let language_code = value.get("languageCode")?.as_str()?.to_string();

    let name = value
        .get("name")
        .and_then(|name| {
            name.get("simpleText").or_else(|| {
                name.get("runs")
                    .and_then(Value::as_array)
                    .and_then(|runs| runs.first())
                    .and_then(|run| run.get("text"))
            })
        })
        .and_then(Value::as_str)
        .map(str::to_string);

    let is_generated = value.get("kind").and_then(Value::as_str) == Some(ASR_KIND);

    // srv3 is a richer format the timed-text parser does not read
    let base_url = value
        .get("baseUrl")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(|url| url.replace("&fmt=srv3", ""));

    Some(CaptionTrack {
        language_code,
        name,
        is_generated,
        base_url,
    })
}

/// Parse a timed-text caption document into snippets.
///
/// Each `<text>` node is unescaped, stripped of font markup, collapsed onto one line
/// and trimmed. Nodes that end up empty are dropped.
pub fn parse_timed_text(xml: &str) -> Result<Vec<Snippet>, SourceError> {
    static TEXT_NODE: OnceLock<Regex> = OnceLock::new();
    static START: OnceLock<Regex> = OnceLock::new();
    static DURATION: OnceLock<Regex> = OnceLock::new();
    static INLINE_TAG: OnceLock<Regex> = OnceLock::new();

    let text_node = TEXT_NODE.get_or_init(|| {
        Regex::new(r"(?s)<text\b([^>]*?)(?:/>|>(.*?)</text>)").expect("valid text node pattern")
    });
    let start = START.get_or_init(|| Regex::new(r#"\bstart="([^"]*)""#).expect("valid start pattern"));
    let duration = DURATION.get_or_init(|| Regex::new(r#"\bdur="([^"]*)""#).expect("valid dur pattern"));
    // Only the formatting tags YouTube emits; any other angle brackets are caption text
    let inline_tag = INLINE_TAG.get_or_init(|| {
        Regex::new(r"(?i)</?(?:font|b|i|u)(?:\s[^>]*)?>").expect("valid tag pattern")
    });

    let body = xml.trim_start_matches('\u{feff}').trim();
    if !body.starts_with('<') {
        return Err(SourceError::MalformedResponse(
            "caption data is not XML and could not be parsed".to_string(),
        ));
    }
    if !body.contains("<transcript") && !body.contains("<timedtext") && !body.contains("<text") {
        return Err(SourceError::MalformedResponse(
            "caption XML has no transcript element and could not be parsed".to_string(),
        ));
    }

    let snippets = text_node
        .captures_iter(body)
        .filter_map(|node| {
            let attributes = node.get(1).map_or("", |m| m.as_str());
            let raw = node.get(2).map_or("", |m| m.as_str());

            // YouTube escapes entities twice ("&amp;#39;")
            let once = html_escape::decode_html_entities(raw);
            let twice = html_escape::decode_html_entities(&once);
            let stripped = inline_tag.replace_all(&twice, "");
            let text = crate::utils::collapse_whitespace(&stripped);
            if text.is_empty() {
                return None;
            }

            let seconds = |pattern: &Regex| {
                pattern
                    .captures(attributes)
                    .and_then(|captures| captures.get(1))
                    .and_then(|value| value.as_str().parse::<f64>().ok())
            };

            Some(Snippet {
                text,
                start: seconds(start),
                duration: seconds(duration),
            })
        })
        .collect();

    Ok(snippets)
}
