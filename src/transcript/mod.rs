use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod normalizer;

pub use normalizer::normalize;

/// Individual caption fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    /// Display text
    pub text: String,

    /// Start time in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,

    /// Duration in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl Snippet {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            start: None,
            duration: None,
        }
    }

    pub fn timed(text: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            text: text.into(),
            start: Some(start),
            duration: Some(duration),
        }
    }
}

/// Raw caption data as handed over by a transcript source.
///
/// Upstream providers return several shapes; `detect` folds all of them into one of
/// these variants so nothing past the source boundary inspects raw JSON again.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptPayload {
    /// Snippet objects, optionally with track-level metadata
    SnippetList {
        snippets: Vec<Snippet>,
        language: Option<String>,
        is_generated: Option<bool>,
    },

    /// Key-value records carrying their text under `"text"`
    RecordList(Vec<Map<String, Value>>),

    /// Plain caption strings
    StringList(Vec<String>),

    /// Nothing recognizable
    Unknown,
}

impl TranscriptPayload {
    /// Build a snippet payload with track metadata
    pub fn from_track(snippets: Vec<Snippet>, language: Option<String>, is_generated: Option<bool>) -> Self {
        TranscriptPayload::SnippetList {
            snippets,
            language,
            is_generated,
        }
    }

    /// Classify an untyped upstream payload.
    ///
    /// Order matters: an object exposing a `snippets` list wins, then a list of
    /// records, then a list of strings. Everything else is `Unknown`.
    pub fn detect(value: &Value) -> Self {
        match value {
            Value::Object(object) => match object.get("snippets") {
                Some(Value::Array(items)) => TranscriptPayload::SnippetList {
                    snippets: items.iter().map(snippet_from_value).collect(),
                    language: track_language(object),
                    is_generated: object.get("is_generated").and_then(Value::as_bool),
                },
                _ => TranscriptPayload::Unknown,
            },
            Value::Array(items) if items.iter().all(Value::is_object) => TranscriptPayload::RecordList(
                items
                    .iter()
                    .filter_map(|item| item.as_object().cloned())
                    .collect(),
            ),
            Value::Array(items) if items.iter().all(Value::is_string) => TranscriptPayload::StringList(
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect(),
            ),
            _ => TranscriptPayload::Unknown,
        }
    }

    /// Number of entries the payload carries
    pub fn len(&self) -> usize {
        match self {
            TranscriptPayload::SnippetList { snippets, .. } => snippets.len(),
            TranscriptPayload::RecordList(records) => records.len(),
            TranscriptPayload::StringList(lines) => lines.len(),
            TranscriptPayload::Unknown => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Canonical transcript produced by the normalizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedTranscript {
    /// Snippet texts joined by single spaces
    pub text: String,

    /// Number of snippets consumed, including ones that were empty after trimming
    pub segment_count: usize,

    /// Track language code, if the source reported one
    pub language: Option<String>,

    /// Whether the captions were machine generated, if known
    pub is_generated: Option<bool>,
}

impl NormalizedTranscript {
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            segment_count: 0,
            language: None,
            is_generated: None,
        }
    }

    /// First `max_chars` characters of the text, with an ellipsis when cut
    pub fn preview(&self, max_chars: usize) -> String {
        crate::utils::truncate_with_ellipsis(&self.text, max_chars)
    }
}

fn snippet_from_value(value: &Value) -> Snippet {
    match value {
        Value::String(text) => Snippet::new(text.clone()),
        Value::Object(object) => Snippet {
            text: object
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            start: object.get("start").and_then(Value::as_f64),
            duration: object.get("duration").and_then(Value::as_f64),
        },
        _ => Snippet::new(String::new()),
    }
}

fn track_language(object: &Map<String, Value>) -> Option<String> {
    ["language_code", "language"]
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .filter(|language| !language.is_empty())
        .map(str::to_string)
}
