use serde_json::Value;

use super::{NormalizedTranscript, TranscriptPayload};

/// Fold any payload shape into the canonical transcript.
///
/// Never fails: an unrecognized payload normalizes to empty text and zero segments.
/// Every consumed entry counts towards `segment_count`, even when its text trims to
/// nothing and is left out of the joined text.
pub fn normalize(payload: &TranscriptPayload) -> NormalizedTranscript {
    match payload {
        TranscriptPayload::SnippetList {
            snippets,
            language,
            is_generated,
        } => NormalizedTranscript {
            text: join_texts(snippets.iter().map(|snippet| snippet.text.as_str())),
            segment_count: snippets.len(),
            language: language.clone(),
            is_generated: *is_generated,
        },
        TranscriptPayload::RecordList(records) => NormalizedTranscript {
            text: join_texts(
                records
                    .iter()
                    .map(|record| record.get("text").and_then(Value::as_str).unwrap_or_default()),
            ),
            segment_count: records.len(),
            language: None,
            is_generated: None,
        },
        TranscriptPayload::StringList(lines) => NormalizedTranscript {
            text: join_texts(lines.iter().map(String::as_str)),
            segment_count: lines.len(),
            language: None,
            is_generated: None,
        },
        TranscriptPayload::Unknown => NormalizedTranscript::empty(),
    }
}

fn join_texts<'a>(texts: impl Iterator<Item = &'a str>) -> String {
    texts
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Snippet;
    use serde_json::json;

    #[test]
    fn test_same_captions_in_every_shape() {
        let payloads = [
            TranscriptPayload::detect(&json!({"snippets": [{"text": "Hello"}, {"text": "world"}]})),
            TranscriptPayload::detect(&json!([{"text": "Hello"}, {"text": "world"}])),
            TranscriptPayload::detect(&json!(["Hello", "world"])),
        ];

        for payload in &payloads {
            let transcript = normalize(payload);
            assert_eq!(transcript.text, "Hello world", "payload: {:?}", payload);
            assert_eq!(transcript.segment_count, 2, "payload: {:?}", payload);
        }
    }

    #[test]
    fn test_metadata_is_carried_over() {
        let payload = TranscriptPayload::from_track(
            vec![Snippet::new("One"), Snippet::new("two"), Snippet::new("three")],
            Some("en".to_string()),
            Some(true),
        );

        let transcript = normalize(&payload);
        assert_eq!(transcript.text, "One two three");
        assert_eq!(transcript.segment_count, 3);
        assert_eq!(transcript.language.as_deref(), Some("en"));
        assert_eq!(transcript.is_generated, Some(true));
    }

    #[test]
    fn test_empty_texts_are_skipped_but_counted() {
        let payload = TranscriptPayload::detect(&json!(["  Hi ", "", "   ", "\nthere"]));
        let transcript = normalize(&payload);
        assert_eq!(transcript.text, "Hi there");
        assert_eq!(transcript.segment_count, 4);
    }

    #[test]
    fn test_records_without_text_count_as_empty() {
        let payload = TranscriptPayload::detect(&json!([{"text": "a"}, {"start": 1.0}, {"text": 5}]));
        let transcript = normalize(&payload);
        assert_eq!(transcript.text, "a");
        assert_eq!(transcript.segment_count, 3);
    }

    #[test]
    fn test_unknown_and_empty_payloads() {
        for payload in [
            TranscriptPayload::Unknown,
            TranscriptPayload::detect(&json!({"unexpected": true})),
            TranscriptPayload::detect(&json!([])),
        ] {
            let transcript = normalize(&payload);
            assert_eq!(transcript.text, "");
            assert_eq!(transcript.segment_count, 0);
            assert_eq!(transcript.language, None);
            assert_eq!(transcript.is_generated, None);
        }
    }
}
