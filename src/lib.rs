//! Stash - save YouTube transcripts and AI-generated notes
//!
//! The core turns a video URL into a normalized transcript: the URL is parsed into a
//! video identifier, transcript sources are tried in priority order, and whatever
//! payload shape the winning source returns is normalized into one record. Around it
//! sit a summarizer client, a JSON video store and the save workflow tying them together.

pub mod cli;
pub mod config;
pub mod fetcher;
pub mod output;
pub mod service;
pub mod sources;
pub mod store;
pub mod summarize;
pub mod transcript;
pub mod utils;
pub mod video_id;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use fetcher::{ErrorKind, FetchResult, TranscriptFetcher};
pub use service::{SaveOutcome, ServiceError, VideoService};
pub use sources::{SourceError, TranscriptSource};
pub use store::{JsonFileStore, VideoRecord, VideoRepository};
pub use summarize::{GroqSummarizer, Summarizer};
pub use transcript::{NormalizedTranscript, TranscriptPayload};
pub use video_id::{extract_video_id, InvalidUrl, VideoId};

/// Result type used throughout the application layer
pub type Result<T> = anyhow::Result<T>;
