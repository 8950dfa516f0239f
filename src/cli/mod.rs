use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "stash",
    about = "Stash - Save YouTube transcripts and AI notes for later",
    version,
    long_about = "Fetches the transcript of a YouTube video, optionally turns it into notes with an AI summarizer, and keeps both in a local video store."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch and print a video's transcript without saving it
    Fetch {
        /// YouTube video URL
        #[arg(value_name = "URL")]
        url: String,

        /// Comma-separated caption languages to prefer (e.g. en,de)
        #[arg(short, long, value_name = "LANGS")]
        language: Option<String>,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Fetch a video's transcript, summarize it and save it
    Save {
        /// YouTube video URL
        #[arg(value_name = "URL")]
        url: String,

        /// User to save the video for
        #[arg(short, long, value_name = "ID")]
        user: Option<u64>,

        /// Skip the AI summary
        #[arg(long)]
        no_summary: bool,
    },

    /// List saved videos, newest first
    List {
        /// User whose videos to list
        #[arg(short, long, value_name = "ID")]
        user: Option<u64>,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Show a saved video with its transcript and summary
    Show {
        /// YouTube video ID
        #[arg(value_name = "VIDEO_ID")]
        video_id: String,

        #[arg(short, long, value_name = "ID")]
        user: Option<u64>,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Change the title or summary of a saved video
    Update {
        /// YouTube video ID
        #[arg(value_name = "VIDEO_ID")]
        video_id: String,

        /// New title
        #[arg(short, long)]
        title: Option<String>,

        /// New summary
        #[arg(short, long)]
        summary: Option<String>,

        #[arg(short, long, value_name = "ID")]
        user: Option<u64>,
    },

    /// Delete a saved video
    Delete {
        /// YouTube video ID
        #[arg(value_name = "VIDEO_ID")]
        video_id: String,

        #[arg(short, long, value_name = "ID")]
        user: Option<u64>,
    },

    /// Show or create the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON
    Json,
}

impl OutputFormat {
    /// Parse the configured default format, falling back to text
    pub fn from_config(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Text,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
