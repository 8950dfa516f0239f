use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stash::cli::{Cli, Commands, OutputFormat};
use stash::config::Config;
use stash::fetcher::{FetchResult, TranscriptFetcher};
use stash::service::{SaveOutcome, VideoService};
use stash::store::{JsonFileStore, VideoUpdate};
use stash::summarize::{GroqSummarizer, Summarizer};
use stash::video_id::{self, VideoId};
use stash::{output, utils};

/// Characters of transcript echoed after writing it to a file
const PREVIEW_CHARS: usize = 200;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "stash=debug"
    } else if cli.quiet {
        "stash=warn"
    } else {
        "stash=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = Config::load().await?;

    match cli.command {
        Commands::Fetch {
            url,
            language,
            format,
            output,
        } => {
            if let Some(language) = language {
                let languages = utils::parse_language_list(&language);
                if !languages.is_empty() {
                    config.fetch.preferred_languages = languages;
                }
            }
            let format = format.unwrap_or_else(|| OutputFormat::from_config(&config.app.default_output_format));

            let fetcher = TranscriptFetcher::from_config(&config)?;
            tracing::debug!("Transcript sources: {}", fetcher.source_names().join(", "));

            let progress = spinner(cli.quiet, "Fetching transcript...")?;
            let result = fetcher.fetch_transcript(&url).await;
            progress.finish_and_clear();

            let rendered = output::format_fetch_result(&result, &format)?;

            match (&result, output) {
                (FetchResult::Success { transcript, .. }, Some(path)) => {
                    output::save_to_file(&rendered, &path).await?;
                    println!("Transcript saved to: {}", path.display());
                    println!("{}", transcript.preview(PREVIEW_CHARS));
                }
                (FetchResult::Success { .. }, None) => println!("{}", rendered),
                (FetchResult::Failure { .. }, _) => {
                    if let Some(content_id) = result.content_id() {
                        tracing::debug!("Fetch failed after extracting {}", content_id);
                    }
                    match format {
                        OutputFormat::Json => println!("{}", rendered),
                        OutputFormat::Text => eprintln!("{}", rendered),
                    }
                    std::process::exit(1);
                }
            }
        }
        Commands::Save {
            url,
            user,
            no_summary,
        } => {
            let user_id = user.unwrap_or(config.app.default_user_id);
            let service = build_service(&config, !no_summary)?;

            let progress = spinner(cli.quiet, "Saving video...")?;
            let outcome = service.save_video(&url, user_id).await;
            progress.finish_and_clear();

            let outcome = outcome?;
            let video = outcome.record();
            match outcome {
                SaveOutcome::Created(_) => {
                    println!("Saved video {} as #{}", video.video_id, video.id);
                    if video.ai_summary.is_none() && service.has_summarizer() {
                        println!("(saved without a summary)");
                    }
                }
                SaveOutcome::AlreadySaved(_) => {
                    println!("Video {} is already saved as #{}", video.video_id, video.id);
                }
            }
        }
        Commands::List { user, format } => {
            let user_id = user.unwrap_or(config.app.default_user_id);
            let format = format.unwrap_or_else(|| OutputFormat::from_config(&config.app.default_output_format));
            let service = build_service(&config, false)?;

            let videos = service.get_user_videos(user_id).await?;
            println!("{}", output::format_video_list(&videos, &format)?);
        }
        Commands::Show {
            video_id,
            user,
            format,
        } => {
            let user_id = user.unwrap_or(config.app.default_user_id);
            let format = format.unwrap_or_else(|| OutputFormat::from_config(&config.app.default_output_format));
            let service = build_service(&config, false)?;

            let video = service.get_video(&parse_video_id(&video_id)?, user_id).await?;
            println!("{}", output::format_video(&video, &format)?);
        }
        Commands::Update {
            video_id,
            title,
            summary,
            user,
        } => {
            let user_id = user.unwrap_or(config.app.default_user_id);
            let service = build_service(&config, false)?;

            let update = VideoUpdate {
                title,
                ai_summary: summary,
            };
            let video = service
                .update_video(&parse_video_id(&video_id)?, user_id, update)
                .await?;
            println!("Updated video {}", video.video_id);
        }
        Commands::Delete { video_id, user } => {
            let user_id = user.unwrap_or(config.app.default_user_id);
            let service = build_service(&config, false)?;

            let video_id = parse_video_id(&video_id)?;
            service.delete_video(&video_id, user_id).await?;
            println!("Deleted video {}", video_id);
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                config.save().await?;
                println!("Configuration written. Edit the config file or run `stash config --show`.");
            }
        }
    }

    Ok(())
}

/// Wire the fetcher, store and (optionally) summarizer into a service
fn build_service(config: &Config, with_summary: bool) -> Result<VideoService> {
    let fetcher = Arc::new(TranscriptFetcher::from_config(config)?);

    let store_path = config.store_path()?;
    let store = JsonFileStore::open(&store_path)
        .with_context(|| format!("Failed to open video store at {}", store_path.display()))?;
    tracing::debug!("Using video store {}", store.path().display());

    let summarizer: Option<Arc<dyn Summarizer>> = match config.active_summarizer_key() {
        Some(api_key) if with_summary => {
            let client = utils::build_http_client(config.request_timeout(), &config.fetch.user_agent)?;
            Some(Arc::new(GroqSummarizer::new(client, &config.summarizer, api_key)) as Arc<dyn Summarizer>)
        }
        None if with_summary => {
            tracing::info!("No summarizer configured, videos are saved without summaries");
            None
        }
        _ => None,
    };

    Ok(VideoService::new(fetcher, Arc::new(store), summarizer))
}

/// Accept a bare video ID or any supported video URL
fn parse_video_id(raw: &str) -> Result<VideoId> {
    if let Some(id) = VideoId::parse(raw) {
        return Ok(id);
    }
    Ok(video_id::extract_video_id(raw)?)
}

fn spinner(quiet: bool, message: &'static str) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }

    let progress = ProgressBar::new_spinner();
    progress.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    progress.set_message(message);
    progress.enable_steady_tick(Duration::from_millis(100));
    Ok(progress)
}
