use anyhow::Result;
use console::style;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::fetcher::FetchResult;
use crate::store::VideoRecord;
use crate::transcript::NormalizedTranscript;

/// Characters of transcript shown next to each listed video
const LIST_PREVIEW_CHARS: usize = 60;

/// Render a fetch result
pub fn format_fetch_result(result: &FetchResult, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Text => Ok(match result {
            FetchResult::Success {
                content_id,
                transcript,
            } => format!(
                "{} {}\n{}\n\n{}",
                style("Video:").bold(),
                content_id,
                transcript_details(transcript),
                transcript.text
            ),
            FetchResult::Failure {
                content_id,
                error_kind,
                message,
            } => {
                let video = content_id
                    .as_ref()
                    .map(|id| format!(" for {}", id))
                    .unwrap_or_default();
                format!(
                    "{} [{}]{}: {}",
                    style("Error").red().bold(),
                    error_kind,
                    video,
                    message
                )
            }
        }),
    }
}

fn transcript_details(transcript: &NormalizedTranscript) -> String {
    let language = transcript.language.as_deref().unwrap_or("unknown");
    let origin = match transcript.is_generated {
        Some(true) => " (auto-generated)",
        Some(false) => " (manual)",
        None => "",
    };
    format!(
        "{} {}{}\n{} {}",
        style("Language:").bold(),
        language,
        origin,
        style("Segments:").bold(),
        transcript.segment_count
    )
}

/// Render one saved video with its transcript and summary
pub fn format_video(video: &VideoRecord, format: &OutputFormat) -> Result<String> {
    if let OutputFormat::Json = format {
        return Ok(serde_json::to_string_pretty(video)?);
    }

    let mut out = String::new();
    out.push_str(&format!("{} #{} {}\n", style("Video").bold(), video.id, video.video_id));
    if let Some(title) = &video.title {
        out.push_str(&format!("{} {}\n", style("Title:").bold(), title));
    }
    out.push_str(&format!("{} {}\n", style("URL:").bold(), video.url));
    out.push_str(&format!(
        "{} {}\n",
        style("Saved:").bold(),
        video.created_at.format("%Y-%m-%d %H:%M UTC")
    ));
    out.push_str(&format!(
        "{} {} ({} segments)\n",
        style("Language:").bold(),
        video.language.as_deref().unwrap_or("unknown"),
        video.segments_count
    ));

    if let Some(summary) = &video.ai_summary {
        out.push_str(&format!("\n{}\n{}\n", style("Summary").cyan().bold(), summary));
    }

    out.push_str(&format!("\n{}\n{}", style("Transcript").cyan().bold(), video.raw_transcript));
    Ok(out)
}

/// Render a list of saved videos, one line each
pub fn format_video_list(videos: &[VideoRecord], format: &OutputFormat) -> Result<String> {
    if let OutputFormat::Json = format {
        return Ok(serde_json::to_string_pretty(videos)?);
    }

    if videos.is_empty() {
        return Ok("No saved videos".to_string());
    }

    let lines: Vec<String> = videos
        .iter()
        .map(|video| {
            let label = video.title.clone().unwrap_or_else(|| {
                crate::utils::truncate_with_ellipsis(&video.raw_transcript, LIST_PREVIEW_CHARS)
            });
            format!(
                "{:>4}  {}  {}  {}",
                style(format!("#{}", video.id)).dim(),
                style(video.video_id.as_str()).green(),
                video.created_at.format("%Y-%m-%d"),
                label
            )
        })
        .collect();

    Ok(lines.join("\n"))
}

/// Write rendered output to a file
pub async fn save_to_file(content: &str, path: &Path) -> Result<()> {
    fs_err::write(path, content)?;
    Ok(())
}
