use std::sync::Arc;

use crate::fetcher::{ErrorKind, FetchResult, TranscriptFetcher};
use crate::store::{NewVideo, StoreError, UserId, VideoRecord, VideoRepository, VideoUpdate};
use crate::summarize::Summarizer;
use crate::video_id::{InvalidUrl, VideoId};

#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    InvalidUrl(#[from] InvalidUrl),

    #[error("Failed to fetch transcript ({kind}): {message}")]
    Fetch { kind: ErrorKind, message: String },

    #[error("Video not found: {0}")]
    NotFound(VideoId),

    #[error("Access denied to video {0}")]
    AccessDenied(VideoId),

    #[error("Nothing to update")]
    EmptyUpdate,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    /// Fetch category, for callers that map failures to responses
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            ServiceError::InvalidUrl(_) => Some(ErrorKind::InvalidUrl),
            ServiceError::Fetch { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Result of a save request
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Created(VideoRecord),
    /// The video was saved before; nothing was fetched
    AlreadySaved(VideoRecord),
}

impl SaveOutcome {
    pub fn record(&self) -> &VideoRecord {
        match self {
            SaveOutcome::Created(record) | SaveOutcome::AlreadySaved(record) => record,
        }
    }
}

/// Video-save workflow and ownership-checked access to saved videos
pub struct VideoService {
    fetcher: Arc<TranscriptFetcher>,
    repository: Arc<dyn VideoRepository>,
    summarizer: Option<Arc<dyn Summarizer>>,
}

impl VideoService {
    pub fn new(
        fetcher: Arc<TranscriptFetcher>,
        repository: Arc<dyn VideoRepository>,
        summarizer: Option<Arc<dyn Summarizer>>,
    ) -> Self {
        Self {
            fetcher,
            repository,
            summarizer,
        }
    }

    /// Whether saved videos get an AI summary
    pub fn has_summarizer(&self) -> bool {
        self.summarizer.is_some()
    }

    /// Fetch, summarize and persist the video behind `url`.
    ///
    /// Already saved videos are returned as they are, before any network call.
    /// A failed summary is logged and the video is saved without one.
    pub async fn save_video(&self, url: &str, user_id: UserId) -> Result<SaveOutcome, ServiceError> {
        let video_id = self.fetcher.extract_video_id(url)?;

        if let Some(existing) = self.repository.get_video_by_id(&video_id).await? {
            tracing::info!("Video {} already saved as #{}", video_id, existing.id);
            return Ok(SaveOutcome::AlreadySaved(existing));
        }

        let (video_id, transcript) = match self.fetcher.fetch_for_id(video_id).await {
            FetchResult::Success {
                content_id,
                transcript,
            } => (content_id, transcript),
            FetchResult::Failure {
                error_kind, message, ..
            } => {
                return Err(ServiceError::Fetch {
                    kind: error_kind,
                    message,
                })
            }
        };

        let ai_summary = match &self.summarizer {
            Some(summarizer) => match summarizer.summarize(&transcript.text).await {
                Ok(summary) => Some(summary),
                Err(e) => {
                    tracing::warn!("Failed to generate summary for {}: {}", video_id, e);
                    None
                }
            },
            None => None,
        };

        let video = NewVideo {
            url: url.trim().to_string(),
            video_id,
            platform: "youtube".to_string(),
            raw_transcript: transcript.text,
            ai_summary,
            language: transcript.language,
            is_generated: transcript.is_generated,
            segments_count: transcript.segment_count,
        };

        let record = self.repository.save_video(video, user_id).await?;
        tracing::info!("Saved video {} for user {}", record.video_id, user_id);

        Ok(SaveOutcome::Created(record))
    }

    /// Videos of one user, newest first
    pub async fn get_user_videos(&self, user_id: UserId) -> Result<Vec<VideoRecord>, ServiceError> {
        Ok(self.repository.get_user_videos(user_id).await?)
    }

    /// A video owned by `user_id`; other users' videos are reported as missing
    pub async fn get_video(&self, video_id: &VideoId, user_id: UserId) -> Result<VideoRecord, ServiceError> {
        match self.repository.get_video_by_id(video_id).await? {
            Some(video) if video.user_id == user_id => Ok(video),
            _ => Err(ServiceError::NotFound(video_id.clone())),
        }
    }

    pub async fn update_video(
        &self,
        video_id: &VideoId,
        user_id: UserId,
        update: VideoUpdate,
    ) -> Result<VideoRecord, ServiceError> {
        if update.is_empty() {
            return Err(ServiceError::EmptyUpdate);
        }

        self.owned_video(video_id, user_id).await?;
        Ok(self.repository.update_video(video_id, update).await?)
    }

    pub async fn delete_video(&self, video_id: &VideoId, user_id: UserId) -> Result<(), ServiceError> {
        self.owned_video(video_id, user_id).await?;
        self.repository.delete_video(video_id).await?;

        tracing::info!("Deleted video {} for user {}", video_id, user_id);
        Ok(())
    }

    async fn owned_video(&self, video_id: &VideoId, user_id: UserId) -> Result<VideoRecord, ServiceError> {
        let video = self
            .repository
            .get_video_by_id(video_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(video_id.clone()))?;

        if video.user_id != user_id {
            return Err(ServiceError::AccessDenied(video_id.clone()));
        }

        Ok(video)
    }
}
