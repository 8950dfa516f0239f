use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::video_id::VideoId;

/// Opaque identifier of the user owning a video
pub type UserId = u64;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Video already exists: {0}")]
    Duplicate(VideoId),

    #[error("Video not found: {0}")]
    NotFound(VideoId),

    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    Poisoned,

    #[error("Store task failed: {0}")]
    Task(String),
}

/// A saved video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: u64,
    pub url: String,
    pub video_id: VideoId,
    pub platform: String,
    pub title: Option<String>,
    pub raw_transcript: String,
    pub ai_summary: Option<String>,
    pub language: Option<String>,
    pub is_generated: Option<bool>,
    pub segments_count: usize,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when saving a video; the store assigns the rest
#[derive(Debug, Clone, PartialEq)]
pub struct NewVideo {
    pub url: String,
    pub video_id: VideoId,
    pub platform: String,
    pub raw_transcript: String,
    pub ai_summary: Option<String>,
    pub language: Option<String>,
    pub is_generated: Option<bool>,
    pub segments_count: usize,
}

/// Partial update; only present fields change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoUpdate {
    pub title: Option<String>,
    pub ai_summary: Option<String>,
}

impl VideoUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.ai_summary.is_none()
    }
}

/// Persistence of saved videos, keyed by video identifier
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn save_video(&self, video: NewVideo, user_id: UserId) -> Result<VideoRecord, StoreError>;

    async fn get_video_by_id(&self, video_id: &VideoId) -> Result<Option<VideoRecord>, StoreError>;

    /// Videos of one user, newest first
    async fn get_user_videos(&self, user_id: UserId) -> Result<Vec<VideoRecord>, StoreError>;

    async fn update_video(&self, video_id: &VideoId, update: VideoUpdate) -> Result<VideoRecord, StoreError>;

    async fn delete_video(&self, video_id: &VideoId) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreFile {
    next_id: u64,
    videos: Vec<VideoRecord>,
}

/// Repository keeping all videos in one JSON file.
///
/// The whole file is rewritten on every change, through a temporary file in the
/// same directory that is renamed over the old one. Memory only takes a change
/// once the file write succeeded. File I/O runs on the blocking thread pool.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    path: PathBuf,
    state: Mutex<StoreFile>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty when the file does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let state = if path.exists() {
            let content = fs_err::read_to_string(&path)?;
            if content.trim().is_empty() {
                StoreFile::default()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            StoreFile::default()
        };

        tracing::debug!("Opened video store at {} ({} videos)", path.display(), state.videos.len());

        Ok(Self {
            inner: Arc::new(StoreInner {
                path,
                state: Mutex::new(state),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    async fn run<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&StoreInner) -> Result<T, StoreError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || op(&inner))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

impl StoreInner {
    fn lock(&self) -> Result<MutexGuard<'_, StoreFile>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Write `next` to disk, then make it the current state
    fn commit(&self, state: &mut StoreFile, next: StoreFile) -> Result<(), StoreError> {
        self.persist(&next)?;
        *state = next;
        Ok(())
    }

    fn persist(&self, state: &StoreFile) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs_err::create_dir_all(&dir)?;

        let content = serde_json::to_vec_pretty(state)?;
        let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
        temp.write_all(&content)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;

        Ok(())
    }

    fn save_video(&self, video: NewVideo, user_id: UserId) -> Result<VideoRecord, StoreError> {
        let mut state = self.lock()?;

        if state.videos.iter().any(|existing| existing.video_id == video.video_id) {
            return Err(StoreError::Duplicate(video.video_id));
        }

        let mut next = state.clone();
        next.next_id += 1;
        let now = Utc::now();
        let record = VideoRecord {
            id: next.next_id,
            url: video.url,
            video_id: video.video_id,
            platform: video.platform,
            title: None,
            raw_transcript: video.raw_transcript,
            ai_summary: video.ai_summary,
            language: video.language,
            is_generated: video.is_generated,
            segments_count: video.segments_count,
            user_id,
            created_at: now,
            updated_at: now,
        };
        next.videos.push(record.clone());

        self.commit(&mut state, next)?;

        tracing::debug!("Stored video {} as #{}", record.video_id, record.id);
        Ok(record)
    }

    fn get_video_by_id(&self, video_id: &VideoId) -> Result<Option<VideoRecord>, StoreError> {
        let state = self.lock()?;
        Ok(state.videos.iter().find(|video| &video.video_id == video_id).cloned())
    }

    fn get_user_videos(&self, user_id: UserId) -> Result<Vec<VideoRecord>, StoreError> {
        let state = self.lock()?;
        let mut videos: Vec<VideoRecord> = state
            .videos
            .iter()
            .filter(|video| video.user_id == user_id)
            .cloned()
            .collect();

        videos.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(videos)
    }

    fn update_video(&self, video_id: &VideoId, update: VideoUpdate) -> Result<VideoRecord, StoreError> {
        let mut state = self.lock()?;

        let mut next = state.clone();
        let video = next
            .videos
            .iter_mut()
            .find(|video| &video.video_id == video_id)
            .ok_or_else(|| StoreError::NotFound(video_id.clone()))?;

        if let Some(title) = update.title {
            video.title = Some(title);
        }
        if let Some(summary) = update.ai_summary {
            video.ai_summary = Some(summary);
        }
        video.updated_at = Utc::now();
        let updated = video.clone();

        self.commit(&mut state, next)?;
        Ok(updated)
    }

    fn delete_video(&self, video_id: &VideoId) -> Result<(), StoreError> {
        let mut state = self.lock()?;

        let mut next = state.clone();
        next.videos.retain(|video| &video.video_id != video_id);
        if next.videos.len() == state.videos.len() {
            return Err(StoreError::NotFound(video_id.clone()));
        }

        self.commit(&mut state, next)
    }
}

#[async_trait]
impl VideoRepository for JsonFileStore {
    async fn save_video(&self, video: NewVideo, user_id: UserId) -> Result<VideoRecord, StoreError> {
        self.run(move |inner| inner.save_video(video, user_id)).await
    }

    async fn get_video_by_id(&self, video_id: &VideoId) -> Result<Option<VideoRecord>, StoreError> {
        let video_id = video_id.clone();
        self.run(move |inner| inner.get_video_by_id(&video_id)).await
    }

    async fn get_user_videos(&self, user_id: UserId) -> Result<Vec<VideoRecord>, StoreError> {
        self.run(move |inner| inner.get_user_videos(user_id)).await
    }

    async fn update_video(&self, video_id: &VideoId, update: VideoUpdate) -> Result<VideoRecord, StoreError> {
        let video_id = video_id.clone();
        self.run(move |inner| inner.update_video(&video_id, update)).await
    }

    async fn delete_video(&self, video_id: &VideoId) -> Result<(), StoreError> {
        let video_id = video_id.clone();
        self.run(move |inner| inner.delete_video(&video_id)).await
    }
}
