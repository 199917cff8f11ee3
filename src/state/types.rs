use crate::transport::{AudioFile, MessageRef};
use chrono::{DateTime, Utc};
use music_channel_common::{ChatId, TrackerId};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Scratch files owned by one job.
///
/// Both paths are removed when the guard is dropped, whichever way the job
/// ends: an abandoned job drops it immediately, a completed job hands it to
/// its cached [`JobResult`] and the files go when that entry is evicted.
#[derive(Debug)]
pub struct TempFiles {
    input: PathBuf,
    output: PathBuf,
}

impl TempFiles {
    pub fn new(input: PathBuf, output: PathBuf) -> Self {
        Self { input, output }
    }

    /// `<dir>/<job id>.mp3` and `<dir>/<job id>.ogg`
    pub fn for_job(dir: &Path, job_id: Uuid) -> Self {
        Self::new(
            dir.join(format!("{}.mp3", job_id)),
            dir.join(format!("{}.ogg", job_id)),
        )
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }
}

impl Drop for TempFiles {
    fn drop(&mut self) {
        for path in [&self.input, &self.output] {
            match std::fs::remove_file(path) {
                Ok(()) => tracing::debug!("Removed temp file {:?}", path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Failed to remove temp file {:?}: {}", path, e),
            }
        }
    }
}

/// One accepted submission waiting for its transform.
#[derive(Debug)]
pub struct Job {
    pub id: Uuid,
    pub files: TempFiles,
    /// Original upload, re-sent as-is on delivery
    pub audio: AudioFile,
    pub submitter: ChatId,
    /// Status notification edited as the job advances
    pub status_message: MessageRef,
    /// Minted when the transform starts
    pub tracker_id: Option<TrackerId>,
    pub queued_at: DateTime<Utc>,
}

impl Job {
    /// Time spent waiting in the queue so far
    pub fn waited(&self) -> chrono::Duration {
        Utc::now() - self.queued_at
    }

    pub fn new(
        id: Uuid,
        files: TempFiles,
        audio: AudioFile,
        submitter: ChatId,
        status_message: MessageRef,
    ) -> Self {
        Self {
            id,
            files,
            audio,
            submitter,
            status_message,
            tracker_id: None,
            queued_at: Utc::now(),
        }
    }

    /// Turn a transformed job into its cacheable result.
    pub fn into_result(self) -> JobResult {
        JobResult {
            job_id: self.id,
            audio: self.audio,
            files: Arc::new(self.files),
            submitter: self.submitter,
            status_message: self.status_message,
        }
    }
}

/// What survives of a job after a successful transform.
///
/// Immutable once cached.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub job_id: Uuid,
    pub audio: AudioFile,
    pub files: Arc<TempFiles>,
    pub submitter: ChatId,
    pub status_message: MessageRef,
}

impl JobResult {
    /// The transformed artifact.
    pub fn artifact(&self) -> &Path {
        self.files.output()
    }
}

/// Lifecycle notifications broadcast by [`AppState`](super::AppState).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Queued { job_id: Uuid },
    Started { job_id: Uuid, tracker_id: TrackerId },
    Completed { job_id: Uuid, tracker_id: TrackerId },
    Failed { job_id: Uuid, error: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobStats {
    pub total_processed: u64,
    pub successful: u64,
    pub failed: u64,
}

impl JobStats {
    pub fn success_rate(&self) -> f32 {
        if self.total_processed == 0 {
            return 0.0;
        }
        (self.successful as f32 / self.total_processed as f32) * 100.0
    }

    pub fn record_success(&mut self) {
        self.total_processed += 1;
        self.successful += 1;
    }

    pub fn record_failure(&mut self) {
        self.total_processed += 1;
        self.failed += 1;
    }
}
