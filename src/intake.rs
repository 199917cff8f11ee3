//! Submission intake.
//!
//! Validates an inbound audio submission, downloads it into the temp
//! directory and appends a [`Job`] to the queue. Every failure is reported to
//! the submitter and is terminal: nothing is queued and nothing is retried.

use crate::state::{AppState, Job, TempFiles};
use crate::transport::{AudioFile, MessageRef, Recipient, SendOptions, Transport};
use music_channel_common::{ChatId, Error, MessageId};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

pub const MSG_DOWNLOADING: &str = "Downloading ...";
pub const MSG_QUEUED: &str = "Processing ...";
pub const MSG_DOWNLOAD_FAILED: &str = "Could not download file !";
pub const MSG_WRITE_FAILED: &str = "Error on saving file !";

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("track is {duration}s long, minimum is {minimum}s")]
    TooShort { duration: u32, minimum: u32 },

    #[error("download failed: {0}")]
    Download(Error),

    #[error("could not write input file: {0}")]
    Write(Error),

    #[error("could not notify submitter: {0}")]
    Notify(Error),
}

/// An audio message as received from a user.
#[derive(Debug, Clone)]
pub struct Submission {
    pub audio: AudioFile,
    pub submitter: ChatId,
    /// The user's own message, used as reply target
    pub message_id: MessageId,
}

pub struct Intake {
    state: Arc<AppState>,
    transport: Arc<dyn Transport>,
    temp_dir: PathBuf,
    min_duration_secs: u32,
}

impl Intake {
    pub fn new(
        state: Arc<AppState>,
        transport: Arc<dyn Transport>,
        temp_dir: PathBuf,
        min_duration_secs: u32,
    ) -> Self {
        Self {
            state,
            transport,
            temp_dir,
            min_duration_secs,
        }
    }

    /// Accept or reject a submission. On success returns the queued job id.
    pub async fn submit(&self, submission: Submission) -> Result<Uuid, SubmitError> {
        let Submission {
            audio,
            submitter,
            message_id,
        } = submission;

        let status = self
            .transport
            .send_text(
                &Recipient::Chat(submitter),
                MSG_DOWNLOADING,
                SendOptions::reply_to(message_id),
            )
            .await
            .map_err(SubmitError::Notify)?;

        if audio.duration < self.min_duration_secs {
            let err = SubmitError::TooShort {
                duration: audio.duration,
                minimum: self.min_duration_secs,
            };
            self.report(&status, &format!("Music is less than {} seconds !", self.min_duration_secs))
                .await;
            return Err(err);
        }

        let job_id = Uuid::new_v4();
        let files = TempFiles::for_job(&self.temp_dir, job_id);

        tracing::info!(
            job_id = %job_id,
            chat_id = %submitter,
            file_id = %audio.file_id,
            "Downloading submission"
        );

        // `files` is dropped on the error paths below, removing partial downloads
        if let Err(e) = self.transport.download_file(&audio.file_id, files.input()).await {
            tracing::warn!(job_id = %job_id, "Submission download failed: {}", e);
            return Err(match e {
                Error::Io(_) => {
                    self.report(&status, MSG_WRITE_FAILED).await;
                    SubmitError::Write(e)
                }
                other => {
                    self.report(&status, MSG_DOWNLOAD_FAILED).await;
                    SubmitError::Download(other)
                }
            });
        }

        self.report(&status, MSG_QUEUED).await;

        let job = Job::new(job_id, files, audio, submitter, status);
        Ok(self.state.queue_job(job))
    }

    async fn report(&self, status: &MessageRef, text: &str) {
        if let Err(e) = self.transport.edit_text(status, text).await {
            tracing::warn!("Failed to update status message: {}", e);
        }
    }
}
