use crate::state::{AppState, Job};
use crate::transform::Transcoder;
use crate::transport::{InlineButton, InlineKeyboard, MessageRef, Recipient, SendOptions, Transport};
use music_channel_common::{ChoiceToken, Destination, TrackerId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub const MSG_TRIMMING: &str = "Trimming ...";
pub const MSG_DONE: &str = "Done !";
pub const MSG_PROMPT: &str = "Where do you want to get edited music ?";

/// Single background worker that drains the job queue one transform at a time
pub struct JobProcessor {
    state: Arc<AppState>,
    transport: Arc<dyn Transport>,
    transcoder: Arc<dyn Transcoder>,
    idle_delay: Duration,
    shutdown_rx: mpsc::Receiver<()>,
}

impl JobProcessor {
    pub fn new(
        state: Arc<AppState>,
        transport: Arc<dyn Transport>,
        transcoder: Arc<dyn Transcoder>,
        idle_delay: Duration,
        shutdown_rx: mpsc::Receiver<()>,
    ) -> Self {
        Self {
            state,
            transport,
            transcoder,
            idle_delay,
            shutdown_rx,
        }
    }

    /// Drain, idle, repeat until shut down.
    pub async fn run(mut self) {
        tracing::info!("Job processor started");

        loop {
            if self.drain().await {
                break;
            }

            tokio::select! {
                biased;

                _ = self.shutdown_rx.recv() => break,
                _ = self.state.queue().wait(self.idle_delay) => {}
            }
        }

        tracing::info!("Job processor shutting down");
    }

    /// Process queued jobs until the queue is empty. Returns `true` if a
    /// shutdown was requested in between jobs.
    async fn drain(&mut self) -> bool {
        while let Some(job) = self.state.dequeue_job() {
            self.process_job(job).await;

            match self.shutdown_rx.try_recv() {
                Ok(()) | Err(mpsc::error::TryRecvError::Disconnected) => return true,
                Err(mpsc::error::TryRecvError::Empty) => {}
            }
        }
        false
    }

    /// Run one job to completion. Never fails: errors end up in the job's
    /// status message and the job is dropped.
    pub async fn process_job(&self, mut job: Job) {
        let tracker_id = TrackerId::generate();
        job.tracker_id = Some(tracker_id.clone());
        self.state.start_job(job.id, &tracker_id);
        tracing::debug!(
            job_id = %job.id,
            waited_ms = job.waited().num_milliseconds(),
            "Dequeued job"
        );

        self.edit_status(&job.status_message, MSG_TRIMMING).await;

        let result = self
            .transcoder
            .transcode(job.files.input(), job.files.output())
            .await;

        if let Err(e) = result {
            let text = format!("Running command failed, {}", e);
            self.edit_status(&job.status_message, &text).await;
            self.state.fail_job(job.id, &e.to_string());
            // Dropping the job removes its temp files
            return;
        }

        self.edit_status(&job.status_message, MSG_DONE).await;

        let submitter = job.submitter;
        let status_message = job.status_message;

        // Publish before prompting so an immediate button press finds the result
        self.state.complete_job(tracker_id.clone(), job.into_result());

        let options =
            SendOptions::reply_to(status_message.message_id).with_keyboard(choice_keyboard(&tracker_id));
        if let Err(e) = self
            .transport
            .send_text(&Recipient::Chat(submitter), MSG_PROMPT, options)
            .await
        {
            tracing::error!(tracker_id = %tracker_id, "Failed to send delivery prompt: {}", e);
        }
    }

    async fn edit_status(&self, message: &MessageRef, text: &str) {
        if let Err(e) = self.transport.edit_text(message, text).await {
            tracing::warn!("Failed to update status message: {}", e);
        }
    }
}

/// The two mutually exclusive delivery choices for a result
pub fn choice_keyboard(tracker_id: &TrackerId) -> InlineKeyboard {
    let button = |text: &str, destination| InlineButton {
        text: text.to_string(),
        callback_data: ChoiceToken::new(tracker_id.clone(), destination).to_string(),
    };

    InlineKeyboard::row(vec![
        button("Channel", Destination::Channel),
        button("Here", Destination::Direct),
    ])
}
