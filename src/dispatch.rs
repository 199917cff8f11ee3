//! Delivery dispatch.
//!
//! Redeems a choice token pressed by a user: looks the tracker id up in the
//! result cache and sends the original track plus the trimmed voice clip to
//! the chosen destination. Results stay redeemable until they expire; a
//! successful delivery does not consume the cache entry.

use crate::state::{AppState, JobResult};
use crate::transport::{MessageRef, Recipient, SendOptions, Transport};
use music_channel_common::{ChatId, ChoiceToken, ChoiceTokenError, Destination, Error};
use std::sync::Arc;

pub const MSG_UNSUPPORTED: &str = "Unsupported data !";
pub const MSG_EXPIRED: &str = "Data has been expired !";
pub const MSG_NO_CHANNEL: &str = "No channel is configured !";
pub const MSG_SENDING: &str = "Sending ...";
pub const MSG_SENT: &str = "Sent !";

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("unsupported choice token: {0}")]
    Unsupported(#[from] ChoiceTokenError),

    #[error("result expired or unknown")]
    Expired,

    #[error("no broadcast channel configured")]
    NoChannel,

    #[error("delivery failed: {0}")]
    Send(Error),
}

/// A button press as received from a user.
#[derive(Debug, Clone)]
pub struct Callback {
    pub id: String,
    pub from: ChatId,
    pub data: String,
    /// The prompt message carrying the pressed button
    pub message: Option<MessageRef>,
}

pub struct Dispatcher {
    state: Arc<AppState>,
    transport: Arc<dyn Transport>,
    channel: Option<String>,
}

impl Dispatcher {
    pub fn new(state: Arc<AppState>, transport: Arc<dyn Transport>, channel: Option<String>) -> Self {
        Self {
            state,
            transport,
            channel,
        }
    }

    /// Redeem a callback. Errors have already been reported to the user when
    /// this returns.
    pub async fn redeem(&self, callback: &Callback) -> Result<Destination, DispatchError> {
        tracing::debug!(data = %callback.data, "Processing callback");

        let token: ChoiceToken = match callback.data.parse() {
            Ok(token) => token,
            Err(e) => {
                self.reply(callback, MSG_UNSUPPORTED).await;
                return Err(DispatchError::Unsupported(e));
            }
        };

        let Some(result) = self.state.lookup_result(token.tracker_id()) else {
            tracing::info!(tracker_id = %token.tracker_id(), "Result not found in cache");
            self.reply(callback, MSG_EXPIRED).await;
            return Err(DispatchError::Expired);
        };

        let destination = token.destination();
        let recipient = match destination {
            Destination::Channel => match &self.channel {
                Some(channel) => Recipient::Channel(channel.clone()),
                None => {
                    self.reply(callback, MSG_NO_CHANNEL).await;
                    return Err(DispatchError::NoChannel);
                }
            },
            Destination::Direct => Recipient::Chat(callback.from),
        };

        let sending = self
            .transport
            .send_text(&Recipient::Chat(result.submitter), MSG_SENDING, SendOptions::default())
            .await
            .map_err(|e| {
                tracing::warn!("Failed to send status message: {}", e);
                e
            })
            .ok();

        if let Err(e) = self.deliver(&recipient, &result).await {
            tracing::error!(
                tracker_id = %token.tracker_id(),
                destination = %destination,
                "Delivery failed: {}",
                e
            );
            if let Some(sending) = &sending {
                let text = format!("Sending audio failed, {}", e);
                if let Err(e) = self.transport.edit_text(sending, &text).await {
                    tracing::warn!("Failed to update status message: {}", e);
                }
            }
            return Err(DispatchError::Send(e));
        }

        tracing::info!(
            tracker_id = %token.tracker_id(),
            destination = %destination,
            "Result delivered"
        );

        self.clean_up(callback, &result, sending, destination).await;
        Ok(destination)
    }

    /// Original track first, then the clip. A failure on the second send
    /// leaves the first in place.
    async fn deliver(&self, to: &Recipient, result: &JobResult) -> Result<(), Error> {
        self.transport
            .send_audio(to, &result.audio, self.channel.as_deref())
            .await?;
        self.transport.send_voice(to, result.artifact()).await?;
        Ok(())
    }

    /// Remove the transient notifications. Failures are logged only.
    async fn clean_up(
        &self,
        callback: &Callback,
        result: &JobResult,
        sending: Option<MessageRef>,
        destination: Destination,
    ) {
        let mut doomed = vec![result.status_message];
        doomed.extend(callback.message);

        if let Some(sending) = sending {
            match destination {
                Destination::Direct => doomed.push(sending),
                Destination::Channel => {
                    if let Err(e) = self.transport.edit_text(&sending, MSG_SENT).await {
                        tracing::warn!("Failed to update status message: {}", e);
                    }
                }
            }
        }

        let deletions = doomed.iter().map(|message| async move {
            if let Err(e) = self.transport.delete_message(message).await {
                tracing::debug!(message_id = %message.message_id, "Failed to delete message: {}", e);
            }
        });
        futures::future::join_all(deletions).await;
    }

    async fn reply(&self, callback: &Callback, text: &str) {
        let options = match &callback.message {
            Some(message) => SendOptions::reply_to(message.message_id),
            None => SendOptions::default(),
        };

        if let Err(e) = self
            .transport
            .send_text(&Recipient::Chat(callback.from), text, options)
            .await
        {
            tracing::warn!("Failed to reply to callback: {}", e);
        }
    }
}
