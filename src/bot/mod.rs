//! Inbound update routing and the long-poll loop.

mod auth;

pub use auth::{AdminGate, MSG_NOT_ADMIN};

use crate::dispatch::{Callback, DispatchError, Dispatcher};
use crate::intake::{Intake, SubmitError, Submission};
use crate::transport::{CallbackQuery, Message, Recipient, SendOptions, TelegramClient, Transport, Update};
use music_channel_common::{ChatId, Destination, MessageId};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const MSG_SEND_AUDIO: &str = "Send an audio to me please !";

/// Pause before polling again after a failed poll
const POLL_BACKOFF: Duration = Duration::from_secs(3);

/// What became of one inbound update.
#[derive(Debug)]
pub enum Outcome {
    /// Nothing to act on (no sender, empty callback, unsupported message kind)
    Ignored,
    /// Sender is not an administrator
    Refused,
    /// Plain text; the sender was asked for audio
    Hinted,
    Submission(Result<Uuid, SubmitError>),
    Delivery(Result<Destination, DispatchError>),
}

/// Sends each update to the intake or the dispatcher after the admin check.
pub struct Router {
    gate: AdminGate,
    intake: Intake,
    dispatcher: Dispatcher,
    transport: Arc<dyn Transport>,
}

impl Router {
    pub fn new(
        gate: AdminGate,
        intake: Intake,
        dispatcher: Dispatcher,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            gate,
            intake,
            dispatcher,
            transport,
        }
    }

    pub async fn handle_update(&self, update: Update) -> Outcome {
        let Some(sender) = update.sender() else {
            tracing::debug!(update_id = update.update_id, "Update without sender");
            return Outcome::Ignored;
        };
        let sender_id = sender.id;

        if !self.gate.is_admin(sender_id) {
            tracing::info!(user_id = sender_id, "Refusing non-administrator");
            self.refuse(&update, sender_id).await;
            return Outcome::Refused;
        }

        if let Some(message) = update.message {
            return self.handle_message(message).await;
        }

        if let Some(callback) = update.callback_query {
            return self.handle_callback(callback).await;
        }

        Outcome::Ignored
    }

    async fn handle_message(&self, message: Message) -> Outcome {
        let chat = ChatId(message.chat.id);
        let message_id = MessageId(message.message_id);

        if let Some(audio) = message.audio {
            let submission = Submission {
                audio,
                submitter: chat,
                message_id,
            };
            let result = self.intake.submit(submission).await;
            if let Err(e) = &result {
                tracing::info!(chat_id = %chat, "Submission rejected: {}", e);
            }
            return Outcome::Submission(result);
        }

        if message.text.is_some() {
            self.send(&Recipient::Chat(chat), MSG_SEND_AUDIO, SendOptions::reply_to(message_id))
                .await;
            return Outcome::Hinted;
        }

        Outcome::Ignored
    }

    async fn handle_callback(&self, query: CallbackQuery) -> Outcome {
        if let Err(e) = self.transport.answer_callback(&query.id).await {
            tracing::debug!("Failed to answer callback: {}", e);
        }

        let Some(data) = query.data else {
            return Outcome::Ignored;
        };

        let callback = Callback {
            id: query.id,
            from: ChatId(query.from.id),
            data,
            message: query.message.as_ref().map(Message::to_ref),
        };

        Outcome::Delivery(self.dispatcher.redeem(&callback).await)
    }

    async fn refuse(&self, update: &Update, sender_id: i64) {
        let (to, options) = match (&update.message, &update.callback_query) {
            (Some(message), _) => (
                ChatId(message.chat.id),
                SendOptions::reply_to(MessageId(message.message_id)),
            ),
            (None, Some(CallbackQuery {
                message: Some(message),
                ..
            })) => (ChatId(sender_id), SendOptions::reply_to(MessageId(message.message_id))),
            _ => (ChatId(sender_id), SendOptions::default()),
        };
        self.send(&Recipient::Chat(to), MSG_NOT_ADMIN, options).await;
    }

    async fn send(&self, to: &Recipient, text: &str, options: SendOptions) {
        if let Err(e) = self.transport.send_text(to, text, options).await {
            tracing::warn!(to = %to, "Failed to send message: {}", e);
        }
    }
}

/// Long-polls the Bot API and hands every update to the [`Router`] on its
/// own task.
pub struct Bot {
    client: Arc<TelegramClient>,
    router: Arc<Router>,
}

impl Bot {
    pub fn new(client: Arc<TelegramClient>, router: Arc<Router>) -> Self {
        Self { client, router }
    }

    /// Poll until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut offset = 0_i64;

        tracing::info!("Polling for updates");

        loop {
            let updates = tokio::select! {
                _ = &mut shutdown => break,
                updates = self.client.get_updates(offset) => updates,
            };

            match updates {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        let router = Arc::clone(&self.router);
                        tokio::spawn(async move {
                            router.handle_update(update).await;
                        });
                    }
                }
                Err(e) => {
                    tracing::warn!("Polling failed: {}", e);
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = tokio::time::sleep(POLL_BACKOFF) => {}
                    }
                }
            }
        }

        tracing::info!("Stopped polling");
    }
}
