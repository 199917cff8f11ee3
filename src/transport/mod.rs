//! Message transport boundary.
//!
//! Everything the core needs from the chat platform: fetch an inbound file,
//! send/edit/delete notifications, and send the final media. The Telegram
//! implementation lives in [`telegram`]; tests substitute a recording fake.

pub mod telegram;
mod types;

pub use telegram::TelegramClient;
pub use types::*;

use music_channel_common::Result;
use std::path::Path;

#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Download an inbound file by reference to `dest`.
    ///
    /// Fails with `Error::Io` when the bytes were fetched but could not be
    /// written, and with any other variant when the fetch itself failed.
    async fn download_file(&self, file_id: &str, dest: &Path) -> Result<()>;

    /// Send a text notification.
    async fn send_text(&self, to: &Recipient, text: &str, options: SendOptions)
        -> Result<MessageRef>;

    /// Replace the text of a previously sent notification.
    async fn edit_text(&self, message: &MessageRef, text: &str) -> Result<()>;

    async fn delete_message(&self, message: &MessageRef) -> Result<()>;

    /// Re-send an existing audio file by reference.
    async fn send_audio(
        &self,
        to: &Recipient,
        audio: &AudioFile,
        caption: Option<&str>,
    ) -> Result<MessageRef>;

    /// Upload a local OGG/Opus file as a voice message.
    async fn send_voice(&self, to: &Recipient, path: &Path) -> Result<MessageRef>;

    /// Acknowledge a button press so the client stops its spinner.
    async fn answer_callback(&self, callback_id: &str) -> Result<()>;
}
