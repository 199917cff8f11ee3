use super::types::{
    ApiResponse, AudioFile, InlineKeyboard, Message, MessageRef, Recipient, RemoteFile,
    SendOptions, Update,
};
use super::Transport;
use crate::config::TelegramConfig;
use music_channel_common::{Error, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// Timeout for ordinary API calls and file transfers
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Extra time allowed on top of the long-poll timeout before giving up
const POLL_GRACE: Duration = Duration::from_secs(10);

const VOICE_MIME: &str = "audio/ogg";

/// Telegram Bot API client.
pub struct TelegramClient {
    client: Client,
    base_url: String,
    token: String,
    poll_timeout: Duration,
}

impl TelegramClient {
    pub fn new(token: &str, config: &TelegramConfig) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            poll_timeout: Duration::from_secs(config.poll_timeout_secs),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.base_url, self.token, file_path)
    }

    async fn call<P, R>(&self, method: &str, params: &P) -> Result<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let request = self.client.post(self.method_url(method)).json(params);
        self.execute(method, request).await
    }

    async fn execute<R: DeserializeOwned>(
        &self,
        method: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<R> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::transport(format!("{} request failed: {}", method, e)))?;

        // Error replies carry a JSON envelope too, whatever the HTTP status
        let envelope: ApiResponse<R> = response
            .json()
            .await
            .map_err(|e| Error::transport(format!("{} returned an unreadable reply: {}", method, e)))?;

        into_result(method, envelope)
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        #[derive(Serialize)]
        struct GetUpdates<'a> {
            offset: i64,
            timeout: u64,
            allowed_updates: &'a [&'a str],
        }

        let params = GetUpdates {
            offset,
            timeout: self.poll_timeout.as_secs(),
            allowed_updates: &["message", "callback_query"],
        };

        let request = self
            .client
            .post(self.method_url("getUpdates"))
            .timeout(self.poll_timeout + POLL_GRACE)
            .json(&params);

        self.execute("getUpdates", request).await
    }
}

fn into_result<R>(method: &str, envelope: ApiResponse<R>) -> Result<R> {
    if !envelope.ok {
        let description = envelope
            .description
            .unwrap_or_else(|| "no description".to_string());
        return Err(match envelope.error_code {
            Some(code) => Error::transport(format!("{} failed ({}): {}", method, code, description)),
            None => Error::transport(format!("{} failed: {}", method, description)),
        });
    }

    envelope
        .result
        .ok_or_else(|| Error::transport(format!("{} returned ok without a result", method)))
}

#[async_trait::async_trait]
impl Transport for TelegramClient {
    async fn download_file(&self, file_id: &str, dest: &Path) -> Result<()> {
        #[derive(Serialize)]
        struct GetFile<'a> {
            file_id: &'a str,
        }

        let remote: RemoteFile = self.call("getFile", &GetFile { file_id }).await?;
        let file_path = remote
            .file_path
            .ok_or_else(|| Error::not_found(format!("file {} has no download path", remote.file_id)))?;

        let response = self
            .client
            .get(self.file_url(&file_path))
            .send()
            .await
            .map_err(|e| Error::transport(format!("download failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::transport(format!(
                "download failed with status {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::transport(format!("download interrupted: {}", e)))?;

        tokio::fs::write(dest, &bytes).await?;
        tracing::debug!(file_id, bytes = bytes.len(), dest = %dest.display(), "Downloaded file");
        Ok(())
    }

    async fn send_text(
        &self,
        to: &Recipient,
        text: &str,
        options: SendOptions,
    ) -> Result<MessageRef> {
        #[derive(Serialize)]
        struct SendMessage<'a> {
            chat_id: &'a Recipient,
            text: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            reply_to_message_id: Option<i64>,
            #[serde(skip_serializing_if = "Option::is_none")]
            reply_markup: Option<&'a InlineKeyboard>,
        }

        let params = SendMessage {
            chat_id: to,
            text,
            reply_to_message_id: options.reply_to.map(|id| id.0),
            reply_markup: options.keyboard.as_ref(),
        };

        let message: Message = self.call("sendMessage", &params).await?;
        Ok(message.to_ref())
    }

    async fn edit_text(&self, message: &MessageRef, text: &str) -> Result<()> {
        #[derive(Serialize)]
        struct EditMessageText<'a> {
            chat_id: i64,
            message_id: i64,
            text: &'a str,
        }

        let params = EditMessageText {
            chat_id: message.chat_id.0,
            message_id: message.message_id.0,
            text,
        };

        // Result is the edited Message, or `true` for inline messages
        let _: serde_json::Value = self.call("editMessageText", &params).await?;
        Ok(())
    }

    async fn delete_message(&self, message: &MessageRef) -> Result<()> {
        #[derive(Serialize)]
        struct DeleteMessage {
            chat_id: i64,
            message_id: i64,
        }

        let params = DeleteMessage {
            chat_id: message.chat_id.0,
            message_id: message.message_id.0,
        };

        let _: bool = self.call("deleteMessage", &params).await?;
        Ok(())
    }

    async fn send_audio(
        &self,
        to: &Recipient,
        audio: &AudioFile,
        caption: Option<&str>,
    ) -> Result<MessageRef> {
        #[derive(Serialize)]
        struct SendAudio<'a> {
            chat_id: &'a Recipient,
            audio: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            caption: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            performer: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            title: Option<&'a str>,
        }

        let params = SendAudio {
            chat_id: to,
            audio: &audio.file_id,
            caption,
            performer: caption.or(audio.performer.as_deref()),
            title: audio.title.as_deref(),
        };

        let message: Message = self.call("sendAudio", &params).await?;
        Ok(message.to_ref())
    }

    async fn send_voice(&self, to: &Recipient, path: &Path) -> Result<MessageRef> {
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "voice.ogg".to_string());

        let part = Part::bytes(data)
            .file_name(file_name)
            .mime_str(VOICE_MIME)
            .map_err(|e| Error::internal(format!("invalid voice MIME type: {}", e)))?;

        let form = Form::new().text("chat_id", to.to_string()).part("voice", part);
        let request = self.client.post(self.method_url("sendVoice")).multipart(form);

        let message: Message = self.execute("sendVoice", request).await?;
        Ok(message.to_ref())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<()> {
        #[derive(Serialize)]
        struct AnswerCallbackQuery<'a> {
            callback_query_id: &'a str,
        }

        let _: bool = self
            .call(
                "answerCallbackQuery",
                &AnswerCallbackQuery {
                    callback_query_id: callback_id,
                },
            )
            .await?;
        Ok(())
    }
}
