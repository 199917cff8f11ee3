//! Shared test harness for integration tests.
//!
//! Provides [`FakeTransport`], which records every outbound call instead of
//! talking to the Bot API, [`FakeTranscoder`], which stands in for ffmpeg,
//! and [`TestHarness`], which wires both into a full set of services.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use music_channel::bot::{AdminGate, Router};
use music_channel::dispatch::Dispatcher;
use music_channel::intake::Intake;
use music_channel::processor::JobProcessor;
use music_channel::state::AppState;
use music_channel::transform::{TranscodeError, Transcoder};
use music_channel::transport::{
    AudioFile, CallbackQuery, Chat, Message, MessageRef, Recipient, SendOptions, Transport,
    Update, User,
};
use music_channel_common::{ChatId, Error, MessageId, Result};
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::sync::mpsc;

pub const ADMIN: i64 = 1000;
pub const CHANNEL: &str = "@music";

/// Input content that makes [`FakeTranscoder`] fail
pub const CORRUPT: &str = "CORRUPT";

/// One recorded outbound call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Download { file_id: String, dest: PathBuf },
    SendText { to: Recipient, text: String, options: SendOptions, sent: MessageRef },
    Edit { message: MessageRef, text: String },
    Delete { message: MessageRef },
    SendAudio { to: Recipient, file_id: String, caption: Option<String> },
    SendVoice { to: Recipient, path: PathBuf },
    AnswerCallback { id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadMode {
    /// Write the file id as the file content
    Succeed,
    /// Transport-level failure
    Fail,
    /// Local write failure
    WriteFail,
}

pub struct FakeTransport {
    calls: Mutex<Vec<Call>>,
    next_message_id: AtomicI64,
    download_mode: Mutex<DownloadMode>,
    fail_send_audio: AtomicBool,
}

impl Default for FakeTransport {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_message_id: AtomicI64::new(5000),
            download_mode: Mutex::new(DownloadMode::Succeed),
            fail_send_audio: AtomicBool::new(false),
        }
    }
}

impl FakeTransport {
    pub fn set_download_mode(&self, mode: DownloadMode) {
        *self.download_mode.lock() = mode;
    }

    pub fn fail_send_audio(&self, fail: bool) {
        self.fail_send_audio.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    /// Every text sent with `send_text`, in order
    pub fn sent_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::SendText { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Every edit applied to `message`, in order
    pub fn edits_of(&self, message: &MessageRef) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Edit { message: m, text } if m == *message => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn deleted(&self) -> Vec<MessageRef> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete { message } => Some(message),
                _ => None,
            })
            .collect()
    }

    /// The message returned by the first `send_text` carrying `text`
    pub fn sent_message(&self, text: &str) -> Option<MessageRef> {
        self.calls().into_iter().find_map(|c| match c {
            Call::SendText { text: t, sent, .. } if t == text => Some(sent),
            _ => None,
        })
    }

    /// Callback payloads of the latest keyboard sent
    pub fn last_keyboard(&self) -> Option<(MessageRef, Vec<String>)> {
        self.calls().into_iter().rev().find_map(|c| match c {
            Call::SendText {
                options:
                    SendOptions {
                        keyboard: Some(keyboard),
                        ..
                    },
                sent,
                ..
            } => Some((
                sent,
                keyboard.payloads().into_iter().map(String::from).collect(),
            )),
            _ => None,
        })
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn next_ref(&self, to: &Recipient) -> MessageRef {
        let chat_id = match to {
            Recipient::Chat(id) => *id,
            Recipient::Channel(_) => ChatId(-100),
        };
        MessageRef {
            chat_id,
            message_id: MessageId(self.next_message_id.fetch_add(1, Ordering::SeqCst)),
        }
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn download_file(&self, file_id: &str, dest: &Path) -> Result<()> {
        self.record(Call::Download {
            file_id: file_id.to_string(),
            dest: dest.to_path_buf(),
        });

        match *self.download_mode.lock() {
            DownloadMode::Succeed => {
                std::fs::write(dest, file_id.as_bytes())?;
                Ok(())
            }
            DownloadMode::Fail => Err(Error::transport("getFile failed (400): file is too big")),
            DownloadMode::WriteFail => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only file system",
            ))),
        }
    }

    async fn send_text(
        &self,
        to: &Recipient,
        text: &str,
        options: SendOptions,
    ) -> Result<MessageRef> {
        let sent = self.next_ref(to);
        self.record(Call::SendText {
            to: to.clone(),
            text: text.to_string(),
            options,
            sent,
        });
        Ok(sent)
    }

    async fn edit_text(&self, message: &MessageRef, text: &str) -> Result<()> {
        self.record(Call::Edit {
            message: *message,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn delete_message(&self, message: &MessageRef) -> Result<()> {
        self.record(Call::Delete { message: *message });
        Ok(())
    }

    async fn send_audio(
        &self,
        to: &Recipient,
        audio: &AudioFile,
        caption: Option<&str>,
    ) -> Result<MessageRef> {
        self.record(Call::SendAudio {
            to: to.clone(),
            file_id: audio.file_id.clone(),
            caption: caption.map(String::from),
        });
        if self.fail_send_audio.load(Ordering::SeqCst) {
            return Err(Error::transport("sendAudio failed (400): chat not found"));
        }
        Ok(self.next_ref(to))
    }

    async fn send_voice(&self, to: &Recipient, path: &Path) -> Result<MessageRef> {
        self.record(Call::SendVoice {
            to: to.clone(),
            path: path.to_path_buf(),
        });
        if !path.exists() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "artifact missing",
            )));
        }
        Ok(self.next_ref(to))
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<()> {
        self.record(Call::AnswerCallback {
            id: callback_id.to_string(),
        });
        Ok(())
    }
}

/// Copies input to output, failing for inputs whose content is [`CORRUPT`].
#[derive(Default)]
pub struct FakeTranscoder {
    processed: Mutex<Vec<PathBuf>>,
    delay: Option<Duration>,
}

impl FakeTranscoder {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            processed: Mutex::new(Vec::new()),
            delay: Some(delay),
        }
    }

    pub fn processed(&self) -> Vec<PathBuf> {
        self.processed.lock().clone()
    }
}

#[async_trait::async_trait]
impl Transcoder for FakeTranscoder {
    async fn transcode(&self, input: &Path, output: &Path) -> std::result::Result<(), TranscodeError> {
        self.processed.lock().push(input.to_path_buf());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let data = std::fs::read(input).map_err(|source| TranscodeError::Spawn {
            program: "fake".to_string(),
            source,
        })?;

        if data == CORRUPT.as_bytes() {
            return Err(TranscodeError::Spawn {
                program: "fake".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, "invalid data found"),
            });
        }

        std::fs::write(output, b"OggS").map_err(|source| TranscodeError::Spawn {
            program: "fake".to_string(),
            source,
        })
    }
}

/// Fully wired services over the fakes.
pub struct TestHarness {
    pub state: Arc<AppState>,
    pub transport: Arc<FakeTransport>,
    pub transcoder: Arc<FakeTranscoder>,
    pub router: Router,
    pub temp_dir: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(30))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self::build(ttl, FakeTranscoder::default(), Some(CHANNEL.to_string()))
    }

    pub fn build(ttl: Duration, transcoder: FakeTranscoder, channel: Option<String>) -> Self {
        let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
        let state = AppState::new(ttl);
        let transport = Arc::new(FakeTransport::default());
        let transcoder = Arc::new(transcoder);

        let dyn_transport: Arc<dyn Transport> = transport.clone();
        let router = Router::new(
            AdminGate::new([ADMIN]),
            Intake::new(
                state.clone(),
                dyn_transport.clone(),
                temp_dir.path().to_path_buf(),
                30,
            ),
            Dispatcher::new(state.clone(), dyn_transport.clone(), channel),
            dyn_transport,
        );

        Self {
            state,
            transport,
            transcoder,
            router,
            temp_dir,
        }
    }

    /// A worker over this harness. Keep the sender alive while it runs.
    pub fn processor(&self) -> (JobProcessor, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel(1);
        let processor = JobProcessor::new(
            self.state.clone(),
            self.transport.clone(),
            self.transcoder.clone(),
            Duration::from_millis(50),
            rx,
        );
        (processor, tx)
    }

    pub fn temp_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.temp_dir.path())
            .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
            .unwrap_or_default()
    }
}

pub fn user(id: i64) -> User {
    User {
        id,
        is_bot: false,
        first_name: format!("user{}", id),
        username: None,
    }
}

fn message(from: i64, message_id: i64) -> Message {
    Message {
        message_id,
        from: Some(user(from)),
        chat: Chat {
            id: from,
            kind: "private".to_string(),
        },
        text: None,
        audio: None,
    }
}

/// An audio upload whose downloaded content will be `file_id`
pub fn audio_update(from: i64, file_id: &str, duration: u32) -> Update {
    let mut msg = message(from, 1);
    msg.audio = Some(AudioFile {
        file_id: file_id.to_string(),
        duration,
        performer: Some("Artist".to_string()),
        title: Some("Song".to_string()),
        mime_type: Some("audio/mpeg".to_string()),
    });
    Update {
        update_id: 1,
        message: Some(msg),
        callback_query: None,
    }
}

pub fn text_update(from: i64, text: &str) -> Update {
    let mut msg = message(from, 2);
    msg.text = Some(text.to_string());
    Update {
        update_id: 2,
        message: Some(msg),
        callback_query: None,
    }
}

/// A press on a button of `prompt`
pub fn callback_update(from: i64, data: &str, prompt: Option<MessageRef>) -> Update {
    Update {
        update_id: 3,
        message: None,
        callback_query: Some(CallbackQuery {
            id: format!("cb-{}", data),
            from: user(from),
            message: prompt.map(|p| Message {
                message_id: p.message_id.0,
                from: None,
                chat: Chat {
                    id: p.chat_id.0,
                    kind: "private".to_string(),
                },
                text: None,
                audio: None,
            }),
            data: Some(data.to_string()),
        }),
    }
}
