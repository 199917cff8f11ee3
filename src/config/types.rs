use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Bot API credential
    #[serde(default)]
    pub token: String,

    /// User ids allowed to talk to the bot
    #[serde(default)]
    pub administrators: Vec<i64>,

    /// Where downloaded inputs and transcoded outputs are written
    #[serde(default = "default_temp_directory")]
    pub temp_directory: PathBuf,

    /// Broadcast channel username (e.g. "@mychannel")
    #[serde(default)]
    pub channel_username: Option<String>,

    #[serde(default)]
    pub tracker: TrackerConfig,

    #[serde(default)]
    pub worker: WorkerConfig,

    #[serde(default)]
    pub intake: IntakeConfig,

    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_temp_directory() -> PathBuf {
    PathBuf::from("tmp")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: String::new(),
            administrators: Vec::new(),
            temp_directory: default_temp_directory(),
            channel_username: None,
            tracker: TrackerConfig::default(),
            worker: WorkerConfig::default(),
            intake: IntakeConfig::default(),
            telegram: TelegramConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

impl Config {
    pub fn administrator_set(&self) -> HashSet<i64> {
        self.administrators.iter().copied().collect()
    }
}

/// Result cache timing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackerConfig {
    /// How long a completed result stays redeemable
    #[serde(default = "default_ttl")]
    pub default_ttl_secs: u64,

    /// How often expired results are swept
    #[serde(default = "default_sweep_interval")]
    pub interval_secs: u64,
}

fn default_ttl() -> u64 {
    30
}

fn default_sweep_interval() -> u64 {
    5
}

impl TrackerConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_ttl(),
            interval_secs: default_sweep_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    /// Re-check delay once the queue has been drained
    #[serde(default = "default_idle_delay")]
    pub idle_delay_secs: u64,
}

fn default_idle_delay() -> u64 {
    5
}

impl WorkerConfig {
    pub fn idle_delay(&self) -> Duration {
        Duration::from_secs(self.idle_delay_secs)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            idle_delay_secs: default_idle_delay(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntakeConfig {
    /// Submissions shorter than this are refused
    #[serde(default = "default_min_duration")]
    pub min_duration_secs: u32,
}

fn default_min_duration() -> u32 {
    30
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            min_duration_secs: default_min_duration(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Long-poll timeout for getUpdates
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout() -> u64 {
    15
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
        }
    }
}
