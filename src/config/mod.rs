mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Environment variable carrying the bot API credential
pub const ENV_TOKEN: &str = "TOKEN";
/// Comma-separated administrator user ids
pub const ENV_ADMINISTRATORS: &str = "ADMINISTRATORS";
/// Broadcast channel username
pub const ENV_CHANNEL: &str = "CHANNEL_ID";

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    apply_env_overrides(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./config.toml",
        "./music-channel.toml",
        "~/.config/music-channel/config.toml",
        "/etc/music-channel/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    let mut config = Config::default();
    apply_env_overrides(&mut config);
    validate_config(&config)?;
    Ok(config)
}

/// Overlay `TOKEN`, `ADMINISTRATORS` and `CHANNEL_ID` from the process environment
pub fn apply_env_overrides(config: &mut Config) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

fn apply_overrides_from<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(token) = lookup(ENV_TOKEN).filter(|t| !t.is_empty()) {
        config.token = token;
    }

    if let Some(raw) = lookup(ENV_ADMINISTRATORS) {
        config.administrators = parse_administrators(&raw);
    }

    if let Some(channel) = lookup(ENV_CHANNEL).filter(|c| !c.is_empty()) {
        config.channel_username = Some(channel);
    }
}

/// Parse a comma-separated id list, skipping entries that are not integers.
fn parse_administrators(raw: &str) -> Vec<i64> {
    raw.split(',')
        .filter_map(|part| match part.trim().parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                if !part.trim().is_empty() {
                    tracing::warn!("Ignoring invalid administrator id: {:?}", part);
                }
                None
            }
        })
        .collect()
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.tracker.default_ttl_secs == 0 {
        anyhow::bail!("tracker.default_ttl_secs cannot be 0");
    }

    if config.tracker.interval_secs == 0 {
        anyhow::bail!("tracker.interval_secs cannot be 0");
    }

    if config.worker.idle_delay_secs == 0 {
        anyhow::bail!("worker.idle_delay_secs cannot be 0");
    }

    if config.administrators.is_empty() {
        tracing::warn!("No administrators configured; every update will be refused");
    }

    if config.channel_username.is_none() {
        tracing::warn!("No channel configured; channel deliveries will fail");
    }

    Ok(())
}

/// Checks that only matter when actually connecting to the transport
pub fn validate_for_start(config: &Config) -> Result<()> {
    if config.token.trim().is_empty() {
        anyhow::bail!("No bot token configured (set `token` or the {} variable)", ENV_TOKEN);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.tracker.default_ttl_secs, 30);
        assert_eq!(config.tracker.interval_secs, 5);
        assert_eq!(config.worker.idle_delay_secs, 5);
        assert_eq!(config.intake.min_duration_secs, 30);
        assert_eq!(config.temp_directory, std::path::PathBuf::from("tmp"));
        assert_eq!(config.tools.ffmpeg, "ffmpeg");
        assert_eq!(config.telegram.api_url, "https://api.telegram.org");
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.tracker.default_ttl_secs, 30);
        assert_eq!(config.temp_directory, std::path::PathBuf::from("tmp"));
        assert!(config.administrators.is_empty());
    }

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
token = "123:abc"
administrators = [1, 2]
temp_directory = "/var/tmp/mc"
channel_username = "@music"

[tracker]
default_ttl_secs = 600
interval_secs = 10
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.token, "123:abc");
        assert_eq!(config.administrators, vec![1, 2]);
        assert_eq!(config.channel_username.as_deref(), Some("@music"));
        assert_eq!(config.tracker.default_ttl_secs, 600);
        assert_eq!(config.tracker.interval_secs, 10);
        assert_eq!(config.worker.idle_delay_secs, 5);
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[tracker]\ndefault_ttl_secs = 0").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("default_ttl_secs"));
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = load_config(Path::new("/nonexistent/music-channel.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        apply_overrides_from(
            &mut config,
            lookup_from(&[
                (ENV_TOKEN, "999:xyz"),
                (ENV_ADMINISTRATORS, "10, 20,oops,,30"),
                (ENV_CHANNEL, "@broadcast"),
            ]),
        );
        assert_eq!(config.token, "999:xyz");
        assert_eq!(config.administrators, vec![10, 20, 30]);
        assert_eq!(config.channel_username.as_deref(), Some("@broadcast"));
    }

    #[test]
    fn test_empty_env_values_do_not_clobber() {
        let mut config = Config {
            token: "from-file".to_string(),
            channel_username: Some("@file".to_string()),
            ..Config::default()
        };
        apply_overrides_from(&mut config, lookup_from(&[(ENV_TOKEN, ""), (ENV_CHANNEL, "")]));
        assert_eq!(config.token, "from-file");
        assert_eq!(config.channel_username.as_deref(), Some("@file"));
    }

    #[test]
    fn test_validate_for_start_requires_token() {
        assert!(validate_for_start(&Config::default()).is_err());
        let config = Config {
            token: "1:a".to_string(),
            ..Config::default()
        };
        assert!(validate_for_start(&config).is_ok());
    }
}
