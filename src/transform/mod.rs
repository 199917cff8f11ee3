//! Transform runner.
//!
//! Trims a submitted track to a short mono Opus clip with ffmpeg. The
//! argument set is fixed: seconds 20 to 40 of the source, one channel,
//! 128 kbit/s, libopus. Only the executable is configurable.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

/// Start of the clip window, in seconds
pub const CLIP_START_SECS: u32 = 20;
/// End of the clip window, in seconds
pub const CLIP_END_SECS: u32 = 40;
pub const AUDIO_BITRATE: &str = "128k";
pub const AUDIO_CODEC: &str = "libopus";

#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {output}")]
    Failed {
        program: String,
        status: ExitStatus,
        output: String,
    },

    #[error("transcode task aborted: {0}")]
    Join(String),
}

impl TranscodeError {
    /// Captured process output, when the process ran at all.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::Failed { output, .. } => Some(output),
            _ => None,
        }
    }
}

/// Converts a job's input file into its output artifact.
#[async_trait::async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), TranscodeError>;
}

/// Runs the ffmpeg executable as a blocking subprocess.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: String,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Full argument list for one clip.
    pub fn args(input: &Path, output: &Path) -> Vec<String> {
        vec![
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-y".to_string(),
            "-ac".to_string(),
            "1".to_string(),
            "-map".to_string(),
            "0:a".to_string(),
            "-strict".to_string(),
            "-2".to_string(),
            "-b:a".to_string(),
            AUDIO_BITRATE.to_string(),
            "-ss".to_string(),
            CLIP_START_SECS.to_string(),
            "-to".to_string(),
            CLIP_END_SECS.to_string(),
            "-acodec".to_string(),
            AUDIO_CODEC.to_string(),
            output.to_string_lossy().to_string(),
        ]
    }

    fn run_blocking(program: &str, input: &Path, output: &Path) -> Result<(), TranscodeError> {
        let args = Self::args(input, output);
        tracing::debug!("FFmpeg args: {:?}", args);

        let result = Command::new(program)
            .args(&args)
            .output()
            .map_err(|source| TranscodeError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if !result.status.success() {
            let stdout = String::from_utf8_lossy(&result.stdout);
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(TranscodeError::Failed {
                program: program.to_string(),
                status: result.status,
                output: format!("{}{}", stdout, stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), TranscodeError> {
        let program = self.program.clone();
        let input = input.to_path_buf();
        let output = output.to_path_buf();

        tokio::task::spawn_blocking(move || Self::run_blocking(&program, &input, &output))
            .await
            .map_err(|e| TranscodeError::Join(e.to_string()))?
    }
}

/// Availability of an external tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub available: bool,
    pub path: Option<PathBuf>,
}

/// Locate the configured ffmpeg executable on `PATH`.
pub fn check_tool(program: &str) -> ToolInfo {
    let path = which::which(program).ok();
    ToolInfo {
        name: program.to_string(),
        available: path.is_some(),
        path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_argument_template() {
        let args = FfmpegTranscoder::args(Path::new("tmp/a.mp3"), Path::new("tmp/a.ogg"));
        assert_eq!(
            args,
            vec![
                "-i", "tmp/a.mp3", "-y", "-ac", "1", "-map", "0:a", "-strict", "-2", "-b:a",
                "128k", "-ss", "20", "-to", "40", "-acodec", "libopus", "tmp/a.ogg",
            ]
        );
    }

    #[tokio::test]
    async fn test_spawn_error() {
        let transcoder = FfmpegTranscoder::new("/nonexistent/ffmpeg-binary");
        let err = transcoder
            .transcode(Path::new("in.mp3"), Path::new("out.ogg"))
            .await
            .unwrap_err();
        assert!(matches!(err, TranscodeError::Spawn { .. }));
        assert!(err.diagnostic().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let transcoder = FfmpegTranscoder::new("false");
        let err = transcoder
            .transcode(Path::new("in.mp3"), Path::new("out.ogg"))
            .await
            .unwrap_err();
        assert!(matches!(err, TranscodeError::Failed { .. }));
        assert!(err.to_string().starts_with("false exited with"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_zero_exit_is_success() {
        let transcoder = FfmpegTranscoder::new("true");
        transcoder
            .transcode(Path::new("in.mp3"), Path::new("out.ogg"))
            .await
            .unwrap();
    }

    #[test]
    fn test_check_missing_tool() {
        let info = check_tool("definitely-not-a-real-tool-xyz");
        assert!(!info.available);
        assert!(info.path.is_none());
    }
}
