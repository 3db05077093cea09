//! Subprocess runner and FFmpeg command builder.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output file path
    output: PathBuf,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    log_level: String,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            log_level: "error".to_string(),
        }
    }

    /// Add an input argument (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add an output argument (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Seek before decoding the input.
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{:.3}", seconds))
    }

    /// Limit the amount of input read.
    pub fn duration(self, seconds: f64) -> Self {
        self.input_arg("-t").input_arg(format!("{:.3}", seconds))
    }

    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    pub fn crf(self, crf: u8) -> Self {
        self.output_arg("-crf").output_arg(crf.to_string())
    }

    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    /// Move the moov atom to the front so browsers can start playback early.
    pub fn faststart(self) -> Self {
        self.output_arg("-movflags").output_arg("+faststart")
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec!["-y".to_string(), "-v".to_string(), self.log_level.clone()];

        args.extend(self.input_args.iter().cloned());
        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());
        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Captured output of a finished subprocess.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs an external binary with an optional hard deadline.
///
/// On timeout the child is killed and [`MediaError::Timeout`] is returned.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    program: String,
    timeout_secs: Option<u64>,
}

impl ToolRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout_secs: None,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Name used in logs, metrics and error messages.
    pub fn tool_name(&self) -> String {
        Path::new(&self.program)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.clone())
    }

    /// Check that the binary resolves on PATH (or as a direct path).
    pub fn check(&self) -> MediaResult<PathBuf> {
        which::which(&self.program).map_err(|_| MediaError::ToolNotFound(self.tool_name()))
    }

    /// Run the binary to completion and capture its output.
    ///
    /// A non-zero exit status becomes [`MediaError::CommandFailed`] carrying
    /// the last non-empty stderr line.
    pub async fn run(&self, args: &[String]) -> MediaResult<ToolOutput> {
        self.check()?;
        let tool = self.tool_name();
        debug!("Running {}: {} {}", tool, self.program, args.join(" "));

        let child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let started = Instant::now();
        let wait = child.wait_with_output();

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match self.timeout_secs {
            Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), wait).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!("{} timed out after {} seconds, killing process", tool, secs);
                    record_run(&tool, "timeout", started);
                    return Err(MediaError::timeout(tool, secs));
                }
            },
            None => wait.await?,
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            debug!("{} stderr: {}", tool, stderr);
            record_run(&tool, "failure", started);
            return Err(MediaError::command_failed(
                tool,
                last_meaningful_line(&stderr).unwrap_or("exited with non-zero status"),
                output.status.code(),
            ));
        }

        record_run(&tool, "success", started);
        Ok(ToolOutput { stdout, stderr })
    }
}

fn record_run(tool: &str, outcome: &'static str, started: Instant) {
    metrics::histogram!(
        "clipgen_subprocess_duration_seconds",
        "tool" => tool.to_string(),
        "outcome" => outcome
    )
    .record(started.elapsed().as_secs_f64());
}

/// Last non-empty line of a tool's stderr, which is where yt-dlp and FFmpeg
/// put the actual error.
pub fn last_meaningful_line(stderr: &str) -> Option<&str> {
    stderr.lines().map(str::trim).filter(|l| !l.is_empty()).last()
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    ToolRunner::new("ffmpeg").check()
}

/// Check if yt-dlp is available.
pub fn check_ytdlp() -> MediaResult<PathBuf> {
    ToolRunner::new("yt-dlp").check()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let cmd = FfmpegCommand::new("input.mp4", "output.mp4")
            .seek(30.0)
            .duration(30.0)
            .video_codec("libx264")
            .crf(23)
            .faststart();

        let args = cmd.build_args();
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < input, "seek must be an input option");
        assert_eq!(args[ss + 1], "30.000");
        assert!(args.contains(&"+faststart".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("output.mp4"));
        assert_eq!(args[0], "-y");
    }

    #[test]
    fn test_last_meaningful_line() {
        let stderr = "WARNING: something\nERROR: Video unavailable\n\n";
        assert_eq!(last_meaningful_line(stderr), Some("ERROR: Video unavailable"));
        assert_eq!(last_meaningful_line("  \n"), None);
    }

    #[test]
    fn test_tool_name_from_path() {
        assert_eq!(ToolRunner::new("/usr/local/bin/yt-dlp").tool_name(), "yt-dlp");
        assert_eq!(ToolRunner::new("ffmpeg").tool_name(), "ffmpeg");
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let runner = ToolRunner::new("definitely-not-a-real-binary-clipgen");
        let err = runner.run(&[]).await.unwrap_err();
        assert!(matches!(err, MediaError::ToolNotFound(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_process() {
        let runner = ToolRunner::new("sleep").with_timeout(1);
        let err = runner.run(&["5".to_string()]).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit() {
        let runner = ToolRunner::new("false");
        let err = runner.run(&[]).await.unwrap_err();
        assert!(matches!(err, MediaError::CommandFailed { .. }));
    }
}
