use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use thiserror::Error;

use super::report::{parse_duration, parse_timestamp};
use super::timeline::Segment;
use super::utils::{extension_or_default, ffmpeg_seconds};
use crate::ui::prelude::{Level, emit};

const CONCAT_LIST_FILE: &str = "list.txt";

/// Parameters handed to ffmpeg's `silencedetect` filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectionSettings {
    /// Level in dB under which audio counts as silence.
    pub noise_db: f64,
    /// Shortest silence ffmpeg reports, in seconds.
    pub min_silence: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum DetectionError {
    #[error("silence threshold must be a finite number of dB, got {0}")]
    NotFiniteThreshold(f64),

    #[error("minimum silence must be a positive number of seconds, got {0}")]
    NonPositiveMinSilence(f64),
}

impl DetectionSettings {
    pub fn validate(&self) -> Result<(), DetectionError> {
        if !self.noise_db.is_finite() {
            return Err(DetectionError::NotFiniteThreshold(self.noise_db));
        }
        if !self.min_silence.is_finite() || self.min_silence <= 0.0 {
            return Err(DetectionError::NonPositiveMinSilence(self.min_silence));
        }
        Ok(())
    }

    pub fn filter(&self) -> String {
        format!("silencedetect=n={}dB:d={}", self.noise_db, self.min_silence)
    }
}

/// The external decoder/encoder the trimming pipeline drives.
pub trait MediaTool {
    /// Runs silence detection and returns the diagnostic lines ffmpeg printed.
    fn detect_silence(&self, input: &Path, settings: &DetectionSettings) -> Result<Vec<String>>;

    /// Cuts every keep segment into its own file inside `work_dir`, returning
    /// the chunk paths in timeline order.
    fn extract_segments(
        &self,
        input: &Path,
        keep: &[Segment],
        work_dir: &Path,
    ) -> Result<Vec<PathBuf>>;

    fn concatenate(&self, chunks: &[PathBuf], output: &Path, work_dir: &Path) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemFfmpeg {
    verbose: bool,
}

impl SystemFfmpeg {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn is_available() -> bool {
        which::which("ffmpeg").is_ok()
    }

    fn run(&self, args: &[String], task: &str, log_path: Option<&Path>) -> Result<Vec<String>> {
        if self.verbose {
            emit(
                Level::Debug,
                "silence.ffmpeg.command",
                &format!("ffmpeg {}", args.join(" ")),
                None,
            );
        }

        let mut child = Command::new("ffmpeg")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| "Failed to spawn ffmpeg")?;

        let stderr = child
            .stderr
            .take()
            .context("ffmpeg stderr was not captured")?;

        let progress = if self.verbose {
            None
        } else {
            Some(task_progress(task))
        };

        let verbose = self.verbose;
        let mut lines: Vec<String> = Vec::new();
        let mut error_lines: Vec<String> = Vec::new();
        let result = read_stderr_lines(stderr, |line| {
            if verbose {
                eprintln!("{}", line);
            }
            if line.contains("error") || line.contains("Error") || line.contains("ERROR") {
                error_lines.push(line.to_string());
            }
            if let Some(pb) = &progress {
                track_progress(pb, line);
            }
            lines.push(line.to_string());
        });

        let status = child.wait().context("Failed to wait for ffmpeg")?;
        if let Some(pb) = progress {
            pb.finish_and_clear();
        }
        result?;

        if let Some(path) = log_path {
            fs::write(path, lines.join("\n"))
                .with_context(|| format!("Failed to write ffmpeg log {}", path.display()))?;
        }

        if !status.success() {
            let error_msg = if !error_lines.is_empty() {
                error_lines.join("\n")
            } else {
                lines.last().cloned().unwrap_or_default()
            };
            bail!(
                "ffmpeg {} exited with status {:?}: {}",
                task,
                status.code(),
                error_msg.trim()
            );
        }

        Ok(lines)
    }
}

impl MediaTool for SystemFfmpeg {
    fn detect_silence(&self, input: &Path, settings: &DetectionSettings) -> Result<Vec<String>> {
        self.run(&detect_args(input, settings), "silence detection", None)
    }

    fn extract_segments(
        &self,
        input: &Path,
        keep: &[Segment],
        work_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        if keep.is_empty() {
            bail!("no segments to extract from {}", input.display());
        }
        let (args, chunks) = extract_args(input, keep, work_dir);
        self.run(&args, "extraction", Some(&work_dir.join("extract.log")))?;

        if let Some(missing) = chunks.iter().find(|chunk| !chunk.exists()) {
            bail!("ffmpeg did not produce chunk {}", missing.display());
        }
        Ok(chunks)
    }

    fn concatenate(&self, chunks: &[PathBuf], output: &Path, work_dir: &Path) -> Result<()> {
        let list_path = work_dir.join(CONCAT_LIST_FILE);
        fs::write(&list_path, concat_list(chunks))
            .with_context(|| format!("Failed to write concat list {}", list_path.display()))?;
        self.run(
            &concat_args(&list_path, output),
            "concatenation",
            Some(&work_dir.join("concat.log")),
        )?;
        Ok(())
    }
}

pub fn detect_args(input: &Path, settings: &DetectionSettings) -> Vec<String> {
    vec![
        "-nostdin".to_string(),
        "-hide_banner".to_string(),
        "-i".to_string(),
        input.to_string_lossy().into_owned(),
        "-vn".to_string(),
        "-af".to_string(),
        settings.filter(),
        "-f".to_string(),
        "null".to_string(),
        "-".to_string(),
    ]
}

/// One ffmpeg invocation with an output per keep segment. The `-ss`/`-t`
/// output options apply to the chunk path that follows them.
pub fn extract_args(input: &Path, keep: &[Segment], work_dir: &Path) -> (Vec<String>, Vec<PathBuf>) {
    let extension = extension_or_default(input, "mkv");
    let mut args = vec![
        "-nostdin".to_string(),
        "-hide_banner".to_string(),
        "-y".to_string(),
        "-i".to_string(),
        input.to_string_lossy().into_owned(),
    ];
    let mut chunks = Vec::with_capacity(keep.len());

    for (index, segment) in keep.iter().enumerate() {
        let chunk = work_dir.join(format!("{}.{}", index, extension));
        if segment.start > 0.0 {
            args.push("-ss".to_string());
            args.push(ffmpeg_seconds(segment.start));
        }
        if let Some(end) = segment.end_seconds() {
            args.push("-t".to_string());
            args.push(ffmpeg_seconds(end - segment.start));
        }
        args.push(chunk.to_string_lossy().into_owned());
        chunks.push(chunk);
    }

    (args, chunks)
}

/// Contents of the list file read by ffmpeg's concat demuxer.
pub fn concat_list(chunks: &[PathBuf]) -> String {
    chunks
        .iter()
        .map(|chunk| {
            let escaped = chunk.to_string_lossy().replace('\'', r"'\''");
            format!("file '{}'\n", escaped)
        })
        .collect()
}

pub fn concat_args(list_path: &Path, output: &Path) -> Vec<String> {
    vec![
        "-nostdin".to_string(),
        "-hide_banner".to_string(),
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        list_path.to_string_lossy().into_owned(),
        "-c".to_string(),
        "copy".to_string(),
        "-y".to_string(),
        output.to_string_lossy().into_owned(),
    ]
}

/// Splits a stream on `\n` and `\r` (ffmpeg redraws its progress line with
/// carriage returns) and hands every non-empty line to `on_line`.
fn read_stderr_lines<R: Read, F: FnMut(&str)>(mut stderr: R, mut on_line: F) -> Result<()> {
    let mut buffer = [0u8; 4096];
    let mut accumulated: Vec<u8> = Vec::new();

    loop {
        let bytes_read = stderr
            .read(&mut buffer)
            .context("Failed to read ffmpeg stderr")?;
        if bytes_read == 0 {
            break;
        }
        accumulated.extend_from_slice(&buffer[..bytes_read]);

        while let Some(pos) = accumulated.iter().position(|&b| b == b'\r' || b == b'\n') {
            let raw: Vec<u8> = accumulated.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..pos]);
            if !line.is_empty() {
                on_line(&line);
            }
        }
    }

    if !accumulated.is_empty() {
        on_line(&String::from_utf8_lossy(&accumulated));
    }

    Ok(())
}

fn task_progress(task: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) =
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
    {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(task.to_string());
    pb
}

// Switches the spinner to a bar once ffmpeg has printed the input duration.
fn track_progress(pb: &ProgressBar, line: &str) {
    if pb.length().is_none() {
        if let Ok(duration) = parse_duration([line]) {
            pb.set_length((duration * 1000.0) as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] ({eta}) {msg}")
            {
                pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏ "));
            }
        }
    }
    if let Some(position) = parse_ffmpeg_progress(line) {
        pb.set_position((position * 1000.0) as u64);
    }
}

fn parse_ffmpeg_progress(line: &str) -> Option<f64> {
    let time_start = line.find("time=")?;
    let time_str = &line[time_start + 5..];
    let time_val = time_str.split_whitespace().next()?;
    parse_timestamp(time_val)
}
