use anyhow::{Context, Result, bail};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

use super::cli::{ConfigCommands, DetectArgs, PlanArgs, TrimArgs};
use super::config::TrimConfig;
use super::ffmpeg::{DetectionSettings, MediaTool, SystemFfmpeg};
use super::report::{SilenceReport, parse_report};
use super::timeline::{
    PausePolicy, Segment, Span, compute_keep_timeline, format_segments, total_length,
};
use super::utils::canonicalize_existing;
use crate::common::paths;
use crate::ui::prelude::{Level, emit, separator};

/// Everything one trim run needs, resolved from flags and configuration.
#[derive(Debug, Clone)]
pub struct TrimOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub detection: DetectionSettings,
    pub policy: PausePolicy,
    pub keep_temp: bool,
    pub dry_run: bool,
    pub force: bool,
}

#[derive(Debug)]
pub struct TrimOutcome {
    pub report: SilenceReport,
    pub keep: Vec<Segment>,
    /// Chunk directory left on disk because `keep_temp` was set.
    pub work_dir: Option<PathBuf>,
}

/// Detects silence, computes the keep timeline, then cuts and re-joins it.
///
/// Each ffmpeg step blocks until it finishes. Chunks live in a temporary
/// directory that is removed afterwards unless `keep_temp` is set, in which
/// case it also survives a failed run.
pub fn trim_silence(tool: &dyn MediaTool, options: &TrimOptions) -> Result<TrimOutcome> {
    options.policy.validate().context("invalid pause policy")?;
    options
        .detection
        .validate()
        .context("invalid detection settings")?;
    check_output(options)?;

    let report = detect(tool, &options.input, &options.detection)?;
    let keep = plan(&report, &options.policy);
    if keep.is_empty() {
        bail!(
            "nothing left to keep in {} after removing silence",
            options.input.display()
        );
    }
    if options.dry_run {
        return Ok(TrimOutcome {
            report,
            keep,
            work_dir: None,
        });
    }

    let work_dir = tempfile::Builder::new()
        .prefix("removesilence-")
        .tempdir()
        .context("Failed to create temporary directory for chunks")?;
    let result = cut_and_join(tool, options, &keep, work_dir.path());

    let kept_dir = if options.keep_temp {
        let path = work_dir.keep();
        emit(
            Level::Info,
            "silence.trim.temp",
            &format!("Kept temporary files in {}", path.display()),
            Some(json!({ "path": path })),
        );
        Some(path)
    } else {
        None
    };
    result?;

    emit(
        Level::Success,
        "silence.trim.success",
        &format!("Saved trimmed file to {}", options.output.display()),
        Some(json!({
            "output": options.output,
            "segments": keep.len(),
            "kept_seconds": total_length(&keep, report.duration),
            "duration": report.duration,
        })),
    );

    Ok(TrimOutcome {
        report,
        keep,
        work_dir: kept_dir,
    })
}

fn check_output(options: &TrimOptions) -> Result<()> {
    if options.dry_run || !options.output.exists() {
        return Ok(());
    }
    let same_file = match (
        fs::canonicalize(&options.input),
        fs::canonicalize(&options.output),
    ) {
        (Ok(input), Ok(output)) => input == output,
        _ => false,
    };
    if same_file {
        bail!(
            "output {} is the input file; choose a different output path",
            options.output.display()
        );
    }
    if !options.force {
        bail!(
            "{} already exists (use --force to overwrite)",
            options.output.display()
        );
    }
    Ok(())
}

fn detect(tool: &dyn MediaTool, input: &Path, settings: &DetectionSettings) -> Result<SilenceReport> {
    emit(
        Level::Info,
        "silence.detect.start",
        &format!(
            "Detecting silence below {}dB lasting at least {}s in {}...",
            settings.noise_db,
            settings.min_silence,
            input.display()
        ),
        None,
    );

    let lines = tool.detect_silence(input, settings)?;
    let report = parse_report(&lines)
        .with_context(|| format!("parsing ffmpeg silence report for {}", input.display()))?;
    announce_silences(&report);
    Ok(report)
}

fn announce_silences(report: &SilenceReport) {
    let spans: Vec<String> = report.silences.iter().map(Span::to_string).collect();
    emit(
        Level::Info,
        "silence.detect.report",
        &format!(
            "silent segments ({:.2}s of {:.2}s): [{}]",
            report.total_silence(),
            report.duration,
            spans.join(" ")
        ),
        Some(json!({
            "silences": report.silences,
            "duration": report.duration,
        })),
    );
}

fn plan(report: &SilenceReport, policy: &PausePolicy) -> Vec<Segment> {
    let keep = compute_keep_timeline(report, policy);
    let kept = total_length(&keep, report.duration);
    emit(
        Level::Info,
        "silence.plan.timeline",
        &format!(
            "keeping segments ({:.2}s of {:.2}s): {}",
            kept,
            report.duration,
            format_segments(&keep)
        ),
        Some(json!({
            "segments": keep,
            "kept_seconds": kept,
            "removed_seconds": (report.duration - kept).max(0.0),
            "duration": report.duration,
            "policy": policy,
        })),
    );
    keep
}

fn cut_and_join(
    tool: &dyn MediaTool,
    options: &TrimOptions,
    keep: &[Segment],
    work_dir: &Path,
) -> Result<()> {
    emit(
        Level::Info,
        "silence.trim.extract",
        &format!("Cutting {} segments...", keep.len()),
        None,
    );
    let chunks = tool.extract_segments(&options.input, keep, work_dir)?;

    emit(
        Level::Info,
        "silence.trim.concat",
        &format!("Joining {} chunks into {}...", chunks.len(), options.output.display()),
        None,
    );
    tool.concatenate(&chunks, &options.output, work_dir)
}

fn ensure_ffmpeg() -> Result<()> {
    if !SystemFfmpeg::is_available() {
        bail!("ffmpeg was not found in PATH; install ffmpeg to detect and cut silence");
    }
    Ok(())
}

pub fn handle_trim(args: TrimArgs, verbose: bool) -> Result<()> {
    ensure_ffmpeg()?;
    let input = canonicalize_existing(&args.input)?;
    let config = TrimConfig::load()?;
    let policy = config.policy_with(&args.policy);
    let detection = config.detection_with(&args.detection, policy.max_pause);

    let options = TrimOptions {
        input,
        output: args.out_file,
        detection,
        policy,
        keep_temp: args.keep_temp,
        dry_run: args.dry_run,
        force: args.force,
    };
    let outcome = trim_silence(&SystemFfmpeg::new(verbose), &options)?;
    if options.dry_run {
        emit(
            Level::Info,
            "silence.trim.dry_run",
            &format!(
                "Dry run: {} segments ({:.2}s of {:.2}s) would be written to {}",
                outcome.keep.len(),
                total_length(&outcome.keep, outcome.report.duration),
                outcome.report.duration,
                options.output.display()
            ),
            None,
        );
    }
    Ok(())
}

pub fn handle_detect(args: DetectArgs, verbose: bool) -> Result<()> {
    ensure_ffmpeg()?;
    let input = canonicalize_existing(&args.input)?;
    let config = TrimConfig::load()?;
    let max_pause = args.max_pause.unwrap_or(config.max_pause);
    let detection = config.detection_with(&args.detection, max_pause);
    detection
        .validate()
        .context("invalid detection settings")?;

    detect(&SystemFfmpeg::new(verbose), &input, &detection)?;
    Ok(())
}

/// Runs the timeline computation over a saved ffmpeg log, without ffmpeg.
pub fn handle_plan(args: PlanArgs) -> Result<()> {
    let contents = fs::read_to_string(&args.report)
        .with_context(|| format!("reading silence report {}", args.report.display()))?;
    let lines: Vec<&str> = contents
        .split(|c: char| c == '\r' || c == '\n')
        .filter(|line| !line.is_empty())
        .collect();

    let config = TrimConfig::load()?;
    let policy = config.policy_with(&args.policy);
    policy.validate().context("invalid pause policy")?;

    let report = parse_report(&lines)
        .with_context(|| format!("parsing silence report {}", args.report.display()))?;
    announce_silences(&report);
    separator();
    if plan(&report, &policy).is_empty() {
        emit(
            Level::Warn,
            "silence.plan.empty",
            "Nothing would be kept with this policy",
            None,
        );
    }
    Ok(())
}

pub fn handle_config(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            let config = TrimConfig::load()?;
            let rendered = config.to_toml()?;
            emit(
                Level::Info,
                "silence.config.show",
                rendered.trim_end(),
                Some(serde_json::to_value(&config).context("serializing trim config")?),
            );
        }
        ConfigCommands::Path => {
            let path = paths::config_file()?;
            emit(
                Level::Info,
                "silence.config.path",
                &path.display().to_string(),
                Some(json!({ "path": path })),
            );
        }
    }
    Ok(())
}
