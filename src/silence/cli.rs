use clap::{Args, Subcommand, ValueHint};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct DetectionArgs {
    /// dB value under which audio is considered to be silence (e.g. -30)
    #[arg(long, allow_negative_numbers = true)]
    pub silence_db: Option<f64>,

    /// Shortest silence to detect, in seconds (defaults to --max-pause)
    #[arg(long)]
    pub min_silence: Option<f64>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct PolicyArgs {
    /// Max allowable pause in seconds; longer pauses are cut down to this by
    /// removing an equal amount of silence from both edges
    #[arg(long)]
    pub max_pause: Option<f64>,

    /// Seconds of silence to keep before the first sound (0 keeps the whole intro)
    #[arg(long)]
    pub intro_padding: Option<f64>,

    /// Seconds of silence to keep after the last sound (0 keeps the whole outro)
    #[arg(long)]
    pub outro_padding: Option<f64>,

    /// Drop kept segments shorter than this many seconds
    #[arg(long)]
    pub min_keep: Option<f64>,

    /// Shrink the padding around short clips between two cuts
    #[arg(long)]
    pub shrink_short_clips: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TrimArgs {
    /// Input audio or video file
    #[arg(value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    /// Output file path
    #[arg(short = 'o', long = "out-file", value_hint = ValueHint::FilePath)]
    pub out_file: PathBuf,

    #[command(flatten)]
    pub detection: DetectionArgs,

    #[command(flatten)]
    pub policy: PolicyArgs,

    /// Keep the temporary chunk directory for inspection
    #[arg(long)]
    pub keep_temp: bool,

    /// Only print the segments that would be kept
    #[arg(long)]
    pub dry_run: bool,

    /// Overwrite the output file if it exists
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DetectArgs {
    /// Input audio or video file
    #[arg(value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    #[command(flatten)]
    pub detection: DetectionArgs,

    /// Shortest silence to detect falls back to this when --min-silence is unset
    #[arg(long)]
    pub max_pause: Option<f64>,
}

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    /// Saved ffmpeg silencedetect output (stderr log)
    #[arg(short = 'r', long = "report", value_hint = ValueHint::FilePath)]
    pub report: PathBuf,

    #[command(flatten)]
    pub policy: PolicyArgs,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Print the configuration file location
    Path,
}
