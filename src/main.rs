mod common;
mod silence;
mod ui;

use clap::{Parser, Subcommand};
use std::io::IsTerminal;

use crate::silence::cli::{DetectArgs, PlanArgs, TrimArgs};
use crate::silence::ConfigCommands;
use crate::ui::prelude::{Level, OutputFormat, emit};

/// Trim silent passages out of audio and video files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Echo ffmpeg commands and their raw output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Output format for messages
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Remove long pauses from a media file
    Trim(TrimArgs),
    /// Print the silences ffmpeg finds in a media file
    Detect(DetectArgs),
    /// Compute the keep timeline from a saved ffmpeg silencedetect log
    Plan(PlanArgs),
    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Trim(args) => silence::handle_trim(args, cli.debug),
        Commands::Detect(args) => silence::handle_detect(args, cli.debug),
        Commands::Plan(args) => silence::handle_plan(args),
        Commands::Config { command } => silence::handle_config(command),
    }
}

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stdout().is_terminal();
    ui::init(cli.output, color);

    if let Err(err) = run(cli) {
        emit(
            Level::Error,
            "removesilence.error",
            &format!("error: {:#}", err),
            None,
        );
        std::process::exit(1);
    }
}
