pub mod cli;
pub mod commands;
mod config;
mod ffmpeg;
mod report;
mod timeline;
mod utils;

pub use cli::ConfigCommands;
pub use commands::{handle_config, handle_detect, handle_plan, handle_trim};
