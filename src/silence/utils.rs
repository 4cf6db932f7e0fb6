use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub fn canonicalize_existing(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        anyhow::bail!("{} does not exist", path.display());
    }
    path.canonicalize()
        .with_context(|| format!("Failed to canonicalize path {}", path.display()))
}

pub fn extension_or_default(path: &Path, default: &str) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_string())
        .unwrap_or_else(|| default.to_string())
}

/// Formats seconds the way ffmpeg's `-ss`/`-t` options expect them.
pub fn ffmpeg_seconds(seconds: f64) -> String {
    format!("{:.6}", seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_falls_back_to_default() {
        assert_eq!(extension_or_default(Path::new("talk.mp4"), "mkv"), "mp4");
        assert_eq!(extension_or_default(Path::new("talk"), "mkv"), "mkv");
    }

    #[test]
    fn seconds_use_fixed_precision() {
        assert_eq!(ffmpeg_seconds(1.5), "1.500000");
    }

    #[test]
    fn missing_paths_are_reported() {
        let err = canonicalize_existing(Path::new("/definitely/not/here.wav")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
