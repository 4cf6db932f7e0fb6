use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::cli::{DetectionArgs, PolicyArgs};
use super::ffmpeg::DetectionSettings;
use super::timeline::PausePolicy;
use crate::common::paths;

/// Defaults for every trim run, stored as TOML.
///
/// Command-line flags always win over values from this file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimConfig {
    /// Level in dB under which audio counts as silence
    pub silence_db: f64,
    /// Longest pause left untouched, in seconds
    pub max_pause: f64,
    /// Shortest silence ffmpeg reports; defaults to max_pause
    pub min_silence: Option<f64>,
    /// Silence kept before the first sound (0 disables intro trimming)
    pub intro_padding: f64,
    /// Silence kept after the last sound (0 disables outro trimming)
    pub outro_padding: f64,
    /// Drop kept segments shorter than this many seconds (0 disables)
    pub min_keep: f64,
    /// Tighten padding around short clips between two cuts
    pub shrink_short_clips: bool,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            silence_db: Self::DEFAULT_SILENCE_DB,
            max_pause: Self::DEFAULT_MAX_PAUSE,
            min_silence: None,
            intro_padding: 0.0,
            outro_padding: 0.0,
            min_keep: 0.0,
            shrink_short_clips: false,
        }
    }
}

impl TrimConfig {
    pub const DEFAULT_SILENCE_DB: f64 = -30.0;
    pub const DEFAULT_MAX_PAUSE: f64 = 2.0;

    pub fn load() -> Result<Self> {
        Self::load_from_path(paths::config_file()?)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            let config = Self::default();
            config.save_to_path(path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading trim config from {}", path.display()))?;
        let config: Self = toml::from_str(&contents).context("parsing trim config")?;
        Ok(config.sanitized())
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }

        fs::write(path, self.to_toml()?)
            .with_context(|| format!("writing trim config to {}", path.display()))?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("serializing trim config")
    }

    // Hand-edited files may hold values the pipeline cannot use.
    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !self.silence_db.is_finite() {
            self.silence_db = defaults.silence_db;
        }
        if !self.max_pause.is_finite() || self.max_pause <= 0.0 {
            self.max_pause = defaults.max_pause;
        }
        if self
            .min_silence
            .is_some_and(|value| !value.is_finite() || value <= 0.0)
        {
            self.min_silence = None;
        }
        for value in [
            &mut self.intro_padding,
            &mut self.outro_padding,
            &mut self.min_keep,
        ] {
            if !value.is_finite() || *value < 0.0 {
                *value = 0.0;
            }
        }
        self
    }

    pub fn policy_with(&self, args: &PolicyArgs) -> PausePolicy {
        PausePolicy {
            max_pause: args.max_pause.unwrap_or(self.max_pause),
            intro_padding: args.intro_padding.unwrap_or(self.intro_padding),
            outro_padding: args.outro_padding.unwrap_or(self.outro_padding),
            min_keep: args.min_keep.unwrap_or(self.min_keep),
            shrink_short_clips: args.shrink_short_clips || self.shrink_short_clips,
        }
    }

    /// Detection settings; the minimum silence follows `max_pause` unless set.
    pub fn detection_with(&self, args: &DetectionArgs, max_pause: f64) -> DetectionSettings {
        DetectionSettings {
            noise_db: args.silence_db.unwrap_or(self.silence_db),
            min_silence: args
                .min_silence
                .or(self.min_silence)
                .unwrap_or(max_pause),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = TrimConfig::load_from_path(&path).unwrap();

        assert_eq!(config, TrimConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = TrimConfig {
            silence_db: -42.0,
            max_pause: 1.5,
            min_silence: Some(0.8),
            intro_padding: 0.3,
            outro_padding: 0.5,
            min_keep: 0.25,
            shrink_short_clips: true,
        };

        config.save_to_path(&path).unwrap();

        assert_eq!(TrimConfig::load_from_path(&path).unwrap(), config);
    }

    #[test]
    fn partial_file_uses_defaults_for_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "max_pause = 3.0\n").unwrap();

        let config = TrimConfig::load_from_path(&path).unwrap();

        assert_eq!(config.max_pause, 3.0);
        assert_eq!(config.silence_db, TrimConfig::DEFAULT_SILENCE_DB);
        assert_eq!(config.min_silence, None);
    }

    #[test]
    fn unusable_values_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "max_pause = -1.0\nintro_padding = -0.5\nmin_silence = 0.0\n",
        )
        .unwrap();

        let config = TrimConfig::load_from_path(&path).unwrap();

        assert_eq!(config.max_pause, TrimConfig::DEFAULT_MAX_PAUSE);
        assert_eq!(config.intro_padding, 0.0);
        assert_eq!(config.min_silence, None);
    }

    #[test]
    fn flags_override_config() {
        let config = TrimConfig {
            intro_padding: 0.4,
            ..TrimConfig::default()
        };
        let args = PolicyArgs {
            max_pause: Some(1.0),
            outro_padding: Some(0.2),
            ..PolicyArgs::default()
        };

        let policy = config.policy_with(&args);

        assert_eq!(policy.max_pause, 1.0);
        assert_eq!(policy.intro_padding, 0.4);
        assert_eq!(policy.outro_padding, 0.2);
        assert!(!policy.shrink_short_clips);
    }

    #[test]
    fn min_silence_defaults_to_max_pause() {
        let config = TrimConfig::default();
        let detection = config.detection_with(&DetectionArgs::default(), 1.25);
        assert_eq!(detection.min_silence, 1.25);
        assert_eq!(detection.noise_db, TrimConfig::DEFAULT_SILENCE_DB);

        let args = DetectionArgs {
            silence_db: Some(-50.0),
            min_silence: Some(0.5),
        };
        let detection = config.detection_with(&args, 1.25);
        assert_eq!(detection.min_silence, 0.5);
        assert_eq!(detection.noise_db, -50.0);
    }
}
