//! Application configuration.
//!
//! Manages settings loaded from an INI configuration file. Provides defaults
//! for safe startup and methods to load/save configuration.
//!
//! # Configuration File Format
//!
//! ```ini
//! [frames]
//! path = /home/user/.local/share/deskling/Frames
//! ```

use std::fs;
use std::path::PathBuf;

use configparser::ini::Ini;
use log::info;

const CONFIG_FILENAME: &str = "deskling.ini";
const FRAMES_DIRNAME: &str = "Frames";

/// Per-user application data directory.
pub fn app_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("deskling")
}

/// Application configuration.
///
/// Stores the frames base directory, the single value the window manager
/// consumes. Values missing from the file retain their defaults.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base directory holding one subdirectory of frames per character.
    pub frames_path: PathBuf,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfig {
    /// Create a new configuration with safe default values.
    pub fn new() -> Self {
        let data_dir = app_data_dir();
        Self {
            frames_path: data_dir.join(FRAMES_DIRNAME),
            config_path: data_dir.join(CONFIG_FILENAME),
        }
    }

    /// Create a new configuration with a custom config file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current (default) values.
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(&mut self) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| format!("Failed to load config file: {e}"))?;

        if let Some(path) = config.get("frames", "path") {
            self.frames_path = PathBuf::from(path);
        }

        info!("Loaded config: frames path {}", self.frames_path.display());
        Ok(())
    }

    /// Save configuration to the INI file, creating its directory if needed.
    pub fn save_to_file(&self) -> Result<(), String> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {e}"))?;
        }

        let mut config = Ini::new();
        config.set(
            "frames",
            "path",
            Some(self.frames_path.display().to_string()),
        );
        config
            .write(&self.config_path)
            .map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// Create the frames directory on first run.
    pub fn ensure_frames_dir(&self) -> Result<(), String> {
        if !self.frames_path.is_dir() {
            fs::create_dir_all(&self.frames_path)
                .map_err(|e| format!("Failed to create frames directory: {e}"))?;
            info!("Created frames folder: {}", self.frames_path.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_point_into_the_data_dir() {
        let config = AppConfig::new();
        assert!(config.frames_path.ends_with(FRAMES_DIRNAME));
        assert!(config.config_path.ends_with(CONFIG_FILENAME));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("deskling.ini");

        let mut config = AppConfig::with_path(&path);
        config.frames_path = dir.path().join("MyFrames");
        config.save_to_file().expect("save");

        let mut loaded = AppConfig::with_path(&path);
        loaded.load_from_file().expect("load");
        assert_eq!(loaded.frames_path, config.frames_path);
    }

    #[test]
    fn loading_a_missing_file_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let mut config = AppConfig::with_path(dir.path().join("absent.ini"));
        let default_frames = config.frames_path.clone();
        assert!(config.load_from_file().is_err());
        assert_eq!(config.frames_path, default_frames, "defaults survive a failed load");
    }

    #[test]
    fn ensure_frames_dir_creates_it_once() {
        let dir = tempdir().expect("tempdir");
        let mut config = AppConfig::with_path(dir.path().join("deskling.ini"));
        config.frames_path = dir.path().join("Frames");

        config.ensure_frames_dir().expect("create");
        assert!(config.frames_path.is_dir());
        config.ensure_frames_dir().expect("idempotent");
    }
}
