/// Application configuration
///
/// Read from a JSON file; every field has a default so a missing file
/// or a partial one both work.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::capture::CaptureSettings;
use crate::gallery::projector::{GalleryProjector, GALLERY_WINDOW, MAP_ZOOM, UNTITLED_LABEL};
use crate::state::buffer::{CaptureBuffer, CAPTURE_CAPACITY, HYDRATE_WINDOW};
use crate::state::data::Location;
use crate::capture::frame::FRAME_MAX_DIMENSION;

/// Environment variable that overrides the config file location
pub const CONFIG_ENV: &str = "GEOCAM_CONFIG";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("could not read config {0}")]
    Read(String),
    #[error("invalid config: {0}")]
    Parse(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Photo database file; defaults to the user data directory
    pub database_path: Option<PathBuf>,
    pub require_title: bool,
    pub untitled_label: String,
    pub capture_capacity: usize,
    pub hydrate_window: usize,
    pub gallery_window: usize,
    pub map_zoom: u8,
    pub geolocation_timeout_ms: u64,
    /// Position reported to captures; `None` means no position is available
    pub location: Option<Location>,
    pub frame_max_dimension: u32,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            require_title: false,
            untitled_label: UNTITLED_LABEL.to_string(),
            capture_capacity: CAPTURE_CAPACITY,
            hydrate_window: HYDRATE_WINDOW,
            gallery_window: GALLERY_WINDOW,
            map_zoom: MAP_ZOOM,
            geolocation_timeout_ms: 10_000,
            location: None,
            frame_max_dimension: FRAME_MAX_DIMENSION,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from `$GEOCAM_CONFIG`, or the default location
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .or_else(default_config_path);

        match path {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from `path`. A missing file gives the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Read(format!("{}: {}", path.display(), e))),
        };

        serde_json::from_str(&text)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))
    }

    /// Where the photo database lives
    /// - Linux: ~/.local/share/geocam/camera.db
    /// - macOS: ~/Library/Application Support/geocam/camera.db
    /// - Windows: %APPDATA%\geocam\camera.db
    pub fn database_path(&self) -> PathBuf {
        if let Some(path) = &self.database_path {
            return path.clone();
        }

        let mut path = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        path.push("geocam");
        path.push("camera.db");
        path
    }

    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            require_title: self.require_title,
            geolocation_timeout: Duration::from_millis(self.geolocation_timeout_ms),
            frame_max_dimension: self.frame_max_dimension,
        }
    }

    pub fn capture_buffer(&self) -> CaptureBuffer {
        CaptureBuffer::new(self.capture_capacity, self.hydrate_window)
    }

    pub fn gallery_projector(&self) -> GalleryProjector {
        GalleryProjector::new(self.gallery_window, self.untitled_label.clone(), self.map_zoom)
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("geocam").join("config.json"))
}
