//! Settings file and application paths
//!
//! Settings live in `framecmp.json` inside the config directory:
//! 1. CLI `--config-dir`
//! 2. `FRAMECMP_CONFIG_DIR` environment variable
//! 3. Current directory, if it already holds `framecmp.json`
//! 4. Platform config directory from dirs-next (`~/.config/framecmp` on Linux)
//!
//! A missing file means defaults. A malformed file is an error.

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::annotation::ANNOTATION_ZOOM_THRESHOLD;
use crate::core::workers::Workers;

pub const SETTINGS_FILE: &str = "framecmp.json";
pub const LOG_FILE: &str = "framecmp.log";
const CONFIG_DIR_ENV: &str = "FRAMECMP_CONFIG_DIR";
const APP_DIR: &str = "framecmp";

/// User-tunable settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Minimum interval between cache-change notifications
    pub cache_notify_ms: u64,
    /// Zoom at which pixel values are printed into the viewport
    pub annotation_zoom: f64,
    /// Background caching threads, 0 = 75% of cores
    pub worker_threads: usize,
    /// Default difference amplification
    pub amplification: i32,
    /// Default to the binary difference mask
    pub mark_differences: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_notify_ms: 1000,
            annotation_zoom: ANNOTATION_ZOOM_THRESHOLD,
            worker_threads: 0,
            amplification: 1,
            mark_differences: false,
        }
    }
}

impl Settings {
    pub fn cache_notify_interval(&self) -> Duration {
        Duration::from_millis(self.cache_notify_ms)
    }

    pub fn worker_count(&self) -> usize {
        match self.worker_threads {
            0 => Workers::default_threads(),
            n => n,
        }
    }

    /// Load from `path`, defaults if the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;
        let settings = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse settings: {}", path.display()))?;
        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write settings: {}", path.display()))?;
        Ok(())
    }
}

/// Override for the default config location
#[derive(Debug, Clone, Default)]
pub struct PathConfig {
    pub config_dir: Option<PathBuf>,
}

impl PathConfig {
    /// Priority: CLI arg -> env var -> None (defaults)
    pub fn from_env_and_cli(cli_dir: Option<PathBuf>) -> Self {
        let config_dir = cli_dir.or_else(|| std::env::var(CONFIG_DIR_ENV).ok().map(PathBuf::from));
        Self { config_dir }
    }

    pub fn config_dir(&self) -> PathBuf {
        if let Some(dir) = &self.config_dir {
            return dir.clone();
        }
        if let Ok(cwd) = std::env::current_dir()
            && cwd.join(SETTINGS_FILE).exists()
        {
            return cwd;
        }
        dirs_next::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn config_file(&self, name: &str) -> PathBuf {
        self.config_dir().join(name)
    }

    pub fn settings_file(&self) -> PathBuf {
        self.config_file(SETTINGS_FILE)
    }
}
