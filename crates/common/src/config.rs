//! Application configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::FrameBatchResult;

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default export naming and batch parameters.
    pub defaults: BatchDefaults,

    /// External export command.
    pub exporter: ExporterConfig,

    /// Completion heuristic used by the auto sequencer.
    pub completion: CompletionConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default export and batch parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchDefaults {
    /// Directory and/or base path for exports (`//` = working directory).
    pub filepath: String,

    /// Explicit output file name. Empty derives it from `filepath`.
    pub filename: String,

    /// Append `_frame_<start>_<end>` to output names.
    pub append_frame_range: bool,

    /// Frames per chunk.
    pub step: i64,

    /// Frames added on both sides of every chunk (0 disables overlap).
    pub overlap_frames: i64,

    /// Delay between filesystem checks (seconds).
    pub poll_delay_secs: f64,

    /// Extra wait after each chunk finishes (seconds).
    pub cooldown_secs: f64,
}

/// External export command.
///
/// `command` is an argv template. The placeholders `{output}`, `{filename}`,
/// `{start}` and `{end}` are substituted per chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    pub command: Vec<String>,

    /// Working directory for the spawned command.
    pub working_dir: Option<PathBuf>,
}

/// Thresholds for inferring that an export has finished writing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Consecutive unchanged size observations that count as "done".
    pub stable_polls: u32,

    /// Polls after which a chunk is force-advanced.
    pub max_polls: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "framebatch=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for BatchDefaults {
    fn default() -> Self {
        Self {
            filepath: "//my_export.orbx".to_string(),
            filename: "my_export.orbx".to_string(),
            append_frame_range: false,
            step: 20,
            overlap_frames: 0,
            poll_delay_secs: 1.0,
            cooldown_secs: 0.0,
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            stable_polls: 3,
            max_polls: 600,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_or_default(&config_file_path())
    }

    /// Load config from `path`, falling back to defaults when it is missing
    /// or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> FrameBatchResult<()> {
        self.save_to(&config_file_path())
    }

    /// Save config as pretty JSON to `path`.
    pub fn save_to(&self, path: &Path) -> FrameBatchResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("framebatch").join("config.json")
}
