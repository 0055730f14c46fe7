// Chunk: docs/chunks/highlight_config - Configuration file
//!
//! Highlighting configuration.
//!
//! ## File Location
//!
//! The default configuration file lives in the platform config directory:
//! - Linux: `~/.config/glint/highlight.json`
//! - macOS: `~/Library/Application Support/glint/highlight.json`
//!
//! Every field is optional; missing fields take their defaults. A malformed
//! file at the default location is logged and ignored, a malformed file at an
//! explicit path is an error.

use std::fs;
use std::io;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use glint_buffer::CharEncoding;
use glint_syntax::EngineOptions;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Application name used for the config directory.
const APP_NAME: &str = "glint";

/// Configuration file name.
const CONFIG_FILENAME: &str = "highlight.json";

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Tunables for the highlighting pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HighlightConfig {
    /// Lines highlighted above and below the viewport.
    pub viewport_margin_lines: usize,
    /// Lines highlighted around a direct edit.
    pub edit_context_lines: usize,
    /// Time budget for one parse, in milliseconds.
    pub parse_timeout_ms: u64,
    /// Number of document versions kept in the highlight cache.
    pub cache_capacity: usize,
    /// Character space for projected ranges.
    pub char_encoding: CharEncoding,
    /// Nesting depth for embedded languages.
    pub max_injection_depth: usize,
    /// Build the character projection on the parse worker.
    pub project_chars_on_worker: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            viewport_margin_lines: 50,
            edit_context_lines: 2,
            parse_timeout_ms: 500,
            cache_capacity: 4,
            char_encoding: CharEncoding::Utf16,
            max_injection_depth: 3,
            project_chars_on_worker: true,
        }
    }
}

impl HighlightConfig {
    /// Parses and validates a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: HighlightConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Loads the configuration from the default location.
    ///
    /// Falls back to defaults when the file is missing or unusable.
    pub fn load_or_default() -> Self {
        let Some(path) = config_file_path() else {
            return Self::default();
        };
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring config file");
                Self::default()
            }
        }
    }

    /// Writes the configuration as pretty JSON.
    ///
    /// Writes to a temporary file and renames it into place.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, path)
    }

    /// Checks value ranges serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_capacity == 0 {
            return Err(ConfigError::Invalid("cache_capacity must be at least 1".into()));
        }
        if self.parse_timeout_ms == 0 {
            return Err(ConfigError::Invalid("parse_timeout_ms must be at least 1".into()));
        }
        Ok(())
    }

    pub fn parse_timeout(&self) -> Duration {
        Duration::from_millis(self.parse_timeout_ms)
    }

    /// Cache capacity, clamped to at least one slot.
    pub fn cache_capacity(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.cache_capacity).unwrap_or(NonZeroUsize::MIN)
    }

    /// Options for the parse engines this configuration drives.
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            parse_timeout: self.parse_timeout(),
            max_injection_depth: self.max_injection_depth,
        }
    }
}

/// Returns the default configuration file path, if the platform has a
/// config directory.
pub fn config_file_path() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join(APP_NAME).join(CONFIG_FILENAME))
}
