//! Tool configuration for the external pipeline stages
//!
//! The configuration maps each external stage to the interpreter and script
//! that implement it. It is read once at process start and shared read-only
//! between jobs; nothing in the pipeline reads it from ambient global state.
//!
//! The file format is a flat JSON object. Keys follow the tool-path file the
//! desktop installer writes:
//!
//! ```json
//! {
//!   "PYTHON_REMBG": "/opt/fogstripper/venv_rembg/bin/python",
//!   "REMBG_SCRIPT": "/opt/fogstripper/worker_rembg.py",
//!   "PYTHON_UPSCALE": "/opt/fogstripper/venv_upscale/bin/python",
//!   "UPSCALE_SCRIPT": "/opt/fogstripper/worker_upscale.py",
//!   "EFFECTS_SCRIPT": "/opt/fogstripper/worker_effects.py",
//!   "BACKGROUND_SCRIPT": "/opt/fogstripper/worker_background.py",
//!   "STAGE_TIMEOUT_SECS": 600
//! }
//! ```

use crate::error::{FogStripperError, Result};
use crate::stages::StageKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable pointing at an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "FOGSTRIPPER_CONFIG";

/// Environment variable switching to the development configuration file
pub const DEV_MODE_ENV_VAR: &str = "FOGSTRIPPER_DEV_MODE";

/// Application directory name under the platform data directory
pub const APP_DIR_NAME: &str = "fogstripper";

const CONFIG_FILE_NAME: &str = "config.json";
const DEV_CONFIG_FILE_NAME: &str = "config.dev.json";

/// Interpreter and script pair used to launch one external stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageCommand {
    /// Interpreter or executable (first argv entry)
    pub interpreter: Option<PathBuf>,
    /// Script passed to the interpreter
    pub script: Option<PathBuf>,
}

/// Paths of the external tools the pipeline shells out to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Interpreter for the background-removal, shadow and compositing scripts
    #[serde(rename = "PYTHON_REMBG", default, skip_serializing_if = "Option::is_none")]
    pub rembg_interpreter: Option<PathBuf>,

    /// Background-removal script
    #[serde(rename = "REMBG_SCRIPT", default, skip_serializing_if = "Option::is_none")]
    pub rembg_script: Option<PathBuf>,

    /// Interpreter for the upscaling script
    #[serde(rename = "PYTHON_UPSCALE", default, skip_serializing_if = "Option::is_none")]
    pub upscale_interpreter: Option<PathBuf>,

    /// Upscaling script
    #[serde(rename = "UPSCALE_SCRIPT", default, skip_serializing_if = "Option::is_none")]
    pub upscale_script: Option<PathBuf>,

    /// Shadow synthesis script
    #[serde(rename = "EFFECTS_SCRIPT", default, skip_serializing_if = "Option::is_none")]
    pub effects_script: Option<PathBuf>,

    /// Background compositing script
    #[serde(rename = "BACKGROUND_SCRIPT", default, skip_serializing_if = "Option::is_none")]
    pub background_script: Option<PathBuf>,

    /// `ffmpeg` executable used for video containers (defaults to `ffmpeg` on PATH)
    #[serde(rename = "FFMPEG", default, skip_serializing_if = "Option::is_none")]
    pub ffmpeg: Option<PathBuf>,

    /// `ffprobe` executable used to read video frame rates (defaults to `ffprobe` on PATH)
    #[serde(rename = "FFPROBE", default, skip_serializing_if = "Option::is_none")]
    pub ffprobe: Option<PathBuf>,

    /// Per-stage wall clock limit in seconds (unset = wait indefinitely)
    #[serde(rename = "STAGE_TIMEOUT_SECS", default, skip_serializing_if = "Option::is_none")]
    pub stage_timeout_secs: Option<u64>,
}

impl ToolsConfig {
    /// Parse a configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| FogStripperError::config(format!("Malformed tool configuration: {}", e)))
    }

    /// Load a configuration from a specific file
    ///
    /// # Errors
    /// - The file does not exist or cannot be read
    /// - The file is not a valid JSON object
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FogStripperError::config(format!(
                "Tool configuration not found at {}: {}",
                path.display(),
                e
            ))
        })?;
        let config = Self::from_json_str(&content)?;
        tracing::info!(path = %path.display(), "Tool configuration loaded");
        Ok(config)
    }

    /// Load the configuration from its default location
    ///
    /// Resolution order:
    /// 1. `FOGSTRIPPER_CONFIG` environment variable
    /// 2. `./config.dev.json` when `FOGSTRIPPER_DEV_MODE` is set
    /// 3. `<data dir>/fogstripper/config.json`
    pub fn load() -> Result<Self> {
        let path = Self::default_config_path()?;
        Self::load_from_path(path)
    }

    /// Resolve the default configuration file path
    pub fn default_config_path() -> Result<PathBuf> {
        if let Ok(explicit) = std::env::var(CONFIG_ENV_VAR) {
            return Ok(PathBuf::from(explicit));
        }

        if std::env::var_os(DEV_MODE_ENV_VAR).is_some() {
            tracing::warn!("Development mode enabled, using {}", DEV_CONFIG_FILE_NAME);
            let cwd = std::env::current_dir()
                .map_err(|e| FogStripperError::file_io_error("resolve", ".", &e))?;
            return Ok(cwd.join(DEV_CONFIG_FILE_NAME));
        }

        Ok(app_data_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Whether no tool entry is configured at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rembg_interpreter.is_none()
            && self.rembg_script.is_none()
            && self.upscale_interpreter.is_none()
            && self.upscale_script.is_none()
            && self.effects_script.is_none()
            && self.background_script.is_none()
    }

    /// Interpreter and script for one external stage
    ///
    /// Shadow synthesis and background compositing share the
    /// background-removal interpreter.
    #[must_use]
    pub fn stage_command(&self, kind: StageKind) -> StageCommand {
        let (interpreter, script) = match kind {
            StageKind::BackgroundRemoval => (&self.rembg_interpreter, &self.rembg_script),
            StageKind::Upscale => (&self.upscale_interpreter, &self.upscale_script),
            StageKind::Shadow => (&self.rembg_interpreter, &self.effects_script),
            StageKind::BackgroundComposite => (&self.rembg_interpreter, &self.background_script),
        };
        StageCommand {
            interpreter: interpreter.clone(),
            script: script.clone(),
        }
    }

    /// Per-stage timeout, if one is configured
    #[must_use]
    pub fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// `ffmpeg` executable to invoke
    #[must_use]
    pub fn ffmpeg_program(&self) -> PathBuf {
        self.ffmpeg.clone().unwrap_or_else(|| PathBuf::from("ffmpeg"))
    }

    /// `ffprobe` executable to invoke
    #[must_use]
    pub fn ffprobe_program(&self) -> PathBuf {
        self.ffprobe
            .clone()
            .unwrap_or_else(|| PathBuf::from("ffprobe"))
    }
}

/// Platform data directory for the application (`~/.local/share/fogstripper` on Linux)
pub fn app_data_dir() -> Result<PathBuf> {
    Ok(dirs::data_dir()
        .ok_or_else(|| {
            FogStripperError::config(format!(
                "Failed to determine data directory. Set {} to point at the tool configuration.",
                CONFIG_ENV_VAR
            ))
        })?
        .join(APP_DIR_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "PYTHON_REMBG": "/venv_rembg/bin/python",
        "REMBG_SCRIPT": "/app/worker_rembg.py",
        "PYTHON_UPSCALE": "/venv_upscale/bin/python",
        "UPSCALE_SCRIPT": "/app/worker_upscale.py",
        "EFFECTS_SCRIPT": "/app/worker_effects.py",
        "BACKGROUND_SCRIPT": "/app/worker_background.py",
        "venv_rembg": "ignored"
    }"#;

    #[test]
    fn test_parse_full_config() {
        let config = ToolsConfig::from_json_str(SAMPLE).unwrap();
        assert!(!config.is_empty());
        assert_eq!(
            config.rembg_script.as_deref(),
            Some(Path::new("/app/worker_rembg.py"))
        );
        assert!(config.stage_timeout().is_none());
    }

    #[test]
    fn test_shadow_and_background_share_rembg_interpreter() {
        let config = ToolsConfig::from_json_str(SAMPLE).unwrap();
        let shadow = config.stage_command(StageKind::Shadow);
        let composite = config.stage_command(StageKind::BackgroundComposite);
        assert_eq!(shadow.interpreter, config.rembg_interpreter);
        assert_eq!(composite.interpreter, config.rembg_interpreter);
        assert_eq!(
            shadow.script.as_deref(),
            Some(Path::new("/app/worker_effects.py"))
        );

        let upscale = config.stage_command(StageKind::Upscale);
        assert_eq!(upscale.interpreter, config.upscale_interpreter);
    }

    #[test]
    fn test_empty_object_is_empty_config() {
        let config = ToolsConfig::from_json_str("{}").unwrap();
        assert!(config.is_empty());
        assert_eq!(config.ffmpeg_program(), PathBuf::from("ffmpeg"));
    }

    #[test]
    fn test_malformed_config_is_error() {
        let err = ToolsConfig::from_json_str("this is not valid json {{{").unwrap_err();
        assert!(matches!(err, FogStripperError::Config(_)));
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ToolsConfig::load_from_path(dir.path().join("nonexistent.json")).unwrap_err();
        assert!(err.to_string().contains("nonexistent.json"));
    }

    #[test]
    fn test_zero_timeout_means_unlimited() {
        let config = ToolsConfig {
            stage_timeout_secs: Some(0),
            ..ToolsConfig::default()
        };
        assert!(config.stage_timeout().is_none());

        let config = ToolsConfig {
            stage_timeout_secs: Some(30),
            ..ToolsConfig::default()
        };
        assert_eq!(config.stage_timeout(), Some(Duration::from_secs(30)));
    }
}
