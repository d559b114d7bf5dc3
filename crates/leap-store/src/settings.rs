use std::fs;
use std::path::{Path, PathBuf};

use leap_core::EngineConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Persisted user settings: engine tunables and the folder last used for
/// import or export.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_folder: Option<PathBuf>,
    pub engine: EngineConfig,
}

impl Settings {
    /// Parse TOML settings. Out-of-range engine values are pulled back into
    /// range.
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut settings: Settings =
            toml::from_str(content).map_err(|e| StoreError::Config(e.to_string()))?;
        settings.engine = settings.engine.sanitized();
        Ok(settings)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Load settings from `path`, writing defaults there if the file does
    /// not exist yet. An unreadable or malformed file is left in place and
    /// defaults are used.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            let settings = Settings::default();
            settings.save(path)?;
            tracing::info!("created default settings at {}", path.display());
            return Ok(settings);
        }

        let parsed = fs::read_to_string(path)
            .map_err(StoreError::from)
            .and_then(|content| Settings::from_toml(&content));
        match parsed {
            Ok(settings) => Ok(settings),
            Err(e) => {
                tracing::warn!("ignoring settings at {}: {e}", path.display());
                Ok(Settings::default())
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Remember the folder containing `file`. Returns whether it changed.
    pub fn remember_folder(&mut self, file: &Path) -> bool {
        let folder = match file.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if self.last_folder.as_ref() == Some(&folder) {
            return false;
        }
        self.last_folder = Some(folder);
        true
    }
}
