//! Console settings

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uplink_core::{LoopSettings, SortOrder, StopFailurePolicy};
use uplink_sim::SimBackendConfig;

/// Number of recently added paths kept
pub const MAX_RECENT_PATHS: usize = 10;

/// Console settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Interval, baud, mode and target restored on startup
    #[serde(default)]
    pub loop_settings: LoopSettings,
    /// Whether failed stop calls are shown
    #[serde(default)]
    pub stop_failure: StopFailurePolicy,
    /// Order used by `ls`
    #[serde(default)]
    pub sort_order: SortOrder,
    /// Recently added file paths, newest first
    #[serde(default)]
    pub recent_paths: Vec<String>,
    /// Offer the host's serial ports as bind candidates
    #[serde(default = "default_true")]
    pub scan_ports: bool,
    /// Simulated backend configuration
    #[serde(default)]
    pub backend: SimBackendConfig,
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            loop_settings: LoopSettings::default(),
            stop_failure: StopFailurePolicy::default(),
            sort_order: SortOrder::default(),
            recent_paths: Vec::new(),
            scan_ports: true,
            backend: SimBackendConfig::default(),
        }
    }
}

impl Settings {
    /// Get the XDG config directory for uplink
    /// Uses $XDG_CONFIG_HOME/uplink on Linux/macOS, falls back to ~/.config/uplink
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("uplink"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("uplink"))
    }

    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        Self::settings_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Load settings from `path`, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<(), String> {
        let path =
            Self::settings_path().ok_or_else(|| "Could not determine settings path".to_string())?;
        self.save_to(&path)
    }

    /// Save settings to `path`, creating its directory
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create settings directory: {}", e))?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        std::fs::write(path, json).map_err(|e| format!("Failed to write settings: {}", e))?;

        Ok(())
    }

    /// Move `paths` to the front of the recent list
    pub fn remember_paths(&mut self, paths: &[String]) {
        for path in paths.iter().rev() {
            self.recent_paths.retain(|p| p != path);
            self.recent_paths.insert(0, path.clone());
        }
        self.recent_paths.truncate(MAX_RECENT_PATHS);
    }

    /// Look up recent paths by 1-based index
    ///
    /// Returns the paths found and the indices that had none.
    pub fn recent_by_index(&self, indices: &[usize]) -> (Vec<String>, Vec<usize>) {
        let mut found = Vec::new();
        let mut missing = Vec::new();
        for &index in indices {
            match index.checked_sub(1).and_then(|i| self.recent_paths.get(i)) {
                Some(path) => found.push(path.clone()),
                None => missing.push(index),
            }
        }
        (found, missing)
    }
}
