//! Settings stored at `~/.config/modecky/settings.json`.
//!
//! Every field has a default, so a missing file (or a file that only sets a
//! couple of keys) is fine.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Override for the state file location
    pub state_file: Option<PathBuf>,
    /// Mod package directory, relative to a title's install path
    pub mods_dir: String,
    /// File extensions treated as packaged mods
    pub archive_extensions: Vec<String>,
    /// Refuse install paths that are not existing directories
    pub strict_install_paths: bool,
    /// Override for the browsing start directory
    pub browse_root: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            state_file: None,
            mods_dir: "mods".to_string(),
            archive_extensions: vec!["zip".to_string(), "7z".to_string(), "rar".to_string()],
            strict_install_paths: false,
            browse_root: None,
        }
    }
}

impl Settings {
    /// Load settings from the default location.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load settings from a file. A missing file yields defaults.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Settings::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read settings {:?}", path))?;
        serde_json::from_str(&raw).with_context(|| format!("parse settings {:?}", path))
    }

    /// Save settings to a file, creating its directory.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create settings dir {:?}", parent))?;
        }
        let raw = serde_json::to_string_pretty(self).context("serialize settings")?;
        std::fs::write(path, raw).with_context(|| format!("write settings {:?}", path))?;
        Ok(())
    }

    /// Where the management state lives.
    pub fn state_path(&self) -> PathBuf {
        self.state_file
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("state.json"))
    }

    /// Starting directory for the install path picker.
    pub fn browse_root(&self) -> PathBuf {
        self.browse_root
            .clone()
            .filter(|p| crate::paths::is_directory(p))
            .unwrap_or_else(crate::paths::default_browse_root)
    }

    /// Settings file path (`~/.config/modecky/settings.json`).
    pub fn default_path() -> PathBuf {
        or_home(dirs::config_dir(), ".config")
            .join("modecky")
            .join("settings.json")
    }

    /// Data directory (`~/.local/share/modecky/`).
    pub fn data_dir() -> PathBuf {
        or_home(dirs::data_dir(), ".local/share").join("modecky")
    }
}

/// `dir`, or `relative` under the home directory when the platform has no
/// such directory.
fn or_home(dir: Option<PathBuf>, relative: &str) -> PathBuf {
    dir.unwrap_or_else(|| crate::paths::default_browse_root().join(relative))
}
