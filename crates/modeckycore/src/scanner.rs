//! Mod package discovery.
//!
//! Mod packages live in a directory under the title's install path
//! (`mods/` by default). Each non-hidden subdirectory with at least one file
//! is a package, and so is each archive with a recognized extension. The
//! package's file name is its mod id.
//!
//! Installation state comes from marker data the installer keeps in
//! `<install path>/.modecky/`:
//! - `manifests/<id>.json`: uninstall manifest, written once installation
//!   completed. A readable manifest means the mod can be cleanly reverted.
//! - `journal/<id>`: written before the first file is copied and removed
//!   together with the manifest write. A journal without a usable manifest
//!   means installation stopped partway.
//!
//! Scans are never cached. Anything that changes the disk must be followed
//! by a fresh scan.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::settings::Settings;

/// Directory under the install path holding installer marker data.
pub const MARKER_DIR: &str = ".modecky";

/// Installation state of a mod package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModStatus {
    /// Not applied to the game
    Disabled,
    /// Installation began but no usable uninstall manifest exists
    PartiallyInstalled,
    /// Installed with a recorded uninstall manifest
    Installed,
}

impl ModStatus {
    /// Partial installs cannot be reverted from a manifest; disabling them
    /// means removing the mod's files directly.
    pub fn needs_direct_cleanup(self) -> bool {
        self == ModStatus::PartiallyInstalled
    }

    pub fn label(self) -> &'static str {
        match self {
            ModStatus::Disabled => "disabled",
            ModStatus::PartiallyInstalled => "partially-installed",
            ModStatus::Installed => "installed",
        }
    }
}

/// How a package is stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    Directory,
    Archive,
}

/// A mod package found by a scan. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModEntry {
    /// Package file name
    pub id: String,
    /// Full path to the package
    pub path: PathBuf,
    pub kind: PackageKind,
    pub status: ModStatus,
}

/// Record of what an installation wrote, used to revert it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UninstallManifest {
    pub mod_id: String,
    pub installed_at: DateTime<Utc>,
    /// Files written into the game directory, relative to the install path
    #[serde(default)]
    pub files: Vec<PathBuf>,
}

impl UninstallManifest {
    pub fn new(mod_id: &str, files: Vec<PathBuf>) -> Self {
        UninstallManifest {
            mod_id: mod_id.to_string(),
            installed_at: Utc::now(),
            files,
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_str(&raw).map_err(|source| Error::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let raw = serde_json::to_string_pretty(self).map_err(|source| Error::Json {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, raw).map_err(|e| Error::io(path, e))
    }
}

/// Where packages and markers live for a title, and what counts as a package.
#[derive(Debug, Clone)]
pub struct ModScanner {
    /// Package directory, relative to the install path
    mods_dir: PathBuf,
    /// Lowercase archive extensions without the leading dot
    archive_extensions: Vec<String>,
}

impl Default for ModScanner {
    fn default() -> Self {
        ModScanner::from_settings(&Settings::default())
    }
}

impl ModScanner {
    pub fn from_settings(settings: &Settings) -> Self {
        ModScanner {
            mods_dir: PathBuf::from(&settings.mods_dir),
            archive_extensions: settings
                .archive_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    /// Directory holding the title's mod packages.
    pub fn mods_root(&self, install_path: &Path) -> PathBuf {
        install_path.join(&self.mods_dir)
    }

    /// Uninstall manifest location for a mod.
    pub fn manifest_path(&self, install_path: &Path, mod_id: &str) -> PathBuf {
        install_path
            .join(MARKER_DIR)
            .join("manifests")
            .join(format!("{mod_id}.json"))
    }

    /// In-progress installation journal for a mod.
    pub fn journal_path(&self, install_path: &Path, mod_id: &str) -> PathBuf {
        install_path.join(MARKER_DIR).join("journal").join(mod_id)
    }

    /// List the mod packages under `install_path` with their status.
    ///
    /// A missing or unreadable install path yields an empty list.
    pub fn scan(&self, install_path: &Path) -> Vec<ModEntry> {
        let root = self.mods_root(install_path);
        let entries = match std::fs::read_dir(&root) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to list mods in {:?}: {}", root, e);
                }
                return Vec::new();
            }
        };

        let mut mods = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Failed to read entry in {:?}: {}", root, e);
                    continue;
                }
            };

            let Some(id) = entry.file_name().to_str().map(ToString::to_string) else {
                tracing::warn!("Skipping non UTF-8 mod name {:?}", entry.path());
                continue;
            };
            if id.starts_with('.') {
                continue;
            }

            let path = entry.path();
            let Some(kind) = self.package_kind(&path) else {
                continue;
            };

            let status = self.classify(install_path, &id);
            mods.push(ModEntry {
                id,
                path,
                kind,
                status,
            });
        }

        mods.sort_by(|a, b| {
            a.id.to_lowercase()
                .cmp(&b.id.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        tracing::debug!("Scanned {} mods in {:?}", mods.len(), root);
        mods
    }

    fn package_kind(&self, path: &Path) -> Option<PackageKind> {
        if path.is_dir() {
            let has_files = walkdir::WalkDir::new(path)
                .min_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
                .any(|e| e.file_type().is_file());
            return has_files.then_some(PackageKind::Directory);
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())?;
        if path.is_file() && self.archive_extensions.contains(&ext) {
            Some(PackageKind::Archive)
        } else {
            None
        }
    }

    fn classify(&self, install_path: &Path, mod_id: &str) -> ModStatus {
        let manifest_path = self.manifest_path(install_path, mod_id);
        if manifest_path.exists() {
            return match UninstallManifest::read(&manifest_path) {
                Ok(manifest) if manifest.mod_id == mod_id => ModStatus::Installed,
                Ok(manifest) => {
                    tracing::warn!(
                        "Uninstall manifest {:?} belongs to '{}', not '{}'",
                        manifest_path,
                        manifest.mod_id,
                        mod_id
                    );
                    ModStatus::PartiallyInstalled
                }
                Err(e) => {
                    tracing::warn!("Unusable uninstall manifest for '{}': {}", mod_id, e);
                    ModStatus::PartiallyInstalled
                }
            };
        }

        if self.journal_path(install_path, mod_id).exists() {
            ModStatus::PartiallyInstalled
        } else {
            ModStatus::Disabled
        }
    }
}

/// Scan with the default package convention.
pub fn scan(install_path: &Path) -> Vec<ModEntry> {
    ModScanner::default().scan(install_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_mod(install: &Path, name: &str) {
        let dir = install.join("mods").join(name);
        std::fs::create_dir_all(dir.join("textures")).unwrap();
        std::fs::write(dir.join("textures/a.dds"), "x").unwrap();
    }

    #[test]
    fn test_scan_nonexistent_is_empty() {
        assert!(scan(Path::new("/nonexistent")).is_empty());
    }

    #[test]
    fn test_scan_without_mods_dir_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(scan(tmp.path()).is_empty());
    }

    #[test]
    fn test_scan_classifies_status() {
        let tmp = tempfile::tempdir().unwrap();
        let install = tmp.path();
        let scanner = ModScanner::default();

        make_mod(install, "Clean");
        make_mod(install, "Broken");
        make_mod(install, "Done");

        std::fs::create_dir_all(install.join(".modecky/journal")).unwrap();
        std::fs::write(scanner.journal_path(install, "Broken"), "").unwrap();
        UninstallManifest::new("Done", vec![PathBuf::from("data/a.dds")])
            .write(&scanner.manifest_path(install, "Done"))
            .unwrap();

        let mods = scanner.scan(install);
        let status: Vec<(&str, ModStatus)> =
            mods.iter().map(|m| (m.id.as_str(), m.status)).collect();
        assert_eq!(
            status,
            vec![
                ("Broken", ModStatus::PartiallyInstalled),
                ("Clean", ModStatus::Disabled),
                ("Done", ModStatus::Installed),
            ]
        );
        assert!(mods.iter().all(|m| m.kind == PackageKind::Directory));
    }

    #[test]
    fn test_corrupt_manifest_is_partial() {
        let tmp = tempfile::tempdir().unwrap();
        let install = tmp.path();
        let scanner = ModScanner::default();
        make_mod(install, "Weird");

        let manifest = scanner.manifest_path(install, "Weird");
        std::fs::create_dir_all(manifest.parent().unwrap()).unwrap();
        std::fs::write(&manifest, "{ not json").unwrap();

        let mods = scanner.scan(install);
        assert_eq!(mods.len(), 1);
        assert_eq!(mods[0].status, ModStatus::PartiallyInstalled);
        assert!(mods[0].status.needs_direct_cleanup());
    }

    #[test]
    fn test_archives_and_ignored_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let install = tmp.path();
        let mods_dir = install.join("mods");
        std::fs::create_dir_all(mods_dir.join("EmptyFolder")).unwrap();
        std::fs::create_dir_all(mods_dir.join(".hidden")).unwrap();
        std::fs::write(mods_dir.join(".hidden/file"), "").unwrap();
        std::fs::write(mods_dir.join("Pack.ZIP"), "").unwrap();
        std::fs::write(mods_dir.join("readme.txt"), "").unwrap();

        let mods = scan(install);
        assert_eq!(mods.len(), 1);
        assert_eq!(mods[0].id, "Pack.ZIP");
        assert_eq!(mods[0].kind, PackageKind::Archive);
        assert_eq!(mods[0].status, ModStatus::Disabled);
    }

    #[test]
    fn test_custom_convention() {
        let tmp = tempfile::tempdir().unwrap();
        let install = tmp.path();
        let settings = Settings {
            mods_dir: "Data/Mods".to_string(),
            archive_extensions: vec![".pak".to_string()],
            ..Settings::default()
        };
        let scanner = ModScanner::from_settings(&settings);

        std::fs::create_dir_all(install.join("Data/Mods")).unwrap();
        std::fs::write(install.join("Data/Mods/ui.pak"), "").unwrap();
        std::fs::write(install.join("Data/Mods/ui.zip"), "").unwrap();

        let ids: Vec<String> = scanner.scan(install).into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["ui.pak"]);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&ModStatus::PartiallyInstalled).unwrap(),
            "\"partially-installed\""
        );
        assert_eq!(ModStatus::Installed.label(), "installed");
    }
}
