//! Titles and the external collaborators that supply them.
//!
//! A title is a game entry in the host library. The engine never creates
//! one on its own: the presentation layer resolves the currently selected
//! title through a [`TitleResolver`] and hands it in. Everything persisted
//! is keyed by the title's [`TitleKey`].
//!
//! Platform ids are positive. Titles the host did not install itself
//! (externally added entries) come back with a sentinel id, and are keyed
//! by their normalized display name instead.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::paths;

/// Id reported for titles found by name only.
pub const UNKNOWN_APP_ID: i64 = -2;

/// A game in the host library, as reported by the title resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Title {
    /// Platform-assigned id, or a non-positive sentinel
    pub app_id: i64,
    /// Display name
    pub name: String,
    /// Best-effort install directory guess (unverified)
    pub install_folder: Option<PathBuf>,
}

impl Title {
    pub fn new(app_id: i64, name: &str, install_folder: Option<PathBuf>) -> Self {
        Title {
            app_id,
            name: name.to_string(),
            install_folder,
        }
    }

    /// A title known only by its display name.
    pub fn by_name(name: &str) -> Self {
        Title::new(UNKNOWN_APP_ID, name, None)
    }

    /// Build a title for an app installed under a host library folder.
    ///
    /// The install path is inferred as `<folder>/steamapps/common/<name>`.
    pub fn from_library(folder: &Path, app: &InstalledApp) -> Self {
        Title::new(
            i64::from(app.app_id),
            &app.name,
            Some(folder.join("steamapps").join("common").join(&app.name)),
        )
    }

    /// True when the platform id could not be determined.
    pub fn has_unknown_id(&self) -> bool {
        self.app_id <= 0 || self.app_id > i64::from(u32::MAX)
    }

    /// Identity used for every persisted record of this title.
    ///
    /// Fails for a title with an unknown id and a blank name, which has
    /// nothing stable to key its records by.
    pub fn key(&self) -> Result<TitleKey> {
        if let Ok(id) = u32::try_from(self.app_id) {
            if id > 0 {
                return Ok(TitleKey::App(id));
            }
        }
        let name = paths::normalize_title_name(&self.name);
        if name.is_empty() {
            return Err(Error::InvalidTitle(self.name.clone()));
        }
        Ok(TitleKey::Name(name))
    }
}

/// Persistent identity of a title.
///
/// Serialized as a string (`app:<id>` or `name:<normalized name>`) so it
/// can key a JSON object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum TitleKey {
    App(u32),
    Name(String),
}

impl fmt::Display for TitleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TitleKey::App(id) => write!(f, "app:{id}"),
            TitleKey::Name(name) => write!(f, "name:{name}"),
        }
    }
}

impl FromStr for TitleKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if let Some(id) = s.strip_prefix("app:") {
            let id: u32 = id
                .parse()
                .map_err(|e| format!("invalid app id in title key {s:?}: {e}"))?;
            if id == 0 {
                return Err(format!("invalid app id in title key {s:?}"));
            }
            Ok(TitleKey::App(id))
        } else if let Some(name) = s.strip_prefix("name:") {
            let normalized = paths::normalize_title_name(name);
            if normalized.is_empty() {
                return Err(format!("empty name in title key {s:?}"));
            }
            Ok(TitleKey::Name(normalized))
        } else {
            Err(format!("unrecognized title key {s:?}"))
        }
    }
}

impl From<TitleKey> for String {
    fn from(key: TitleKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for TitleKey {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// An app installed under one of the host's library folders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledApp {
    pub app_id: u32,
    pub name: String,
}

/// A host storage volume / library folder and the apps installed there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallFolder {
    pub path: PathBuf,
    pub apps: Vec<InstalledApp>,
}

/// Resolves the title currently selected in the host UI.
pub trait TitleResolver {
    fn current_title(&self) -> Option<Title>;
}

/// Lists the host's library folders and their installed apps.
pub trait InstallFolderEnumerator {
    fn install_folders(&self) -> Vec<InstallFolder>;
}

/// Interactive directory chooser. `None` means the user cancelled.
pub trait PathPicker {
    fn pick_directory(&self, start: &Path) -> Option<PathBuf>;
}

/// A [`TitleResolver`] backed by the host's install folders.
///
/// `visible` decides whether an app id appears in the current UI context.
/// When no installed app matches, `fallback_name` (the name shown on a
/// title page for externally added entries) produces a name-keyed title.
pub struct LibraryResolver<E, F> {
    enumerator: E,
    visible: F,
    fallback_name: Option<String>,
}

impl<E, F> LibraryResolver<E, F>
where
    E: InstallFolderEnumerator,
    F: Fn(u32) -> bool,
{
    pub fn new(enumerator: E, visible: F) -> Self {
        LibraryResolver {
            enumerator,
            visible,
            fallback_name: None,
        }
    }

    pub fn with_fallback_name(mut self, name: Option<String>) -> Self {
        self.fallback_name = name.filter(|n| !n.trim().is_empty());
        self
    }
}

impl<E, F> TitleResolver for LibraryResolver<E, F>
where
    E: InstallFolderEnumerator,
    F: Fn(u32) -> bool,
{
    fn current_title(&self) -> Option<Title> {
        for folder in self.enumerator.install_folders() {
            if let Some(app) = folder.apps.iter().find(|a| (self.visible)(a.app_id)) {
                return Some(Title::from_library(&folder.path, app));
            }
        }

        self.fallback_name.as_deref().map(Title::by_name)
    }
}
