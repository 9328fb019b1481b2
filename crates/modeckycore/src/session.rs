//! Session facade, the single entry point for the presentation layer.
//!
//! The caller passes the [`Title`] it is showing into every operation and
//! gets a fresh [`SessionView`] back, so it never stitches registry, profile
//! and scan state together itself and keeps no hidden "current menu" state.
//!
//! All operations are serialized through a single lock around the
//! [`Database`]. Scans run after the lock is released.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::paths;
use crate::scanner::{ModEntry, ModScanner, ModStatus};
use crate::settings::Settings;
use crate::store::Database;
use crate::title::{PathPicker, Title, TitleKey};

/// What the presentation layer renders for a title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionView {
    Unmanaged(UnmanagedView),
    Managed(ManagedView),
}

impl SessionView {
    pub fn key(&self) -> &TitleKey {
        match self {
            SessionView::Unmanaged(v) => &v.key,
            SessionView::Managed(v) => &v.key,
        }
    }

    pub fn is_managed(&self) -> bool {
        matches!(self, SessionView::Managed(_))
    }

    pub fn managed(&self) -> Option<&ManagedView> {
        match self {
            SessionView::Managed(v) => Some(v),
            SessionView::Unmanaged(_) => None,
        }
    }
}

/// A title that has not been opted into mod management.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmanagedView {
    pub key: TitleKey,
    pub app_id: i64,
    pub name: String,
    /// The resolver's install path guess, if any
    pub suggested_path: Option<PathBuf>,
    pub suggested_path_exists: bool,
}

/// A managed title with its mods and profiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagedView {
    pub key: TitleKey,
    pub app_id: i64,
    pub name: String,
    pub install_path: PathBuf,
    pub install_path_exists: bool,
    /// Fresh scan of the install path
    pub mods: Vec<ModEntry>,
    pub active_profile: Option<ActiveProfileView>,
    /// Every profile except the active one, in creation order
    pub other_profiles: Vec<String>,
}

/// The active profile and its load order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveProfileView {
    pub name: String,
    pub load_order: Vec<LoadOrderEntry>,
}

/// One load order slot, matched against the latest scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadOrderEntry {
    pub id: String,
    /// `None` when the mod is not on disk right now
    pub status: Option<ModStatus>,
}

/// State needed to build a managed view, captured under the lock.
struct ManagedSnapshot {
    install_path: PathBuf,
    active: Option<(String, Vec<String>)>,
    other_profiles: Vec<String>,
}

/// Composes registry, profiles and scanning for the presentation layer.
pub struct Session {
    settings: Settings,
    scanner: ModScanner,
    db: Mutex<Database>,
}

impl Session {
    /// Open the state file named by `settings`.
    pub fn open(settings: Settings) -> Result<Self> {
        let db = Database::open(&settings.state_path())?;
        Ok(Session::new(settings, db))
    }

    pub fn new(settings: Settings, db: Database) -> Self {
        Session {
            scanner: ModScanner::from_settings(&settings),
            settings,
            db: Mutex::new(db),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn db(&self) -> Result<MutexGuard<'_, Database>> {
        self.db.lock().map_err(|_| Error::Poisoned)
    }

    /// Build the view for a title. This is the read the UI polls.
    pub fn resolve_session(&self, title: &Title) -> Result<SessionView> {
        let key = title.key()?;
        let snapshot = {
            let db = self.db()?;
            Self::snapshot(&db, &key)
        };
        Ok(self.build_view(title, key, snapshot))
    }

    /// Run a mutation under the lock, then build the fresh view.
    fn mutate(
        &self,
        title: &Title,
        op: impl FnOnce(&mut Database, &TitleKey) -> Result<()>,
    ) -> Result<SessionView> {
        let key = title.key()?;
        let snapshot = {
            let mut db = self.db()?;
            op(&mut db, &key)?;
            Self::snapshot(&db, &key)
        };
        Ok(self.build_view(title, key, snapshot))
    }

    fn snapshot(db: &Database, key: &TitleKey) -> Option<ManagedSnapshot> {
        let record = db.registry().record(key)?;
        let profiles = &record.profiles;
        let active = profiles
            .active_profile()
            .map(|p| (p.name.clone(), p.load_order.clone()));
        let other_profiles = profiles
            .names()
            .into_iter()
            .filter(|name| Some(name.as_str()) != profiles.active())
            .collect();

        Some(ManagedSnapshot {
            install_path: record.install_path.clone(),
            active,
            other_profiles,
        })
    }

    fn build_view(
        &self,
        title: &Title,
        key: TitleKey,
        snapshot: Option<ManagedSnapshot>,
    ) -> SessionView {
        let Some(snapshot) = snapshot else {
            return SessionView::Unmanaged(UnmanagedView {
                key,
                app_id: title.app_id,
                name: title.name.clone(),
                suggested_path_exists: title
                    .install_folder
                    .as_deref()
                    .is_some_and(paths::is_directory),
                suggested_path: title.install_folder.clone(),
            });
        };

        let mods = self.scanner.scan(&snapshot.install_path);
        let active_profile = snapshot.active.map(|(name, order)| ActiveProfileView {
            name,
            load_order: order
                .into_iter()
                .map(|id| LoadOrderEntry {
                    status: mods.iter().find(|m| m.id == id).map(|m| m.status),
                    id,
                })
                .collect(),
        });

        SessionView::Managed(ManagedView {
            key,
            app_id: title.app_id,
            name: title.name.clone(),
            install_path_exists: paths::is_directory(&snapshot.install_path),
            install_path: snapshot.install_path,
            mods,
            active_profile,
            other_profiles: snapshot.other_profiles,
        })
    }

    fn check_install_path(&self, path: &Path) -> Result<()> {
        if self.settings.strict_install_paths {
            paths::validate_install_path(path)?;
        } else if !paths::is_directory(path) {
            tracing::warn!("Install path {:?} does not exist right now", path);
        }
        Ok(())
    }

    /// Opt a title into management. Already-managed titles are left as is,
    /// including their stored install path, so `install_path` is only
    /// checked when a record is created.
    pub fn start_managing(&self, title: &Title, install_path: &Path) -> Result<SessionView> {
        self.mutate(title, |db, key| {
            if db.is_managed(key) {
                return Ok(());
            }
            self.check_install_path(install_path)?;
            db.begin_managing(key, &title.name, install_path).map(|_| ())
        })
    }

    /// Drop management for a title with all its profiles. The caller is
    /// responsible for asking the user first.
    pub fn stop_managing(&self, title: &Title) -> Result<SessionView> {
        self.mutate(title, |db, key| db.stop_managing(key).map(|_| ()))
    }

    /// Make `name` the active profile, or clear it with `None`.
    pub fn switch_active_profile(&self, title: &Title, name: Option<&str>) -> Result<SessionView> {
        self.mutate(title, |db, key| db.set_active_profile(key, name))
    }

    /// Add a profile with a generated name. It becomes active if the title
    /// had no active profile.
    pub fn add_profile(&self, title: &Title) -> Result<SessionView> {
        self.add_profile_inner(title, None)
    }

    pub fn add_named_profile(&self, title: &Title, name: &str) -> Result<SessionView> {
        self.add_profile_inner(title, Some(name))
    }

    fn add_profile_inner(&self, title: &Title, name: Option<&str>) -> Result<SessionView> {
        self.mutate(title, |db, key| {
            db.create_profile_activating(key, name).map(|_| ())
        })
    }

    /// Copy a profile's load order into a new profile.
    pub fn copy_profile(&self, title: &Title, source: &str, name: Option<&str>) -> Result<SessionView> {
        self.mutate(title, |db, key| {
            db.duplicate_profile(key, source, name).map(|_| ())
        })
    }

    pub fn rename_profile(&self, title: &Title, old: &str, new: &str) -> Result<SessionView> {
        self.mutate(title, |db, key| db.rename(key, old, new))
    }

    /// Delete a profile. Deleting the active one leaves no profile active.
    pub fn remove_profile(&self, title: &Title, name: &str) -> Result<SessionView> {
        self.mutate(title, |db, key| db.delete_profile(key, name))
    }

    /// Replace a profile's load order.
    pub fn reorder(&self, title: &Title, profile: &str, new_order: Vec<String>) -> Result<SessionView> {
        self.mutate(title, |db, key| db.set_load_order(key, profile, new_order))
    }

    /// Point a managed title at a new install directory.
    pub fn rebind_install_path(&self, title: &Title, new_path: &Path) -> Result<SessionView> {
        self.check_install_path(new_path)?;
        self.mutate(title, |db, key| db.set_install_path(key, new_path))
    }

    /// Where the directory picker should open for this title.
    pub fn browse_start(&self, title: &Title) -> Result<PathBuf> {
        let key = title.key()?;
        let stored = self.db()?.get_install_path(&key);
        let start = stored
            .filter(|p| paths::is_directory(p))
            .or_else(|| {
                title
                    .install_folder
                    .clone()
                    .filter(|p| paths::is_directory(p))
            })
            .unwrap_or_else(|| self.settings.browse_root());
        Ok(start)
    }

    /// Let the user pick a new install directory and rebind to it.
    /// Cancelling returns the current view unchanged.
    pub fn browse_and_rebind(&self, title: &Title, picker: &dyn PathPicker) -> Result<SessionView> {
        let start = self.browse_start(title)?;
        match picker.pick_directory(&start) {
            Some(chosen) => self.rebind_install_path(title, &chosen),
            None => self.resolve_session(title),
        }
    }

    /// Scan an arbitrary directory with this session's package convention.
    pub fn scan(&self, install_path: &Path) -> Vec<ModEntry> {
        self.scanner.scan(install_path)
    }
}
