//! Durable management state.
//!
//! The whole registry (records, profiles, load orders, active pointers) is one
//! JSON document, by default `~/.local/share/modecky/state.json`:
//!
//! ```json
//! { "version": 1, "titles": { "app:100": { "name": "Foo", ... } } }
//! ```
//!
//! Every mutation runs against a copy of the registry. The copy is written to
//! a temp file next to the state file, synced, and renamed over it; only then
//! does it replace the in-memory state. A crash at any point leaves either the
//! old document or the new one, never a mix, so multi-record changes such as
//! "delete profile and clear the active pointer" are all-or-nothing.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::registry::{ManagementRecord, Registry};
use crate::title::TitleKey;

/// Newest state document version this build reads and writes.
pub const STATE_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
struct StateDocument {
    version: u32,
    titles: Registry,
}

/// On-disk shape with undecoded title keys, so one bad key cannot make the
/// whole document unreadable.
#[derive(Debug, Deserialize)]
struct StoredDocument {
    #[serde(default)]
    titles: BTreeMap<String, ManagementRecord>,
}

#[derive(Debug, Deserialize)]
struct VersionProbe {
    #[serde(default)]
    version: u32,
}

/// The registry bound to its state file.
///
/// Title-keyed registry and profile operations. Reads never touch the disk;
/// each successful mutation is durable before it returns.
#[derive(Debug)]
pub struct Database {
    path: PathBuf,
    registry: Registry,
}

impl Database {
    /// Open the state file, creating an empty registry if it does not exist.
    ///
    /// Invariant violations found on load (e.g. an undecodable title key or
    /// an active pointer naming a missing profile) are repaired and the
    /// repaired state written back.
    pub fn open(path: &Path) -> Result<Self> {
        let (mut registry, mut repairs) = read_state(path)?.unwrap_or_default();

        repairs.extend(registry.repair());
        if !repairs.is_empty() {
            for repair in &repairs {
                tracing::warn!("Repaired state {:?}: {}", path, repair);
            }
            write_state(path, &registry)?;
            tracing::info!("Wrote repaired state to {:?}", path);
        }

        Ok(Database {
            path: path.to_path_buf(),
            registry,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Apply a mutation atomically: on error, or if the write fails, the
    /// in-memory state is left untouched.
    fn commit<T>(&mut self, mutate: impl FnOnce(&mut Registry) -> Result<T>) -> Result<T> {
        let mut next = self.registry.clone();
        let out = mutate(&mut next)?;
        if next != self.registry {
            write_state(&self.path, &next)?;
            self.registry = next;
        }
        Ok(out)
    }

    // ── Management registry ─────────────────────────────────────────

    pub fn is_managed(&self, title: &TitleKey) -> bool {
        self.registry.is_managed(title)
    }

    /// Start managing a title. Idempotent; returns whether a record was created.
    pub fn begin_managing(&mut self, title: &TitleKey, name: &str, install_path: &Path) -> Result<bool> {
        let created = self.commit(|r| Ok(r.begin_managing(title, name, install_path)))?;
        if created {
            tracing::info!("Managing {} ('{}') at {:?}", title, name, install_path);
        }
        Ok(created)
    }

    /// Stop managing a title and delete all of its profiles. Unconditional;
    /// returns whether the title was managed.
    pub fn stop_managing(&mut self, title: &TitleKey) -> Result<bool> {
        let removed = self.commit(|r| Ok(r.stop_managing(title)))?;
        if let Some(record) = &removed {
            tracing::info!(
                "Stopped managing {} ('{}'), dropped {} profile(s)",
                title,
                record.name,
                record.profiles.len()
            );
        }
        Ok(removed.is_some())
    }

    pub fn get_install_path(&self, title: &TitleKey) -> Option<PathBuf> {
        self.registry.install_path(title).map(Path::to_path_buf)
    }

    pub fn set_install_path(&mut self, title: &TitleKey, path: &Path) -> Result<()> {
        self.commit(|r| r.set_install_path(title, path))?;
        tracing::info!("Install path of {} set to {:?}", title, path);
        Ok(())
    }

    // ── Profiles ────────────────────────────────────────────────────

    /// Profile names in creation order. Empty for unmanaged titles.
    pub fn list_profiles(&self, title: &TitleKey) -> Vec<String> {
        self.registry
            .profiles(title)
            .map(|p| p.names())
            .unwrap_or_default()
    }

    /// Create a profile, generating "Profile N" when no name is given.
    pub fn create_profile(&mut self, title: &TitleKey, proposed: Option<&str>) -> Result<String> {
        let name = self.commit(|r| {
            r.profiles_mut(title)?
                .create(proposed)
                .map_err(|e| e.for_title(title))
        })?;
        tracing::info!("Created profile '{}' for {}", name, title);
        Ok(name)
    }

    /// Create a profile and make it active if the title has no active
    /// profile yet. Both happen in one write.
    pub fn create_profile_activating(
        &mut self,
        title: &TitleKey,
        proposed: Option<&str>,
    ) -> Result<String> {
        let (name, activated) = self.commit(|r| {
            let profiles = r.profiles_mut(title)?;
            let name = profiles.create(proposed).map_err(|e| e.for_title(title))?;
            let activate = profiles.active().is_none();
            if activate {
                profiles
                    .set_active(Some(name.as_str()))
                    .map_err(|e| e.for_title(title))?;
            }
            Ok((name, activate))
        })?;
        tracing::info!("Created profile '{}' for {}", name, title);
        if activated {
            tracing::info!("Active profile of {} is now '{}'", title, name);
        }
        Ok(name)
    }

    /// Create a profile holding a copy of `source`'s load order.
    pub fn duplicate_profile(
        &mut self,
        title: &TitleKey,
        source: &str,
        proposed: Option<&str>,
    ) -> Result<String> {
        let name = self.commit(|r| {
            r.profiles_mut(title)?
                .duplicate(source, proposed)
                .map_err(|e| e.for_title(title))
        })?;
        tracing::info!("Copied profile '{}' to '{}' for {}", source, name, title);
        Ok(name)
    }

    /// Rename a profile; the active pointer follows.
    pub fn rename(&mut self, title: &TitleKey, old: &str, new: &str) -> Result<()> {
        self.commit(|r| {
            r.profiles_mut(title)?
                .rename(old, new)
                .map_err(|e| e.for_title(title))
        })?;
        tracing::info!("Renamed profile '{}' to '{}' for {}", old, new.trim(), title);
        Ok(())
    }

    /// Delete a profile, clearing the active pointer if it was active.
    pub fn delete_profile(&mut self, title: &TitleKey, name: &str) -> Result<()> {
        self.commit(|r| {
            r.profiles_mut(title)?
                .delete(name)
                .map_err(|e| e.for_title(title))
        })?;
        tracing::info!("Deleted profile '{}' for {}", name, title);
        Ok(())
    }

    /// Rename `old` to `new`, or delete it when `new` is `None`.
    pub fn rename_profile(&mut self, title: &TitleKey, old: &str, new: Option<&str>) -> Result<()> {
        match new {
            Some(new) => self.rename(title, old, new),
            None => self.delete_profile(title, old),
        }
    }

    pub fn get_load_order(&self, title: &TitleKey, profile: &str) -> Result<Vec<String>> {
        self.registry
            .profiles(title)?
            .load_order(profile)
            .map(<[String]>::to_vec)
            .map_err(|e| e.for_title(title))
    }

    /// Replace a profile's load order. Ids are stored as given.
    pub fn set_load_order(&mut self, title: &TitleKey, profile: &str, order: Vec<String>) -> Result<()> {
        let count = order.len();
        self.commit(|r| {
            r.profiles_mut(title)?
                .set_load_order(profile, order)
                .map_err(|e| e.for_title(title))
        })?;
        tracing::debug!("Stored {} mod(s) in '{}' for {}", count, profile, title);
        Ok(())
    }

    /// Active profile name. `None` for unmanaged titles.
    pub fn get_active_profile(&self, title: &TitleKey) -> Option<String> {
        self.registry
            .profiles(title)
            .ok()
            .and_then(|p| p.active().map(ToString::to_string))
    }

    pub fn set_active_profile(&mut self, title: &TitleKey, name: Option<&str>) -> Result<()> {
        self.commit(|r| {
            r.profiles_mut(title)?
                .set_active(name)
                .map_err(|e| e.for_title(title))
        })?;
        match name {
            Some(name) => tracing::info!("Active profile of {} is now '{}'", title, name),
            None => tracing::info!("Cleared active profile of {}", title),
        }
        Ok(())
    }
}

/// Read the state document and the repairs made while decoding it.
/// `Ok(None)` when the file does not exist.
fn read_state(path: &Path) -> Result<Option<(Registry, Vec<String>)>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::io(path, e)),
    };

    let json_err = |source: serde_json::Error| Error::Json {
        path: path.to_path_buf(),
        source,
    };

    let probe: VersionProbe = serde_json::from_str(&raw).map_err(json_err)?;
    if probe.version > STATE_VERSION {
        return Err(Error::UnsupportedVersion {
            path: path.to_path_buf(),
            found: probe.version,
            supported: STATE_VERSION,
        });
    }

    let doc: StoredDocument = serde_json::from_str(&raw).map_err(json_err)?;
    Ok(Some(Registry::from_stored(doc.titles)))
}

/// Write the state document via temp file + rename.
fn write_state(path: &Path, registry: &Registry) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;

    let doc = StateDocument {
        version: STATE_VERSION,
        titles: registry.clone(),
    };
    let raw = serde_json::to_vec_pretty(&doc).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| Error::io(parent, e))?;
    tmp.write_all(&raw).map_err(|e| Error::io(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| Error::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| Error::io(path, e.error))?;

    tracing::debug!("Wrote {} title(s) to {:?}", registry.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn foo() -> TitleKey {
        TitleKey::App(100)
    }

    fn open_tmp() -> (tempfile::TempDir, Database) {
        let tmp = tempfile::tempdir().unwrap();
        let db = Database::open(&tmp.path().join("state.json")).unwrap();
        (tmp, db)
    }

    #[test]
    fn test_open_missing_file() {
        let (tmp, db) = open_tmp();
        assert!(db.registry().is_empty());
        // Nothing is written until the first mutation
        assert!(!tmp.path().join("state.json").exists());
    }

    #[test]
    fn test_state_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/dir/state.json");

        let mut db = Database::open(&path).unwrap();
        db.begin_managing(&foo(), "Foo", Path::new("/games/foo")).unwrap();
        db.create_profile(&foo(), Some("Default")).unwrap();
        db.set_load_order(&foo(), "Default", vec!["b".into(), "a".into()])
            .unwrap();
        db.set_active_profile(&foo(), Some("Default")).unwrap();
        drop(db);

        let db = Database::open(&path).unwrap();
        assert!(db.is_managed(&foo()));
        assert_eq!(db.list_profiles(&foo()), vec!["Default"]);
        assert_eq!(db.get_load_order(&foo(), "Default").unwrap(), vec!["b", "a"]);
        assert_eq!(db.get_active_profile(&foo()), Some("Default".to_string()));
    }

    #[test]
    fn test_failed_mutation_changes_nothing() {
        let (tmp, mut db) = open_tmp();
        db.begin_managing(&foo(), "Foo", Path::new("/games/foo")).unwrap();
        db.create_profile(&foo(), Some("A")).unwrap();
        db.create_profile(&foo(), Some("B")).unwrap();
        let on_disk = std::fs::read_to_string(tmp.path().join("state.json")).unwrap();

        assert!(matches!(
            db.rename(&foo(), "A", "B"),
            Err(Error::NameTaken { .. })
        ));
        assert_eq!(db.list_profiles(&foo()), vec!["A", "B"]);
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("state.json")).unwrap(),
            on_disk
        );
    }

    #[test]
    fn test_unmanaged_title_operations() {
        let (_tmp, mut db) = open_tmp();
        assert!(db.list_profiles(&foo()).is_empty());
        assert_eq!(db.get_active_profile(&foo()), None);
        assert_eq!(db.get_install_path(&foo()), None);
        assert!(matches!(
            db.create_profile(&foo(), None),
            Err(Error::NotManaged(_))
        ));
        assert!(matches!(
            db.set_install_path(&foo(), Path::new("/x")),
            Err(Error::NotManaged(_))
        ));
        assert!(matches!(
            db.get_load_order(&foo(), "Default"),
            Err(Error::NotManaged(_))
        ));
        assert!(!db.stop_managing(&foo()).unwrap());
    }

    #[test]
    fn test_rename_profile_none_deletes() {
        let (_tmp, mut db) = open_tmp();
        db.begin_managing(&foo(), "Foo", Path::new("/games/foo")).unwrap();
        assert_eq!(db.create_profile(&foo(), Some("Default")).unwrap(), "Default");
        db.set_active_profile(&foo(), Some("Default")).unwrap();

        db.rename_profile(&foo(), "Default", None).unwrap();
        assert!(db.list_profiles(&foo()).is_empty());
        assert_eq!(db.get_active_profile(&foo()), None);

        assert!(matches!(
            db.rename_profile(&foo(), "Default", None),
            Err(Error::ProfileNotFound { .. })
        ));
    }

    #[test]
    fn test_load_repairs_dangling_active() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state.json");
        std::fs::write(
            &path,
            r#"{
                "version": 1,
                "titles": {
                    "app:100": {
                        "name": "Foo",
                        "install_path": "/games/foo",
                        "profiles": [{ "name": "A", "load_order": ["m"] }],
                        "active_profile": "Deleted"
                    }
                }
            }"#,
        )
        .unwrap();

        let db = Database::open(&path).unwrap();
        assert_eq!(db.get_active_profile(&foo()), None);
        assert_eq!(db.list_profiles(&foo()), vec!["A"]);

        // The repair was written back
        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value["titles"]["app:100"]["active_profile"].is_null());
    }

    #[test]
    fn test_newer_version_refused() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state.json");
        std::fs::write(&path, r#"{ "version": 99, "titles": {} }"#).unwrap();

        assert!(matches!(
            Database::open(&path),
            Err(Error::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state.json");
        std::fs::write(&path, "{ truncated").unwrap();
        assert!(matches!(Database::open(&path), Err(Error::Json { .. })));
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let (tmp, mut db) = open_tmp();
        db.begin_managing(&foo(), "Foo", Path::new("/games/foo")).unwrap();
        db.create_profile(&foo(), None).unwrap();

        let names: Vec<String> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["state.json"]);
    }

    #[test]
    fn test_create_profile_activating() {
        let (_tmp, mut db) = open_tmp();
        db.begin_managing(&foo(), "Foo", Path::new("/games/foo")).unwrap();

        assert_eq!(db.create_profile_activating(&foo(), None).unwrap(), "Profile 1");
        assert_eq!(db.get_active_profile(&foo()), Some("Profile 1".to_string()));

        // An existing active profile is kept
        assert_eq!(
            db.create_profile_activating(&foo(), Some("Alt")).unwrap(),
            "Alt"
        );
        assert_eq!(db.get_active_profile(&foo()), Some("Profile 1".to_string()));
    }

    #[test]
    fn test_failed_write_leaves_no_profile_behind() {
        let (tmp, mut db) = open_tmp();
        let path = tmp.path().join("state.json");
        db.begin_managing(&foo(), "Foo", Path::new("/games/foo")).unwrap();

        // Replace the state file with a directory so the rename fails
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "x").unwrap();

        assert!(matches!(
            db.create_profile_activating(&foo(), Some("Default")),
            Err(Error::Io { .. })
        ));
        assert!(db.list_profiles(&foo()).is_empty());
        assert_eq!(db.get_active_profile(&foo()), None);
    }

    #[test]
    fn test_bad_title_key_dropped_on_open() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state.json");
        std::fs::write(
            &path,
            r#"{
                "version": 1,
                "titles": {
                    "app:100": {
                        "name": "Foo",
                        "install_path": "/games/foo",
                        "profiles": [{ "name": "Keep", "load_order": [] }]
                    },
                    "name:": {
                        "name": "",
                        "install_path": "/games/blank",
                        "profiles": []
                    }
                }
            }"#,
        )
        .unwrap();

        let db = Database::open(&path).unwrap();
        assert_eq!(db.registry().len(), 1);
        assert_eq!(db.list_profiles(&foo()), vec!["Keep"]);

        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value["titles"].get("name:").is_none());
    }
}
