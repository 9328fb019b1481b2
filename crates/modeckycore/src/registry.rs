//! Management registry: which titles are opted into mod management.
//!
//! A title is managed iff it has a [`ManagementRecord`]. The record owns the
//! title's profiles, so removing it removes every profile, load order and the
//! active pointer in one step.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::profile::ProfileSet;
use crate::title::TitleKey;

/// Persistent record for one managed title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagementRecord {
    /// Display name at the time management started
    pub name: String,
    /// Install directory. Not guaranteed to exist; revalidated on use.
    pub install_path: PathBuf,
    #[serde(default = "Utc::now")]
    pub managed_since: DateTime<Utc>,
    #[serde(flatten)]
    pub profiles: ProfileSet,
}

impl ManagementRecord {
    pub fn new(name: &str, install_path: &Path) -> Self {
        ManagementRecord {
            name: name.to_string(),
            install_path: install_path.to_path_buf(),
            managed_since: Utc::now(),
            profiles: ProfileSet::default(),
        }
    }
}

/// All management records, keyed by title.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    records: BTreeMap<TitleKey, ManagementRecord>,
}

impl Registry {
    /// Build a registry from records keyed by their stored key strings.
    ///
    /// Keys that do not decode are dropped. Keys that normalize to the same
    /// title are collapsed onto one record, preferring the one stored under
    /// the canonical spelling. Each drop is reported as a repair.
    pub fn from_stored(stored: BTreeMap<String, ManagementRecord>) -> (Self, Vec<String>) {
        let mut decoded: BTreeMap<TitleKey, (String, ManagementRecord)> = BTreeMap::new();
        let mut repairs = Vec::new();

        for (raw, record) in stored {
            let key = match raw.parse::<TitleKey>() {
                Ok(key) => key,
                Err(e) => {
                    repairs.push(format!("dropped record with unusable key: {e}"));
                    continue;
                }
            };
            let canonical = raw == key.to_string();
            match decoded.get(&key) {
                None => {
                    decoded.insert(key, (raw, record));
                }
                Some((kept, _)) if canonical => {
                    repairs.push(format!("{key}: dropped record stored as {kept:?}"));
                    decoded.insert(key, (raw, record));
                }
                Some(_) => repairs.push(format!("{key}: dropped record stored as {raw:?}")),
            }
        }

        let records = decoded
            .into_iter()
            .map(|(key, (_, record))| (key, record))
            .collect();
        (Registry { records }, repairs)
    }

    pub fn is_managed(&self, title: &TitleKey) -> bool {
        self.records.contains_key(title)
    }

    /// Start managing a title. Returns `false` (and changes nothing) if it
    /// is already managed; an existing install path is never overwritten.
    pub fn begin_managing(&mut self, title: &TitleKey, name: &str, install_path: &Path) -> bool {
        if self.records.contains_key(title) {
            return false;
        }
        self.records
            .insert(title.clone(), ManagementRecord::new(name, install_path));
        true
    }

    /// Stop managing a title, dropping its profiles and active pointer.
    /// Returns the removed record, if there was one.
    pub fn stop_managing(&mut self, title: &TitleKey) -> Option<ManagementRecord> {
        self.records.remove(title)
    }

    pub fn install_path(&self, title: &TitleKey) -> Option<&Path> {
        self.records.get(title).map(|r| r.install_path.as_path())
    }

    pub fn set_install_path(&mut self, title: &TitleKey, path: &Path) -> Result<()> {
        let record = self.record_mut(title)?;
        record.install_path = path.to_path_buf();
        Ok(())
    }

    pub fn record(&self, title: &TitleKey) -> Option<&ManagementRecord> {
        self.records.get(title)
    }

    pub fn record_mut(&mut self, title: &TitleKey) -> Result<&mut ManagementRecord> {
        self.records
            .get_mut(title)
            .ok_or_else(|| Error::NotManaged(title.clone()))
    }

    /// Profiles of a managed title.
    pub fn profiles(&self, title: &TitleKey) -> Result<&ProfileSet> {
        self.records
            .get(title)
            .map(|r| &r.profiles)
            .ok_or_else(|| Error::NotManaged(title.clone()))
    }

    pub fn profiles_mut(&mut self, title: &TitleKey) -> Result<&mut ProfileSet> {
        self.record_mut(title).map(|r| &mut r.profiles)
    }

    pub fn titles(&self) -> impl Iterator<Item = &TitleKey> {
        self.records.keys()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Repair invariant violations in every record.
    pub fn repair(&mut self) -> Vec<String> {
        let mut repairs = Vec::new();
        for (title, record) in &mut self.records {
            for repair in record.profiles.repair() {
                repairs.push(format!("{title}: {repair}"));
            }
        }
        repairs
    }
}
