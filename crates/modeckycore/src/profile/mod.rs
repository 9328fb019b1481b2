//! Profile management.
//!
//! A profile is a named load order for one managed title. Each title owns a
//! [`ProfileSet`]: its profiles in creation order plus the name of the active
//! profile, if any.
//!
//! The active profile is a weak reference by name. Every mutation that removes
//! or renames a profile goes through this module so the pointer is always
//! either a live profile name or `None`.

pub mod naming;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::title::TitleKey;

/// A named mod load order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    /// Mod ids in application order (later entries win conflicts).
    /// Ids of mods no longer on disk are kept and simply have no effect.
    #[serde(default)]
    pub load_order: Vec<String>,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
}

impl Profile {
    pub fn new(name: &str) -> Self {
        Profile {
            name: name.to_string(),
            load_order: Vec::new(),
            created: Utc::now(),
        }
    }
}

/// Profile-level failure, before it is attributed to a title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileError {
    NotFound(String),
    NameTaken(String),
    InvalidName(String),
}

impl ProfileError {
    pub fn for_title(self, title: &TitleKey) -> Error {
        match self {
            ProfileError::NotFound(profile) => Error::ProfileNotFound {
                title: title.clone(),
                profile,
            },
            ProfileError::NameTaken(profile) => Error::NameTaken {
                title: title.clone(),
                profile,
            },
            ProfileError::InvalidName(name) => Error::InvalidProfileName(name),
        }
    }
}

type ProfileResult<T> = std::result::Result<T, ProfileError>;

/// All profiles of one title and its active-profile pointer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSet {
    /// Profiles in creation order
    #[serde(default)]
    profiles: Vec<Profile>,
    /// Name of the active profile
    #[serde(default, rename = "active_profile")]
    active: Option<String>,
}

impl ProfileSet {
    /// Profile names in creation order.
    pub fn names(&self) -> Vec<String> {
        self.profiles.iter().map(|p| p.name.clone()).collect()
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut Profile> {
        self.profiles.iter_mut().find(|p| p.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Create a profile. Without a name, "Profile N" is generated.
    pub fn create(&mut self, proposed: Option<&str>) -> ProfileResult<String> {
        let name = match proposed {
            Some(raw) => {
                let name =
                    naming::clean_name(raw).ok_or_else(|| ProfileError::InvalidName(raw.to_string()))?;
                if self.contains(&name) {
                    return Err(ProfileError::NameTaken(name));
                }
                name
            }
            None => naming::generate_name(self.profiles.iter().map(|p| p.name.as_str())),
        };

        self.profiles.push(Profile::new(&name));
        Ok(name)
    }

    /// Create a profile with a copy of `source`'s load order.
    pub fn duplicate(&mut self, source: &str, proposed: Option<&str>) -> ProfileResult<String> {
        let load_order = self
            .get(source)
            .map(|p| p.load_order.clone())
            .ok_or_else(|| ProfileError::NotFound(source.to_string()))?;

        let name = self.create(proposed)?;
        if let Some(copy) = self.get_mut(&name) {
            copy.load_order = load_order;
        }
        Ok(name)
    }

    /// Rename a profile. The active pointer follows the rename.
    pub fn rename(&mut self, old: &str, new: &str) -> ProfileResult<()> {
        let new = naming::clean_name(new).ok_or_else(|| ProfileError::InvalidName(new.to_string()))?;
        if !self.contains(old) {
            return Err(ProfileError::NotFound(old.to_string()));
        }
        if old == new {
            return Ok(());
        }
        if self.contains(&new) {
            return Err(ProfileError::NameTaken(new));
        }

        if let Some(profile) = self.get_mut(old) {
            profile.name = new.clone();
        }
        if self.active.as_deref() == Some(old) {
            self.active = Some(new);
        }
        Ok(())
    }

    /// Delete a profile, clearing the active pointer if it referenced it.
    pub fn delete(&mut self, name: &str) -> ProfileResult<Profile> {
        let index = self
            .profiles
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))?;
        let removed = self.profiles.remove(index);
        self.drop_dangling_active();
        Ok(removed)
    }

    /// Rename to `new`, or delete when `new` is `None`.
    pub fn rename_or_delete(&mut self, old: &str, new: Option<&str>) -> ProfileResult<()> {
        match new {
            Some(new) => self.rename(old, new),
            None => self.delete(old).map(|_| ()),
        }
    }

    pub fn load_order(&self, name: &str) -> ProfileResult<&[String]> {
        self.get(name)
            .map(|p| p.load_order.as_slice())
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))
    }

    /// Replace a profile's load order wholesale.
    pub fn set_load_order(&mut self, name: &str, order: Vec<String>) -> ProfileResult<()> {
        let profile = self
            .get_mut(name)
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))?;
        profile.load_order = order;
        Ok(())
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active_profile(&self) -> Option<&Profile> {
        self.active.as_deref().and_then(|name| self.get(name))
    }

    /// Point the active profile at `name`, or clear it with `None`.
    pub fn set_active(&mut self, name: Option<&str>) -> ProfileResult<()> {
        match name {
            Some(name) => {
                if !self.contains(name) {
                    return Err(ProfileError::NotFound(name.to_string()));
                }
                self.active = Some(name.to_string());
            }
            None => self.active = None,
        }
        Ok(())
    }

    /// Fix invariant violations in loaded data. Returns a description of
    /// each repair made.
    pub fn repair(&mut self) -> Vec<String> {
        let mut repairs = Vec::new();

        let before = self.profiles.len();
        self.profiles.retain(|p| !p.name.trim().is_empty());
        if self.profiles.len() != before {
            repairs.push(format!(
                "dropped {} profile(s) with blank names",
                before - self.profiles.len()
            ));
        }

        let mut seen = std::collections::HashSet::new();
        let mut duplicates = Vec::new();
        self.profiles.retain(|p| {
            if seen.insert(p.name.clone()) {
                true
            } else {
                duplicates.push(p.name.clone());
                false
            }
        });
        for name in duplicates {
            repairs.push(format!("dropped duplicate profile '{name}'"));
        }

        if let Some(active) = self.active.clone() {
            if self.drop_dangling_active() {
                repairs.push(format!("cleared dangling active profile '{active}'"));
            }
        }

        repairs
    }

    /// Clear the active pointer if it no longer names a profile.
    fn drop_dangling_active(&mut self) -> bool {
        let dangling = self
            .active
            .as_deref()
            .is_some_and(|name| !self.profiles.iter().any(|p| p.name == name));
        if dangling {
            self.active = None;
        }
        dangling
    }
}
