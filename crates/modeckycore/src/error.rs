//! Error types for the modding session engine.

use std::path::PathBuf;

use thiserror::Error;

use crate::title::TitleKey;

/// Errors surfaced by registry, profile and session operations.
///
/// Everything except the store variants is an expected usage error that the
/// presentation layer should turn into a user-facing message.
#[derive(Error, Debug)]
pub enum Error {
    #[error("title {0:?} has neither a platform id nor a usable name")]
    InvalidTitle(String),

    #[error("title {0} is not managed")]
    NotManaged(TitleKey),

    #[error("profile '{profile}' does not exist for title {title}")]
    ProfileNotFound { title: TitleKey, profile: String },

    #[error("profile '{profile}' already exists for title {title}")]
    NameTaken { title: TitleKey, profile: String },

    #[error("invalid profile name {0:?}")]
    InvalidProfileName(String),

    #[error("install path {0:?} is not an existing directory")]
    InvalidPath(PathBuf),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed state file {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported state file version {found} in {path:?} (newest supported is {supported})")]
    UnsupportedVersion {
        path: PathBuf,
        found: u32,
        supported: u32,
    },

    #[error("state lock poisoned")]
    Poisoned,
}

impl Error {
    /// True for recoverable usage errors, false for store failures.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidTitle(_)
                | Error::NotManaged(_)
                | Error::ProfileNotFound { .. }
                | Error::NameTaken { .. }
                | Error::InvalidProfileName(_)
                | Error::InvalidPath(_)
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_error_classification() {
        assert!(Error::NotManaged(TitleKey::App(1)).is_user_error());
        assert!(Error::NameTaken {
            title: TitleKey::App(1),
            profile: "A".into()
        }
        .is_user_error());
        assert!(Error::InvalidPath(PathBuf::from("/x")).is_user_error());
        assert!(Error::InvalidTitle("  ".into()).is_user_error());
        assert!(!Error::Poisoned.is_user_error());
        assert!(!Error::io("/x", std::io::Error::other("boom")).is_user_error());
    }

    #[test]
    fn test_messages() {
        let err = Error::ProfileNotFound {
            title: TitleKey::App(100),
            profile: "Default".into(),
        };
        assert_eq!(
            err.to_string(),
            "profile 'Default' does not exist for title app:100"
        );
    }
}
