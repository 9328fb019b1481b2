//! Per-title modding sessions for a game library host.
//!
//! Tracks which titles are opted into mod management, where they are
//! installed, which mod packages are on disk, and the named load-order
//! profiles of each title (with at most one active at a time).
//!
//! [`session::Session`] is the entry point for a front end; the other modules
//! are the pieces it composes.

pub mod error;
pub mod paths;
pub mod profile;
pub mod registry;
pub mod scanner;
pub mod session;
pub mod settings;
pub mod store;
pub mod title;

pub use error::{Error, Result};
pub use session::{Session, SessionView};
pub use title::{Title, TitleKey};
