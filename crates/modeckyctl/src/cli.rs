//! Command-line definitions for modeckyctl.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use modeckycore::title::UNKNOWN_APP_ID;
use modeckycore::Title;

#[derive(Parser, Debug)]
#[command(
    name = "modeckyctl",
    version,
    about = "Manage per-game mod profiles and load orders"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Settings file (default: ~/.config/modecky/settings.json)
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// State file, overriding the one in settings
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,

    /// Print the session view as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Identifies the game being worked on.
#[derive(Args, Debug, Clone)]
pub struct TitleArgs {
    /// Platform app id (omit for games the platform did not install)
    #[arg(long)]
    pub app_id: Option<u32>,

    /// Display name
    #[arg(long, required_unless_present = "app_id")]
    pub name: Option<String>,

    /// Install directory guess
    #[arg(long)]
    pub path: Option<PathBuf>,
}

impl TitleArgs {
    pub fn to_title(&self) -> Title {
        let app_id = self.app_id.map(i64::from).unwrap_or(UNKNOWN_APP_ID);
        let name = match (&self.name, self.app_id) {
            (Some(name), _) => name.clone(),
            (None, Some(id)) => format!("App {id}"),
            (None, None) => String::new(),
        };
        Title::new(app_id, &name, self.path.clone())
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show management state, mods and profiles
    Status(TitleArgs),

    /// Start managing a game
    Manage {
        #[command(flatten)]
        title: TitleArgs,

        /// Install directory (defaults to --path)
        #[arg(long)]
        install: Option<PathBuf>,
    },

    /// Stop managing a game and delete all of its profiles
    Unmanage {
        #[command(flatten)]
        title: TitleArgs,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Profile operations
    Profile {
        #[command(flatten)]
        title: TitleArgs,

        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Set the active profile (no name clears it)
    Activate {
        #[command(flatten)]
        title: TitleArgs,

        profile: Option<String>,
    },

    /// Replace a profile's load order
    Reorder {
        #[command(flatten)]
        title: TitleArgs,

        profile: String,

        /// Mod ids, first applied first
        mods: Vec<String>,
    },

    /// Point a managed game at a new install directory
    Rebind {
        #[command(flatten)]
        title: TitleArgs,

        new_path: PathBuf,
    },

    /// List the mod packages in an install directory
    Scan { install_path: PathBuf },
}

#[derive(Subcommand, Debug)]
pub enum ProfileAction {
    /// Add a profile (generated name if omitted)
    Add { name: Option<String> },

    /// Delete a profile
    Remove { name: String },

    /// Rename a profile
    Rename { old: String, new: String },

    /// Copy a profile's load order into a new profile
    Copy { source: String, name: Option<String> },
}
