mod cli;
mod render;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use modeckycore::settings::Settings;
use modeckycore::Session;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, ProfileAction};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

/// A command line that cannot be carried out as given.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct UsageError(&'static str);

/// 2 for usage and user errors, 1 for everything else.
fn exit_code(e: &anyhow::Error) -> u8 {
    let user_error = e.downcast_ref::<UsageError>().is_some()
        || e
            .downcast_ref::<modeckycore::Error>()
            .is_some_and(modeckycore::Error::is_user_error);
    if user_error {
        2
    } else {
        1
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = match &cli.settings {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    if let Some(state) = &cli.state {
        settings.state_file = Some(state.clone());
    }
    Ok(settings)
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let settings = load_settings(cli)?;

    let state_path = settings.state_path();
    tracing::debug!("using state file {:?}", state_path);
    let session =
        Session::open(settings).with_context(|| format!("open state {:?}", state_path))?;

    let view = match &cli.command {
        Command::Status(title) => session.resolve_session(&title.to_title())?,
        Command::Manage { title, install } => {
            let title = title.to_title();
            let install = install
                .clone()
                .or_else(|| title.install_folder.clone())
                .ok_or(UsageError(
                    "no install directory given (use --install or --path)",
                ))?;
            session.start_managing(&title, &install)?
        }
        Command::Unmanage { title, yes } => {
            if !yes {
                return Err(UsageError("refusing to delete all profiles without --yes").into());
            }
            session.stop_managing(&title.to_title())?
        }
        Command::Profile { title, action } => {
            let title = title.to_title();
            match action {
                ProfileAction::Add { name: Some(name) } => {
                    session.add_named_profile(&title, name)?
                }
                ProfileAction::Add { name: None } => session.add_profile(&title)?,
                ProfileAction::Remove { name } => session.remove_profile(&title, name)?,
                ProfileAction::Rename { old, new } => session.rename_profile(&title, old, new)?,
                ProfileAction::Copy { source, name } => {
                    session.copy_profile(&title, source, name.as_deref())?
                }
            }
        }
        Command::Activate { title, profile } => {
            session.switch_active_profile(&title.to_title(), profile.as_deref())?
        }
        Command::Reorder {
            title,
            profile,
            mods,
        } => session.reorder(&title.to_title(), profile, mods.clone())?,
        Command::Rebind { title, new_path } => {
            session.rebind_install_path(&title.to_title(), new_path)?
        }
        Command::Scan { install_path } => {
            let mods = session.scan(install_path);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&mods)?);
            } else {
                print!("{}", render::mod_list(&mods));
            }
            return Ok(());
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print!("{}", render::session_view(&view));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_exit_codes() {
        let usage = anyhow::Error::new(UsageError("missing --yes"));
        assert_eq!(exit_code(&usage), 2);

        let invalid = anyhow::Error::new(modeckycore::Error::InvalidPath(PathBuf::from("/x")));
        assert_eq!(exit_code(&invalid), 2);

        let store = anyhow::Error::new(modeckycore::Error::Poisoned);
        assert_eq!(exit_code(&store), 1);

        let other = anyhow::anyhow!("open state").context("outer");
        assert_eq!(exit_code(&other), 1);
    }

    #[test]
    fn test_unmanage_without_confirmation_is_usage_error() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = tmp.path().join("settings.json");
        let state = tmp.path().join("state.json");
        let cli = Cli::try_parse_from([
            "modeckyctl",
            "--settings",
            settings.to_str().unwrap(),
            "--state",
            state.to_str().unwrap(),
            "unmanage",
            "--app-id",
            "7",
        ])
        .unwrap();
        let err = run(&cli).unwrap_err();
        assert_eq!(exit_code(&err), 2);
    }
}
