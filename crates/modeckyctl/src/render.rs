//! Plain-text output.

use std::fmt::Write;

use modeckycore::scanner::ModEntry;
use modeckycore::session::ManagedView;
use modeckycore::SessionView;

pub fn mod_list(mods: &[ModEntry]) -> String {
    let mut out = String::new();
    if mods.is_empty() {
        out.push_str("  (no mods found)\n");
    }
    for m in mods {
        let _ = writeln!(out, "  {:<40} {}", m.id, m.status.label());
    }
    out
}

pub fn session_view(view: &SessionView) -> String {
    match view {
        SessionView::Unmanaged(v) => {
            let mut out = format!("\"{}\" ({}) is not managed\n", v.name, v.key);
            if let Some(path) = &v.suggested_path {
                let note = if v.suggested_path_exists { "" } else { " (not found)" };
                let _ = writeln!(out, "Suggested install path: {}{}", path.display(), note);
            }
            out
        }
        SessionView::Managed(v) => managed(v),
    }
}

fn managed(v: &ManagedView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Modding \"{}\" ({})", v.name, v.key);
    let note = if v.install_path_exists { "" } else { " (not found)" };
    let _ = writeln!(out, "Install path: {}{}", v.install_path.display(), note);

    out.push_str("Mods:\n");
    out.push_str(&mod_list(&v.mods));

    match &v.active_profile {
        Some(active) => {
            let _ = writeln!(out, "Active profile: {}", active.name);
            for (i, entry) in active.load_order.iter().enumerate() {
                let status = entry.status.map(|s| s.label()).unwrap_or("missing");
                let _ = writeln!(out, "  {:>3}. {} [{}]", i + 1, entry.id, status);
            }
        }
        None => out.push_str("Active profile: none\n"),
    }

    if !v.other_profiles.is_empty() {
        let _ = writeln!(out, "Other profiles: {}", v.other_profiles.join(", "));
    }
    out
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use modeckycore::scanner::{ModStatus, PackageKind};
    use modeckycore::session::{ActiveProfileView, LoadOrderEntry, UnmanagedView};
    use modeckycore::TitleKey;

    use super::*;

    #[test]
    fn test_unmanaged() {
        let view = SessionView::Unmanaged(UnmanagedView {
            key: TitleKey::App(100),
            app_id: 100,
            name: "Foo".into(),
            suggested_path: Some(PathBuf::from("/games/foo")),
            suggested_path_exists: false,
        });
        let text = session_view(&view);
        assert!(text.contains("\"Foo\" (app:100) is not managed"));
        assert!(text.contains("/games/foo (not found)"));
    }

    #[test]
    fn test_managed_with_missing_mod() {
        let view = SessionView::Managed(ManagedView {
            key: TitleKey::App(100),
            app_id: 100,
            name: "Foo".into(),
            install_path: PathBuf::from("/games/foo"),
            install_path_exists: true,
            mods: vec![ModEntry {
                id: "ModA".into(),
                path: PathBuf::from("/games/foo/mods/ModA"),
                kind: PackageKind::Directory,
                status: ModStatus::Installed,
            }],
            active_profile: Some(ActiveProfileView {
                name: "Default".into(),
                load_order: vec![
                    LoadOrderEntry {
                        id: "ModA".into(),
                        status: Some(ModStatus::Installed),
                    },
                    LoadOrderEntry {
                        id: "Gone".into(),
                        status: None,
                    },
                ],
            }),
            other_profiles: vec!["Alt".into()],
        });
        let text = session_view(&view);
        assert!(text.contains("Active profile: Default"));
        assert!(text.contains("1. ModA [installed]"));
        assert!(text.contains("2. Gone [missing]"));
        assert!(text.contains("Other profiles: Alt"));
    }

    #[test]
    fn test_empty_mod_list() {
        assert_eq!(mod_list(&[]), "  (no mods found)\n");
    }
}
