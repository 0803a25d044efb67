//! Plain-text rendering of the settings panel.

use std::fmt::Write as _;

use client_core::SettingsView;

pub fn render_view(view: &SettingsView) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Add user");
    let _ = writeln!(out, "  > {}", view.query);
    if let Some(error) = &view.error {
        let _ = writeln!(out, "  ! {error}");
    }

    let _ = writeln!(out);
    if view.entries.is_empty() && !view.loading {
        let _ = writeln!(out, "  (no watched users)");
    }
    for entry in &view.entries {
        let _ = write!(out, "  [{}] {}", entry.index, entry.username);
        if let Some(picture) = &entry.picture {
            let _ = write!(out, " <{picture}>");
        }
        let _ = writeln!(out);
    }
    if view.loading {
        let _ = writeln!(out, "  Loading information...");
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Design");
    let _ = writeln!(
        out,
        "  [{}] Use a minimal design",
        if view.minimal { "x" } else { " " }
    );

    out
}
