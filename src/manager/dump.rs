//! Plain-text rendering of the configuration state for diagnostics.

use crate::manager::entries::{ConfigEntry, EntryTable};

const RULE: &str = "=================================================================";
const SUB_RULE: &str = "-----------------------------------------------------------------";

/// Render every active key with its winning and overridden entries,
/// followed by the keys that are known but not active.
pub fn render(table: &EntryTable, search_paths: &[String]) -> String {
    let mut out = String::new();
    out.push_str("Current Content Rewriter Configuration\n");
    out.push_str(RULE);
    out.push('\n');
    out.push_str(&format!("Search paths : {}\n\n", search_paths.join(", ")));

    out.push_str("Active Configurations\n");
    out.push_str(SUB_RULE);
    out.push('\n');
    let active: Vec<&str> = table.active_keys().collect();
    for key in &active {
        render_key(&mut out, key, table.entries(key));
    }

    let inactive: Vec<(&str, &[ConfigEntry])> = table
        .iter()
        .filter(|(key, _)| !active.contains(key))
        .collect();
    if !inactive.is_empty() {
        out.push_str("Inactive Configurations\n");
        out.push_str(SUB_RULE);
        out.push('\n');
        for (key, entries) in inactive {
            render_key(&mut out, key, entries);
        }
    }
    out
}

fn render_key(out: &mut String, key: &str, entries: &[ConfigEntry]) {
    let Some((top, overridden)) = entries.split_first() else {
        return;
    };
    out.push_str(&format!("Configuration {key}\n\n"));
    top.config.print(out);
    out.push_str(&format!("Resource path: {}\n", top.path));
    if !overridden.is_empty() {
        out.push_str("Overriding configurations from the following resource paths:\n");
        for entry in overridden {
            out.push_str(&format!("- {}\n", entry.path));
        }
    }
    out.push_str("\n\n");
}
