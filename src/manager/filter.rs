//! Mapping store change events onto configuration actions.

use crate::store::{is_within, join, ChangeEvent, ChangeType};

/// Relative location of configuration keys below an application node.
pub const CONFIG_REL_PATH: [&str; 2] = ["config", "rewriter"];

/// What a change means for the configuration state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Reload the key at `path`.
    Update { path: String },
    /// Drop the entry read from `path`.
    Remove { path: String },
    /// Drop every entry at or beneath `path`.
    Cascade { path: String },
    /// Discover keys at or beneath `path` again.
    Rescan { path: String },
}

/// Index of the first search path containing `path`.
pub fn root_index(search_paths: &[String], path: &str) -> Option<usize> {
    search_paths.iter().position(|root| is_within(path, root))
}

/// Classify a change, `None` when it cannot affect any configuration.
///
/// Relevant paths have the shape `{root}/{app}/config/rewriter/{key}`.
/// Anything deeper belongs to a component option node and reloads its key.
/// Removing an ancestor of keys cascades; adding or changing one rescans it.
pub fn classify(search_paths: &[String], event: &ChangeEvent) -> Option<Action> {
    let root = &search_paths[root_index(search_paths, &event.path)?];
    let relative = event.path[root.len()..].trim_start_matches('/');
    let segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();

    // segments after the app name must follow config/rewriter
    let shape_ok = segments
        .iter()
        .skip(1)
        .zip(CONFIG_REL_PATH.iter())
        .all(|(segment, expected)| segment == expected);
    if !shape_ok {
        return None;
    }

    let key_depth = 1 + CONFIG_REL_PATH.len() + 1;
    if segments.len() < key_depth {
        let path = event.path.clone();
        return Some(match event.change {
            ChangeType::Removed => Action::Cascade { path },
            ChangeType::Added | ChangeType::Changed => Action::Rescan { path },
        });
    }

    let key_path = segments[..key_depth]
        .iter()
        .fold(root.clone(), |acc, segment| join(&acc, segment));
    if segments.len() > key_depth {
        return Some(Action::Update { path: key_path });
    }
    Some(match event.change {
        ChangeType::Removed => Action::Remove { path: key_path },
        ChangeType::Added | ChangeType::Changed => Action::Update { path: key_path },
    })
}
