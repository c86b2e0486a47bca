use std::path::{Component, Path, PathBuf};

/// Renders `path` as an absolute, normalized path without requiring it to exist.
///
/// Only the parent is resolved, so a symbolic link is shown by its own name.
pub fn best_effort_path_display(path: &Path) -> String {
    let absolute_path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(current_dir) => current_dir.join(path),
            Err(_) => path.to_path_buf(),
        }
    };
    let normalized = normalize_path(&absolute_path);

    let canonical_parent = normalized.parent().and_then(|parent| parent.canonicalize().ok());
    match (canonical_parent, normalized.file_name()) {
        (Some(parent), Some(name)) => parent.join(name).display().to_string(),
        _ => normalized.display().to_string(),
    }
}

fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !components.is_empty() && !matches!(components.last(), Some(Component::RootDir))
                {
                    components.pop();
                }
            }
            _ => components.push(component),
        }
    }

    components.iter().collect()
}

pub trait BestEffortPathExt {
    fn best_effort_path_display(&self) -> String;
}

impl BestEffortPathExt for Path {
    fn best_effort_path_display(&self) -> String {
        best_effort_path_display(self)
    }
}

impl BestEffortPathExt for PathBuf {
    fn best_effort_path_display(&self) -> String {
        best_effort_path_display(self)
    }
}
