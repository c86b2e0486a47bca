use std::fs;
use std::path::Path;

use futures::future::{FutureExt, LocalBoxFuture};
use snafu::ResultExt;
use tracing::debug;

use crate::reconciler::ReconcileError;
use crate::reconciler::reconciler::{ListSnafu, RemoveDirSnafu, RemoveFileSnafu};

/// Removes `dir` and everything below it, children first.
///
/// A child that cannot be removed does not stop its siblings, and `dir` itself
/// is still attempted once all children have been visited. Every failure is
/// returned; an empty result means the whole subtree is gone.
pub async fn remove_tree(dir: &Path) -> Vec<ReconcileError> {
    let mut failures = Vec::new();
    remove_tree_into(dir, &mut failures).await;
    failures
}

fn remove_tree_into<'a>(
    dir: &'a Path,
    failures: &'a mut Vec<ReconcileError>,
) -> LocalBoxFuture<'a, ()> {
    async move {
        match fs::read_dir(dir) {
            Ok(entries) => {
                for entry in entries {
                    let entry = match entry.context(ListSnafu { path: dir }) {
                        Ok(entry) => entry,
                        Err(error) => {
                            failures.push(error);
                            continue;
                        }
                    };
                    let child = entry.path();
                    let is_dir = entry
                        .file_type()
                        .map(|file_type| file_type.is_dir())
                        .unwrap_or(false);

                    if is_dir {
                        remove_tree_into(&child, failures).await;
                    } else {
                        match compio::fs::remove_file(&child)
                            .await
                            .context(RemoveFileSnafu { path: &child })
                        {
                            Ok(()) => debug!("Removed {}", child.display()),
                            Err(error) => failures.push(error),
                        }
                    }
                }
            }
            Err(error) => failures.push(ReconcileError::ListError {
                path: dir.to_path_buf(),
                source: error,
            }),
        }

        match compio::fs::remove_dir(dir)
            .await
            .context(RemoveDirSnafu { path: dir })
        {
            Ok(()) => debug!("Removed {}", dir.display()),
            Err(error) => failures.push(error),
        }
    }
    .boxed_local()
}
