use std::path::{Path, PathBuf};

use futures::future::{FutureExt, LocalBoxFuture};
use snafu::{ResultExt, Snafu};
use tracing::debug;

use crate::comparator::{ComparisonError, files_equal};
use crate::ext::BestEffortPathExt;
use crate::reconciler::{
    CopyError, DirListing, EntryKind, LinkPolicy, PassSummary, SyncAction, SyncEvent,
    SyncReporter, copy_preserving_metadata, remove_tree, replace_preserving_metadata,
};

/// Makes a replica directory match a source directory.
///
/// Every action and every failure goes to the injected [`SyncReporter`].
/// Failures are contained to the entry (or subtree) they happened on; the rest
/// of the pass carries on.
pub struct Reconciler<R> {
    reporter: R,
}

impl<R: SyncReporter> Reconciler<R> {
    pub fn new(reporter: R) -> Self {
        Self { reporter }
    }

    #[cfg(test)]
    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Runs one full pass. `replica` must already exist.
    pub async fn reconcile(&self, source: &Path, replica: &Path) -> PassSummary {
        let mut summary = PassSummary::default();
        self.reconcile_dir(source, replica, &mut summary).await;
        summary
    }

    fn emit(&self, summary: &mut PassSummary, event: SyncEvent) {
        summary.record(&event);
        self.reporter.report(event);
    }

    fn reconcile_dir<'a>(
        &'a self,
        source_dir: &'a Path,
        replica_dir: &'a Path,
        summary: &'a mut PassSummary,
    ) -> LocalBoxFuture<'a, ()> {
        async move {
            let source_entries = match DirListing::read(source_dir, LinkPolicy::Follow)
                .context(ListSnafu { path: source_dir })
            {
                Ok(listing) => listing,
                Err(error) => return self.emit(summary, SyncEvent::failed(source_dir, error)),
            };
            let replica_entries = match DirListing::read(replica_dir, LinkPolicy::NoFollow)
                .context(ListSnafu { path: replica_dir })
            {
                Ok(listing) => listing,
                Err(error) => return self.emit(summary, SyncEvent::failed(replica_dir, error)),
            };
            if source_entries.is_empty() && replica_entries.is_empty() {
                return;
            }
            debug!(
                "Reconciling {} ({} entries) into {} ({} entries)",
                source_dir.display(),
                source_entries.len(),
                replica_dir.display(),
                replica_entries.len()
            );

            for (name, kind) in source_entries.iter() {
                let source_path = source_dir.join(name);
                let replica_path = replica_dir.join(name);
                let existing = replica_entries.get(name);

                match kind {
                    EntryKind::Directory => {
                        self.sync_directory(&source_path, &replica_path, existing, summary)
                            .await
                    }
                    EntryKind::File => {
                        self.sync_file(&source_path, &replica_path, existing, summary)
                            .await
                    }
                    EntryKind::Other => self.emit(
                        summary,
                        SyncEvent::failed(
                            &source_path,
                            ReconcileError::UnsupportedKind { path: source_path.clone() },
                        ),
                    ),
                }
            }

            for (name, kind) in replica_entries.iter() {
                if !source_entries.contains(name) {
                    self.remove_entry(&replica_dir.join(name), kind, summary).await;
                }
            }
        }
        .boxed_local()
    }

    async fn sync_directory(
        &self,
        source_path: &Path,
        replica_path: &Path,
        existing: Option<EntryKind>,
        summary: &mut PassSummary,
    ) {
        match existing {
            Some(EntryKind::Directory) => {}
            None => match compio::fs::create_dir(replica_path)
                .await
                .context(CreateDirSnafu { path: replica_path })
            {
                Ok(()) => self.emit(
                    summary,
                    SyncEvent::applied(SyncAction::Create, EntryKind::Directory, replica_path),
                ),
                Err(error) => return self.emit(summary, SyncEvent::failed(replica_path, error)),
            },
            Some(replica_kind) => {
                let error = ReconcileError::KindConflict {
                    path: replica_path.to_path_buf(),
                    source_kind: EntryKind::Directory,
                    replica_kind,
                };
                return self.emit(summary, SyncEvent::failed(replica_path, error));
            }
        }

        self.reconcile_dir(source_path, replica_path, summary).await;
    }

    async fn sync_file(
        &self,
        source_path: &Path,
        replica_path: &Path,
        existing: Option<EntryKind>,
        summary: &mut PassSummary,
    ) {
        let outcome = match existing {
            None => copy_preserving_metadata(source_path, replica_path)
                .await
                .map(|_| Some(SyncAction::Create))
                .context(CopySnafu),
            Some(EntryKind::Directory) => Err(ReconcileError::KindConflict {
                path: replica_path.to_path_buf(),
                source_kind: EntryKind::File,
                replica_kind: EntryKind::Directory,
            }),
            Some(replica_kind) => self.refresh_file(source_path, replica_path, replica_kind).await,
        };

        match outcome {
            Ok(Some(action)) => self.emit(
                summary,
                SyncEvent::applied(action, EntryKind::File, replica_path),
            ),
            Ok(None) => debug!("{} is up to date", replica_path.display()),
            Err(error) => self.emit(summary, SyncEvent::failed(replica_path, error)),
        }
    }

    /// Rewrites `replica_path` from `source_path` unless both files are equal.
    async fn refresh_file(
        &self,
        source_path: &Path,
        replica_path: &Path,
        replica_kind: EntryKind,
    ) -> Result<Option<SyncAction>, ReconcileError> {
        if replica_kind == EntryKind::File {
            let equal = files_equal(source_path, replica_path)
                .await
                .context(CompareSnafu { path: replica_path })?;
            if equal {
                return Ok(None);
            }
        }

        replace_preserving_metadata(source_path, replica_path)
            .await
            .context(CopySnafu)?;

        Ok(Some(SyncAction::Update))
    }

    async fn remove_entry(&self, replica_path: &Path, kind: EntryKind, summary: &mut PassSummary) {
        if kind == EntryKind::Directory {
            // The directory's own failure, if any, is among these.
            let failures = remove_tree(replica_path).await;
            let removed = !failures.iter().any(|error| {
                matches!(error, ReconcileError::RemoveDirError { path, .. } if path == replica_path)
            });
            for error in failures {
                let path = error.path().to_path_buf();
                self.emit(summary, SyncEvent::failed(&path, error));
            }
            if removed {
                self.emit(
                    summary,
                    SyncEvent::applied(SyncAction::Remove, kind, replica_path),
                );
            }
            return;
        }

        match compio::fs::remove_file(replica_path)
            .await
            .context(RemoveFileSnafu { path: replica_path })
        {
            Ok(()) => self.emit(
                summary,
                SyncEvent::applied(SyncAction::Remove, kind, replica_path),
            ),
            Err(error) => self.emit(summary, SyncEvent::failed(replica_path, error)),
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ReconcileError {
    #[snafu(display("Failed to list {}", path.best_effort_path_display()))]
    ListError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to create directory {}", path.best_effort_path_display()))]
    CreateDirError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to copy file"))]
    CopyError { source: CopyError },
    #[snafu(display("Failed to compare {} with its source", path.best_effort_path_display()))]
    CompareError {
        path: PathBuf,
        source: ComparisonError,
    },
    #[snafu(display("Failed to remove file {}", path.best_effort_path_display()))]
    RemoveFileError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to remove directory {}", path.best_effort_path_display()))]
    RemoveDirError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "{} is a {} in the source but a {} in the replica",
        path.best_effort_path_display(),
        source_kind,
        replica_kind
    ))]
    KindConflict {
        path: PathBuf,
        source_kind: EntryKind,
        replica_kind: EntryKind,
    },
    #[snafu(display(
        "{} is neither a regular file nor a directory",
        path.best_effort_path_display()
    ))]
    UnsupportedKind { path: PathBuf },
}

impl ReconcileError {
    /// The underlying I/O failure, if this error came from the filesystem.
    pub fn io_error(&self) -> Option<&std::io::Error> {
        match self {
            ReconcileError::ListError { source, .. }
            | ReconcileError::CreateDirError { source, .. }
            | ReconcileError::RemoveFileError { source, .. }
            | ReconcileError::RemoveDirError { source, .. } => Some(source),
            ReconcileError::CopyError { source } => Some(source.io_error()),
            ReconcileError::CompareError { source, .. } => Some(source.io_error()),
            ReconcileError::KindConflict { .. } | ReconcileError::UnsupportedKind { .. } => None,
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        self.io_error()
            .is_some_and(|error| error.kind() == std::io::ErrorKind::PermissionDenied)
    }

    /// The entry this error is about.
    pub fn path(&self) -> &Path {
        match self {
            ReconcileError::ListError { path, .. }
            | ReconcileError::CreateDirError { path, .. }
            | ReconcileError::CompareError { path, .. }
            | ReconcileError::RemoveFileError { path, .. }
            | ReconcileError::RemoveDirError { path, .. }
            | ReconcileError::KindConflict { path, .. }
            | ReconcileError::UnsupportedKind { path } => path,
            ReconcileError::CopyError { source } => source.path(),
        }
    }
}
