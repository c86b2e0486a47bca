use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

use derive_more::Display;
use tracing::{error, info};

use crate::reconciler::{EntryKind, ReconcileError};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    #[display("Creating")]
    Create,
    #[display("Updating")]
    Update,
    #[display("Removing")]
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

/// One attempted action on the replica tree, successful or not.
#[derive(Debug)]
pub enum SyncEvent {
    Applied {
        action: SyncAction,
        kind: EntryKind,
        path: PathBuf,
    },
    Failed {
        path: PathBuf,
        error: ReconcileError,
    },
}

impl SyncEvent {
    pub fn applied(action: SyncAction, kind: EntryKind, path: &Path) -> Self {
        SyncEvent::Applied {
            action,
            kind,
            path: path.to_path_buf(),
        }
    }

    pub fn failed(path: &Path, error: ReconcileError) -> Self {
        SyncEvent::Failed {
            path: path.to_path_buf(),
            error,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            SyncEvent::Applied { .. } => Severity::Info,
            SyncEvent::Failed { .. } => Severity::Error,
        }
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        match self {
            SyncEvent::Applied { path, .. } | SyncEvent::Failed { path, .. } => path,
        }
    }
}

impl fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncEvent::Applied { action, kind, path } => {
                write!(f, "{action} {kind}: {}", path.display())
            }
            SyncEvent::Failed { path, error } => {
                if error.is_permission_denied() {
                    write!(f, "Permission denied for {}: ", path.display())?;
                } else {
                    write!(f, "Failed to sync {}: ", path.display())?;
                }
                write_error_chain(f, error)
            }
        }
    }
}

fn write_error_chain(f: &mut fmt::Formatter<'_>, error: &dyn Error) -> fmt::Result {
    write!(f, "{error}")?;
    let mut source = error.source();
    while let Some(cause) = source {
        write!(f, ": {cause}")?;
        source = cause.source();
    }
    Ok(())
}

/// Sink for the records a reconciliation pass produces.
pub trait SyncReporter {
    fn report(&self, event: SyncEvent);
}

/// Writes every event through `tracing`; actions at info, failures at error.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl SyncReporter for TracingReporter {
    fn report(&self, event: SyncEvent) {
        match event.severity() {
            Severity::Info => info!("{event}"),
            Severity::Error => error!("{event}"),
        }
    }
}

/// Per-pass action counts.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq)]
#[display("{created} created, {updated} updated, {removed} removed, {failed} failed")]
pub struct PassSummary {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
    pub failed: usize,
}

impl PassSummary {
    pub fn record(&mut self, event: &SyncEvent) {
        match event {
            SyncEvent::Applied { action, .. } => match action {
                SyncAction::Create => self.created += 1,
                SyncAction::Update => self.updated += 1,
                SyncAction::Remove => self.removed += 1,
            },
            SyncEvent::Failed { .. } => self.failed += 1,
        }
    }

    pub fn is_noop(&self) -> bool {
        *self == PassSummary::default()
    }
}

/// Keeps every event in memory for inspection.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: std::cell::RefCell<Vec<SyncEvent>>,
}

#[cfg(test)]
impl RecordingReporter {
    pub fn take(&self) -> Vec<SyncEvent> {
        self.events.take()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events.borrow().iter().map(ToString::to_string).collect()
    }
}

#[cfg(test)]
impl SyncReporter for RecordingReporter {
    fn report(&self, event: SyncEvent) {
        self.events.borrow_mut().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn applied_event_names_action_kind_and_path() {
        let path = Path::new("replica/a.txt");
        let event = SyncEvent::applied(SyncAction::Create, EntryKind::File, path);
        assert_eq!(event.to_string(), "Creating file: replica/a.txt");
        assert_eq!(event.severity(), Severity::Info);
    }

    #[test]
    fn permission_failures_are_called_out() {
        let error = ReconcileError::RemoveFileError {
            path: PathBuf::from("replica/locked.txt"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        let event = SyncEvent::failed(Path::new("replica/locked.txt"), error);

        let message = event.to_string();
        assert!(message.starts_with("Permission denied for replica/locked.txt"));
        assert_eq!(event.severity(), Severity::Error);
    }

    #[test]
    fn failure_message_includes_cause_chain() {
        let error = ReconcileError::CreateDirError {
            path: PathBuf::from("replica/dir"),
            source: io::Error::other("disk on fire"),
        };
        let message = SyncEvent::failed(Path::new("replica/dir"), error).to_string();

        assert!(message.starts_with("Failed to sync replica/dir: "));
        assert!(message.ends_with(": disk on fire"));
    }

    #[test]
    fn summary_counts_each_event() {
        let mut summary = PassSummary::default();
        assert!(summary.is_noop());

        summary.record(&SyncEvent::applied(SyncAction::Create, EntryKind::File, Path::new("a")));
        summary.record(&SyncEvent::applied(SyncAction::Update, EntryKind::File, Path::new("b")));
        summary.record(&SyncEvent::applied(
            SyncAction::Remove,
            EntryKind::Directory,
            Path::new("c"),
        ));
        summary.record(&SyncEvent::failed(
            Path::new("d"),
            ReconcileError::UnsupportedKind {
                path: PathBuf::from("d"),
            },
        ));

        assert_eq!(summary.to_string(), "1 created, 1 updated, 1 removed, 1 failed");
        assert!(!summary.is_noop());
    }
}
