//! Drives one directory tree toward another, one directory level at a time.

mod copy;
mod entry;
#[allow(clippy::module_inception)]
mod reconciler;
mod removal;
mod report;

pub use copy::{CopyError, copy_preserving_metadata, replace_preserving_metadata};
pub use entry::{DirListing, EntryKind, LinkPolicy};
pub use reconciler::{ReconcileError, Reconciler};
pub use removal::remove_tree;
pub use report::{PassSummary, SyncAction, SyncEvent, SyncReporter, TracingReporter};

#[cfg(test)]
pub use copy::staging_path;
#[cfg(test)]
pub use report::{RecordingReporter, Severity};
