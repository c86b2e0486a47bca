use std::path::{Path, PathBuf};

use derive_more::Display;
use snafu::{ResultExt, Snafu};
use tracing::debug;

use crate::comparator::{DigestError, FileDigest};
use crate::ext::{AsyncTryFrom, BestEffortPathExt};

/// Outcome of comparing two regular files.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    #[display("equal")]
    Equal,
    #[display("sizes differ")]
    SizeDiffers,
    #[display("modification times differ")]
    ModifiedTimeDiffers,
    #[display("contents differ")]
    ContentDiffers,
}

impl Comparison {
    pub fn is_equal(&self) -> bool {
        matches!(self, Comparison::Equal)
    }
}

/// Compares two files, stopping at the first check that tells them apart.
///
/// A modification time mismatch is reported as a difference even when the
/// contents happen to be identical.
pub async fn compare(first: &Path, second: &Path) -> Result<Comparison, ComparisonError> {
    let first_metadata = first.metadata().context(MetadataSnafu {
        path: first.to_path_buf(),
    })?;
    let second_metadata = second.metadata().context(MetadataSnafu {
        path: second.to_path_buf(),
    })?;

    if first_metadata.len() != second_metadata.len() {
        return Ok(Comparison::SizeDiffers);
    }

    let first_modified = first_metadata.modified().context(MetadataSnafu {
        path: first.to_path_buf(),
    })?;
    let second_modified = second_metadata.modified().context(MetadataSnafu {
        path: second.to_path_buf(),
    })?;
    if first_modified != second_modified {
        return Ok(Comparison::ModifiedTimeDiffers);
    }

    let first_digest = FileDigest::async_try_from(first).await.context(DigestSnafu)?;
    let second_digest = FileDigest::async_try_from(second)
        .await
        .context(DigestSnafu)?;
    debug!(
        "Digests for {} and {}: {first_digest} / {second_digest}",
        first.display(),
        second.display()
    );

    if first_digest == second_digest {
        Ok(Comparison::Equal)
    } else {
        Ok(Comparison::ContentDiffers)
    }
}

pub async fn files_equal(first: &Path, second: &Path) -> Result<bool, ComparisonError> {
    let comparison = compare(first, second).await?;
    if !comparison.is_equal() {
        debug!(
            "{} and {} are not equal: {comparison}",
            first.display(),
            second.display()
        );
    }
    Ok(comparison.is_equal())
}

#[derive(Debug, Snafu)]
pub enum ComparisonError {
    #[snafu(display("Failed to read metadata of {}", path.best_effort_path_display()))]
    MetadataError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to compute content digest"))]
    DigestError { source: DigestError },
}

impl ComparisonError {
    pub fn io_error(&self) -> &std::io::Error {
        match self {
            ComparisonError::MetadataError { source, .. } => source,
            ComparisonError::DigestError { source } => source.io_error(),
        }
    }
}
