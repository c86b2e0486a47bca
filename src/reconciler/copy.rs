use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use compio::BufResult;
use compio::fs::File;
use compio::io::{AsyncReadAt, AsyncWriteAtExt};
use filetime::FileTime;
use snafu::{ResultExt, Snafu};
use tracing::debug;

use crate::comparator::DIGEST_CHUNK_SIZE;
use crate::ext::BestEffortPathExt;

/// Copies `from` to `to`, then carries over permission bits and timestamps so
/// the copy compares equal to its source on the next pass.
///
/// Returns the number of bytes copied.
pub async fn copy_preserving_metadata(from: &Path, to: &Path) -> Result<u64, CopyError> {
    let metadata = fs::metadata(from).context(SourceMetadataSnafu {
        path: from.to_path_buf(),
    })?;

    let copied = {
        let source = File::open(from).await.context(OpenSourceSnafu {
            path: from.to_path_buf(),
        })?;
        let mut destination = File::create(to).await.context(CreateDestinationSnafu {
            path: to.to_path_buf(),
        })?;

        let mut buffer = Vec::with_capacity(DIGEST_CHUNK_SIZE);
        let mut position = 0u64;
        loop {
            buffer.clear();
            let BufResult(read, returned) = source.read_at(buffer, position).await;
            buffer = returned;
            let read = read.context(ReadSnafu {
                path: from.to_path_buf(),
            })?;
            if read == 0 {
                break;
            }

            let BufResult(written, returned) = destination.write_all_at(buffer, position).await;
            buffer = returned;
            written.context(WriteSnafu {
                path: to.to_path_buf(),
            })?;
            position += read as u64;
        }
        position
    };

    // Timestamps go last; any later write to the file would bump its mtime.
    fs::set_permissions(to, metadata.permissions()).context(PreserveMetadataSnafu {
        path: to.to_path_buf(),
    })?;
    filetime::set_file_times(
        to,
        FileTime::from_last_access_time(&metadata),
        FileTime::from_last_modification_time(&metadata),
    )
    .context(PreserveMetadataSnafu {
        path: to.to_path_buf(),
    })?;

    debug!(
        "Copied {copied} bytes from {} to {}",
        from.display(),
        to.display()
    );
    Ok(copied)
}

/// Sibling of `to` that an update is written to before it replaces `to`.
pub fn staging_path(to: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(to.file_name().unwrap_or_default());
    name.push(".dirmirror-partial");
    to.with_file_name(name)
}

/// Rewrites `to` from `from`, leaving `to` untouched until the new copy is
/// complete.
///
/// The copy is staged next to `to` and renamed over it. A failed copy keeps the
/// previous content; a read-only file or a link at `to` is replaced, never
/// written through.
pub async fn replace_preserving_metadata(from: &Path, to: &Path) -> Result<u64, CopyError> {
    let staged = staging_path(to);
    let result = async {
        let copied = copy_preserving_metadata(from, &staged).await?;
        compio::fs::rename(&staged, to).await.context(RenameSnafu {
            path: to.to_path_buf(),
        })?;
        Ok::<_, CopyError>(copied)
    }
    .await;

    if result.is_err() {
        discard_staged(&staged).await;
    }
    result
}

async fn discard_staged(staged: &Path) {
    match compio::fs::remove_file(staged).await {
        Ok(()) => debug!("Discarded partial copy {}", staged.display()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => debug!("Could not discard {}: {error}", staged.display()),
    }
}

#[derive(Debug, Snafu)]
pub enum CopyError {
    #[snafu(display("Failed to read metadata of {}", path.best_effort_path_display()))]
    SourceMetadataError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to open {} for copying", path.best_effort_path_display()))]
    OpenSourceError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to create {}", path.best_effort_path_display()))]
    CreateDestinationError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to read from {}", path.best_effort_path_display()))]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to write to {}", path.best_effort_path_display()))]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "Failed to preserve permissions and timestamps on {}",
        path.best_effort_path_display()
    ))]
    PreserveMetadataError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "Failed to move the new copy into place at {}",
        path.best_effort_path_display()
    ))]
    RenameError {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl CopyError {
    pub fn io_error(&self) -> &std::io::Error {
        match self {
            CopyError::SourceMetadataError { source, .. }
            | CopyError::OpenSourceError { source, .. }
            | CopyError::CreateDestinationError { source, .. }
            | CopyError::ReadError { source, .. }
            | CopyError::WriteError { source, .. }
            | CopyError::PreserveMetadataError { source, .. }
            | CopyError::RenameError { source, .. } => source,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            CopyError::SourceMetadataError { path, .. }
            | CopyError::OpenSourceError { path, .. }
            | CopyError::CreateDestinationError { path, .. }
            | CopyError::ReadError { path, .. }
            | CopyError::WriteError { path, .. }
            | CopyError::PreserveMetadataError { path, .. }
            | CopyError::RenameError { path, .. } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::{Comparison, compare};
    use filetime::set_file_mtime;
    use tempfile::TempDir;

    #[compio::test]
    async fn copy_replicates_content_and_mtime() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("from.txt");
        let to = dir.path().join("to.txt");
        fs::write(&from, "payload").unwrap();
        set_file_mtime(&from, FileTime::from_unix_time(1_600_000_000, 123_000_000)).unwrap();

        let copied = copy_preserving_metadata(&from, &to).await.unwrap();

        assert_eq!(copied, 7);
        assert_eq!(fs::read_to_string(&to).unwrap(), "payload");
        assert_eq!(
            fs::metadata(&to).unwrap().modified().unwrap(),
            fs::metadata(&from).unwrap().modified().unwrap()
        );
        assert_eq!(compare(&from, &to).await.unwrap(), Comparison::Equal);
    }

    #[compio::test]
    async fn copy_truncates_longer_destination() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("from.txt");
        let to = dir.path().join("to.txt");
        fs::write(&from, "y").unwrap();
        fs::write(&to, "a much longer previous body").unwrap();

        copy_preserving_metadata(&from, &to).await.unwrap();

        assert_eq!(fs::read_to_string(&to).unwrap(), "y");
    }

    #[compio::test]
    async fn copy_handles_multi_chunk_and_empty_files() {
        let dir = TempDir::new().unwrap();
        let big = dir.path().join("big.bin");
        let empty = dir.path().join("empty.bin");
        let content: Vec<u8> = (0..DIGEST_CHUNK_SIZE * 2 + 5).map(|i| (i % 7) as u8).collect();
        fs::write(&big, &content).unwrap();
        fs::write(&empty, b"").unwrap();

        copy_preserving_metadata(&big, &dir.path().join("big.copy"))
            .await
            .unwrap();
        let copied_empty = copy_preserving_metadata(&empty, &dir.path().join("empty.copy"))
            .await
            .unwrap();

        assert_eq!(fs::read(dir.path().join("big.copy")).unwrap(), content);
        assert_eq!(copied_empty, 0);
        assert!(dir.path().join("empty.copy").exists());
    }

    #[cfg(unix)]
    #[compio::test]
    async fn copy_preserves_permission_bits() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let from = dir.path().join("script.sh");
        let to = dir.path().join("script.copy");
        fs::write(&from, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&from, fs::Permissions::from_mode(0o750)).unwrap();

        copy_preserving_metadata(&from, &to).await.unwrap();

        let mode = fs::metadata(&to).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o750);
    }

    #[compio::test]
    async fn missing_source_is_reported_with_its_path() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("missing.txt");

        let error = copy_preserving_metadata(&from, &dir.path().join("to.txt"))
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            CopyError::SourceMetadataError { ref path, .. } if *path == from
        ));
        assert_eq!(error.io_error().kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn staging_path_is_a_hidden_sibling() {
        assert_eq!(
            staging_path(Path::new("replica/dir/a.txt")),
            PathBuf::from("replica/dir/.a.txt.dirmirror-partial")
        );
    }

    #[cfg(unix)]
    #[compio::test]
    async fn replace_overwrites_read_only_target() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let from = dir.path().join("from.txt");
        let to = dir.path().join("to.txt");
        fs::write(&from, "fresh").unwrap();
        fs::write(&to, "stale").unwrap();
        fs::set_permissions(&to, fs::Permissions::from_mode(0o444)).unwrap();

        replace_preserving_metadata(&from, &to).await.unwrap();

        assert_eq!(fs::read_to_string(&to).unwrap(), "fresh");
        assert!(!staging_path(&to).exists());
        assert_eq!(compare(&from, &to).await.unwrap(), Comparison::Equal);
    }

    #[compio::test]
    async fn failed_replace_keeps_previous_content() {
        let dir = TempDir::new().unwrap();
        let to = dir.path().join("to.txt");
        fs::write(&to, "previous").unwrap();

        let error = replace_preserving_metadata(&dir.path().join("missing.txt"), &to)
            .await
            .unwrap_err();

        assert!(matches!(error, CopyError::SourceMetadataError { .. }));
        assert_eq!(fs::read_to_string(&to).unwrap(), "previous");
        assert!(!staging_path(&to).exists());
    }

    #[compio::test]
    async fn blocked_staging_keeps_previous_content() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("from.txt");
        let to = dir.path().join("to.txt");
        fs::write(&from, "fresh").unwrap();
        fs::write(&to, "previous").unwrap();
        // A directory squatting on the staging name makes the copy fail.
        fs::create_dir(staging_path(&to)).unwrap();

        let error = replace_preserving_metadata(&from, &to).await.unwrap_err();

        assert!(matches!(error, CopyError::CreateDestinationError { .. }));
        assert_eq!(fs::read_to_string(&to).unwrap(), "previous");
    }
}
