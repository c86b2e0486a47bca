use std::hash::Hasher;
use std::path::{Path, PathBuf};

use compio::BufResult;
use compio::fs::File;
use compio::io::AsyncReadAt;
use derive_more::Display;
use metrohash::MetroHash64;
use snafu::{ResultExt, Snafu};

use crate::ext::{AsyncTryFrom, BestEffortPathExt};

/// Size of each read while streaming a file through the hasher.
pub const DIGEST_CHUNK_SIZE: usize = 8 * 1024;

/// Fingerprint of a file's full byte content.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display("{_0:016x}")]
pub struct FileDigest(u64);

#[cfg(test)]
impl FileDigest {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut hasher = MetroHash64::default();
        hasher.write(bytes);
        FileDigest(hasher.finish())
    }
}

impl AsyncTryFrom<&Path> for FileDigest {
    type Error = DigestError;

    async fn async_try_from(path: &Path) -> Result<Self, Self::Error> {
        let file = File::open(path).await.context(OpenSnafu {
            path: path.to_path_buf(),
        })?;

        let mut hasher = MetroHash64::default();
        let mut buffer = Vec::with_capacity(DIGEST_CHUNK_SIZE);
        let mut position = 0u64;

        loop {
            buffer.clear();
            let BufResult(read, returned) = file.read_at(buffer, position).await;
            buffer = returned;
            let read = read.context(ReadSnafu {
                path: path.to_path_buf(),
            })?;
            if read == 0 {
                break;
            }

            hasher.write(&buffer[..read]);
            position += read as u64;
        }

        Ok(FileDigest(hasher.finish()))
    }
}

#[derive(Debug, Snafu)]
pub enum DigestError {
    #[snafu(display("Failed to open {} for hashing", path.best_effort_path_display()))]
    OpenError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to read {} while hashing", path.best_effort_path_display()))]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl DigestError {
    pub fn io_error(&self) -> &std::io::Error {
        match self {
            DigestError::OpenError { source, .. } | DigestError::ReadError { source, .. } => source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[rstest]
    #[case(b"")]
    #[case(b"x")]
    #[case("special chars: äöü🚀".as_bytes())]
    #[case(b"multiline\ncontent\nwith\nnewlines")]
    #[compio::test]
    async fn streamed_digest_matches_in_memory_digest(#[case] content: &[u8]) {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        temp_file.write_all(content).expect("Failed to write to temp file");

        let digest = FileDigest::async_try_from(temp_file.path())
            .await
            .expect("Failed to digest file");

        assert_eq!(digest, FileDigest::from_bytes(content));
    }

    #[compio::test]
    async fn digest_spans_multiple_chunks() {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let content: Vec<u8> = (0..DIGEST_CHUNK_SIZE * 3 + 17)
            .map(|i| (i % 251) as u8)
            .collect();
        temp_file.write_all(&content).expect("Failed to write to temp file");

        let digest = FileDigest::async_try_from(temp_file.path())
            .await
            .expect("Failed to digest file");

        assert_eq!(digest, FileDigest::from_bytes(&content));
    }

    #[compio::test]
    async fn different_content_yields_different_digest() {
        let mut first = NamedTempFile::new().expect("Failed to create temp file");
        let mut second = NamedTempFile::new().expect("Failed to create temp file");
        write!(first, "x").expect("Failed to write");
        write!(second, "y").expect("Failed to write");

        let first = FileDigest::async_try_from(first.path()).await.unwrap();
        let second = FileDigest::async_try_from(second.path()).await.unwrap();

        assert_ne!(first, second);
    }

    #[compio::test]
    async fn missing_file_is_an_open_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let missing = temp_dir.path().join("missing.txt");

        let result = FileDigest::async_try_from(missing.as_path()).await;

        match result {
            Err(DigestError::OpenError { path, source }) => {
                assert_eq!(path, missing);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("Expected OpenError, got {other:?}"),
        }
    }

    #[test]
    fn digest_displays_as_fixed_width_hex() {
        let digest = FileDigest(0xab);
        assert_eq!(digest.to_string(), "00000000000000ab");
    }
}
