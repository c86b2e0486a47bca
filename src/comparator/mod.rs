//! Decides whether a source file and its replica counterpart are identical.
//!
//! Checks run cheapest first: size, then modification time, then a streamed
//! content digest of both files.

mod content_comparator;
mod file_digest;

pub use content_comparator::{Comparison, ComparisonError, compare, files_equal};
pub use file_digest::{DIGEST_CHUNK_SIZE, DigestError, FileDigest};
