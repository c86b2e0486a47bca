use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::Path;

use derive_more::Display;
use tracing::debug;

/// What a directory entry turned out to be when it was listed.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    #[display("directory")]
    Directory,
    #[display("file")]
    File,
    /// Anything that is neither, e.g. sockets, FIFOs, unresolvable links, or
    /// (when links are not followed) symbolic links.
    #[display("special entry")]
    Other,
}

impl EntryKind {
    fn from_file_type(file_type: fs::FileType) -> Self {
        if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        }
    }
}

/// Whether symbolic links are resolved while classifying entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPolicy {
    Follow,
    NoFollow,
}

/// The immediate entries of one directory, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirListing {
    entries: BTreeMap<OsString, EntryKind>,
}

impl DirListing {
    pub fn read(dir: &Path, links: LinkPolicy) -> std::io::Result<Self> {
        let mut entries = BTreeMap::new();

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let kind = match links {
                LinkPolicy::Follow => fs::metadata(entry.path())
                    .map(|metadata| EntryKind::from_file_type(metadata.file_type())),
                LinkPolicy::NoFollow => entry.file_type().map(EntryKind::from_file_type),
            }
            .unwrap_or_else(|error| {
                debug!("Cannot classify {}: {}", entry.path().display(), error);
                EntryKind::Other
            });

            entries.insert(entry.file_name(), kind);
        }

        Ok(DirListing { entries })
    }

    pub fn get(&self, name: &OsStr) -> Option<EntryKind> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &OsStr) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, EntryKind)> {
        self.entries
            .iter()
            .map(|(name, kind)| (name.as_os_str(), *kind))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
