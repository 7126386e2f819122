//! Removable storage
//!
//! A flat view of the storage card's root directory. Drivers hand out
//! numbered handles; a file can be held by at most one handle at a time, which
//! is the constraint the logger and the file download handler negotiate
//! around.

mod accounting;
mod error;
mod fs;
mod memory;

pub use accounting::{used_bytes, StorageAccounting};
pub use error::StorageError;
pub use fs::FsStorage;
pub use memory::MemStorage;

use serde::{Deserialize, Serialize};

/// Default limit on simultaneously open handles
pub const DEFAULT_MAX_OPEN_FILES: usize = 4;

/// Opaque handle to an open file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle(pub(crate) u32);

/// How an existing file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Sequential read from the start
    Read,
    /// Writes go to the end; existing content is kept
    Append,
}

/// One entry of the root directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// File or directory name
    pub name: String,
    /// Size in bytes; zero for directories
    pub size: u64,
    /// Whether the entry is a directory
    pub is_dir: bool,
}

/// FAT-style volume layout, used to derive total capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeGeometry {
    /// Blocks in one allocation cluster
    pub blocks_per_cluster: u32,
    /// Clusters on the volume
    pub cluster_count: u32,
    /// Bytes per block
    pub block_size: u32,
}

impl VolumeGeometry {
    /// Describe a volume layout
    pub const fn new(blocks_per_cluster: u32, cluster_count: u32, block_size: u32) -> Self {
        Self {
            blocks_per_cluster,
            cluster_count,
            block_size,
        }
    }

    /// Total bytes addressable on the volume
    pub fn capacity_bytes(&self) -> u64 {
        self.blocks_per_cluster as u64 * self.cluster_count as u64 * self.block_size as u64
    }
}

impl Default for VolumeGeometry {
    /// A 2 GB card formatted FAT16 with 32 KB clusters
    fn default() -> Self {
        Self::new(64, 60_352, 512)
    }
}

/// File storage capability
///
/// All names are relative to the card root; subdirectories are listed but
/// never created by this crate.
pub trait Storage {
    /// Whether the medium is inserted and mounted
    fn is_present(&self) -> bool;

    /// Volume layout of the mounted medium
    fn geometry(&self) -> VolumeGeometry;

    /// Check whether a root entry exists
    fn exists(&self, name: &str) -> bool;

    /// Create (or truncate) a file and open it for append
    fn create(&mut self, name: &str) -> Result<FileHandle, StorageError>;

    /// Open an existing file
    fn open(&mut self, name: &str, mode: OpenMode) -> Result<FileHandle, StorageError>;

    /// Append bytes to a file opened for writing
    fn append(&mut self, handle: FileHandle, data: &[u8]) -> Result<(), StorageError>;

    /// Read up to `buf.len()` bytes; returns 0 at end of file
    fn read(&mut self, handle: FileHandle, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Commit pending writes to the medium
    fn flush(&mut self, handle: FileHandle) -> Result<(), StorageError>;

    /// Flush and release a handle
    fn close(&mut self, handle: FileHandle) -> Result<(), StorageError>;

    /// Enumerate the root directory
    fn entries(&self) -> Result<Vec<DirEntry>, StorageError>;

    /// Delete a root entry; fails if it is open
    fn remove(&mut self, name: &str) -> Result<(), StorageError>;
}

/// Reject names that would escape the root or are otherwise unusable
pub(crate) fn validate_name(name: &str) -> Result<(), StorageError> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
    {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_capacity() {
        let g = VolumeGeometry::new(8, 1000, 512);
        assert_eq!(g.capacity_bytes(), 4_096_000);
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("01022024.txt").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("../etc/passwd").is_err());
        assert!(validate_name("a\\b").is_err());
    }
}
