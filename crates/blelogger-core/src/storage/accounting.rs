//! Storage space reporting
//!
//! Total capacity is fixed by the volume geometry and computed once; the
//! remaining space is recomputed from a full root enumeration on every call.

use super::{Storage, StorageError, VolumeGeometry};

/// Sum of the sizes of every root entry
pub fn used_bytes<S: Storage + ?Sized>(storage: &S) -> Result<u64, StorageError> {
    Ok(storage.entries()?.iter().map(|e| e.size).sum())
}

/// Capacity figures for one mounted session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageAccounting {
    max_bytes: u64,
}

impl StorageAccounting {
    /// Fix the total capacity from the volume geometry
    pub fn new(geometry: VolumeGeometry) -> Self {
        Self {
            max_bytes: geometry.capacity_bytes(),
        }
    }

    /// Total capacity in bytes
    pub fn max_storage_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Total capacity in KB
    pub fn max_storage_kb(&self) -> u64 {
        self.max_bytes / 1024
    }

    /// Capacity not taken up by root entries
    pub fn current_storage_bytes<S: Storage + ?Sized>(
        &self,
        storage: &S,
    ) -> Result<u64, StorageError> {
        Ok(self.max_bytes.saturating_sub(used_bytes(storage)?))
    }

    /// Free space in KB
    pub fn current_storage_kb<S: Storage + ?Sized>(&self, storage: &S) -> Result<u64, StorageError> {
        Ok(self.current_storage_bytes(storage)? / 1024)
    }
}
