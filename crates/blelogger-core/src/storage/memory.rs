//! In-memory storage driver
//!
//! Behaves like a small SD card: appends are buffered per handle until
//! flushed, capacity comes from the volume geometry, and the medium can be
//! "pulled" to exercise the fatal storage paths.

use std::collections::{BTreeMap, HashMap};

use super::{
    validate_name, DirEntry, FileHandle, OpenMode, Storage, StorageError, VolumeGeometry,
    DEFAULT_MAX_OPEN_FILES,
};

#[derive(Debug)]
struct OpenFile {
    name: String,
    mode: OpenMode,
    /// Read cursor (read mode only)
    pos: usize,
    /// Appended but not yet flushed
    pending: Vec<u8>,
}

/// Storage held entirely in memory
#[derive(Debug)]
pub struct MemStorage {
    files: BTreeMap<String, Vec<u8>>,
    open: HashMap<FileHandle, OpenFile>,
    next_handle: u32,
    max_open: usize,
    geometry: VolumeGeometry,
    present: bool,
}

impl Default for MemStorage {
    fn default() -> Self {
        Self::new(VolumeGeometry::default())
    }
}

impl MemStorage {
    /// Create an empty, mounted volume
    pub fn new(geometry: VolumeGeometry) -> Self {
        Self {
            files: BTreeMap::new(),
            open: HashMap::new(),
            next_handle: 1,
            max_open: DEFAULT_MAX_OPEN_FILES,
            geometry,
            present: true,
        }
    }

    /// Limit the number of simultaneously open handles
    pub fn with_max_open_files(mut self, max_open: usize) -> Self {
        self.max_open = max_open;
        self
    }

    /// Seed a file with flushed content
    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.files.insert(name.into(), content.into());
    }

    /// Flushed content of a file
    pub fn contents(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(Vec::as_slice)
    }

    /// Flushed content of a file as text
    pub fn contents_str(&self, name: &str) -> Option<String> {
        self.contents(name)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Number of handles currently open
    pub fn open_handles(&self) -> usize {
        self.open.len()
    }

    /// Whether `name` is currently held by any handle
    pub fn is_open(&self, name: &str) -> bool {
        self.open.values().any(|f| f.name == name)
    }

    /// Simulate inserting or removing the card
    pub fn set_present(&mut self, present: bool) {
        self.present = present;
        if !present {
            self.open.clear();
        }
    }

    fn ensure_present(&self) -> Result<(), StorageError> {
        if self.present {
            Ok(())
        } else {
            Err(StorageError::NotPresent)
        }
    }

    fn used(&self) -> u64 {
        let committed: usize = self.files.values().map(Vec::len).sum();
        let pending: usize = self.open.values().map(|f| f.pending.len()).sum();
        (committed + pending) as u64
    }

    fn register(&mut self, name: &str, mode: OpenMode) -> Result<FileHandle, StorageError> {
        if self.is_open(name) {
            return Err(StorageError::FileInUse(name.to_string()));
        }
        if self.open.len() >= self.max_open {
            return Err(StorageError::TooManyOpenFiles {
                limit: self.max_open,
            });
        }
        let handle = FileHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        self.open.insert(
            handle,
            OpenFile {
                name: name.to_string(),
                mode,
                pos: 0,
                pending: Vec::new(),
            },
        );
        Ok(handle)
    }

    fn commit(&mut self, handle: FileHandle) -> Result<(), StorageError> {
        let file = self
            .open
            .get_mut(&handle)
            .ok_or(StorageError::InvalidHandle)?;
        if file.pending.is_empty() {
            return Ok(());
        }
        let data = std::mem::take(&mut file.pending);
        self.files
            .entry(file.name.clone())
            .or_default()
            .extend_from_slice(&data);
        Ok(())
    }
}

impl Storage for MemStorage {
    fn is_present(&self) -> bool {
        self.present
    }

    fn geometry(&self) -> VolumeGeometry {
        self.geometry
    }

    fn exists(&self, name: &str) -> bool {
        self.present && self.files.contains_key(name)
    }

    fn create(&mut self, name: &str) -> Result<FileHandle, StorageError> {
        self.ensure_present()?;
        validate_name(name)?;
        let handle = self.register(name, OpenMode::Append)?;
        self.files.insert(name.to_string(), Vec::new());
        Ok(handle)
    }

    fn open(&mut self, name: &str, mode: OpenMode) -> Result<FileHandle, StorageError> {
        self.ensure_present()?;
        validate_name(name)?;
        if !self.files.contains_key(name) {
            return Err(StorageError::NotFound(name.to_string()));
        }
        self.register(name, mode)
    }

    fn append(&mut self, handle: FileHandle, data: &[u8]) -> Result<(), StorageError> {
        self.ensure_present()?;
        let available = self.geometry.capacity_bytes().saturating_sub(self.used());
        let file = self
            .open
            .get_mut(&handle)
            .ok_or(StorageError::InvalidHandle)?;
        if file.mode != OpenMode::Append {
            return Err(StorageError::WrongMode(file.name.clone()));
        }
        if data.len() as u64 > available {
            return Err(StorageError::StorageFull {
                requested: data.len() as u64,
                available,
            });
        }
        file.pending.extend_from_slice(data);
        Ok(())
    }

    fn read(&mut self, handle: FileHandle, buf: &mut [u8]) -> Result<usize, StorageError> {
        self.ensure_present()?;
        let file = self
            .open
            .get_mut(&handle)
            .ok_or(StorageError::InvalidHandle)?;
        if file.mode != OpenMode::Read {
            return Err(StorageError::WrongMode(file.name.clone()));
        }
        let content = self
            .files
            .get(&file.name)
            .ok_or_else(|| StorageError::NotFound(file.name.clone()))?;
        let remaining = content.len().saturating_sub(file.pos);
        let n = remaining.min(buf.len());
        buf[..n].copy_from_slice(&content[file.pos..file.pos + n]);
        file.pos += n;
        Ok(n)
    }

    fn flush(&mut self, handle: FileHandle) -> Result<(), StorageError> {
        self.ensure_present()?;
        self.commit(handle)
    }

    fn close(&mut self, handle: FileHandle) -> Result<(), StorageError> {
        self.ensure_present()?;
        self.commit(handle)?;
        self.open.remove(&handle);
        Ok(())
    }

    fn entries(&self) -> Result<Vec<DirEntry>, StorageError> {
        self.ensure_present()?;
        Ok(self
            .files
            .iter()
            .map(|(name, content)| DirEntry {
                name: name.clone(),
                size: content.len() as u64,
                is_dir: false,
            })
            .collect())
    }

    fn remove(&mut self, name: &str) -> Result<(), StorageError> {
        self.ensure_present()?;
        if self.is_open(name) {
            return Err(StorageError::FileInUse(name.to_string()));
        }
        self.files
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_is_invisible_until_flush() {
        let mut storage = MemStorage::default();
        let h = storage.create("a.txt").unwrap();
        storage.append(h, b"hello").unwrap();
        assert_eq!(storage.contents("a.txt"), Some(&b""[..]));
        storage.flush(h).unwrap();
        assert_eq!(storage.contents("a.txt"), Some(&b"hello"[..]));
    }

    #[test]
    fn test_one_handle_per_file() {
        let mut storage = MemStorage::default();
        let _h = storage.create("a.txt").unwrap();
        assert!(matches!(
            storage.open("a.txt", OpenMode::Read),
            Err(StorageError::FileInUse(_))
        ));
    }

    #[test]
    fn test_open_handle_limit() {
        let mut storage = MemStorage::default().with_max_open_files(1);
        storage.insert("b.txt", "x");
        let _h = storage.create("a.txt").unwrap();
        assert!(matches!(
            storage.open("b.txt", OpenMode::Read),
            Err(StorageError::TooManyOpenFiles { limit: 1 })
        ));
    }

    #[test]
    fn test_read_in_chunks() {
        let mut storage = MemStorage::default();
        storage.insert("a.txt", "abcdef");
        let h = storage.open("a.txt", OpenMode::Read).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(storage.read(h, &mut buf).unwrap(), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(storage.read(h, &mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");
        assert_eq!(storage.read(h, &mut buf).unwrap(), 0);
    }

    #[test]
    fn test_capacity_enforced() {
        let mut storage = MemStorage::new(VolumeGeometry::new(1, 1, 8));
        let h = storage.create("a.txt").unwrap();
        storage.append(h, b"12345678").unwrap();
        assert!(matches!(
            storage.append(h, b"9"),
            Err(StorageError::StorageFull { available: 0, .. })
        ));
    }

    #[test]
    fn test_removed_medium() {
        let mut storage = MemStorage::default();
        storage.set_present(false);
        assert!(!storage.exists("a.txt"));
        assert!(matches!(storage.create("a.txt"), Err(StorageError::NotPresent)));
        assert!(storage.entries().is_err());
    }

    #[test]
    fn test_remove_open_file_fails() {
        let mut storage = MemStorage::default();
        let h = storage.create("a.txt").unwrap();
        assert!(storage.remove("a.txt").is_err());
        storage.close(h).unwrap();
        storage.remove("a.txt").unwrap();
        assert!(!storage.exists("a.txt"));
    }
}
