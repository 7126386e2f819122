//! Directory-backed storage driver
//!
//! Maps the card root onto a host directory, for running the device loop on
//! a desktop or against a mounted card image.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use super::{
    used_bytes, validate_name, DirEntry, FileHandle, OpenMode, Storage, StorageError, VolumeGeometry,
    DEFAULT_MAX_OPEN_FILES,
};

enum FsFile {
    Reader(File),
    Writer(BufWriter<File>),
}

struct OpenFile {
    name: String,
    file: FsFile,
}

/// Storage rooted at a host directory
pub struct FsStorage {
    root: PathBuf,
    geometry: VolumeGeometry,
    open: HashMap<FileHandle, OpenFile>,
    next_handle: u32,
    max_open: usize,
}

impl FsStorage {
    /// Use `root` as the card root; it must already exist
    pub fn new(root: impl Into<PathBuf>, geometry: VolumeGeometry) -> Self {
        Self {
            root: root.into(),
            geometry,
            open: HashMap::new(),
            next_handle: 1,
            max_open: DEFAULT_MAX_OPEN_FILES,
        }
    }

    /// Limit the number of simultaneously open handles
    pub fn with_max_open_files(mut self, max_open: usize) -> Self {
        self.max_open = max_open;
        self
    }

    /// Host directory acting as the card root
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, name: &str) -> Result<PathBuf, StorageError> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }

    fn ensure_present(&self) -> Result<(), StorageError> {
        if self.is_present() {
            Ok(())
        } else {
            Err(StorageError::NotPresent)
        }
    }

    fn register(&mut self, name: &str, file: FsFile) -> Result<FileHandle, StorageError> {
        let handle = FileHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        self.open.insert(
            handle,
            OpenFile {
                name: name.to_string(),
                file,
            },
        );
        Ok(handle)
    }

    fn check_can_open(&self, name: &str) -> Result<(), StorageError> {
        if self.open.values().any(|f| f.name == name) {
            return Err(StorageError::FileInUse(name.to_string()));
        }
        if self.open.len() >= self.max_open {
            return Err(StorageError::TooManyOpenFiles {
                limit: self.max_open,
            });
        }
        Ok(())
    }

    fn writer(&mut self, handle: FileHandle) -> Result<&mut BufWriter<File>, StorageError> {
        let file = self
            .open
            .get_mut(&handle)
            .ok_or(StorageError::InvalidHandle)?;
        match &mut file.file {
            FsFile::Writer(w) => Ok(w),
            FsFile::Reader(_) => Err(StorageError::WrongMode(file.name.clone())),
        }
    }
}

impl Storage for FsStorage {
    fn is_present(&self) -> bool {
        self.root.is_dir()
    }

    fn geometry(&self) -> VolumeGeometry {
        self.geometry
    }

    fn exists(&self, name: &str) -> bool {
        self.path(name).map(|p| p.exists()).unwrap_or(false)
    }

    fn create(&mut self, name: &str) -> Result<FileHandle, StorageError> {
        self.ensure_present()?;
        let path = self.path(name)?;
        self.check_can_open(name)?;
        let file = File::create(path)?;
        self.register(name, FsFile::Writer(BufWriter::new(file)))
    }

    fn open(&mut self, name: &str, mode: OpenMode) -> Result<FileHandle, StorageError> {
        self.ensure_present()?;
        let path = self.path(name)?;
        if !path.is_file() {
            return Err(StorageError::NotFound(name.to_string()));
        }
        self.check_can_open(name)?;
        let file = match mode {
            OpenMode::Read => FsFile::Reader(File::open(path)?),
            OpenMode::Append => {
                let file = OpenOptions::new().append(true).open(path)?;
                FsFile::Writer(BufWriter::new(file))
            }
        };
        self.register(name, file)
    }

    fn append(&mut self, handle: FileHandle, data: &[u8]) -> Result<(), StorageError> {
        let available = self
            .geometry
            .capacity_bytes()
            .saturating_sub(used_bytes(&*self)?);
        if data.len() as u64 > available {
            return Err(StorageError::StorageFull {
                requested: data.len() as u64,
                available,
            });
        }
        self.writer(handle)?.write_all(data)?;
        Ok(())
    }

    fn read(&mut self, handle: FileHandle, buf: &mut [u8]) -> Result<usize, StorageError> {
        let file = self
            .open
            .get_mut(&handle)
            .ok_or(StorageError::InvalidHandle)?;
        match &mut file.file {
            FsFile::Reader(r) => Ok(r.read(buf)?),
            FsFile::Writer(_) => Err(StorageError::WrongMode(file.name.clone())),
        }
    }

    fn flush(&mut self, handle: FileHandle) -> Result<(), StorageError> {
        let writer = self.writer(handle)?;
        writer.flush()?;
        writer.get_ref().sync_data()?;
        Ok(())
    }

    fn close(&mut self, handle: FileHandle) -> Result<(), StorageError> {
        let file = self
            .open
            .remove(&handle)
            .ok_or(StorageError::InvalidHandle)?;
        if let FsFile::Writer(mut w) = file.file {
            w.flush()?;
            w.get_ref().sync_data()?;
        }
        Ok(())
    }

    fn entries(&self) -> Result<Vec<DirEntry>, StorageError> {
        self.ensure_present()?;
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let meta = entry.metadata()?;
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                size: if meta.is_file() { meta.len() } else { 0 },
                is_dir: meta.is_dir(),
            });
        }
        // read_dir order is platform-dependent
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn remove(&mut self, name: &str) -> Result<(), StorageError> {
        self.ensure_present()?;
        let path = self.path(name)?;
        if self.open.values().any(|f| f.name == name) {
            return Err(StorageError::FileInUse(name.to_string()));
        }
        if !path.exists() {
            return Err(StorageError::NotFound(name.to_string()));
        }
        fs::remove_file(path)?;
        Ok(())
    }
}
