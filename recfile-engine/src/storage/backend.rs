//! Storage backends - where the bytes of a record file live
//!
//! A store never keeps a handle between calls. Each operation asks its
//! backend for a fresh handle, uses it, and drops it before returning.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A read/write handle onto the bytes of one record file
pub trait SlotFile: Read + Write + Seek {
    /// Truncate or extend the file
    fn set_len(&mut self, len: u64) -> io::Result<()>;

    /// Flush written data to the storage device
    fn sync(&mut self) -> io::Result<()>;

    /// Current size in bytes
    fn size(&mut self) -> io::Result<u64> {
        self.seek(SeekFrom::End(0))
    }
}

/// Source of per-operation handles
pub trait Backend {
    type Handle: SlotFile;

    /// Create the file, failing with `AlreadyExists` if it is already there
    fn create(&self) -> io::Result<Self::Handle>;

    /// Open an existing file for reading and writing
    fn open(&self) -> io::Result<Self::Handle>;

    /// Where the file lives, for logs and listings
    fn path(&self) -> &Path;
}

/// Record file on the local filesystem
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileBackend { path: path.into() }
    }
}

impl Backend for FileBackend {
    type Handle = File;

    fn create(&self) -> io::Result<File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&self.path)
    }

    fn open(&self) -> io::Result<File> {
        OpenOptions::new().read(true).write(true).open(&self.path)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl SlotFile for File {
    fn set_len(&mut self, len: u64) -> io::Result<()> {
        File::set_len(self, len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    /// `None` until the file is created
    data: Option<Vec<u8>>,
    read_only: bool,
}

/// In-memory record file for tests and scratch stores
///
/// Clones share the same buffer, so a test can keep one clone to inspect the
/// bytes a store wrote through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    /// A backend whose file does not exist yet
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose file already holds the given bytes
    pub fn from_bytes(data: Vec<u8>) -> Self {
        MemoryBackend {
            state: Arc::new(Mutex::new(MemoryState {
                data: Some(data),
                read_only: false,
            })),
        }
    }

    /// Copy of the current file contents
    pub fn snapshot(&self) -> Option<Vec<u8>> {
        self.state.lock().data.clone()
    }

    /// Make every later write fail with `PermissionDenied`
    pub fn set_read_only(&self, read_only: bool) {
        self.state.lock().read_only = read_only;
    }
}

impl Backend for MemoryBackend {
    type Handle = MemoryFile;

    fn create(&self) -> io::Result<MemoryFile> {
        let mut state = self.state.lock();
        if state.data.is_some() {
            return Err(io::Error::new(io::ErrorKind::AlreadyExists, "memory file exists"));
        }
        if state.read_only {
            return Err(denied());
        }
        state.data = Some(Vec::new());
        Ok(MemoryFile {
            state: self.state.clone(),
            pos: 0,
        })
    }

    fn open(&self) -> io::Result<MemoryFile> {
        if self.state.lock().data.is_none() {
            return Err(missing());
        }
        Ok(MemoryFile {
            state: self.state.clone(),
            pos: 0,
        })
    }

    fn path(&self) -> &Path {
        Path::new(":memory:")
    }
}

/// Handle onto a [`MemoryBackend`] buffer
#[derive(Debug)]
pub struct MemoryFile {
    state: Arc<Mutex<MemoryState>>,
    pos: u64,
}

fn missing() -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, "memory file does not exist")
}

fn denied() -> io::Error {
    io::Error::new(io::ErrorKind::PermissionDenied, "memory file is read-only")
}

impl Read for MemoryFile {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let state = self.state.lock();
        let data = state.data.as_ref().ok_or_else(missing)?;
        let start = (self.pos as usize).min(data.len());
        let n = out.len().min(data.len() - start);
        out[..n].copy_from_slice(&data[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Write for MemoryFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.read_only {
            return Err(denied());
        }
        let data = state.data.as_mut().ok_or_else(missing)?;
        let start = self.pos as usize;
        let end = start + buf.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        self.pos = end as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = {
            let state = self.state.lock();
            state.data.as_ref().ok_or_else(missing)?.len() as u64
        };
        let next = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::End(delta) => len.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
        };
        self.pos = next.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of memory file")
        })?;
        Ok(self.pos)
    }
}

impl SlotFile for MemoryFile {
    fn set_len(&mut self, len: u64) -> io::Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.read_only {
            return Err(denied());
        }
        state.data.as_mut().ok_or_else(missing)?.resize(len as usize, 0);
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_create_then_open() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("data.bin"));

        assert_eq!(backend.open().unwrap_err().kind(), io::ErrorKind::NotFound);

        let mut file = backend.create().unwrap();
        file.write_all(b"abcd").unwrap();
        drop(file);

        assert_eq!(backend.create().unwrap_err().kind(), io::ErrorKind::AlreadyExists);

        let mut file = backend.open().unwrap();
        assert_eq!(file.size().unwrap(), 4);
        file.set_len(2).unwrap();
        assert_eq!(file.size().unwrap(), 2);
    }

    #[test]
    fn test_memory_shared_buffer() {
        let backend = MemoryBackend::new();
        assert!(backend.snapshot().is_none());
        assert_eq!(backend.open().unwrap_err().kind(), io::ErrorKind::NotFound);

        let mut file = backend.clone().create().unwrap();
        file.write_all(&[1, 2, 3]).unwrap();
        file.seek(SeekFrom::Start(5)).unwrap();
        file.write_all(&[9]).unwrap();
        assert_eq!(backend.snapshot().unwrap(), vec![1, 2, 3, 0, 0, 9]);

        let mut reader = backend.open().unwrap();
        reader.seek(SeekFrom::Start(1)).unwrap();
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, vec![2, 3, 0, 0, 9]);
    }

    #[test]
    fn test_memory_truncate_and_seek() {
        let backend = MemoryBackend::from_bytes(vec![7; 10]);
        let mut file = backend.open().unwrap();
        file.set_len(4).unwrap();
        assert_eq!(file.size().unwrap(), 4);
        assert_eq!(file.seek(SeekFrom::End(-1)).unwrap(), 3);
        assert!(file.seek(SeekFrom::Current(-10)).is_err());
    }

    #[test]
    fn test_memory_read_only() {
        let backend = MemoryBackend::from_bytes(vec![0; 4]);
        backend.set_read_only(true);
        let mut file = backend.open().unwrap();
        let err = file.write_all(&[1]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(backend.snapshot().unwrap(), vec![0; 4]);
    }
}
