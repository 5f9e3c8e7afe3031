//! Record store - fixed-size slots behind a one-integer header
//!
//! A [`Store`] owns a [`Backend`] and keeps only the header value cached in
//! memory. Every call opens its own handle, so nothing is held between
//! operations.
//!
//! Two strategies share the one interface, chosen by [`CompactionPolicy`]:
//! - `ShiftOnDelete`: records are packed at the front, deletes close the gap
//! - `TombstoneOnDelete`: a fixed-capacity table addressed by double hashing
//!
//! Only one `Store` may touch a given file at a time. Operations that write
//! more than once (record then header) are not atomic across a crash; a
//! torn write shows up as `CorruptHeader` on the next open.

mod append;
mod hashed;
mod iter;

pub use hashed::{h1, h2, ProbeSequence};
pub use iter::{Records, Slots};

use serde::Deserialize;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::storage::backend::{Backend, FileBackend, SlotFile};
use crate::storage::header::{Header, HEADER_SIZE};
use crate::storage::record::{Layout, Record, Slot};

/// Slot count of a new slot-table file when none is configured
pub const DEFAULT_CAPACITY: u32 = 11;

/// What a delete does to the slot it frees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompactionPolicy {
    /// Append-only file; later records move down to fill the hole
    #[default]
    ShiftOnDelete,
    /// Hashed slot table; the slot is tombstoned in place
    TombstoneOnDelete,
}

impl CompactionPolicy {
    /// Record layout used by files of this policy
    pub fn layout(self) -> Layout {
        match self {
            CompactionPolicy::ShiftOnDelete => Layout::Packed,
            CompactionPolicy::TombstoneOnDelete => Layout::Tagged,
        }
    }
}

impl FromStr for CompactionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "shift" | "shift_on_delete" => Ok(CompactionPolicy::ShiftOnDelete),
            "tombstone" | "tombstone_on_delete" => Ok(CompactionPolicy::TombstoneOnDelete),
            other => Err(format!(
                "unknown policy '{}' (expected 'shift' or 'tombstone')",
                other
            )),
        }
    }
}

impl std::fmt::Display for CompactionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CompactionPolicy::ShiftOnDelete => "shift",
            CompactionPolicy::TombstoneOnDelete => "tombstone",
        })
    }
}

/// Settings used when a store creates or opens its file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    pub policy: CompactionPolicy,
    /// Slot count of a newly created slot-table file. An existing file keeps
    /// the capacity in its header.
    pub capacity: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            policy: CompactionPolicy::default(),
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl StoreOptions {
    pub fn shift_on_delete() -> Self {
        StoreOptions {
            policy: CompactionPolicy::ShiftOnDelete,
            ..Self::default()
        }
    }

    pub fn tombstone_on_delete(capacity: u32) -> Self {
        StoreOptions {
            policy: CompactionPolicy::TombstoneOnDelete,
            capacity,
        }
    }
}

/// A record file and the operations over its slots
#[derive(Debug)]
pub struct Store<B: Backend = FileBackend> {
    backend: B,
    policy: CompactionPolicy,
    /// Record count (append-only) or capacity (slot table)
    header: Header,
}

impl Store<FileBackend> {
    /// Open the record file at `path`, creating it first if needed
    pub fn open_or_create(path: impl AsRef<Path>, options: StoreOptions) -> StoreResult<Self> {
        Self::with_backend(FileBackend::new(path.as_ref()), options)
    }
}

impl<B: Backend> Store<B> {
    /// Open or create the record file behind `backend`
    pub fn with_backend(backend: B, options: StoreOptions) -> StoreResult<Self> {
        if options.policy == CompactionPolicy::TombstoneOnDelete && options.capacity == 0 {
            return Err(StoreError::CorruptHeader(
                "slot-table capacity must be at least 1".into(),
            ));
        }

        match backend.create() {
            Ok(file) => Self::initialize(backend, file, options),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Self::load(backend, options),
            Err(e) => Err(e.into()),
        }
    }

    fn initialize(backend: B, mut file: B::Handle, options: StoreOptions) -> StoreResult<Self> {
        let layout = options.policy.layout();
        let header = match options.policy {
            CompactionPolicy::ShiftOnDelete => Header::new(0),
            CompactionPolicy::TombstoneOnDelete => Header::new(options.capacity),
        };

        let mut image = Vec::with_capacity(header.file_size(layout) as usize);
        image.extend_from_slice(&header.to_bytes());
        if options.policy == CompactionPolicy::TombstoneOnDelete {
            let empty = layout.encode_slot(&Slot::Empty)?;
            for _ in 0..header.slots {
                image.extend_from_slice(&empty);
            }
        }
        file.write_all(&image)?;
        file.sync()?;

        info!(
            "Created record file {} ({} policy, {} slots)",
            backend.path().display(),
            options.policy,
            header.slots
        );

        Ok(Store {
            backend,
            policy: options.policy,
            header,
        })
    }

    fn load(backend: B, options: StoreOptions) -> StoreResult<Self> {
        let layout = options.policy.layout();
        let mut file = backend.open()?;

        let size = file.size()?;
        if size < HEADER_SIZE as u64 {
            return Err(StoreError::CorruptHeader(format!(
                "file is {} bytes, shorter than its header",
                size
            )));
        }
        file.seek(SeekFrom::Start(0))?;
        let mut raw = [0u8; HEADER_SIZE];
        file.read_exact(&mut raw)?;
        let header = Header::from_bytes(&raw)?;

        if options.policy == CompactionPolicy::TombstoneOnDelete {
            if header.slots == 0 {
                return Err(StoreError::CorruptHeader("slot-table capacity is zero".into()));
            }
            if header.slots != options.capacity {
                warn!(
                    "{} has capacity {}, ignoring configured capacity {}",
                    backend.path().display(),
                    header.slots,
                    options.capacity
                );
            }
        }
        header.validate(layout, size)?;

        debug!(
            "Opened record file {} ({} policy, {} slots)",
            backend.path().display(),
            options.policy,
            header.slots
        );

        Ok(Store {
            backend,
            policy: options.policy,
            header,
        })
    }

    /// Insert a new record, returning the slot it landed in
    ///
    /// Fails with `KeyExists` if the key is already live, `OutOfSpace` if a
    /// slot table has no free slot on the key's probe sequence, and
    /// `FieldTooLong` before any I/O if the label does not fit.
    pub fn insert(&mut self, key: u32, label: &str, attribute: u8) -> StoreResult<u32> {
        let record = Record::new(key, label, attribute);
        match self.policy {
            CompactionPolicy::ShiftOnDelete => self.append_insert(record),
            CompactionPolicy::TombstoneOnDelete => self.hashed_insert(record),
        }
    }

    /// Find the live record with this key
    pub fn lookup_by_key(&self, key: u32) -> StoreResult<Option<Record>> {
        let mut file = self.handle()?;
        let found = match self.policy {
            CompactionPolicy::ShiftOnDelete => self.append_find(&mut file, key)?,
            CompactionPolicy::TombstoneOnDelete => self.hashed_find(&mut file, key)?,
        };
        Ok(found.map(|(_, record)| record))
    }

    /// Record in slot `index`, or `None` past the end or for a free slot
    pub fn lookup_by_index(&self, index: u32) -> StoreResult<Option<Record>> {
        Ok(self.slot(index)?.and_then(Slot::into_record))
    }

    /// Raw contents of slot `index`, or `None` past the end
    pub fn slot(&self, index: u32) -> StoreResult<Option<Slot>> {
        if index >= self.header.slots {
            return Ok(None);
        }
        let mut file = self.handle()?;
        read_slot(&mut file, self.layout(), index).map(Some)
    }

    /// Delete the live record with this key
    pub fn delete_by_key(&mut self, key: u32) -> StoreResult<()> {
        match self.policy {
            CompactionPolicy::ShiftOnDelete => self.shift_delete(key),
            CompactionPolicy::TombstoneOnDelete => self.hashed_delete(key),
        }
    }

    /// Lazy pass over the live records in slot order
    ///
    /// Each call reads the file afresh. The pass borrows the store, so it
    /// must be dropped before the next insert or delete.
    pub fn iterate(&self) -> StoreResult<Records<'_, B::Handle>> {
        Ok(Records::new(self.slots()?))
    }

    /// Lazy pass over every slot, free ones included
    pub fn slots(&self) -> StoreResult<Slots<'_, B::Handle>> {
        let mut file = self.handle()?;
        file.seek(SeekFrom::Start(HEADER_SIZE as u64))?;
        Ok(Slots::new(file, self.layout(), self.header.slots))
    }

    /// Number of live records (reads the whole file)
    pub fn len(&self) -> StoreResult<usize> {
        self.iterate()?.try_fold(0, |n, record| record.map(|_| n + 1))
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Header value: record count or fixed capacity
    pub fn slot_count(&self) -> u32 {
        self.header.slots
    }

    pub fn policy(&self) -> CompactionPolicy {
        self.policy
    }

    pub fn layout(&self) -> Layout {
        self.policy.layout()
    }

    pub fn path(&self) -> &Path {
        self.backend.path()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn handle(&self) -> StoreResult<B::Handle> {
        Ok(self.backend.open()?)
    }
}

pub(crate) fn read_slot<F: Read + Seek>(file: &mut F, layout: Layout, index: u32) -> StoreResult<Slot> {
    file.seek(SeekFrom::Start(Header::slot_offset(layout, index)))?;
    let mut buf = vec![0u8; layout.record_size()];
    file.read_exact(&mut buf)?;
    layout.decode_slot(&buf)
}

pub(crate) fn write_slot<F: Write + Seek>(
    file: &mut F,
    layout: Layout,
    index: u32,
    slot: &Slot,
) -> StoreResult<()> {
    let bytes = layout.encode_slot(slot)?;
    file.seek(SeekFrom::Start(Header::slot_offset(layout, index)))?;
    file.write_all(&bytes)?;
    Ok(())
}

pub(crate) fn write_header<F: Write + Seek>(file: &mut F, header: Header) -> StoreResult<()> {
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&header.to_bytes())?;
    Ok(())
}
