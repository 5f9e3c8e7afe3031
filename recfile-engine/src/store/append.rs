//! Append-only strategy
//!
//! Records sit packed in slots `0..N` with `N` in the header. Inserts go to
//! slot `N`; deletes move every later record down one slot and shrink the
//! file, so the live records always stay contiguous.

use std::io::{Read, Seek, SeekFrom, Write};
use tracing::debug;

use crate::error::{ErrorKind, StoreResult};
use crate::storage::backend::{Backend, SlotFile};
use crate::storage::header::Header;
use crate::storage::record::{check_label, Record, Slot};

use super::{read_slot, write_header, write_slot, Store};

impl<B: Backend> Store<B> {
    /// Linear scan for a key
    pub(super) fn append_find(
        &self,
        file: &mut B::Handle,
        key: u32,
    ) -> StoreResult<Option<(u32, Record)>> {
        for index in 0..self.header.slots {
            if let Slot::Occupied(record) = read_slot(file, self.layout(), index)? {
                if record.key == key {
                    return Ok(Some((index, record)));
                }
            }
        }
        Ok(None)
    }

    pub(super) fn append_insert(&mut self, record: Record) -> StoreResult<u32> {
        check_label(&record.label)?;

        let mut file = self.handle()?;
        if self.append_find(&mut file, record.key)?.is_some() {
            return Err(ErrorKind::KeyExists.into());
        }

        let index = self.header.slots;
        let header = Header::new(index.checked_add(1).ok_or(ErrorKind::OutOfSpace)?);

        write_slot(&mut file, self.layout(), index, &Slot::Occupied(record))?;
        write_header(&mut file, header)?;
        file.sync()?;

        self.header = header;
        debug!("Appended record in slot {} ({} records)", index, header.slots);
        Ok(index)
    }

    pub(super) fn shift_delete(&mut self, key: u32) -> StoreResult<()> {
        let mut file = self.handle()?;
        let (index, _) = self
            .append_find(&mut file, key)?
            .ok_or(ErrorKind::KeyNotFound)?;

        let layout = self.layout();
        let last = self.header.slots - 1;
        let mut buf = vec![0u8; layout.record_size()];
        for slot in index..last {
            file.seek(SeekFrom::Start(Header::slot_offset(layout, slot + 1)))?;
            file.read_exact(&mut buf)?;
            file.seek(SeekFrom::Start(Header::slot_offset(layout, slot)))?;
            file.write_all(&buf)?;
        }

        let header = Header::new(last);
        write_header(&mut file, header)?;
        file.set_len(header.file_size(layout))?;
        file.sync()?;

        self.header = header;
        debug!(
            "Deleted key {} from slot {}, shifted {} records",
            key,
            index,
            last - index
        );
        Ok(())
    }
}
