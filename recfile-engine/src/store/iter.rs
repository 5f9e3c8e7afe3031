//! Lazy passes over a record file
//!
//! A pass owns its own handle and reads slots front to back through a
//! buffer. It stops after the first error.

use std::io::{BufReader, Read};
use std::marker::PhantomData;

use crate::error::StoreResult;
use crate::storage::record::{Layout, Record, Slot};

/// Every slot of a file, in order, with its index
pub struct Slots<'a, F> {
    reader: BufReader<F>,
    layout: Layout,
    next: u32,
    end: u32,
    buf: Vec<u8>,
    _store: PhantomData<&'a ()>,
}

impl<'a, F: Read> Slots<'a, F> {
    /// `file` must already be positioned at slot 0
    pub(super) fn new(file: F, layout: Layout, end: u32) -> Self {
        Slots {
            reader: BufReader::new(file),
            layout,
            next: 0,
            end,
            buf: vec![0u8; layout.record_size()],
            _store: PhantomData,
        }
    }

    /// Like `next`, but keeps the slot index
    pub fn next_indexed(&mut self) -> Option<StoreResult<(u32, Slot)>> {
        if self.next >= self.end {
            return None;
        }
        let index = self.next;
        self.next += 1;

        let slot = self
            .reader
            .read_exact(&mut self.buf)
            .map_err(Into::into)
            .and_then(|_| self.layout.decode_slot(&self.buf));
        if slot.is_err() {
            self.next = self.end;
        }
        Some(slot.map(|slot| (index, slot)))
    }
}

impl<'a, F: Read> Iterator for Slots<'a, F> {
    type Item = StoreResult<Slot>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_indexed().map(|slot| slot.map(|(_, slot)| slot))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.end - self.next) as usize;
        (left, Some(left))
    }
}

/// Live records of a file, in slot order
pub struct Records<'a, F> {
    slots: Slots<'a, F>,
}

impl<'a, F: Read> Records<'a, F> {
    pub(super) fn new(slots: Slots<'a, F>) -> Self {
        Records { slots }
    }
}

impl<'a, F: Read> Iterator for Records<'a, F> {
    type Item = StoreResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.slots.next()? {
                Ok(Slot::Occupied(record)) => return Some(Ok(record)),
                Ok(_) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.slots.size_hint().1)
    }
}
