//! Slot-table strategy with double hashing
//!
//! The file holds a fixed number of tagged slots. A key's probe sequence is
//!
//! ```text
//! slot(i) = (h1(key) + i * h2(key)) mod capacity,   i = 1, 2, ..., capacity
//! ```
//!
//! Deletes leave a tombstone so keys that probed past the slot stay
//! reachable. Empty slots never come back once used, which means a key can
//! never sit beyond the first empty slot of its own sequence: every search
//! stops there.

use tracing::debug;

use crate::error::{ErrorKind, StoreResult};
use crate::storage::backend::{Backend, SlotFile};
use crate::storage::record::{check_label, Record, Slot};

use super::{read_slot, write_slot, Store};

/// Primary hash: home position of a key
pub fn h1(key: u32, capacity: u32) -> u32 {
    key % capacity
}

/// Secondary hash: probe step, never zero
pub fn h2(key: u32, capacity: u32) -> u32 {
    ((key / capacity) % capacity).max(1)
}

/// Slots visited when searching for a key
#[derive(Debug, Clone)]
pub struct ProbeSequence {
    start: u64,
    step: u64,
    capacity: u64,
    next: u64,
}

impl ProbeSequence {
    pub fn new(key: u32, capacity: u32) -> Self {
        ProbeSequence {
            start: h1(key, capacity) as u64,
            step: h2(key, capacity) as u64,
            capacity: capacity as u64,
            next: 1,
        }
    }
}

impl Iterator for ProbeSequence {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.next > self.capacity {
            return None;
        }
        let slot = (self.start + self.next * self.step) % self.capacity;
        self.next += 1;
        Some(slot as u32)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.capacity + 1 - self.next) as usize;
        (left, Some(left))
    }
}

/// Result of walking a key's probe sequence
enum Probe {
    Found { slot: u32, record: Record },
    Missing { free: Option<u32> },
}

impl<B: Backend> Store<B> {
    fn probe(&self, file: &mut B::Handle, key: u32) -> StoreResult<Probe> {
        let mut free = None;
        for slot in ProbeSequence::new(key, self.header.slots) {
            match read_slot(file, self.layout(), slot)? {
                Slot::Occupied(record) if record.key == key => {
                    return Ok(Probe::Found { slot, record });
                }
                Slot::Occupied(_) => {}
                Slot::Tombstoned => {
                    free.get_or_insert(slot);
                }
                Slot::Empty => {
                    free.get_or_insert(slot);
                    break;
                }
            }
        }
        Ok(Probe::Missing { free })
    }

    pub(super) fn hashed_find(
        &self,
        file: &mut B::Handle,
        key: u32,
    ) -> StoreResult<Option<(u32, Record)>> {
        Ok(match self.probe(file, key)? {
            Probe::Found { slot, record } => Some((slot, record)),
            Probe::Missing { .. } => None,
        })
    }

    /// Claim the first free slot, but only after the whole probe sequence
    /// has been checked for a live copy of the key
    pub(super) fn hashed_insert(&mut self, record: Record) -> StoreResult<u32> {
        check_label(&record.label)?;

        let mut file = self.handle()?;
        let key = record.key;
        let slot = match self.probe(&mut file, key)? {
            Probe::Found { .. } => return Err(ErrorKind::KeyExists.into()),
            Probe::Missing { free: None } => return Err(ErrorKind::OutOfSpace.into()),
            Probe::Missing { free: Some(slot) } => slot,
        };

        write_slot(&mut file, self.layout(), slot, &Slot::Occupied(record))?;
        file.sync()?;

        let home = h1(key, self.header.slots);
        if slot != home {
            debug!("Key {} hashed to {}, placed in slot {}", key, home, slot);
        } else {
            debug!("Key {} placed in slot {}", key, slot);
        }
        Ok(slot)
    }

    pub(super) fn hashed_delete(&mut self, key: u32) -> StoreResult<()> {
        let mut file = self.handle()?;
        let slot = match self.probe(&mut file, key)? {
            Probe::Found { slot, .. } => slot,
            Probe::Missing { .. } => return Err(ErrorKind::KeyNotFound.into()),
        };

        write_slot(&mut file, self.layout(), slot, &Slot::Tombstoned)?;
        file.sync()?;

        debug!("Tombstoned key {} in slot {}", key, slot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::backend::MemoryBackend;
    use crate::store::StoreOptions;

    fn store(capacity: u32) -> (MemoryBackend, Store<MemoryBackend>) {
        let backend = MemoryBackend::new();
        let store =
            Store::with_backend(backend.clone(), StoreOptions::tombstone_on_delete(capacity))
                .unwrap();
        (backend, store)
    }

    #[test]
    fn test_hash_functions() {
        assert_eq!(h1(25, 11), 3);
        assert_eq!(h2(25, 11), 2);
        // Keys below the capacity would step by zero without the guard
        assert_eq!(h2(5, 11), 1);
        assert_eq!(h2(121, 11), 1);
    }

    #[test]
    fn test_probe_sequence() {
        let slots: Vec<u32> = ProbeSequence::new(25, 11).collect();
        assert_eq!(slots.len(), 11);
        assert_eq!(&slots[..3], &[5, 7, 9]);
        // A prime capacity visits every slot once
        let mut sorted = slots.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..11).collect::<Vec<_>>());

        assert_eq!(ProbeSequence::new(3, 1).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_duplicate_in_sample_sequence() {
        let (_, mut store) = store(11);
        let mut results = Vec::new();
        for (key, label, age) in [
            (1, "Abraham Weintraub", 11),
            (0, "Roberto Carlos", 255),
            (2, "Pedro Silva Costa", 24),
            (0, "Severino Severo", 44),
            (4, "João Gabriel", 10),
            (6, "Fausto Silva", 60),
            (5, "Pablo Vilar", 19),
        ] {
            results.push(store.insert(key, label, age).map_err(|e| e.kind()));
        }

        assert_eq!(results[0], Ok(2));
        assert_eq!(results[1], Ok(1));
        assert_eq!(results[2], Ok(3));
        assert_eq!(results[3], Err(ErrorKind::KeyExists));
        assert_eq!(results[4], Ok(5));
        assert_eq!(results[5], Ok(7));
        assert_eq!(results[6], Ok(6));

        assert_eq!(store.lookup_by_key(0).unwrap().unwrap().label, "Roberto Carlos");
        assert_eq!(store.len().unwrap(), 6);
    }

    #[test]
    fn test_delete_twice() {
        let (_, mut store) = store(11);
        store.insert(6, "Fausto Silva", 60).unwrap();
        store.delete_by_key(6).unwrap();
        assert_eq!(store.delete_by_key(6).unwrap_err().kind(), ErrorKind::KeyNotFound);
        assert_eq!(store.slot(7).unwrap(), Some(Slot::Tombstoned));
    }

    #[test]
    fn test_collision_survives_tombstone() {
        let (_, mut store) = store(11);
        // Both keys start their sequence at slot 2
        assert_eq!(store.insert(1, "first", 1).unwrap(), 2);
        assert_eq!(store.insert(12, "second", 2).unwrap(), 3);

        store.delete_by_key(1).unwrap();
        assert_eq!(store.lookup_by_key(1).unwrap(), None);
        assert_eq!(store.lookup_by_key(12).unwrap(), Some(Record::new(12, "second", 2)));

        // The tombstone at slot 2 is free, but key 12 still lives at slot 3
        assert_eq!(store.insert(12, "again", 3).unwrap_err().kind(), ErrorKind::KeyExists);
        assert_eq!(store.slot(2).unwrap(), Some(Slot::Tombstoned));

        // Key 22 probes slot 2 first and reuses the tombstone
        assert_eq!(store.insert(22, "third", 4).unwrap(), 2);
        assert_eq!(store.lookup_by_index(2).unwrap().unwrap().key, 22);
    }

    #[test]
    fn test_table_full() {
        let (_, mut store) = store(11);
        for key in 0..11 {
            store.insert(key, "k", key as u8).unwrap();
        }
        assert_eq!(store.insert(11, "k", 0).unwrap_err().kind(), ErrorKind::OutOfSpace);
        // A duplicate is still reported as such on a full table
        assert_eq!(store.insert(3, "k", 0).unwrap_err().kind(), ErrorKind::KeyExists);

        store.delete_by_key(4).unwrap();
        assert_eq!(store.insert(11, "k", 0).unwrap(), 5);
    }

    #[test]
    fn test_iterate_skips_free_slots() {
        let (_, mut store) = store(11);
        for key in [10, 3, 7] {
            store.insert(key, "x", 0).unwrap();
        }
        store.delete_by_key(3).unwrap();

        let keys: Vec<u32> = store.iterate().unwrap().map(|r| r.unwrap().key).collect();
        // Slot order: key 10 -> 0, key 7 -> 8
        assert_eq!(keys, vec![10, 7]);

        let statuses: Vec<_> = store
            .slots()
            .unwrap()
            .map(|s| s.unwrap().status())
            .collect();
        assert_eq!(statuses.len(), 11);
        assert_eq!(statuses[4], crate::storage::record::SlotStatus::Tombstoned);
    }

    #[test]
    fn test_slot_bytes_on_disk() {
        let (backend, mut store) = store(11);
        store.insert(0, "Roberto Carlos", 255).unwrap();
        let bytes = backend.snapshot().unwrap();
        let offset = 4 + 26;
        assert_eq!(bytes[offset], 1);
        assert_eq!(&bytes[offset + 1..offset + 5], &[0, 0, 0, 0]);
        assert_eq!(&bytes[offset + 5..offset + 19], b"Roberto Carlos");
        assert_eq!(bytes[offset + 25], 255);
        assert_eq!(bytes.len(), 4 + 11 * 26);
    }
}
