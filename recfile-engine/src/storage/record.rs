//! Fixed-width record encoding
//!
//! A record block is laid out as:
//!
//! ```text
//! [tag:u8]?  [key:u32 BE]  [label:20 bytes, zero padded]  [attribute:u8]
//! ```
//!
//! The status tag is present only in the [`Layout::Tagged`] layout used by
//! slot-table files. All integers are big-endian so files move between
//! machines unchanged.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

use crate::error::{StoreError, StoreResult};

/// Size of the record key in bytes
pub const KEY_SIZE: usize = 4;
/// Fixed on-disk width of the label field
pub const LABEL_WIDTH: usize = 20;
/// Size of the attribute field in bytes
pub const ATTRIBUTE_SIZE: usize = 1;
/// Size of the slot status tag (tagged layout only)
pub const STATUS_TAG_SIZE: usize = 1;

/// A keyed entity stored in one slot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    /// Record key, unique among occupied slots
    pub key: u32,
    /// Short text label, at most [`LABEL_WIDTH`] bytes of UTF-8
    pub label: String,
    /// Single-byte attribute, such as an age
    pub attribute: u8,
}

impl Record {
    /// Create a new record
    pub fn new(key: u32, label: impl Into<String>, attribute: u8) -> Self {
        Record {
            key,
            label: label.into(),
            attribute,
        }
    }
}

/// Status tag values stored in the first byte of a tagged slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SlotStatus {
    Empty = 0,
    Occupied = 1,
    Tombstoned = 2,
}

impl SlotStatus {
    pub fn from_raw(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(SlotStatus::Empty),
            1 => Some(SlotStatus::Occupied),
            2 => Some(SlotStatus::Tombstoned),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> u8 {
        *self as u8
    }
}

/// Contents of one slot
///
/// Slots only move forward: `Empty -> Occupied -> Tombstoned -> Occupied`.
/// A tombstoned slot never becomes empty again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Empty,
    Occupied(Record),
    Tombstoned,
}

impl Slot {
    pub fn status(&self) -> SlotStatus {
        match self {
            Slot::Empty => SlotStatus::Empty,
            Slot::Occupied(_) => SlotStatus::Occupied,
            Slot::Tombstoned => SlotStatus::Tombstoned,
        }
    }

    /// Check if an insert may claim this slot
    pub fn is_free(&self) -> bool {
        !matches!(self, Slot::Occupied(_))
    }

    /// Check if this slot holds a live record with the given key
    pub fn holds(&self, key: u32) -> bool {
        matches!(self, Slot::Occupied(record) if record.key == key)
    }

    pub fn record(&self) -> Option<&Record> {
        match self {
            Slot::Occupied(record) => Some(record),
            _ => None,
        }
    }

    pub fn into_record(self) -> Option<Record> {
        match self {
            Slot::Occupied(record) => Some(record),
            _ => None,
        }
    }
}

/// On-disk record layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layout {
    /// Key, label, attribute. Every slot below the header count is occupied.
    Packed,
    /// A status tag followed by the packed fields
    Tagged,
}

impl Layout {
    /// Exact size of one slot on disk
    pub const fn record_size(self) -> usize {
        let body = KEY_SIZE + LABEL_WIDTH + ATTRIBUTE_SIZE;
        match self {
            Layout::Packed => body,
            Layout::Tagged => STATUS_TAG_SIZE + body,
        }
    }

    /// Encode a slot into exactly [`Layout::record_size`] bytes
    ///
    /// Empty and tombstoned slots carry a zeroed body. The packed layout has
    /// no way to express them and rejects them.
    pub fn encode_slot(self, slot: &Slot) -> StoreResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.record_size());

        match self {
            Layout::Packed => match slot {
                Slot::Occupied(record) => write_body(&mut buf, record)?,
                other => {
                    return Err(StoreError::MalformedRecord(format!(
                        "packed layout cannot hold a {:?} slot",
                        other.status()
                    )))
                }
            },
            Layout::Tagged => {
                buf.write_u8(slot.status().as_raw())?;
                match slot {
                    Slot::Occupied(record) => write_body(&mut buf, record)?,
                    _ => buf.resize(self.record_size(), 0),
                }
            }
        }

        debug_assert_eq!(buf.len(), self.record_size());
        Ok(buf)
    }

    /// Decode a slot from a block of exactly [`Layout::record_size`] bytes
    pub fn decode_slot(self, data: &[u8]) -> StoreResult<Slot> {
        if data.len() != self.record_size() {
            return Err(StoreError::MalformedRecord(format!(
                "expected {} bytes, got {}",
                self.record_size(),
                data.len()
            )));
        }

        let mut cursor = Cursor::new(data);
        let status = match self {
            Layout::Packed => SlotStatus::Occupied,
            Layout::Tagged => {
                let tag = cursor.read_u8()?;
                SlotStatus::from_raw(tag).ok_or_else(|| {
                    StoreError::MalformedRecord(format!("unknown status tag {}", tag))
                })?
            }
        };

        Ok(match status {
            SlotStatus::Empty => Slot::Empty,
            SlotStatus::Tombstoned => Slot::Tombstoned,
            SlotStatus::Occupied => Slot::Occupied(read_body(&mut cursor)?),
        })
    }
}

/// Encode a record in the packed layout
pub fn encode_record(record: &Record) -> StoreResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(Layout::Packed.record_size());
    write_body(&mut buf, record)?;
    Ok(buf)
}

/// Decode a record from a packed block
pub fn decode_record(data: &[u8]) -> StoreResult<Record> {
    Layout::Packed
        .decode_slot(data)?
        .into_record()
        .ok_or_else(|| StoreError::MalformedRecord("packed block without record".into()))
}

/// Reject labels that could not survive a round trip through the fixed field
pub fn check_label(label: &str) -> StoreResult<()> {
    if label.len() > LABEL_WIDTH {
        return Err(StoreError::FieldTooLong {
            field: "label",
            len: label.len(),
            max: LABEL_WIDTH,
        });
    }
    if label.as_bytes().contains(&0) {
        return Err(StoreError::MalformedRecord(
            "label contains a NUL byte".into(),
        ));
    }
    Ok(())
}

fn write_body<W: Write>(out: &mut W, record: &Record) -> StoreResult<()> {
    check_label(&record.label)?;

    let mut label = [0u8; LABEL_WIDTH];
    label[..record.label.len()].copy_from_slice(record.label.as_bytes());

    out.write_u32::<BigEndian>(record.key)?;
    out.write_all(&label)?;
    out.write_u8(record.attribute)?;
    Ok(())
}

fn read_body<R: Read>(input: &mut R) -> StoreResult<Record> {
    let key = input.read_u32::<BigEndian>()?;

    let mut raw = [0u8; LABEL_WIDTH];
    input.read_exact(&mut raw)?;
    let end = raw.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
    if raw[..end].contains(&0) {
        return Err(StoreError::MalformedRecord(format!(
            "label of key {} has an embedded NUL",
            key
        )));
    }
    let label = String::from_utf8(raw[..end].to_vec()).map_err(|e| {
        StoreError::MalformedRecord(format!("label of key {} is not UTF-8: {}", key, e))
    })?;

    let attribute = input.read_u8()?;
    Ok(Record { key, label, attribute })
}
