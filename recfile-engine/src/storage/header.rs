//! Store header - the first four bytes of every record file
//!
//! The header is a single big-endian `u32`. Append-only files keep the live
//! record count there; slot-table files keep their fixed capacity.

use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use std::io::Cursor;

use crate::error::{StoreError, StoreResult};
use super::record::Layout;

/// Header size in bytes
pub const HEADER_SIZE: usize = 4;

/// Parsed store header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Number of addressable slots (record count or capacity)
    pub slots: u32,
}

impl Header {
    pub fn new(slots: u32) -> Self {
        Header { slots }
    }

    /// Parse a header from the start of a file
    pub fn from_bytes(data: &[u8]) -> StoreResult<Self> {
        if data.len() < HEADER_SIZE {
            return Err(StoreError::CorruptHeader(format!(
                "header needs {} bytes, file has {}",
                HEADER_SIZE,
                data.len()
            )));
        }
        let slots = Cursor::new(&data[..HEADER_SIZE]).read_u32::<BigEndian>()?;
        Ok(Header { slots })
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        BigEndian::write_u32(&mut buf, self.slots);
        buf
    }

    /// Byte offset of a slot
    pub fn slot_offset(layout: Layout, index: u32) -> u64 {
        HEADER_SIZE as u64 + index as u64 * layout.record_size() as u64
    }

    /// File size implied by this header
    pub fn file_size(&self, layout: Layout) -> u64 {
        Self::slot_offset(layout, self.slots)
    }

    /// Check the header against the actual file size
    ///
    /// A mismatch means a multi-write operation was interrupted (for example
    /// a record appended without its header update) or the file was edited.
    pub fn validate(&self, layout: Layout, actual_size: u64) -> StoreResult<()> {
        let expected = self.file_size(layout);
        if expected != actual_size {
            return Err(StoreError::CorruptHeader(format!(
                "header announces {} slots ({} bytes) but file is {} bytes",
                self.slots, expected, actual_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_header_bytes() {
        let header = Header::new(11);
        assert_eq!(header.to_bytes(), [0, 0, 0, 11]);
        assert_eq!(Header::from_bytes(&[0, 0, 1, 0]).unwrap().slots, 256);
    }

    #[test]
    fn test_short_header() {
        let err = Header::from_bytes(&[0, 0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptHeader);
    }

    #[test]
    fn test_slot_offsets() {
        assert_eq!(Header::slot_offset(Layout::Packed, 0), 4);
        assert_eq!(Header::slot_offset(Layout::Packed, 2), 54);
        assert_eq!(Header::slot_offset(Layout::Tagged, 2), 56);
        assert_eq!(Header::new(11).file_size(Layout::Tagged), 4 + 11 * 26);
    }

    #[test]
    fn test_validate_size() {
        let header = Header::new(3);
        assert!(header.validate(Layout::Packed, 79).is_ok());
        let err = header.validate(Layout::Packed, 104).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptHeader);
        assert!(header.validate(Layout::Tagged, 79).is_err());
    }
}
