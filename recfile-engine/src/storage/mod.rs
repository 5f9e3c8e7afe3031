//! Storage layer for record files
//!
//! This module handles the low-level binary format:
//! - Record codec (packed and tagged slot layouts)
//! - Store header
//! - Backends that hand out per-operation file handles

pub mod backend;
pub mod header;
pub mod record;

pub use backend::{Backend, FileBackend, MemoryBackend, MemoryFile, SlotFile};
pub use header::{Header, HEADER_SIZE};
pub use record::{
    decode_record, encode_record, Layout, Record, Slot, SlotStatus, LABEL_WIDTH,
};
