//! recfile engine - fixed-record binary file store
//!
//! A record file is a 4-byte header followed by fixed-width slots. This
//! crate provides the record codec, the store that keeps the file
//! consistent across inserts and deletes, and a small request dispatcher
//! for interactive front ends.

pub mod error;
pub mod storage;
pub mod store;
pub mod operations;

pub use error::{ErrorKind, StoreError, StoreResult};
pub use storage::{Record, Slot};
pub use store::{CompactionPolicy, Store, StoreOptions};
