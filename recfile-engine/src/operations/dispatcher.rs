//! Operation dispatcher - routes shell commands to store operations
//!
//! A front end builds an [`OperationRequest`] from whatever the user typed,
//! hands it to [`Dispatcher::execute`], and renders the
//! [`OperationResponse`]. Exiting is a reply like any other; the front end
//! decides when to stop reading commands.

use std::path::PathBuf;
use tracing::debug;

use crate::error::{ErrorKind, StoreError, StoreResult};
use crate::storage::backend::{Backend, FileBackend};
use crate::storage::record::{Record, Slot};
use crate::store::Store;

/// Operation codes, keyed by the single letter the shell reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationCode {
    Insert,
    Query,
    Remove,
    Print,
    Dump,
    Exit,
    Unknown,
}

impl OperationCode {
    pub fn from_raw(code: &str) -> Self {
        match code.trim() {
            "i" => OperationCode::Insert,
            "c" => OperationCode::Query,
            "r" => OperationCode::Remove,
            "p" => OperationCode::Print,
            "d" => OperationCode::Dump,
            "e" => OperationCode::Exit,
            _ => OperationCode::Unknown,
        }
    }

    pub fn as_raw(&self) -> &'static str {
        match self {
            OperationCode::Insert => "i",
            OperationCode::Query => "c",
            OperationCode::Remove => "r",
            OperationCode::Print => "p",
            OperationCode::Dump => "d",
            OperationCode::Exit => "e",
            OperationCode::Unknown => "?",
        }
    }

    /// Argument lines that follow the command letter
    pub fn arity(&self) -> usize {
        match self {
            OperationCode::Insert => 3,
            OperationCode::Query | OperationCode::Remove => 1,
            _ => 0,
        }
    }

    /// Check if this operation changes the file
    pub fn is_write(&self) -> bool {
        matches!(self, OperationCode::Insert | OperationCode::Remove)
    }
}

/// Request structure for operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRequest {
    pub operation: OperationCode,
    pub key: Option<u32>,
    pub label: Option<String>,
    pub attribute: Option<u8>,
}

impl Default for OperationRequest {
    fn default() -> Self {
        OperationRequest {
            operation: OperationCode::Unknown,
            key: None,
            label: None,
            attribute: None,
        }
    }
}

impl OperationRequest {
    pub fn new(operation: OperationCode) -> Self {
        OperationRequest {
            operation,
            ..Self::default()
        }
    }

    pub fn insert(key: u32, label: impl Into<String>, attribute: u8) -> Self {
        OperationRequest {
            operation: OperationCode::Insert,
            key: Some(key),
            label: Some(label.into()),
            attribute: Some(attribute),
        }
    }

    pub fn query(key: u32) -> Self {
        OperationRequest {
            key: Some(key),
            ..Self::new(OperationCode::Query)
        }
    }

    pub fn remove(key: u32) -> Self {
        OperationRequest {
            key: Some(key),
            ..Self::new(OperationCode::Remove)
        }
    }

    fn require_key(&self) -> StoreResult<u32> {
        self.key.ok_or(StoreError::Status(ErrorKind::InvalidOperation))
    }
}

/// Successful outcome of an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Inserted { key: u32, slot: u32 },
    Removed { key: u32 },
    Found(Record),
    /// Live records in slot order
    Listing { location: PathBuf, records: Vec<Record> },
    /// Every slot, free ones included
    SlotMap { location: PathBuf, slots: Vec<Slot> },
    /// The front end should stop reading commands
    Stop,
}

/// Response structure for operations
#[derive(Debug)]
pub struct OperationResponse {
    pub operation: OperationCode,
    /// Key the request was about, if any
    pub key: Option<u32>,
    pub result: Result<Reply, StoreError>,
}

impl OperationResponse {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Error kind of a failed operation
    pub fn status(&self) -> Option<ErrorKind> {
        self.result.as_ref().err().map(StoreError::kind)
    }
}

/// Executes requests against one store
pub struct Dispatcher<B: Backend = FileBackend> {
    store: Store<B>,
}

impl<B: Backend> Dispatcher<B> {
    pub fn new(store: Store<B>) -> Self {
        Dispatcher { store }
    }

    pub fn store(&self) -> &Store<B> {
        &self.store
    }

    pub fn into_store(self) -> Store<B> {
        self.store
    }

    /// Execute one request
    pub fn execute(&mut self, request: OperationRequest) -> OperationResponse {
        let result = match request.operation {
            OperationCode::Insert => self.op_insert(&request),
            OperationCode::Query => self.op_query(&request),
            OperationCode::Remove => self.op_remove(&request),
            OperationCode::Print => self.op_print(),
            OperationCode::Dump => self.op_dump(),
            OperationCode::Exit => Ok(Reply::Stop),
            OperationCode::Unknown => Err(StoreError::Status(ErrorKind::InvalidOperation)),
        };

        if let Err(e) = &result {
            debug!("Operation {} failed: {}", request.operation.as_raw(), e);
        }

        OperationResponse {
            operation: request.operation,
            key: request.key,
            result,
        }
    }

    fn op_insert(&mut self, req: &OperationRequest) -> StoreResult<Reply> {
        let key = req.require_key()?;
        let (label, attribute) = match (&req.label, req.attribute) {
            (Some(label), Some(attribute)) => (label, attribute),
            _ => return Err(StoreError::Status(ErrorKind::InvalidOperation)),
        };
        let slot = self.store.insert(key, label, attribute)?;
        Ok(Reply::Inserted { key, slot })
    }

    fn op_query(&mut self, req: &OperationRequest) -> StoreResult<Reply> {
        let key = req.require_key()?;
        self.store
            .lookup_by_key(key)?
            .map(Reply::Found)
            .ok_or(StoreError::Status(ErrorKind::KeyNotFound))
    }

    fn op_remove(&mut self, req: &OperationRequest) -> StoreResult<Reply> {
        let key = req.require_key()?;
        self.store.delete_by_key(key)?;
        Ok(Reply::Removed { key })
    }

    fn op_print(&mut self) -> StoreResult<Reply> {
        let records = self.store.iterate()?.collect::<StoreResult<Vec<_>>>()?;
        Ok(Reply::Listing {
            location: self.store.path().to_path_buf(),
            records,
        })
    }

    fn op_dump(&mut self) -> StoreResult<Reply> {
        let slots = self.store.slots()?.collect::<StoreResult<Vec<_>>>()?;
        Ok(Reply::SlotMap {
            location: self.store.path().to_path_buf(),
            slots,
        })
    }
}
