//! Store status codes and error handling
//!
//! Every store and codec operation reports failure as a [`StoreError`].
//! Callers branch on [`StoreError::kind`] to decide what to tell the user.

use thiserror::Error;

/// Error kinds - the raw values of the first three match the status codes
/// written by earlier versions of the record shell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum ErrorKind {
    /// An occupied record already holds this key
    KeyExists = -1,
    /// No free slot left in a slot-table file
    OutOfSpace = -2,
    /// No occupied record holds this key
    KeyNotFound = -3,
    /// A text field does not fit its fixed width
    FieldTooLong = -4,
    /// A record block has the wrong size or unparseable contents
    MalformedRecord = -5,
    /// The file header is unreadable or disagrees with the file size
    CorruptHeader = -6,
    /// The underlying storage failed
    IoFailure = -7,
    /// Unknown operation or missing operation arguments
    InvalidOperation = -8,
}

impl ErrorKind {
    /// Create an ErrorKind from a raw status value
    pub fn from_raw(code: i16) -> Option<Self> {
        match code {
            -1 => Some(ErrorKind::KeyExists),
            -2 => Some(ErrorKind::OutOfSpace),
            -3 => Some(ErrorKind::KeyNotFound),
            -4 => Some(ErrorKind::FieldTooLong),
            -5 => Some(ErrorKind::MalformedRecord),
            -6 => Some(ErrorKind::CorruptHeader),
            -7 => Some(ErrorKind::IoFailure),
            -8 => Some(ErrorKind::InvalidOperation),
            _ => None,
        }
    }

    /// Get the raw status value
    pub fn as_raw(&self) -> i16 {
        *self as i16
    }

    /// Errors that leave the file untouched and can simply be reported
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ErrorKind::CorruptHeader | ErrorKind::IoFailure)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.as_raw(), match self {
            ErrorKind::KeyExists => "Key already exists",
            ErrorKind::OutOfSpace => "File full",
            ErrorKind::KeyNotFound => "Key not found",
            ErrorKind::FieldTooLong => "Field too long",
            ErrorKind::MalformedRecord => "Malformed record",
            ErrorKind::CorruptHeader => "Corrupt header",
            ErrorKind::IoFailure => "I/O failure",
            ErrorKind::InvalidOperation => "Invalid operation",
        })
    }
}

/// Main error type for the record store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store status {0}")]
    Status(ErrorKind),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{field} is {len} bytes, at most {max} allowed")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("corrupt header: {0}")]
    CorruptHeader(String),
}

impl StoreError {
    /// Get the error kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Status(kind) => *kind,
            StoreError::Io(_) => ErrorKind::IoFailure,
            StoreError::FieldTooLong { .. } => ErrorKind::FieldTooLong,
            StoreError::MalformedRecord(_) => ErrorKind::MalformedRecord,
            StoreError::CorruptHeader(_) => ErrorKind::CorruptHeader,
        }
    }
}

impl From<ErrorKind> for StoreError {
    fn from(kind: ErrorKind) -> Self {
        StoreError::Status(kind)
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
