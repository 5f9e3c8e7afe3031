//! Operation handlers
//!
//! Translates shell-level requests into store calls.

pub mod dispatcher;

pub use dispatcher::{Dispatcher, OperationCode, OperationRequest, OperationResponse, Reply};
