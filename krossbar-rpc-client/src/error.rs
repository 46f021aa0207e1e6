use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::status::Status;

#[derive(Debug, Serialize, Deserialize, Clone, Error)]
pub enum Error {
    /// Invalid params to a call. Contains serialization error
    #[error("Invalid call params: {0}")]
    ParamsTypeError(String),
    /// Invalid result type of a call or a stream. Contains deserialization error
    #[error("Invalid result type: {0}")]
    ResultTypeError(String),
    /// Remote side finished the call with a non-ok status
    #[error("Call finished with status {0}")]
    Status(Status),
    /// A completion arrived which the call can't legally receive in its current phase.
    /// Indicates a bug in the transport or in the engine transition table
    #[error("Protocol violation: {0}. Please report the issue")]
    ProtocolError(String),
    /// Completion queue is shut down. No new calls are accepted, pending ones are dropped
    #[error("Completion queue is shut down")]
    Shutdown,
}

pub type Result<T> = std::result::Result<T, Error>;
