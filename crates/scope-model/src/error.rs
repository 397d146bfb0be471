//! The error taxonomy shared by every driver family.
//!
//! Transport, codec, and state-machine layers all return [`Error`]; the
//! transport layer never retries, all retry policy lives in the acquisition
//! state machine (see `scope-core`).

use std::io;

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport read/write failure, or an unexpected device disconnect.
    #[error("transport io error: {0}")]
    Io(#[from] io::Error),

    /// A trigger wait or block-available wait exceeded its deadline.
    ///
    /// Non-fatal: the acquisition state machine records its wait state and
    /// retries on the next poll tick rather than propagating this upward as
    /// a terminal failure.
    #[error("operation timed out")]
    Timeout,

    /// Fewer bytes arrived than the transport's declared read size promised.
    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    /// A definite-length block (§4.2.1/§4.2.2) header was malformed.
    #[error("bad block header: {0}")]
    BadHeader(String),

    /// A textual or TLV response didn't match the expected opcode/index/shape.
    #[error("bad protocol format: {0}")]
    BadFormat(String),

    /// `config-set` value isn't in the model's enumerated set or range, or
    /// the model itself isn't in the catalog.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Acquisition requested on a closed device, or config-set on an
    /// unknown channel group.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// `*ESR?` reported bit 0x10 ("execution error") after a single-shot
    /// capture, and the bounded retry count was exhausted.
    #[error("firmware reported an execution error after {retries} retries")]
    FirmwareError { retries: u32 },
}

impl Error {
    pub fn bad_header(msg: impl Into<String>) -> Self {
        Error::BadHeader(msg.into())
    }

    pub fn bad_format(msg: impl Into<String>) -> Self {
        Error::BadFormat(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Error::Unsupported(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Error::InvalidState(msg.into())
    }

    /// Whether the state machine should treat this as fatal for the current
    /// frame (abort, emit `End`) versus a retryable wait (spec.md §7).
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Timeout)
    }
}
