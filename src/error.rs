//! Error type shared by every fallible operation in the crate.

use core::fmt;
use std::io;

/// Unified error currency for memory access, story-file parsing, and opcode
/// execution.
#[derive(Debug)]
pub enum Error {
    /// A Quetzal save/restore file could not be read or written.
    Io(io::Error),
    /// A fixed-layout structure (header, object entry, Quetzal chunk) could not
    /// be decoded from its bytes.
    Decode(scroll::Error),
    /// The bytes are structurally readable but violate a Z-machine format rule
    /// (bad version byte, out-of-range object number, oversized property write,
    /// wrong IFF chunk id, ...).
    Malformed(String),
    /// A fatal illegal-operand condition: invalid variable number, call to a
    /// non-routine, popping an empty call stack.
    IllegalOperand(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "i/o error: {e}"),
            Error::Decode(e) => write!(f, "decode error: {e}"),
            Error::Malformed(msg) => write!(f, "malformed story data: {msg}"),
            Error::IllegalOperand(msg) => write!(f, "illegal operand: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Decode(e) => Some(e),
            Error::Malformed(_) | Error::IllegalOperand(_) => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<scroll::Error> for Error {
    fn from(e: scroll::Error) -> Self {
        Error::Decode(e)
    }
}

pub type Result<T> = core::result::Result<T, Error>;
