//! Crate-wide error type for the DOL/GCM parsing and patching layers.
//!
//! Mirrors the shape of the hooking engine's lighter unit codes
//! (`runtime::hook::HookError`) but carries enough context for the
//! offline patcher to report *which* invariant failed, since that tool
//! runs once, off-device, and can afford to allocate.

use core::fmt;

#[cfg(feature = "alloc")]
extern crate alloc;
#[cfg(feature = "alloc")]
use alloc::string::String;

/// Errors produced while parsing, validating, or patching DOL/GCM images.
#[derive(Debug)]
pub enum Error {
    /// An I/O operation on the host filesystem failed.
    #[cfg(feature = "std")]
    Io(std::io::Error),
    /// A `scroll` read/write against a byte buffer failed (out of bounds,
    /// bad context, etc).
    Scroll(scroll::Error),
    /// A structural invariant of the DOL or GCM format was violated.
    Malformed(&'static str),
    /// A fixed-capacity resource (section slot, trampoline pool) is full.
    Capacity(&'static str),
    /// A required external input (payload file, symbol map, symbol) is
    /// missing.
    #[cfg(feature = "alloc")]
    MissingInput(String),
    #[cfg(not(feature = "alloc"))]
    MissingInput(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "std")]
            Error::Io(e) => write!(f, "i/o error: {e}"),
            Error::Scroll(e) => write!(f, "buffer error: {e}"),
            Error::Malformed(msg) => write!(f, "malformed image: {msg}"),
            Error::Capacity(msg) => write!(f, "capacity exceeded: {msg}"),
            Error::MissingInput(msg) => write!(f, "missing input: {msg}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<scroll::Error> for Error {
    fn from(e: scroll::Error) -> Self {
        Error::Scroll(e)
    }
}

pub type Result<T> = core::result::Result<T, Error>;
