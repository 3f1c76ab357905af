//! DolHook: a GameCube DOL/GCM image patcher and PowerPC inline hook
//! engine, split into a host-side image toolkit (DOL/GCM parsing, the
//! patch driver) and an on-target runtime (cache/IRQ primitives,
//! branch encoding, trampolines, hook install/remove, pattern
//! scanning) meant to be linked into the patched game binary itself.
//!
//! The host-side toolkit needs an allocator but not the standard
//! library; filesystem access (loading images, writing patched
//! output) is gated behind the `std` feature. The [`runtime`] module
//! additionally avoids `std` entirely so it can be linked into a
//! `no_std` GameCube binary.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod be;
pub mod error;

#[cfg(feature = "alloc")]
pub mod dol;
#[cfg(feature = "alloc")]
pub mod gcm;
#[cfg(feature = "alloc")]
pub mod patch;
#[cfg(feature = "alloc")]
pub mod symbols;

pub mod runtime;

pub use error::{Error, Result};
