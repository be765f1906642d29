//! aesd core - line-oriented append log served over TCP
//!
//! Clients connect, send one newline-terminated record, and receive the
//! full contents of a shared log that every connection and a periodic
//! timestamp task append to. The crate also provides the bounded ring index
//! used wherever a fixed-size history must be addressed by byte offset.

/// Command-line and environment configuration
pub mod config;

/// Detaching into the background
pub mod daemon;

/// Shared append-only log
pub mod disk;

/// Error type
pub mod error;

/// Listener, connection handler and server lifecycle
pub mod net;

/// Bounded ring index of records
pub mod ring;

/// Periodic timestamp records
pub mod timestamp;

pub use error::{Error, Result};
