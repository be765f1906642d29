//! Network side of the socket service.
//!
//! This module owns the listening socket, the per-connection protocol and
//! the server lifecycle that ties them to the shared log.

pub mod handler;
pub mod listener;
pub mod server;

pub use handler::{ConnectionHandler, ConnectionOutcome, RECORD_DELIMITER};
pub use listener::bind_listener;
pub use server::{Server, ServerState};
