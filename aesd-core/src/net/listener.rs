//! Listening socket setup.

use crate::error::{Error, Result};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{SocketAddr, TcpListener};

/// Creates a non-blocking listening socket on `addr`.
///
/// `SO_REUSEADDR` is set so a restarted server can rebind while old
/// connections sit in `TIME_WAIT`.
pub fn bind_listener(addr: SocketAddr, backlog: i32) -> Result<TcpListener> {
    let listen_err = |source| Error::Listen { addr, source };

    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .map_err(listen_err)?;
    socket.set_reuse_address(true).map_err(listen_err)?;
    socket.bind(&addr.into()).map_err(listen_err)?;
    socket.listen(backlog).map_err(listen_err)?;
    // Required before handing the socket to tokio.
    socket.set_nonblocking(true).map_err(listen_err)?;

    Ok(socket.into())
}
