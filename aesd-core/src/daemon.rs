//! Background execution.

use crate::error::Result;
use nix::fcntl::{open, OFlag};
use nix::sys::stat::Mode;
use nix::unistd::{chdir, close, dup2, fork, setsid, ForkResult, Pid};

/// Which side of the fork the caller is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detached {
    /// The process that called fork. It should exit successfully.
    Parent(Pid),

    /// The detached child. It should carry on serving.
    Child,
}

/// Forks, starts a new session in the child and points its standard
/// streams at `/dev/null`.
///
/// Must be called while the process is still single-threaded, i.e. before
/// the async runtime is built.
pub fn daemonize() -> Result<Detached> {
    // SAFETY: the caller guarantees no other threads exist yet, so the child
    // cannot inherit a lock held by a thread that did not survive the fork.
    match unsafe { fork() }? {
        ForkResult::Parent { child } => return Ok(Detached::Parent(child)),
        ForkResult::Child => {}
    }

    setsid()?;
    chdir("/")?;
    redirect_stdio()?;

    Ok(Detached::Child)
}

fn redirect_stdio() -> Result<()> {
    let null = open("/dev/null", OFlag::O_RDWR, Mode::empty())?;

    for fd in [0, 1, 2] {
        dup2(null, fd)?;
    }
    if null > 2 {
        close(null)?;
    }

    Ok(())
}
