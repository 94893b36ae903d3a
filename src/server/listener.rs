//! Unix socket bootstrap
//!
//! Creates, binds and listens in three separate steps so each failure can
//! be reported with its own bootstrap reason. The socket file is removed
//! before binding and again when the listener is dropped.

use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

/// Pending connection backlog
const BACKLOG: libc::c_int = 5;

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Failed to create socket: {0}")]
    Create(#[source] io::Error),

    #[error("Failed to bind socket to {path}: {source}")]
    Bind {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to listen on socket: {0}")]
    Listen(#[source] io::Error),
}

impl BootstrapError {
    /// Token reported on the bootstrap channel
    pub fn reason(&self) -> &'static str {
        match self {
            BootstrapError::Create(_) => "socket_create_failed",
            BootstrapError::Bind { .. } => "socket_bind_failed",
            BootstrapError::Listen(_) => "socket_listen_failed",
        }
    }
}

/// Default socket path for this process inside `dir`
pub fn socket_path(dir: &Path) -> PathBuf {
    dir.join(format!("termport_{}.sock", std::process::id()))
}

/// A listening Unix socket that removes its file on drop
pub struct SocketListener {
    listener: UnixListener,
    path: PathBuf,
}

impl SocketListener {
    pub fn bind(path: &Path) -> Result<Self, BootstrapError> {
        let fd = create_socket().map_err(BootstrapError::Create)?;

        // Stale socket from an earlier run
        let _ = std::fs::remove_file(path);

        bind_socket(&fd, path).map_err(|source| BootstrapError::Bind {
            path: path.to_path_buf(),
            source,
        })?;

        if unsafe { libc::listen(fd.as_raw_fd(), BACKLOG) } == -1 {
            let err = io::Error::last_os_error();
            let _ = std::fs::remove_file(path);
            return Err(BootstrapError::Listen(err));
        }

        info!("Listening on {}", path.display());
        Ok(Self {
            listener: UnixListener::from(fd),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Block until one client connects.
    pub fn accept(&self) -> io::Result<UnixStream> {
        let (stream, _) = self.listener.accept()?;
        info!("Client connected");
        Ok(stream)
    }
}

impl Drop for SocketListener {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn create_socket() -> io::Result<OwnedFd> {
    let fd = unsafe { libc::socket(libc::AF_UNIX, libc::SOCK_STREAM, 0) };
    if fd == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

fn bind_socket(fd: &OwnedFd, path: &Path) -> io::Result<()> {
    let mut addr: libc::sockaddr_un = unsafe { mem::zeroed() };
    addr.sun_family = libc::AF_UNIX as libc::sa_family_t;

    let bytes = path.as_os_str().as_bytes();
    // Leave room for the terminating NUL
    if bytes.len() >= addr.sun_path.len() || bytes.contains(&0) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "socket path too long or contains NUL",
        ));
    }
    for (dst, src) in addr.sun_path.iter_mut().zip(bytes) {
        *dst = *src as libc::c_char;
    }

    let result = unsafe {
        libc::bind(
            fd.as_raw_fd(),
            &addr as *const libc::sockaddr_un as *const libc::sockaddr,
            mem::size_of::<libc::sockaddr_un>() as libc::socklen_t,
        )
    };
    if result == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
