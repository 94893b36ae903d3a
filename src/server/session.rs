//! Session loop
//!
//! One session serves exactly one client connection:
//!
//! ```text
//! Accepting ──accept + backend init──▶ Serving ──shutdown / peer close / fatal I/O──▶ Draining ──▶ Terminated
//! ```
//!
//! Each iteration of `Serving` polls the backend once with a short timeout
//! and forwards any event, then checks the connection without waiting and
//! dispatches every complete line that arrived, in order.

use std::collections::TryReserveError;
use std::io::{self, Read};
use std::net::Shutdown;
use std::ops::ControlFlow;
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixStream;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::protocol::dispatch::{dispatch_line, ErrorReason, Outcome, Response};
use crate::protocol::framer::{Frame, LineFramer, DEFAULT_WINDOW};
use crate::ui::Backend;

use super::context::Context;
use super::listener::SocketListener;
use super::pump::{write_line, EventPump};

/// Bytes read from the connection per readiness check
const READ_CHUNK: usize = 4096;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to accept connection: {0}")]
    Accept(#[source] io::Error),

    #[error("Failed to initialize terminal: {0}")]
    BackendInit(#[source] io::Error),

    #[error("Terminal backend failed: {0}")]
    Backend(#[source] io::Error),

    #[error("Failed to read from client: {0}")]
    Read(#[source] io::Error),

    #[error("Failed to write to client: {0}")]
    Write(#[source] io::Error),

    #[error("Failed to allocate shadow buffer: {0}")]
    CacheAlloc(#[source] TryReserveError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Accepting,
    Serving,
    Draining,
    Terminated,
}

/// How a session that ended cleanly ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Shutdown,
    PeerClosed,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub poll_timeout: Duration,
    pub receive_window: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_millis(10),
            receive_window: DEFAULT_WINDOW,
        }
    }
}

pub struct Session<B: Backend> {
    conn: UnixStream,
    ctx: Context<B>,
    framer: LineFramer,
    pump: EventPump,
    state: SessionState,
}

impl<B: Backend> Session<B> {
    /// Wait for the single client, then start serving it.
    pub fn accept(
        listener: &SocketListener,
        backend: B,
        config: &SessionConfig,
    ) -> Result<Self, SessionError> {
        let conn = listener.accept().map_err(SessionError::Accept)?;
        Self::start(conn, backend, config)
    }

    /// Initialize the backend and size the shadow buffer for an accepted
    /// connection. On failure the client is told and the session drained.
    pub fn start(conn: UnixStream, backend: B, config: &SessionConfig) -> Result<Self, SessionError> {
        let mut session = Self {
            conn,
            ctx: Context::new(backend),
            framer: LineFramer::new(config.receive_window),
            pump: EventPump::new(config.poll_timeout),
            state: SessionState::Accepting,
        };

        if let Err(e) = session.init_backend() {
            error!("{}", e);
            session.drain();
            return Err(e);
        }

        session.state = SessionState::Serving;
        Ok(session)
    }

    #[cfg(test)]
    pub fn state(&self) -> SessionState {
        self.state
    }

    fn init_backend(&mut self) -> Result<(), SessionError> {
        if let Err(e) = self.ctx.backend.init() {
            let _ = self.reply(&Response::Error(ErrorReason::BackendInitFailed));
            return Err(SessionError::BackendInit(e));
        }
        self.ctx.resync().map_err(SessionError::CacheAlloc)?;
        if self.ctx.shadow.is_empty() {
            warn!("Terminal reports no cells; get_cell will fail until a resize");
        }
        info!(
            "Serving {}x{} terminal",
            self.ctx.backend.width(),
            self.ctx.backend.height()
        );
        Ok(())
    }

    /// Serve until shutdown, peer close or a fatal error, then drain.
    pub fn run(mut self) -> Result<Exit, SessionError> {
        let result = self.serve();
        match &result {
            Ok(exit) => info!("Session ended: {:?}", exit),
            Err(e) => error!("Session failed: {}", e),
        }
        self.drain();
        result
    }

    fn serve(&mut self) -> Result<Exit, SessionError> {
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            if let Some(event) = self.pump.poll_once(&mut self.ctx)? {
                self.pump.forward(&mut self.conn, &event)?;
            }

            if !readable(&self.conn).map_err(SessionError::Read)? {
                continue;
            }

            let n = match self.conn.read(&mut chunk) {
                Ok(0) => {
                    if self.framer.pending() > 0 {
                        debug!("Dropping {} bytes of an unterminated line", self.framer.pending());
                    }
                    return Ok(Exit::PeerClosed);
                }
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(SessionError::Read(e)),
            };

            for frame in self.framer.feed(&chunk[..n]) {
                if self.handle_frame(frame)?.is_break() {
                    return Ok(Exit::Shutdown);
                }
            }
        }
    }

    fn handle_frame(&mut self, frame: Frame) -> Result<ControlFlow<()>, SessionError> {
        let line = match frame {
            Frame::Line(line) => line,
            Frame::Overflow => {
                warn!("Dropped a line longer than the receive window");
                self.reply(&Response::Error(ErrorReason::LineTooLong))?;
                return Ok(ControlFlow::Continue(()));
            }
        };

        let text = String::from_utf8_lossy(&line);
        match dispatch_line(&mut self.ctx, &text) {
            Outcome::Reply(response) => self.reply(&response)?,
            Outcome::Forward(event) => self.pump.forward(&mut self.conn, &event)?,
            Outcome::Shutdown => {
                info!("Shutdown requested by client");
                self.reply(&Response::Ok)?;
                return Ok(ControlFlow::Break(()));
            }
            Outcome::Ignore => {}
        }
        Ok(ControlFlow::Continue(()))
    }

    fn reply(&mut self, response: &Response) -> Result<(), SessionError> {
        write_line(&mut self.conn, &response.to_string()).map_err(SessionError::Write)
    }

    /// Release the backend and close the connection. Runs once.
    fn drain(&mut self) {
        if matches!(self.state, SessionState::Draining | SessionState::Terminated) {
            return;
        }
        self.state = SessionState::Draining;

        self.ctx.backend.shutdown();
        if let Err(e) = self.conn.shutdown(Shutdown::Both) {
            if e.kind() != io::ErrorKind::NotConnected {
                warn!("Failed to close connection: {}", e);
            }
        }

        self.state = SessionState::Terminated;
        info!("Session drained");
    }
}

/// Whether the connection has bytes (or EOF) ready, without waiting.
fn readable(conn: &UnixStream) -> io::Result<bool> {
    let mut fds = libc::pollfd {
        fd: conn.as_raw_fd(),
        events: libc::POLLIN,
        revents: 0,
    };
    let result = unsafe { libc::poll(&mut fds, 1, 0) };
    if result < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(false);
        }
        return Err(err);
    }
    Ok(result > 0 && (fds.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR)) != 0)
}
