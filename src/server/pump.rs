//! Event pump
//!
//! Polls the backend for at most one event per call and forwards it to the
//! client. A resize is applied to the shadow buffer before the event leaves,
//! so any command read afterwards already sees the new dimensions.

use std::io::{self, Write};
use std::time::Duration;

use tracing::{debug, info};

use crate::core::event::{Event, EventKind};
use crate::ui::Backend;

use super::context::Context;
use super::session::SessionError;

pub struct EventPump {
    timeout: Duration,
}

impl EventPump {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Wait up to the poll timeout for one backend event.
    pub fn poll_once<B: Backend>(
        &self,
        ctx: &mut Context<B>,
    ) -> Result<Option<Event>, SessionError> {
        let Some(event) = ctx
            .backend
            .poll_event(self.timeout)
            .map_err(SessionError::Backend)?
        else {
            return Ok(None);
        };

        if event.kind == EventKind::Resize {
            ctx.shadow
                .resize(event.width, event.height)
                .map_err(SessionError::CacheAlloc)?;
            info!("Resize: {}x{}", ctx.shadow.width(), ctx.shadow.height());
        }
        Ok(Some(event))
    }

    /// Send one event line to the client.
    pub fn forward<W: Write>(&self, out: &mut W, event: &Event) -> Result<(), SessionError> {
        debug!("Forwarding {}", event);
        write_line(out, &event.to_string()).map_err(SessionError::Write)
    }
}

/// Write `line` followed by a newline in one call.
pub fn write_line<W: Write>(out: &mut W, line: &str) -> io::Result<()> {
    let mut buf = Vec::with_capacity(line.len() + 1);
    buf.extend_from_slice(line.as_bytes());
    buf.push(b'\n');
    out.write_all(&buf)?;
    out.flush()
}
