//! Line framing for the command stream
//!
//! Bytes arrive in arbitrary chunks; commands are newline-terminated. A
//! partial line is carried over to the next `feed`. Each line must fit in
//! the receive window; a longer one is dropped through its newline and
//! reported once as [`Frame::Overflow`].

/// Default receive window in bytes
pub const DEFAULT_WINDOW: usize = 4096;

/// One unit produced by the framer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete line without its newline or trailing carriage return
    Line(Vec<u8>),
    /// A line did not fit in the receive window
    Overflow,
}

pub struct LineFramer {
    pending: Vec<u8>,
    capacity: usize,
    /// Skipping the remainder of an overflowed line
    discarding: bool,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl LineFramer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            pending: Vec::with_capacity(capacity),
            capacity,
            discarding: false,
        }
    }

    /// Bytes held for an incomplete line
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Consume a chunk and return every frame it completes, in order.
    pub fn feed(&mut self, mut bytes: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();

        while !bytes.is_empty() {
            let Some(pos) = bytes.iter().position(|&b| b == b'\n') else {
                self.buffer_partial(bytes, &mut frames);
                break;
            };

            let (head, rest) = (&bytes[..pos], &bytes[pos + 1..]);
            bytes = rest;

            if self.discarding {
                self.discarding = false;
                continue;
            }
            if self.pending.len() + head.len() > self.capacity {
                self.pending.clear();
                frames.push(Frame::Overflow);
                continue;
            }

            self.pending.extend_from_slice(head);
            let mut line = std::mem::replace(&mut self.pending, Vec::with_capacity(self.capacity));
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            frames.push(Frame::Line(line));
        }

        frames
    }

    fn buffer_partial(&mut self, bytes: &[u8], frames: &mut Vec<Frame>) {
        if self.discarding {
            return;
        }
        if self.pending.len() + bytes.len() > self.capacity {
            self.pending.clear();
            self.discarding = true;
            frames.push(Frame::Overflow);
            return;
        }
        self.pending.extend_from_slice(bytes);
    }
}
