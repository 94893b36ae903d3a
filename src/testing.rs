//! Fake terminal backend for tests.
//!
//! Records every call so tests can inspect what the session did, and
//! serves a scripted queue of events. Clones share state, so a test keeps
//! one handle while the session owns the other.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::core::event::{Event, EventKind};
use crate::core::shadow::Cell;
use crate::ui::backend::ModeError;
use crate::ui::Backend;

#[derive(Debug, Default)]
struct State {
    width: i32,
    height: i32,
    paints: Vec<(i32, i32, Cell)>,
    cursor: Option<(i32, i32)>,
    clear_attributes: (u16, u16),
    input_mode: i32,
    output_mode: i32,
    events: VecDeque<Event>,
    inits: usize,
    initialized: bool,
    clears: usize,
    presents: usize,
    shutdowns: usize,
    polls: usize,
    fail_init: bool,
    fail_present: bool,
    fail_poll: bool,
}

/// A fake backend for testing.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<State>>,
}

impl FakeBackend {
    /// Create a fake terminal of the given size.
    pub fn with_size(width: i32, height: i32) -> Self {
        let backend = Self::default();
        {
            let mut state = backend.lock();
            state.width = width;
            state.height = height;
            state.input_mode = 1;
            state.output_mode = 1;
        }
        backend
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Queue an event for `poll_event`.
    pub fn push_event(&self, event: Event) {
        self.lock().events.push_back(event);
    }

    pub fn fail_init(&self, fail: bool) {
        self.lock().fail_init = fail;
    }

    pub fn fail_present(&self, fail: bool) {
        self.lock().fail_present = fail;
    }

    pub fn fail_poll(&self, fail: bool) {
        self.lock().fail_poll = fail;
    }

    /// Every paint call in order.
    pub fn paints(&self) -> Vec<(i32, i32, Cell)> {
        self.lock().paints.clone()
    }

    /// Last cell painted at a position.
    pub fn cell(&self, x: i32, y: i32) -> Option<Cell> {
        self.lock()
            .paints
            .iter()
            .rev()
            .find(|(px, py, _)| (*px, *py) == (x, y))
            .map(|(_, _, cell)| *cell)
    }

    pub fn cursor(&self) -> Option<(i32, i32)> {
        self.lock().cursor
    }

    pub fn clear_attributes(&self) -> (u16, u16) {
        self.lock().clear_attributes
    }

    pub fn input_mode(&self) -> i32 {
        self.lock().input_mode
    }

    pub fn inits(&self) -> usize {
        self.lock().inits
    }

    pub fn clears(&self) -> usize {
        self.lock().clears
    }

    pub fn presents(&self) -> usize {
        self.lock().presents
    }

    pub fn shutdowns(&self) -> usize {
        self.lock().shutdowns
    }

    pub fn polls(&self) -> usize {
        self.lock().polls
    }
}

impl Backend for FakeBackend {
    fn init(&mut self) -> io::Result<()> {
        let mut state = self.lock();
        if state.fail_init {
            return Err(io::Error::new(io::ErrorKind::Other, "no terminal"));
        }
        if !state.initialized {
            state.initialized = true;
            state.inits += 1;
        }
        Ok(())
    }

    fn width(&self) -> i32 {
        self.lock().width
    }

    fn height(&self) -> i32 {
        self.lock().height
    }

    fn paint(&mut self, x: i32, y: i32, codepoint: u32, fg: u16, bg: u16) {
        self.lock().paints.push((x, y, Cell::new(codepoint, fg, bg)));
    }

    fn set_cursor(&mut self, x: i32, y: i32) {
        self.lock().cursor = Some((x, y));
    }

    fn clear(&mut self) {
        self.lock().clears += 1;
    }

    fn present(&mut self) -> io::Result<()> {
        let mut state = self.lock();
        if state.fail_present {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "tty gone"));
        }
        state.presents += 1;
        Ok(())
    }

    fn set_clear_attributes(&mut self, fg: u16, bg: u16) {
        self.lock().clear_attributes = (fg, bg);
    }

    fn select_input_mode(&mut self, mode: i32) -> Result<i32, ModeError> {
        let mut state = self.lock();
        match mode {
            0 => Ok(state.input_mode),
            1..=7 => {
                state.input_mode = mode;
                Ok(mode)
            }
            _ => Err(ModeError::Input(mode)),
        }
    }

    fn select_output_mode(&mut self, mode: i32) -> Result<i32, ModeError> {
        let mut state = self.lock();
        match mode {
            0 => Ok(state.output_mode),
            1..=4 => {
                state.output_mode = mode;
                Ok(mode)
            }
            _ => Err(ModeError::Output(mode)),
        }
    }

    fn poll_event(&mut self, _timeout: Duration) -> io::Result<Option<Event>> {
        let mut state = self.lock();
        state.polls += 1;
        if state.fail_poll {
            return Err(io::Error::new(io::ErrorKind::Other, "poll failed"));
        }
        let event = state.events.pop_front();
        if let Some(Event {
            kind: EventKind::Resize,
            width,
            height,
            ..
        }) = event
        {
            state.width = width;
            state.height = height;
        }
        Ok(event)
    }

    fn shutdown(&mut self) {
        let mut state = self.lock();
        if state.initialized {
            state.initialized = false;
            state.shutdowns += 1;
        }
    }
}
