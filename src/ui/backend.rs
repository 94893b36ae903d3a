//! Terminal backend
//!
//! The session talks to the terminal only through the [`Backend`] trait.
//! [`CrosstermBackend`] is the production implementation: it keeps a back
//! buffer that drawing calls write into and a front buffer holding what is
//! on screen, and `present` sends only the difference.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use bitflags::bitflags;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::event::Event;
use crate::core::shadow::{Cell, ShadowBuffer, DEFAULT_COLOR};

use super::keymap::KeyMapper;

/// Cursor coordinate that hides the cursor
pub const HIDE_CURSOR: i32 = -1;

/// Attribute bits above the color byte
pub const ATTR_BOLD: u16 = 0x0100;
pub const ATTR_UNDERLINE: u16 = 0x0200;
pub const ATTR_REVERSE: u16 = 0x0400;

bitflags! {
    /// Input mode flags
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct InputMode: i32 {
        const ESC   = 1;
        const ALT   = 2;
        const MOUSE = 4;
    }
}

/// Output color mode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputMode {
    Normal = 1,
    Colors256 = 2,
    Colors216 = 3,
    Grayscale = 4,
}

impl OutputMode {
    fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(OutputMode::Normal),
            2 => Some(OutputMode::Colors256),
            3 => Some(OutputMode::Colors216),
            4 => Some(OutputMode::Grayscale),
            _ => None,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ModeError {
    #[error("Unsupported input mode: {0}")]
    Input(i32),

    #[error("Unsupported output mode: {0}")]
    Output(i32),
}

/// Capabilities the session needs from a terminal
pub trait Backend {
    /// Prepare the terminal. Calling it again is a no-op.
    fn init(&mut self) -> io::Result<()>;

    fn width(&self) -> i32;

    fn height(&self) -> i32;

    /// Set one cell of the back buffer; out-of-bounds writes are ignored.
    fn paint(&mut self, x: i32, y: i32, codepoint: u32, fg: u16, bg: u16);

    fn set_cursor(&mut self, x: i32, y: i32);

    /// Fill the back buffer with the clear attributes.
    fn clear(&mut self);

    /// Flush the back buffer to the physical terminal.
    fn present(&mut self) -> io::Result<()>;

    fn set_clear_attributes(&mut self, fg: u16, bg: u16);

    /// Select an input mode; mode 0 only queries. Returns the mode now in effect.
    fn select_input_mode(&mut self, mode: i32) -> Result<i32, ModeError>;

    /// Select an output mode; mode 0 only queries. Returns the mode now in effect.
    fn select_output_mode(&mut self, mode: i32) -> Result<i32, ModeError>;

    /// Wait at most `timeout` for one event.
    fn poll_event(&mut self, timeout: Duration) -> io::Result<Option<Event>>;

    /// Restore the terminal. Calling it again is a no-op.
    fn shutdown(&mut self);
}

/// Where the backend draws. Opened by `Backend::init`, not before.
pub trait Output: Write {
    fn open(&mut self) -> io::Result<()>;
}

/// Terminal device opened on first `init`
pub struct Tty {
    path: PathBuf,
    file: Option<File>,
}

impl Tty {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            file: None,
        }
    }

    fn file(&mut self) -> io::Result<&mut File> {
        self.file.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "terminal device not open")
        })
    }
}

impl Output for Tty {
    fn open(&mut self) -> io::Result<()> {
        if self.file.is_none() {
            let file = OpenOptions::new().read(true).write(true).open(&self.path)?;
            info!("Opened {}", self.path.display());
            self.file = Some(file);
        }
        Ok(())
    }
}

impl Write for Tty {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file()?.flush()
    }
}

#[cfg(test)]
impl Output for Vec<u8> {
    fn open(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Backend drawing through crossterm
pub struct CrosstermBackend<W: Output> {
    out: W,
    initialized: bool,
    width: i32,
    height: i32,
    back: ShadowBuffer,
    front: ShadowBuffer,
    cursor: (i32, i32),
    clear_fg: u16,
    clear_bg: u16,
    input_mode: InputMode,
    output_mode: OutputMode,
}

impl<W: Output> CrosstermBackend<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            initialized: false,
            width: 0,
            height: 0,
            back: ShadowBuffer::new(),
            front: ShadowBuffer::new(),
            cursor: (HIDE_CURSOR, HIDE_CURSOR),
            clear_fg: DEFAULT_COLOR,
            clear_bg: DEFAULT_COLOR,
            input_mode: InputMode::ESC,
            output_mode: OutputMode::Normal,
        }
    }

    fn blank(&self) -> Cell {
        Cell::new(' ' as u32, self.clear_fg, self.clear_bg)
    }

    /// Reallocate both buffers. The front buffer gets a value no paint can
    /// produce so the next present redraws everything.
    fn resize_buffers(&mut self, width: i32, height: i32) {
        self.width = width;
        self.height = height;
        if self.back.resize(width, height).is_err() || self.front.resize(width, height).is_err() {
            warn!("Failed to allocate {}x{} terminal buffers", width, height);
            return;
        }
        self.back.fill(self.blank());
        self.front.fill(Cell::new(u32::MAX, u16::MAX, u16::MAX));
    }

    fn color(&self, attr: u16) -> Color {
        let value = attr & 0xFF;
        match self.output_mode {
            OutputMode::Normal => match value & 0x0F {
                0 => Color::Reset,
                1 => Color::Black,
                2 => Color::DarkRed,
                3 => Color::DarkGreen,
                4 => Color::DarkYellow,
                5 => Color::DarkBlue,
                6 => Color::DarkMagenta,
                7 => Color::DarkCyan,
                _ => Color::Grey,
            },
            OutputMode::Colors256 => Color::AnsiValue(value as u8),
            OutputMode::Colors216 => Color::AnsiValue(value.min(215) as u8 + 0x10),
            OutputMode::Grayscale => Color::AnsiValue(value.min(23) as u8 + 0xE8),
        }
    }

    fn queue_cell(&mut self, x: i32, y: i32, cell: Cell) -> io::Result<()> {
        let (mut fg, mut bg) = (self.color(cell.fg), self.color(cell.bg));
        if cell.fg & ATTR_REVERSE != 0 {
            std::mem::swap(&mut fg, &mut bg);
        }
        let ch = match char::from_u32(cell.codepoint) {
            Some(ch) if !ch.is_control() => ch,
            _ => ' ',
        };

        queue!(
            self.out,
            MoveTo(x as u16, y as u16),
            SetAttribute(Attribute::Reset),
            SetForegroundColor(fg),
            SetBackgroundColor(bg)
        )?;
        if cell.fg & ATTR_BOLD != 0 {
            queue!(self.out, SetAttribute(Attribute::Bold))?;
        }
        if cell.fg & ATTR_UNDERLINE != 0 {
            queue!(self.out, SetAttribute(Attribute::Underlined))?;
        }
        queue!(self.out, Print(ch))
    }

    fn apply_mouse_capture(&mut self, enable: bool) -> io::Result<()> {
        if enable {
            execute!(self.out, EnableMouseCapture)
        } else {
            execute!(self.out, DisableMouseCapture)
        }
    }
}

impl<W: Output> Backend for CrosstermBackend<W> {
    fn init(&mut self) -> io::Result<()> {
        if self.initialized {
            return Ok(());
        }

        self.out.open()?;
        terminal::enable_raw_mode()?;
        execute!(self.out, EnterAlternateScreen, Hide, Clear(ClearType::All))?;
        if self.input_mode.contains(InputMode::MOUSE) {
            self.apply_mouse_capture(true)?;
        }

        let (cols, rows) = terminal::size()?;
        self.resize_buffers(cols as i32, rows as i32);
        self.initialized = true;

        info!("Terminal initialized: {}x{}", cols, rows);
        Ok(())
    }

    fn width(&self) -> i32 {
        self.width
    }

    fn height(&self) -> i32 {
        self.height
    }

    fn paint(&mut self, x: i32, y: i32, codepoint: u32, fg: u16, bg: u16) {
        self.back.write(x, y, Cell::new(codepoint, fg, bg));
    }

    fn set_cursor(&mut self, x: i32, y: i32) {
        self.cursor = (x, y);
    }

    fn clear(&mut self) {
        let blank = self.blank();
        self.back.fill(blank);
    }

    fn present(&mut self) -> io::Result<()> {
        for y in 0..self.height {
            for x in 0..self.width {
                let (Some(cell), Some(shown)) = (self.back.read(x, y), self.front.read(x, y)) else {
                    continue;
                };
                if cell != shown {
                    self.queue_cell(x, y, cell)?;
                    self.front.write(x, y, cell);
                }
            }
        }

        queue!(self.out, SetAttribute(Attribute::Reset), ResetColor)?;
        match self.cursor {
            (x, y) if x < 0 || y < 0 => queue!(self.out, Hide)?,
            (x, y) => queue!(self.out, MoveTo(x as u16, y as u16), Show)?,
        }
        self.out.flush()
    }

    fn set_clear_attributes(&mut self, fg: u16, bg: u16) {
        self.clear_fg = fg;
        self.clear_bg = bg;
    }

    fn select_input_mode(&mut self, mode: i32) -> Result<i32, ModeError> {
        if mode == 0 {
            return Ok(self.input_mode.bits());
        }
        let mut selected = InputMode::from_bits(mode).ok_or(ModeError::Input(mode))?;

        if !selected.intersects(InputMode::ESC | InputMode::ALT) {
            selected |= InputMode::ESC;
        }
        if selected.contains(InputMode::ESC | InputMode::ALT) {
            selected.remove(InputMode::ALT);
        }

        let mouse_changed =
            selected.contains(InputMode::MOUSE) != self.input_mode.contains(InputMode::MOUSE);
        self.input_mode = selected;
        if mouse_changed && self.initialized {
            if let Err(e) = self.apply_mouse_capture(selected.contains(InputMode::MOUSE)) {
                warn!("Failed to toggle mouse capture: {}", e);
            }
        }

        debug!("Input mode: {:?}", self.input_mode);
        Ok(self.input_mode.bits())
    }

    fn select_output_mode(&mut self, mode: i32) -> Result<i32, ModeError> {
        if mode != 0 {
            self.output_mode = OutputMode::from_code(mode).ok_or(ModeError::Output(mode))?;
            // Colors of everything on screen may have changed
            self.front.fill(Cell::new(u32::MAX, u16::MAX, u16::MAX));
            debug!("Output mode: {:?}", self.output_mode);
        }
        Ok(self.output_mode as i32)
    }

    fn poll_event(&mut self, timeout: Duration) -> io::Result<Option<Event>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }

        let raw = event::read()?;
        if let event::Event::Resize(cols, rows) = raw {
            self.resize_buffers(cols as i32, rows as i32);
        }
        Ok(KeyMapper::map(&raw, self.input_mode))
    }

    fn shutdown(&mut self) {
        if !self.initialized {
            return;
        }
        self.initialized = false;

        if self.input_mode.contains(InputMode::MOUSE) {
            let _ = execute!(self.out, DisableMouseCapture);
        }
        let _ = execute!(
            self.out,
            SetAttribute(Attribute::Reset),
            ResetColor,
            Show,
            LeaveAlternateScreen
        );
        let _ = terminal::disable_raw_mode();
        info!("Terminal restored");
    }
}

impl<W: Output> Drop for CrosstermBackend<W> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
