//! Shadow screen buffer
//!
//! Mirrors every cell written to the terminal so `get_cell` can be answered
//! without reading anything back from the backend. The backend stays
//! authoritative: writes outside the current bounds still reach the backend,
//! only the mirror skips them.

use std::collections::TryReserveError;

/// Foreground/background value meaning "terminal default"
pub const DEFAULT_COLOR: u16 = 0;

/// One grid position's last known content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub codepoint: u32,
    pub fg: u16,
    pub bg: u16,
}

impl Cell {
    pub const fn new(codepoint: u32, fg: u16, bg: u16) -> Self {
        Self { codepoint, fg, bg }
    }

    /// Text form of the codepoint as sent on the wire.
    ///
    /// Control characters (NUL, LF and CR among them) and values that are
    /// not Unicode scalars cannot travel inside a text line and read back
    /// as `?`.
    pub fn glyph(&self) -> char {
        match char::from_u32(self.codepoint) {
            Some(ch) if !ch.is_control() => ch,
            _ => '?',
        }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            codepoint: ' ' as u32,
            fg: DEFAULT_COLOR,
            bg: DEFAULT_COLOR,
        }
    }
}

/// Row-major cell grid.
///
/// Either both dimensions are positive and `cells.len() == width * height`,
/// or the buffer is empty and holds no storage at all.
#[derive(Debug, Default)]
pub struct ShadowBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl ShadowBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Discard the old grid and allocate a fresh one of default cells.
    ///
    /// Non-positive dimensions leave the buffer empty. The only error is an
    /// allocation failure, in which case the buffer is left empty too.
    pub fn resize(&mut self, width: i32, height: i32) -> Result<(), TryReserveError> {
        self.cells = Vec::new();
        self.width = 0;
        self.height = 0;

        if width <= 0 || height <= 0 {
            return Ok(());
        }

        let (width, height) = (width as usize, height as usize);
        let len = width.saturating_mul(height);
        let mut cells = Vec::new();
        cells.try_reserve_exact(len)?;
        cells.resize(len, Cell::default());

        self.cells = cells;
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Reset every cell to the default cell, keeping the allocation.
    pub fn clear(&mut self) {
        self.fill(Cell::default());
    }

    pub fn fill(&mut self, cell: Cell) {
        self.cells.iter_mut().for_each(|c| *c = cell);
    }

    /// Store a cell; out-of-bounds coordinates are ignored.
    pub fn write(&mut self, x: i32, y: i32, cell: Cell) {
        if let Some(index) = self.index(x, y) {
            self.cells[index] = cell;
        }
    }

    /// Read a cell, or `None` when the buffer is empty or the coordinates
    /// fall outside it.
    pub fn read(&self, x: i32, y: i32) -> Option<Cell> {
        self.index(x, y).map(|index| self.cells[index])
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y * self.width + x)
    }
}
