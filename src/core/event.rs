//! Terminal events forwarded to the controller
//!
//! Numeric values follow the termbox conventions the controllers were
//! written against.

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Event modifier flags
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Modifiers: u8 {
        const ALT    = 0x01;
        const MOTION = 0x02;
    }
}

/// Event type as carried in the `type` field
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    None,
    Key,
    Resize,
    Mouse,
    /// Any other value, only produced by synthetic events
    Other(u8),
}

impl EventKind {
    pub fn code(self) -> u8 {
        match self {
            EventKind::None => 0,
            EventKind::Key => 1,
            EventKind::Resize => 2,
            EventKind::Mouse => 3,
            EventKind::Other(code) => code,
        }
    }
}

impl From<u8> for EventKind {
    fn from(code: u8) -> Self {
        match code {
            0 => EventKind::None,
            1 => EventKind::Key,
            2 => EventKind::Resize,
            3 => EventKind::Mouse,
            other => EventKind::Other(other),
        }
    }
}

/// Key codes for keys that have no character
pub mod key {
    pub const CTRL_TILDE: u16 = 0x00;
    pub const TAB: u16 = 0x09;
    pub const ENTER: u16 = 0x0D;
    pub const ESC: u16 = 0x1B;
    pub const SPACE: u16 = 0x20;
    pub const BACKSPACE2: u16 = 0x7F;

    pub const F1: u16 = 0xFFFF;
    #[allow(dead_code)]
    pub const F12: u16 = 0xFFFF - 11;
    pub const INSERT: u16 = 0xFFFF - 12;
    pub const DELETE: u16 = 0xFFFF - 13;
    pub const HOME: u16 = 0xFFFF - 14;
    pub const END: u16 = 0xFFFF - 15;
    pub const PGUP: u16 = 0xFFFF - 16;
    pub const PGDN: u16 = 0xFFFF - 17;
    pub const ARROW_UP: u16 = 0xFFFF - 18;
    pub const ARROW_DOWN: u16 = 0xFFFF - 19;
    pub const ARROW_LEFT: u16 = 0xFFFF - 20;
    pub const ARROW_RIGHT: u16 = 0xFFFF - 21;
    pub const MOUSE_LEFT: u16 = 0xFFFF - 22;
    pub const MOUSE_RIGHT: u16 = 0xFFFF - 23;
    pub const MOUSE_MIDDLE: u16 = 0xFFFF - 24;
    pub const MOUSE_RELEASE: u16 = 0xFFFF - 25;
    pub const MOUSE_WHEEL_UP: u16 = 0xFFFF - 26;
    pub const MOUSE_WHEEL_DOWN: u16 = 0xFFFF - 27;
}

/// A terminal event. Never stored, only forwarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub modifiers: Modifiers,
    pub key: u16,
    pub ch: u32,
    pub width: i32,
    pub height: i32,
    pub x: i32,
    pub y: i32,
}

impl Event {
    fn empty(kind: EventKind) -> Self {
        Self {
            kind,
            modifiers: Modifiers::empty(),
            key: 0,
            ch: 0,
            width: 0,
            height: 0,
            x: 0,
            y: 0,
        }
    }

    pub fn key(key: u16, ch: u32, modifiers: Modifiers) -> Self {
        Self {
            key,
            ch,
            modifiers,
            ..Self::empty(EventKind::Key)
        }
    }

    pub fn resize(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            ..Self::empty(EventKind::Resize)
        }
    }

    pub fn mouse(key: u16, x: i32, y: i32, modifiers: Modifiers) -> Self {
        Self {
            key,
            x,
            y,
            modifiers,
            ..Self::empty(EventKind::Mouse)
        }
    }
}

/// Renders the wire line, without the trailing newline:
/// `EVENT {"type":T, "mod":M, "key":K, "ch":C, "w":W, "h":H, "x":X, "y":Y}`
impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EVENT {{\"type\":{}, \"mod\":{}, \"key\":{}, \"ch\":{}, \"w\":{}, \"h\":{}, \"x\":{}, \"y\":{}}}",
            self.kind.code(),
            self.modifiers.bits(),
            self.key,
            self.ch,
            self.width,
            self.height,
            self.x,
            self.y,
        )
    }
}
