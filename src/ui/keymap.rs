//! Input translation
//!
//! Converts crossterm input events into termbox-style events for the
//! controller.

use crossterm::event::{
    Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};

use crate::core::event::{key, Event, Modifiers};

use super::backend::InputMode;

/// Key mapper for converting crossterm events
pub struct KeyMapper;

impl KeyMapper {
    /// Translate one crossterm event. Returns `None` for events the
    /// controller has no representation for.
    pub fn map(event: &TermEvent, mode: InputMode) -> Option<Event> {
        match event {
            TermEvent::Key(key_event) => Self::map_key(key_event, mode),
            TermEvent::Mouse(mouse_event) if mode.contains(InputMode::MOUSE) => {
                Self::map_mouse(mouse_event)
            }
            TermEvent::Resize(cols, rows) => Some(Event::resize(*cols as i32, *rows as i32)),
            _ => None,
        }
    }

    /// Map a key press
    pub fn map_key(event: &KeyEvent, mode: InputMode) -> Option<Event> {
        if event.kind == KeyEventKind::Release {
            return None;
        }

        let mods = if mode.contains(InputMode::ALT) && event.modifiers.contains(KeyModifiers::ALT)
        {
            Modifiers::ALT
        } else {
            Modifiers::empty()
        };

        let code = match event.code {
            KeyCode::Char(ch) if event.modifiers.contains(KeyModifiers::CONTROL) => {
                Self::control_code(ch)?
            }
            KeyCode::Char(' ') => key::SPACE,
            KeyCode::Char(ch) => return Some(Event::key(0, ch as u32, mods)),
            KeyCode::Enter => key::ENTER,
            KeyCode::Tab => key::TAB,
            KeyCode::Backspace => key::BACKSPACE2,
            KeyCode::Esc => key::ESC,
            KeyCode::F(n @ 1..=12) => key::F1 - (n as u16 - 1),
            KeyCode::Insert => key::INSERT,
            KeyCode::Delete => key::DELETE,
            KeyCode::Home => key::HOME,
            KeyCode::End => key::END,
            KeyCode::PageUp => key::PGUP,
            KeyCode::PageDown => key::PGDN,
            KeyCode::Up => key::ARROW_UP,
            KeyCode::Down => key::ARROW_DOWN,
            KeyCode::Left => key::ARROW_LEFT,
            KeyCode::Right => key::ARROW_RIGHT,
            _ => return None,
        };

        Some(Event::key(code, 0, mods))
    }

    /// Map a mouse event
    pub fn map_mouse(event: &MouseEvent) -> Option<Event> {
        let (code, mods) = match event.kind {
            MouseEventKind::Down(button) => (Self::mouse_button_code(button), Modifiers::empty()),
            MouseEventKind::Drag(button) => (Self::mouse_button_code(button), Modifiers::MOTION),
            MouseEventKind::Up(_) => (key::MOUSE_RELEASE, Modifiers::empty()),
            MouseEventKind::ScrollUp => (key::MOUSE_WHEEL_UP, Modifiers::empty()),
            MouseEventKind::ScrollDown => (key::MOUSE_WHEEL_DOWN, Modifiers::empty()),
            _ => return None,
        };

        Some(Event::mouse(
            code,
            event.column as i32,
            event.row as i32,
            mods,
        ))
    }

    /// Control-key codes, as a terminal would send them
    fn control_code(ch: char) -> Option<u16> {
        let code = match ch.to_ascii_lowercase() {
            c @ 'a'..='z' => c as u16 - 'a' as u16 + 1,
            ' ' | '2' | '@' | '~' => key::CTRL_TILDE,
            '[' | '3' => 0x1B,
            '\\' | '4' => 0x1C,
            ']' | '5' => 0x1D,
            '^' | '6' => 0x1E,
            '_' | '/' | '7' => 0x1F,
            '8' => key::BACKSPACE2,
            _ => return None,
        };
        Some(code)
    }

    fn mouse_button_code(button: MouseButton) -> u16 {
        match button {
            MouseButton::Left => key::MOUSE_LEFT,
            MouseButton::Right => key::MOUSE_RIGHT,
            MouseButton::Middle => key::MOUSE_MIDDLE,
        }
    }
}
