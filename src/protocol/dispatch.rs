//! Command dispatch
//!
//! Turns one command line into backend calls, shadow buffer updates and a
//! reply. Argument counts are checked before anything is touched, so a
//! rejected command leaves all state as it was.

use std::fmt;

use tracing::{debug, warn};

use crate::core::event::{Event, EventKind, Modifiers};
use crate::core::shadow::Cell;
use crate::server::Context;
use crate::ui::Backend;

use super::command::{Command, Verb};

/// Protocol-level failure reported back as `ERROR <reason>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorReason {
    InvalidArgs(Verb),
    UnknownCommand,
    InvalidCoords,
    InputModeFailed,
    OutputModeFailed,
    PresentFailed,
    LineTooLong,
    BackendInitFailed,
}

impl fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorReason::InvalidArgs(verb) => write!(f, "invalid_args_{}", verb.name()),
            ErrorReason::UnknownCommand => f.write_str("unknown_command"),
            ErrorReason::InvalidCoords => f.write_str("invalid_coords_get_cell"),
            ErrorReason::InputModeFailed => f.write_str("tb_select_input_mode_failed"),
            ErrorReason::OutputModeFailed => f.write_str("tb_select_output_mode_failed"),
            ErrorReason::PresentFailed => f.write_str("present_failed"),
            ErrorReason::LineTooLong => f.write_str("line_too_long"),
            ErrorReason::BackendInitFailed => f.write_str("backend_init_failed"),
        }
    }
}

/// A reply line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Ok,
    Cell { x: i32, y: i32, cell: Cell },
    Width(i32),
    Height(i32),
    Error(ErrorReason),
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Ok => f.write_str("OK"),
            Response::Cell { x, y, cell } => write!(
                f,
                "OK_CELL {} {} {} {} {}",
                x,
                y,
                cell.glyph(),
                cell.fg,
                cell.bg
            ),
            Response::Width(n) => write!(f, "OK_WIDTH {}", n),
            Response::Height(n) => write!(f, "OK_HEIGHT {}", n),
            Response::Error(reason) => write!(f, "ERROR {}", reason),
        }
    }
}

/// What the session should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Reply(Response),
    /// Forward an event line instead of replying
    Forward(Event),
    /// Reply `OK`, then end the session
    Shutdown,
    /// Blank line, nothing to send
    Ignore,
}

/// Dispatch one line of text
pub fn dispatch_line<B: Backend>(ctx: &mut Context<B>, line: &str) -> Outcome {
    match Command::parse(line) {
        Some(command) => dispatch(ctx, &command),
        None => Outcome::Ignore,
    }
}

/// Dispatch a parsed command
pub fn dispatch<B: Backend>(ctx: &mut Context<B>, command: &Command<'_>) -> Outcome {
    let Some(verb) = Verb::parse(command.verb) else {
        warn!("Unknown command: {}", command.verb);
        return Outcome::Reply(Response::Error(ErrorReason::UnknownCommand));
    };

    if !verb.arity().accepts(command.args.len()) {
        debug!("Bad argument count for {}: {}", verb.name(), command.args.len());
        return Outcome::Reply(Response::Error(ErrorReason::InvalidArgs(verb)));
    }

    let response = match verb {
        Verb::Present => match ctx.backend.present() {
            Ok(()) => Response::Ok,
            Err(e) => {
                warn!("Present failed: {}", e);
                Response::Error(ErrorReason::PresentFailed)
            }
        },
        Verb::Clear => {
            ctx.backend.clear();
            ctx.shadow.clear();
            Response::Ok
        }
        Verb::Print => {
            print(ctx, command);
            Response::Ok
        }
        Verb::ChangeCell => {
            let (x, y) = (command.int(0), command.int(1));
            let cell = Cell::new(command.u32(2), command.u16(3), command.u16(4));
            paint(ctx, x, y, cell);
            Response::Ok
        }
        Verb::GetCell => {
            let (x, y) = (command.int(0), command.int(1));
            match ctx.shadow.read(x, y) {
                Some(cell) => Response::Cell { x, y, cell },
                None => Response::Error(ErrorReason::InvalidCoords),
            }
        }
        Verb::Width => Response::Width(ctx.backend.width()),
        Verb::Height => Response::Height(ctx.backend.height()),
        Verb::SetCursor => {
            ctx.backend.set_cursor(command.int(0), command.int(1));
            Response::Ok
        }
        Verb::SetInputMode => match ctx.backend.select_input_mode(command.int(0)) {
            Ok(_) => Response::Ok,
            Err(e) => {
                warn!("{}", e);
                Response::Error(ErrorReason::InputModeFailed)
            }
        },
        Verb::SetOutputMode => match ctx.backend.select_output_mode(command.int(0)) {
            Ok(_) => Response::Ok,
            Err(e) => {
                warn!("{}", e);
                Response::Error(ErrorReason::OutputModeFailed)
            }
        },
        Verb::SetClearAttributes => {
            ctx.backend.set_clear_attributes(command.u16(0), command.u16(1));
            Response::Ok
        }
        Verb::DebugSendEvent => return Outcome::Forward(synthetic_event(command)),
        Verb::Shutdown => return Outcome::Shutdown,
    };

    Outcome::Reply(response)
}

/// `print x y fg bg text...`: one cell per scalar, advancing x each time
/// even where the shadow buffer has no room. The text ends at a NUL.
fn print<B: Backend>(ctx: &mut Context<B>, command: &Command<'_>) {
    let (x, y) = (command.int(0), command.int(1));
    let (fg, bg) = (command.u16(2), command.u16(3));
    let text = command.text_from(4);

    let mut column = x;
    for ch in text.chars().take_while(|&ch| ch != '\0') {
        paint(ctx, column, y, Cell::new(ch as u32, fg, bg));
        column = column.saturating_add(1);
    }
}

/// The backend always gets the paint; the mirror only within bounds.
fn paint<B: Backend>(ctx: &mut Context<B>, x: i32, y: i32, cell: Cell) {
    ctx.backend.paint(x, y, cell.codepoint, cell.fg, cell.bg);
    ctx.shadow.write(x, y, cell);
}

/// `DEBUG_SEND_EVENT type mod key ch w h x y`
fn synthetic_event(command: &Command<'_>) -> Event {
    Event {
        kind: EventKind::from(command.u8(0)),
        modifiers: Modifiers::from_bits_retain(command.u8(1)),
        key: command.u16(2),
        ch: command.u32(3),
        width: command.int(4),
        height: command.int(5),
        x: command.int(6),
        y: command.int(7),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;

    fn context(width: i32, height: i32) -> (Context<FakeBackend>, FakeBackend) {
        let backend = FakeBackend::with_size(width, height);
        let handle = backend.clone();
        let mut ctx = Context::new(backend);
        ctx.resync().unwrap();
        (ctx, handle)
    }

    fn reply(ctx: &mut Context<FakeBackend>, line: &str) -> String {
        match dispatch_line(ctx, line) {
            Outcome::Reply(response) => response.to_string(),
            other => panic!("expected a reply to {:?}, got {:?}", line, other),
        }
    }

    #[test]
    fn test_change_cell_then_get_cell() {
        let (mut ctx, backend) = context(10, 5);

        assert_eq!(reply(&mut ctx, "change_cell 3 2 65 4 7"), "OK");
        assert_eq!(reply(&mut ctx, "get_cell 3 2"), "OK_CELL 3 2 A 4 7");
        assert_eq!(backend.cell(3, 2), Some(Cell::new(65, 4, 7)));
    }

    #[test]
    fn test_non_ascii_round_trip() {
        let (mut ctx, _) = context(10, 5);

        assert_eq!(reply(&mut ctx, "change_cell 0 0 8364 1 0"), "OK");
        assert_eq!(reply(&mut ctx, "get_cell 0 0"), "OK_CELL 0 0 € 1 0");
    }

    #[test]
    fn test_print_advances_columns() {
        let (mut ctx, _) = context(10, 5);

        assert_eq!(reply(&mut ctx, "print 0 0 1 2 ab"), "OK");
        assert_eq!(reply(&mut ctx, "get_cell 0 0"), "OK_CELL 0 0 a 1 2");
        assert_eq!(reply(&mut ctx, "get_cell 1 0"), "OK_CELL 1 0 b 1 2");
        assert_eq!(reply(&mut ctx, "get_cell 2 0"), "OK_CELL 2 0   0 0");
    }

    #[test]
    fn test_print_rejoins_words_and_decodes_utf8() {
        let (mut ctx, _) = context(10, 1);

        assert_eq!(reply(&mut ctx, "print 1 0 0 0 añ  b"), "OK");
        assert_eq!(ctx.shadow.read(1, 0).unwrap().codepoint, 'a' as u32);
        assert_eq!(ctx.shadow.read(2, 0).unwrap().codepoint, 'ñ' as u32);
        assert_eq!(ctx.shadow.read(3, 0).unwrap().codepoint, ' ' as u32);
        assert_eq!(ctx.shadow.read(4, 0).unwrap().codepoint, 'b' as u32);
    }

    #[test]
    fn test_print_past_edge_still_paints_backend() {
        let (mut ctx, backend) = context(3, 1);

        assert_eq!(reply(&mut ctx, "print 2 0 5 6 xyz"), "OK");
        assert_eq!(ctx.shadow.read(2, 0), Some(Cell::new('x' as u32, 5, 6)));
        assert_eq!(
            backend.paints(),
            vec![
                (2, 0, Cell::new('x' as u32, 5, 6)),
                (3, 0, Cell::new('y' as u32, 5, 6)),
                (4, 0, Cell::new('z' as u32, 5, 6)),
            ]
        );
    }

    #[test]
    fn test_print_stops_at_nul() {
        let (mut ctx, backend) = context(6, 1);

        assert_eq!(reply(&mut ctx, "print 0 0 1 1 ab\0cd"), "OK");
        assert_eq!(
            backend.paints(),
            vec![
                (0, 0, Cell::new('a' as u32, 1, 1)),
                (1, 0, Cell::new('b' as u32, 1, 1)),
            ]
        );
        assert_eq!(ctx.shadow.read(2, 0), Some(Cell::default()));
    }

    #[test]
    fn test_get_cell_out_of_bounds() {
        let (mut ctx, _) = context(4, 4);

        assert_eq!(reply(&mut ctx, "get_cell 4 0"), "ERROR invalid_coords_get_cell");
        assert_eq!(reply(&mut ctx, "get_cell 0 -1"), "ERROR invalid_coords_get_cell");
    }

    #[test]
    fn test_get_cell_on_empty_cache() {
        let (mut ctx, _) = context(0, 0);
        assert_eq!(reply(&mut ctx, "get_cell 0 0"), "ERROR invalid_coords_get_cell");
    }

    #[test]
    fn test_clear_resets_shadow_and_backend() {
        let (mut ctx, backend) = context(4, 4);

        reply(&mut ctx, "change_cell 1 1 120 3 3");
        assert_eq!(reply(&mut ctx, "clear"), "OK");
        assert_eq!(reply(&mut ctx, "get_cell 1 1"), "OK_CELL 1 1   0 0");
        assert_eq!(backend.clears(), 1);
    }

    #[test]
    fn test_dimension_queries() {
        let (mut ctx, _) = context(80, 24);
        assert_eq!(reply(&mut ctx, "width"), "OK_WIDTH 80");
        assert_eq!(reply(&mut ctx, "height"), "OK_HEIGHT 24");
    }

    #[test]
    fn test_wrong_arity_touches_nothing() {
        let (mut ctx, backend) = context(4, 4);

        let cases = [
            ("present 1", "present"),
            ("clear now", "clear"),
            ("print 0 0 1 2", "print"),
            ("change_cell 0 0 65 1", "change_cell"),
            ("get_cell 0", "get_cell"),
            ("width 1", "width"),
            ("height 1", "height"),
            ("set_cursor 1", "set_cursor"),
            ("set_input_mode", "set_input_mode"),
            ("set_output_mode 1 2", "set_output_mode"),
            ("set_clear_attributes 1", "set_clear_attributes"),
            ("DEBUG_SEND_EVENT 1 2 3", "debug_send_event"),
            ("shutdown now", "shutdown"),
        ];
        for (line, name) in cases {
            assert_eq!(reply(&mut ctx, line), format!("ERROR invalid_args_{}", name));
        }

        assert!(backend.paints().is_empty());
        assert_eq!(backend.clears(), 0);
        assert_eq!(backend.presents(), 0);
        assert_eq!(backend.cursor(), None);
        assert_eq!(ctx.shadow.read(0, 0), Some(Cell::default()));
    }

    #[test]
    fn test_unknown_command() {
        let (mut ctx, _) = context(4, 4);
        assert_eq!(reply(&mut ctx, "frobnicate 1 2"), "ERROR unknown_command");
        assert_eq!(reply(&mut ctx, "PRESENT"), "ERROR unknown_command");
    }

    #[test]
    fn test_lenient_arguments_default_to_zero() {
        let (mut ctx, backend) = context(4, 4);

        assert_eq!(reply(&mut ctx, "set_cursor abc 2"), "OK");
        assert_eq!(backend.cursor(), Some((0, 2)));
    }

    #[test]
    fn test_mode_rejection() {
        let (mut ctx, backend) = context(4, 4);

        assert_eq!(reply(&mut ctx, "set_input_mode 4"), "OK");
        assert_eq!(backend.input_mode(), 4);
        assert_eq!(reply(&mut ctx, "set_input_mode 99"), "ERROR tb_select_input_mode_failed");
        assert_eq!(reply(&mut ctx, "set_output_mode 2"), "OK");
        assert_eq!(reply(&mut ctx, "set_output_mode 9"), "ERROR tb_select_output_mode_failed");
    }

    #[test]
    fn test_present_and_clear_attributes() {
        let (mut ctx, backend) = context(4, 4);

        assert_eq!(reply(&mut ctx, "set_clear_attributes 3 5"), "OK");
        assert_eq!(backend.clear_attributes(), (3, 5));
        assert_eq!(reply(&mut ctx, "present"), "OK");
        assert_eq!(backend.presents(), 1);

        backend.fail_present(true);
        assert_eq!(reply(&mut ctx, "present"), "ERROR present_failed");
    }

    #[test]
    fn test_debug_event_is_forwarded() {
        let (mut ctx, _) = context(4, 4);

        let outcome = dispatch_line(&mut ctx, "DEBUG_SEND_EVENT 1 1 0 955 0 0 0 0");
        let Outcome::Forward(event) = outcome else {
            panic!("expected forwarded event, got {:?}", outcome);
        };
        assert_eq!(event.kind, EventKind::Key);
        assert_eq!(event.modifiers, Modifiers::ALT);
        assert_eq!(event.ch, 955);
        assert_eq!(
            event.to_string(),
            r#"EVENT {"type":1, "mod":1, "key":0, "ch":955, "w":0, "h":0, "x":0, "y":0}"#
        );
    }

    #[test]
    fn test_synthetic_resize_leaves_shadow_alone() {
        let (mut ctx, _) = context(4, 4);

        dispatch_line(&mut ctx, "DEBUG_SEND_EVENT 2 0 0 0 10 10 0 0");
        assert_eq!((ctx.shadow.width(), ctx.shadow.height()), (4, 4));
    }

    #[test]
    fn test_shutdown_and_blank_lines() {
        let (mut ctx, _) = context(4, 4);
        assert_eq!(dispatch_line(&mut ctx, "shutdown"), Outcome::Shutdown);
        assert_eq!(dispatch_line(&mut ctx, ""), Outcome::Ignore);
        assert_eq!(dispatch_line(&mut ctx, "  "), Outcome::Ignore);
    }
}
