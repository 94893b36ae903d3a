//! Line protocol spoken with the controller.
//!
//! - **framer**: Splits the byte stream into newline-terminated lines
//! - **command**: Tokenizes a line into a verb and lenient arguments
//! - **dispatch**: Executes a command against the session context
//!
//! Client lines are commands. Server lines are either replies (`OK`,
//! `OK_CELL`, `OK_WIDTH`, `OK_HEIGHT`, `ERROR <reason>`) or `EVENT` lines,
//! interleaved freely; clients tell them apart by prefix.

pub mod command;
pub mod dispatch;
pub mod framer;
