//! Terminal backend and input handling.
//!
//! - **backend**: The `Backend` trait and its crossterm implementation
//! - **keymap**: crossterm input events to controller events

pub mod backend;
pub mod keymap;

pub use backend::{Backend, CrosstermBackend, Tty};
