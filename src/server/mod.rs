//! Single-connection server.
//!
//! - **listener**: Unix socket bootstrap (create, bind, listen)
//! - **context**: Backend and shadow buffer owned by one session
//! - **pump**: Backend event polling and forwarding
//! - **session**: The accept → serve → drain loop
//!
//! # Architecture
//!
//! ```text
//! Session
//! ├── UnixStream (the one client)
//! ├── LineFramer (command bytes → lines)
//! ├── EventPump (backend events → client)
//! └── Context
//!     ├── Backend (terminal)
//!     └── ShadowBuffer (read-back mirror)
//! ```

pub mod context;
pub mod listener;
pub mod pump;
pub mod session;

pub use context::Context;
pub use listener::{socket_path, SocketListener};
pub use session::{Session, SessionConfig};
