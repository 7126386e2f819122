//! Download Protocol
//!
//! Line-oriented request/response protocol spoken with the paired app over
//! the radio link.
//!
//! Requests are plain text (`REQ+DOWNLOAD`, `REQ+DATA`, `REQ+FILE&<name>`).
//! Responses are frames of the form `%TAG%&field&...&%END%`.

pub mod commands;
mod engine;
mod error;
pub mod frame;
mod reader;

pub use commands::Command;
pub use engine::ProtocolEngine;
pub use error::ProtocolError;
pub use frame::Response;
pub use reader::CommandReader;

/// Longest unterminated command buffered before it is dispatched as-is
pub const MAX_COMMAND_LEN: usize = 128;
