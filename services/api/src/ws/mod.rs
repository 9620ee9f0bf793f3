//! WebSocket Session Management
//!
//! Real-time assistant sessions for the browser front end:
//!
//! - `protocol`: the JSON messages exchanged with the client.
//! - `session`: the connection lifecycle and the per-connection assistant.

pub mod protocol;
pub mod session;

pub use session::ws_handler;
