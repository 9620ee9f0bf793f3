//! JARVIS API Library Crate
//!
//! This library contains the web service behind the assistant: the
//! configuration, the in-process backend services, the JSON endpoints, the
//! WebSocket sessions, and routing. The `api` binary is a thin wrapper
//! around it.

pub mod config;
pub mod handlers;
pub mod router;
pub mod services;
pub mod state;
pub mod upstream;
pub mod ws;
