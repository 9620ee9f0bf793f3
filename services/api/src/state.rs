//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the shared
//! services and configuration handed to every handler and session.

use crate::{config::Config, services::Services};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<Services>,
    pub config: Arc<Config>,
}
