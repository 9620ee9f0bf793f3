//! Core logic of the JARVIS assistant.
//!
//! The crate is transport-agnostic: [`classifier`] and [`controller`] are
//! pure, [`dispatcher`] talks to a [`backend::Backend`], and
//! [`assistant::Assistant`] runs everything on tokio for whichever front end
//! embeds it.

pub mod assistant;
pub mod backend;
pub mod classifier;
pub mod controller;
pub mod dispatcher;
pub mod documents;
pub mod error;
pub mod llm_client;
pub mod narrator;
pub mod transcript;
pub mod wire;
