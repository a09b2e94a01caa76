//! Goblin is a persona-driven chat client for a hosted chat-completions API.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns sessions, persona merging, transcripts, configuration and
//!   the HTTP gateway that talks to the model.
//! - [`cli`] parses arguments and runs the interactive terminal loop.
//! - [`panel`] serves the browser panel on top of the same session operations.
//! - [`api`] defines the chat completion payloads sent over the wire.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod logging;
pub mod panel;
pub mod utils;
