//! kickoff-assistant: retrieval-augmented question answering over a local
//! document folder, served as a terminal chat and an HTTP API.
//!
//! Startup loads the documents, builds (or reuses) a persistent vector
//! index and wires a condense-question chat engine on top of it. Both
//! front ends share that engine:
//! - [`repl`] keeps one conversation for the terminal session
//! - [`server`] keeps one conversation per session id

pub mod assistant;
pub mod chat;
pub mod chunk;
pub mod config;
pub mod embed;
pub mod error;
pub mod index;
pub mod llm;
pub mod loader;
pub mod meta;
pub mod openai;
pub mod parse;
pub mod progress;
pub mod repl;
pub mod server;
pub mod session;
pub mod store;
pub mod turn;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};
