//! Interactive client for hfchat.
//!
//! Reads prompts line by line, sends each one through the chat context and
//! prints the raw response.

pub mod repl;

pub use repl::run_repl;
