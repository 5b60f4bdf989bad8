//! Interactive chat module
//!
//! A line-oriented chat loop over one conversation at a time.

mod repl;

pub use repl::{ChatCommand, ChatRepl};
