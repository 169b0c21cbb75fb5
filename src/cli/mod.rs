//! CLI module for llm-tools
//!
//! Handles command-line argument parsing.

pub mod args;

pub use args::{parse_key_value, Args, Commands, Verbosity};
