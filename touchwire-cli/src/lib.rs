//! # touchwire-cli: command-line client
//!
//! Loads a TOML configuration, connects to one remote touch-screen daemon,
//! runs a single gesture or capture command and prints the outcome.

pub mod cli;
pub mod commands;
pub mod config;
