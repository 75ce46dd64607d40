//! stratadump CLI library.
//!
//! This module exposes internal types for testing purposes.
//! The main entry point is the `stratadump` binary.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod naming;
pub mod output;
pub mod verify;

// Re-export commonly used types
pub use cli::Args;
