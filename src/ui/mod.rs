//! ui
//!
//! User interaction utilities.
//!
//! # Modules
//!
//! - [`output`] - Console output and runner event printing
//! - [`prompts`] - Confirmations and password prompts
//!
//! Commands print through this module so quiet mode and stream choice
//! stay consistent.

pub mod output;
pub mod prompts;
