//! Got - find, clone and track git repositories by name
//!
//! Got maps short repository names ("repospecs") to local clones. A name is
//! looked up in a persisted registry first; when there is no clone, the
//! registered git hosts are searched in order and the first one serving the
//! name is cloned from. Repositories can declare dependencies in a plain text
//! file, and Got walks those graphs to list them or to run commands across
//! all of them.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Resolution, dependency walking and command running
//! - [`core`] - Repospecs, templates, configuration, paths and locking
//! - [`registry`] - Persisted hosts and clone records
//! - [`host`] - Host adapters (Bitbucket, git daemon)
//! - [`git`] - Local git access
//! - [`secrets`] - Secret storage abstraction
//! - [`ui`] - User interaction utilities
//!
//! # Correctness Invariants
//!
//! 1. A `(host, name)` pair has at most one clone record
//! 2. A repository is cloned at most once per operation
//! 3. Dependency walks terminate on cyclic graphs
//! 4. Passwords never enter the registry file

pub mod cli;
pub mod core;
pub mod engine;
pub mod git;
pub mod host;
pub mod registry;
pub mod secrets;
pub mod ui;
