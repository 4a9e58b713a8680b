//! core
//!
//! Core domain types and infrastructure for Got.
//!
//! # Modules
//!
//! - [`types`] - Strong types: HostName, RepoKey, HostKind, OnUncloned
//! - [`repospec`] - The repospec grammar and extended-token parser
//! - [`template`] - `%`-delimited templates for clone URLs and listings
//! - [`config`] - Configuration schema and loading
//! - [`paths`] - Centralized path routing for Got storage
//! - [`lock`] - Exclusive registry lock
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Parsing is pure; nothing here touches the network

pub mod config;
pub mod lock;
pub mod paths;
pub mod repospec;
pub mod template;
pub mod types;
