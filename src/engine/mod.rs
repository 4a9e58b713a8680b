//! engine
//!
//! Resolution, traversal and command running over the registry.
//!
//! # Architecture
//!
//! Everything hangs off a [`Resolver`], a session that borrows the
//! [`Store`](crate::registry::Store), an
//! [`AdapterFactory`](crate::host::AdapterFactory) and a
//! [`Vcs`](crate::git::Vcs):
//!
//! - [`resolver`]: repospec to clone path, cloning on demand
//! - [`records`]: `here`, `what`, `find_root`, moves and pruning
//! - [`hosts`]: host administration
//! - [`expand`]: glob and `+` expansion of extended requests
//! - [`deps`]: the dependency graph walker and listing formats
//! - [`runner`]: dependency-ordered git runs and flat shell runs
//! - [`listen`]: the line protocol
//!
//! # Invariants
//!
//! - Only the resolver writes clone records.
//! - Background command workers never see the registry; targets are
//!   resolved before any worker starts.
//! - Nothing is persisted until the caller flushes the store, except in
//!   listen mode and after a move.

pub mod deps;
pub mod errors;
pub mod expand;
pub mod hosts;
pub mod listen;
pub mod records;
pub mod resolver;
pub mod runner;

pub use deps::{read_dependency_file, DepsFormat, DepsOptions, DEFAULT_FORMAT, FORMAT_PLACEHOLDERS};
pub use errors::{GotError, HostAttempt};
pub use expand::Expansion;
pub use hosts::{EditReport, PasswordChange, RemovedHost};
pub use listen::WhereEntry;
pub use records::{HereOutcome, HereTarget, PruneReport};
pub use resolver::{fake_path, ResolveOptions, Resolved, Resolver, FAKE_ROOT};
pub use runner::{run_flat, PinnedBehavior, RunEvent, RunReport};
