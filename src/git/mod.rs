//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the only doorway to Git. Engine code depends on the
//! [`Vcs`] trait; no other module imports `git2` or spawns `git`.
//!
//! # Responsibilities
//!
//! - Cloning with host credentials wired through `GIT_ASKPASS`
//! - Reading and rewriting the origin remote
//! - Dirty and HEAD checks for version-pinned clones
//! - Pass-through subcommands with captured output
//!
//! # Example
//!
//! ```
//! use got::git::{MockVcs, Vcs};
//! use std::path::Path;
//!
//! let vcs = MockVcs::new().with_repo(Path::new("/src/tools"), "git://h/tools");
//! assert!(vcs.is_repo(Path::new("/src/tools")));
//! assert_eq!(
//!     vcs.remote_url(Path::new("/src/tools")).unwrap().as_deref(),
//!     Some("git://h/tools")
//! );
//! ```

mod interface;
mod mock;

pub use interface::{CommandOutput, Git, GitError, Vcs, ASKPASS_ENV, HOSTNAME_ENV};
pub use mock::{MockVcs, VcsCall};
