//! host
//!
//! Remote host adapters.
//!
//! # Modules
//!
//! - [`traits`] - The [`HostAdapter`] capability set and [`HostError`]
//! - [`bitbucket`] - Bitbucket Server over REST
//! - [`daemon`] - URL-addressed git servers
//! - [`factory`] - Adapter construction from host records
//! - [`mock`] - Deterministic mock for tests

pub mod bitbucket;
pub mod daemon;
pub mod factory;
pub mod mock;
pub mod traits;

pub use bitbucket::BitbucketHost;
pub use daemon::DaemonHost;
pub use factory::{AdapterFactory, DefaultAdapterFactory};
pub use traits::{HostAdapter, HostError};
