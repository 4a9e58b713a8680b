//! get-credential command - Print a host's stored password
//!
//! Used by credential helpers; runs without the registry lock.

use anyhow::Result;

use crate::cli::askpass::{lookup, Prompt};
use crate::core::paths::GotPaths;
use crate::core::types::HostName;
use crate::ui::output;

pub fn get_credential(paths: &GotPaths, host: &str) -> Result<()> {
    let host = HostName::new(host)?;
    output::result(lookup(paths, &host, Prompt::Password)?);
    Ok(())
}
