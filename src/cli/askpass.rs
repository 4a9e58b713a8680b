//! cli::askpass
//!
//! Credential answers for git.
//!
//! Git subprocesses started by got get `GIT_ASKPASS` pointing back at the
//! got binary, with `GOT_ASKPASS=1` and the host name in `GOT_HOSTNAME`.
//! Git then runs `got "Username for '...': "` (or `Password ...`) and reads
//! the answer from stdout.
//!
//! This path runs while the parent got holds the registry lock, so it only
//! reads and never locks.

use anyhow::{anyhow, bail, Context as _, Result};

use crate::core::config::Config;
use crate::core::paths::GotPaths;
use crate::core::types::HostName;
use crate::git::{ASKPASS_ENV, HOSTNAME_ENV};
use crate::registry::{FileBackend, Store};
use crate::secrets;

/// Which credential git asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    Username,
    Password,
}

impl Prompt {
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim_start();
        if text.starts_with("Username") {
            Some(Prompt::Username)
        } else if text.starts_with("Password") {
            Some(Prompt::Password)
        } else {
            None
        }
    }
}

/// The prompt, when this process was started by git as an askpass helper.
pub fn requested() -> Option<Prompt> {
    if std::env::var(ASKPASS_ENV).ok().as_deref() != Some("1") {
        return None;
    }
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [prompt] => Prompt::parse(prompt),
        _ => None,
    }
}

/// Print the requested credential for the host named in the environment.
pub fn answer(prompt: &Prompt) -> Result<()> {
    let host = std::env::var(HOSTNAME_ENV)
        .with_context(|| format!("{HOSTNAME_ENV} is not set"))?;
    let host = HostName::new(host)?;
    let paths = GotPaths::from_env()
        .ok_or_else(|| anyhow!("Cannot locate the got directory; set GOT_ROOT"))?;
    println!("{}", lookup(&paths, &host, *prompt)?);
    Ok(())
}

/// The stored credential of `host`.
pub fn lookup(paths: &GotPaths, host: &HostName, prompt: Prompt) -> Result<String> {
    let store = Store::open(Box::new(FileBackend::new(paths.registry_path())))
        .context("Failed to open registry")?;
    let record = store
        .hosts()
        .lookup(host)
        .ok_or_else(|| anyhow!("Unrecognized host: {host}"))?;

    match prompt {
        Prompt::Username => Ok(record.username.clone().unwrap_or_default()),
        Prompt::Password => {
            let config = Config::load(paths).context("Failed to load config")?;
            let secrets = secrets::create_store(config.secrets_provider(), paths)?;
            match secrets.get(&record.password_key())? {
                Some(password) => Ok(password),
                None => bail!("No password stored for host {host}"),
            }
        }
    }
}
