//! cli
//!
//! Command-line interface for Got.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Open the registry under its lock and hand it to the engine
//! - Print results and translate outcomes into exit codes
//!
//! # Architecture
//!
//! The CLI layer is thin. Every command builds an
//! [`engine::Resolver`](crate::engine::Resolver) over the shared
//! [`Context`] and prints what it returns. The registry is flushed once at
//! the end of the invocation, including after a failed command, so clones
//! made before the failure stay recorded.

pub mod args;
pub mod askpass;
pub mod commands;

pub use args::{Cli, Shell};

use anyhow::{anyhow, Context as _, Result};

use crate::core::config::Config;
use crate::core::lock::RegistryLock;
use crate::core::paths::GotPaths;
use crate::engine::Resolver;
use crate::git::Git;
use crate::host::DefaultAdapterFactory;
use crate::registry::{FileBackend, Store};
use crate::secrets::{self, SecretStore};
use crate::ui::output::Verbosity;

/// Everything a command needs for one invocation.
pub struct Context {
    pub verbosity: Verbosity,
    pub interactive: bool,
    pub paths: GotPaths,
    pub config: Config,
    pub store: Store,
    pub factory: DefaultAdapterFactory,
    pub git: Git,
    _lock: RegistryLock,
}

impl Context {
    /// Lock and open the registry under `paths`.
    ///
    /// Prompts are allowed when `allow_prompts` is set and the config does
    /// not disable them.
    pub fn open(paths: GotPaths, verbosity: Verbosity, allow_prompts: bool) -> Result<Self> {
        paths
            .ensure_dirs()
            .with_context(|| format!("Failed to create {}", paths.root().display()))?;
        let config = Config::load(&paths).context("Failed to load config")?;
        let interactive = allow_prompts && config.interactive();

        let lock = RegistryLock::acquire_blocking(&paths)?;

        let store = Store::open(Box::new(FileBackend::new(paths.registry_path())))
            .context("Failed to open registry")?;
        let secrets = secrets::create_store(config.secrets_provider(), &paths)?;
        let factory = DefaultAdapterFactory::new(secrets);
        let git = Git::new(&paths);

        Ok(Self {
            verbosity,
            interactive,
            paths,
            config,
            store,
            factory,
            git,
            _lock: lock,
        })
    }

    /// A resolver over this invocation's registry, with the secret store.
    pub fn resolver(&mut self) -> (Resolver<'_>, &dyn SecretStore) {
        let clone_root = self.config.clone_root();
        let resolver = Resolver::new(&mut self.store, &self.factory, &self.git, clone_root);
        (resolver, self.factory.secrets())
    }

    /// Persist pending registry changes.
    pub fn finish(&mut self) -> Result<()> {
        if self.store.is_dirty() {
            self.store.flush().context("Failed to save registry")?;
        }
        Ok(())
    }
}

/// Run the CLI application and return the process exit code.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<i32> {
    if let Some(prompt) = askpass::requested() {
        return askpass::answer(&prompt).map(|()| 0);
    }

    let cli = Cli::parse_args();
    let verbosity = Verbosity::from_flags(cli.quiet, cli.debug);
    init_logging(verbosity);

    let allow_prompts = cli.interactive(true);
    let command = match cli.into_command() {
        Some(command) => command,
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            return Ok(0);
        }
    };

    let paths = GotPaths::from_env()
        .ok_or_else(|| anyhow!("Cannot locate the got directory; set GOT_ROOT"))?;

    // These never touch the registry lock.
    match command {
        args::Command::Completion { shell } => return commands::completion(shell).map(|()| 0),
        args::Command::GetCredential { ref host } => {
            return commands::get_credential(&paths, host).map(|()| 0)
        }
        _ => {}
    }

    let mut ctx = Context::open(paths, verbosity, allow_prompts)?;
    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(commands::dispatch(command, &mut ctx));
    let saved = ctx.finish();

    let code = result?;
    saved?;
    log::debug!("exit code {code}");
    Ok(code)
}

fn init_logging(verbosity: Verbosity) {
    let env = env_logger::Env::default().default_filter_or(verbosity.log_filter());
    // A second init (tests embedding the CLI) is harmless.
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}
