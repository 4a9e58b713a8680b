//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--debug` / `-v`: Enable debug logging
//! - `--no-interactive`: Never prompt
//! - `--quiet` / `-q`: Results and errors only; implies `--no-interactive`
//!
//! Bare repospecs with no subcommand (`got proj/lib`) behave like
//! `got where`.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::core::types::{HostKind, OnUncloned};

/// Got - find, clone and track git repositories by name
#[derive(Parser, Debug)]
#[command(name = "got")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short = 'v', long, visible_alias = "verbose", global = true)]
    pub debug: bool,

    /// Results and errors only; implies --no-interactive
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Never prompt
    #[arg(long, global = true)]
    pub no_interactive: bool,

    /// Repospecs to locate (shorthand for `got where`)
    #[arg(value_name = "REPOSPEC")]
    pub repospecs: Vec<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Interactive when neither `--no-interactive` nor `--quiet` was given,
    /// the config allows it and stdin is a terminal.
    pub fn interactive(&self, configured: bool) -> bool {
        !self.no_interactive && !self.quiet && configured && std::io::stdin().is_terminal()
    }

    /// The command to run; bare repospecs become `where`.
    pub fn into_command(self) -> Option<Command> {
        match self.command {
            Some(command) => Some(command),
            None if self.repospecs.is_empty() => None,
            None => Some(Command::Where(WhereArgs {
                repospecs: self.repospecs,
                ..WhereArgs::default()
            })),
        }
    }
}

/// Output format for commands with machine-readable output.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Plain,
    Json,
}

/// What to do with a repository that has no local clone.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Uncloned {
    Clone,
    Skip,
    Fail,
    Fake,
}

impl From<Uncloned> for OnUncloned {
    fn from(value: Uncloned) -> Self {
        match value {
            Uncloned::Clone => OnUncloned::Clone,
            Uncloned::Skip => OnUncloned::Skip,
            Uncloned::Fail => OnUncloned::Fail,
            Uncloned::Fake => OnUncloned::Fake,
        }
    }
}

/// Host adapter type.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HostType {
    #[default]
    Bitbucket,
    Daemon,
}

impl From<HostType> for HostKind {
    fn from(value: HostType) -> Self {
        match value {
            HostType::Bitbucket => HostKind::Bitbucket,
            HostType::Daemon => HostKind::Daemon,
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the local path of repositories, cloning them if necessary
    #[command(
        visible_alias = "local",
        long_about = "Print the local path of each repository.\n\n\
            Repositories without a local clone are cloned from the first host that \
            serves them and recorded. Repospecs may be patterns (proj/*), files of \
            repospecs (@list.txt) or carry a trailing + to include every dependency.",
        after_help = "\
EXAMPLES:
    # Path of a repository, cloning it on first use
    got where proj/lib

    # A repository and its whole dependency closure
    got where app+

    # Only what is already cloned
    got where --no-clone proj/*"
    )]
    Where(WhereArgs),

    /// Print the clone URL of a repository
    #[command(visible_alias = "remote")]
    Whence {
        repospec: String,

        #[arg(long, value_enum, default_value_t)]
        format: Format,
    },

    /// Record an existing directory as the clone of a repository
    #[command(long_about = "Record an existing directory as the clone of a repository.\n\n\
        Pass - as the directory to forget the recorded clone instead. When the \
        repospec names no host, the host is deduced from the clone's origin.")]
    Here {
        repospec: String,

        /// Directory of the clone, or - to unregister
        dir: String,

        /// Skip the path and origin checks
        #[arg(short, long)]
        force: bool,
    },

    /// Print the repospec of the clone containing a directory
    What {
        /// Directory to look up (default: current directory)
        dir: Option<PathBuf>,
    },

    /// Print the root of the clone containing a directory
    FindRoot {
        /// Directory to look up (default: current directory)
        dir: Option<PathBuf>,
    },

    /// List registered hosts
    Hosts {
        #[arg(long, value_enum, default_value_t)]
        format: Format,
    },

    /// Register a git host
    AddHost(AddHostArgs),

    /// Change a registered host
    EditHost(EditHostArgs),

    /// Remove a registered host
    RmHost { name: String },

    /// List a repository and its dependencies
    #[command(after_help = "\
FORMAT PLACEHOLDERS:
    %rs    repospec without host
    %RS    repospec with host
    %p     local path
    %h     abbreviated HEAD hash
    %H     full HEAD hash
    %%     literal %")]
    Deps {
        /// Repository to start from (default: the clone containing the current directory)
        repospec: Option<String>,

        /// Dependency file to read for the starting repository
        #[arg(long)]
        file: Option<String>,

        /// Output format for each entry
        #[arg(long, default_value = crate::engine::DEFAULT_FORMAT)]
        format: String,

        /// Leave the starting repository out
        #[arg(long)]
        no_root: bool,

        #[arg(long, value_enum)]
        on_uncloned: Option<Uncloned>,
    },

    /// Run a git command in a repository and all its dependencies
    #[command(after_help = "\
PINNED REPOSITORIES:
    commit and push are skipped; fetch and pull fetch and reset to the pinned revision.")]
    Git {
        /// Directory inside the starting repository
        #[arg(short = 'C', long, value_name = "DIR", default_value = ".")]
        directory: PathBuf,

        /// Keep going after a failing command
        #[arg(long)]
        ignore_errors: bool,

        /// Arguments passed to git
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Run a shell command in each repository
    Run {
        #[arg(required = true)]
        repospecs: Vec<String>,

        /// Command to run through the shell
        #[arg(short = 'x', long = "exec", value_name = "COMMAND")]
        command: String,

        /// Run in every repository at once
        #[arg(long)]
        bg: bool,

        /// Keep going after a failing command
        #[arg(long)]
        ignore_errors: bool,

        #[arg(long, value_enum)]
        on_uncloned: Option<Uncloned>,
    },

    /// Move a clone on disk and update its record
    Mv { repospec: String, dest: PathBuf },

    /// Forget clones whose directories no longer exist
    Prune {
        /// Ask before forgetting each clone
        #[arg(short, long)]
        interactive: bool,
    },

    /// Answer repospecs read from stdin, one per line
    Listen {
        #[arg(long, value_enum, default_value_t)]
        format: Format,
    },

    /// Get or set configuration values
    Config {
        /// Key to show or set; all keys are listed when omitted
        key: Option<String>,
        value: Option<String>,
    },

    /// Generate shell completion scripts
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print the stored password of a host
    #[command(hide = true)]
    GetCredential { host: String },
}

#[derive(Args, Debug, Default)]
pub struct WhereArgs {
    #[arg(required = true, value_name = "REPOSPEC")]
    pub repospecs: Vec<String>,

    #[arg(long, value_enum, default_value_t)]
    pub format: Format,

    #[arg(long, value_enum, conflicts_with = "no_clone")]
    pub on_uncloned: Option<Uncloned>,

    /// Do not clone; skip repositories without a local clone
    #[arg(long)]
    pub no_clone: bool,

    /// Clone into this directory (single repospec only)
    #[arg(short, long)]
    pub dest: Option<PathBuf>,

    /// Trust recorded clones even if their directory is gone
    #[arg(long)]
    pub ignore_missing: bool,
}

impl WhereArgs {
    pub fn on_uncloned(&self) -> OnUncloned {
        if self.no_clone {
            OnUncloned::Skip
        } else {
            self.on_uncloned.map(Into::into).unwrap_or_default()
        }
    }
}

#[derive(Args, Debug)]
pub struct AddHostArgs {
    pub name: String,
    pub url: String,

    #[arg(short = 't', long = "type", value_enum, default_value_t)]
    pub kind: HostType,

    #[arg(short, long)]
    pub username: Option<String>,

    /// Password; prompts when given without a value or as -
    #[arg(short, long, num_args = 0..=1, default_missing_value = "-")]
    pub password: Option<String>,

    /// SSH key used instead of API credentials
    #[arg(long)]
    pub ssh_key: Option<PathBuf>,

    /// Clone URL template (%rs is the repository name, %username the login)
    #[arg(long)]
    pub clone_url: Option<String>,

    /// Directory for this host's clones
    #[arg(long)]
    pub clone_root: Option<PathBuf>,

    /// Add the host even if it cannot be reached
    #[arg(long)]
    pub force: bool,
}

/// An empty value clears an optional field.
#[derive(Args, Debug)]
pub struct EditHostArgs {
    pub name: String,

    #[arg(long)]
    pub url: Option<String>,

    #[arg(short, long)]
    pub username: Option<String>,

    /// New password; prompts when given without a value or as -
    #[arg(short, long, num_args = 0..=1, default_missing_value = "-", conflicts_with = "clear_password")]
    pub password: Option<String>,

    /// Remove the stored password
    #[arg(long)]
    pub clear_password: bool,

    #[arg(long)]
    pub ssh_key: Option<PathBuf>,

    #[arg(long)]
    pub clone_url: Option<String>,

    #[arg(long)]
    pub clone_root: Option<PathBuf>,

    /// Point the origin of existing clones at the updated URL
    #[arg(long)]
    pub rewrite_remotes: bool,
}

/// Supported shells for completion.
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
}
