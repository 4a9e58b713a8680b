//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Validates command-specific arguments
//! 2. Calls the engine through a [`Resolver`](crate::engine::Resolver)
//! 3. Formats and displays output
//!
//! Handlers return the process exit code. Engine errors propagate to
//! `main`, which prints them and exits with 1.

mod completion;
mod config_cmd;
mod credential;
mod deps;
mod hosts;
mod records;
mod run;
mod where_cmd;

pub use completion::completion;
pub use credential::get_credential;

use crate::cli::args::Command;
use crate::cli::Context;
use anyhow::Result;

/// Dispatch a command to its handler.
pub async fn dispatch(command: Command, ctx: &mut Context) -> Result<i32> {
    match command {
        Command::Where(args) => where_cmd::where_(ctx, args).await,
        Command::Whence { repospec, format } => where_cmd::whence(ctx, &repospec, format).await,
        Command::Listen { format } => where_cmd::listen(ctx, format).await,

        Command::Here {
            repospec,
            dir,
            force,
        } => records::here(ctx, &repospec, &dir, force).await,
        Command::What { dir } => records::what(ctx, dir.as_deref()),
        Command::FindRoot { dir } => records::find_root(ctx, dir.as_deref()),
        Command::Mv { repospec, dest } => records::mv(ctx, &repospec, &dest),
        Command::Prune { interactive } => records::prune(ctx, interactive),

        Command::Hosts { format } => hosts::hosts(ctx, format),
        Command::AddHost(args) => hosts::add_host(ctx, args).await,
        Command::EditHost(args) => hosts::edit_host(ctx, args).await,
        Command::RmHost { name } => hosts::rm_host(ctx, &name),

        Command::Deps {
            repospec,
            file,
            format,
            no_root,
            on_uncloned,
        } => {
            deps::deps(
                ctx,
                repospec.as_deref(),
                file,
                &format,
                !no_root,
                on_uncloned.map(Into::into).unwrap_or_default(),
            )
            .await
        }
        Command::Git {
            directory,
            ignore_errors,
            args,
        } => run::git(ctx, &directory, &args, ignore_errors).await,
        Command::Run {
            repospecs,
            command,
            bg,
            ignore_errors,
            on_uncloned,
        } => {
            run::run(
                ctx,
                &repospecs,
                &command,
                bg,
                ignore_errors,
                on_uncloned.map(Into::into).unwrap_or_default(),
            )
            .await
        }

        Command::Config { key, value } => config_cmd::config(ctx, key.as_deref(), value.as_deref()),
        Command::Completion { shell } => completion(shell).map(|()| 0),
        Command::GetCredential { host } => get_credential(&ctx.paths, &host).map(|()| 0),
    }
}
