//! here, what, find-root, mv and prune commands - Manage clone records

use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};

use crate::cli::Context;
use crate::core::repospec::Repospec;
use crate::engine::{HereOutcome, HereTarget};
use crate::ui::{output, prompts};

/// Register or unregister a clone.
pub async fn here(ctx: &mut Context, repospec: &str, dir: &str, force: bool) -> Result<i32> {
    let spec = Repospec::parse(repospec)?;
    let verbosity = ctx.verbosity;
    let (mut resolver, _) = ctx.resolver();

    match resolver.here(&spec, HereTarget::from_arg(dir), force).await? {
        HereOutcome::Registered {
            record,
            deduced,
            previous,
        } => {
            if deduced {
                output::print(format!("Deduced host {}", record.host), verbosity);
            }
            if let Some(previous) = previous.filter(|p| p.path != record.path) {
                output::print(
                    format!("(previously recorded at {})", previous.path.display()),
                    verbosity,
                );
            }
            output::result(format!(
                "{} is located at {}",
                record.repospec(),
                record.path.display()
            ));
        }
        HereOutcome::Unregistered { record } => {
            output::result(format!(
                "{} no longer has a registered local clone",
                record.repospec()
            ));
            if record.path.exists() {
                output::print(
                    format!("(old path still exists on disk: {})", record.path.display()),
                    verbosity,
                );
            }
        }
    }
    Ok(0)
}

fn dir_or_cwd(dir: Option<&Path>) -> Result<PathBuf> {
    match dir {
        Some(dir) => Ok(dir.to_path_buf()),
        None => std::env::current_dir().context("Failed to determine the current directory"),
    }
}

/// Print the repospec of the clone containing a directory.
pub fn what(ctx: &mut Context, dir: Option<&Path>) -> Result<i32> {
    let dir = dir_or_cwd(dir)?;
    let (resolver, _) = ctx.resolver();
    output::result(resolver.what(&dir)?.repospec());
    Ok(0)
}

/// Print the root of the clone containing a directory.
pub fn find_root(ctx: &mut Context, dir: Option<&Path>) -> Result<i32> {
    let dir = dir_or_cwd(dir)?;
    let (resolver, _) = ctx.resolver();
    output::result(resolver.find_root(&dir)?.display());
    Ok(0)
}

/// Move a clone and update its record.
pub fn mv(ctx: &mut Context, repospec: &str, dest: &Path) -> Result<i32> {
    let spec = Repospec::parse(repospec)?;
    let (mut resolver, _) = ctx.resolver();
    let moved = resolver.move_clone(&spec, dest)?;
    output::result(format!(
        "{} moved to {}",
        moved.repospec(),
        moved.path.display()
    ));
    Ok(0)
}

/// Forget clones whose directories are gone.
pub fn prune(ctx: &mut Context, ask: bool) -> Result<i32> {
    let verbosity = ctx.verbosity;
    let interactive = ctx.interactive;
    if ask && !interactive {
        bail!("--interactive needs a terminal");
    }
    let (mut resolver, _) = ctx.resolver();

    let report = resolver.prune(|record| {
        if !ask {
            return true;
        }
        let question = format!(
            "Forget {} (missing {})?",
            record.repospec(),
            record.path.display()
        );
        match prompts::confirm(&question, true, interactive) {
            Ok(answer) => answer,
            Err(err) => {
                output::warn(format!("{}: {}", record.repospec(), err), verbosity);
                false
            }
        }
    });

    for record in &report.removed {
        output::print(format!("Removed {}", record.repospec()), verbosity);
    }
    output::result(format!(
        "Removed {}, kept {}",
        report.removed.len(),
        report.kept
    ));
    Ok(0)
}
