//! git and run commands - Run commands across repositories

use std::path::Path;

use anyhow::Result;

use crate::cli::Context;
use crate::core::repospec::parse_all;
use crate::core::types::OnUncloned;
use crate::engine::{run_flat, ResolveOptions};
use crate::ui::output;

/// Largest exit code a failure count is reported as.
const MAX_EXIT_CODE: usize = 255;

/// Run git in a repository and each of its dependencies.
pub async fn git(
    ctx: &mut Context,
    directory: &Path,
    args: &[String],
    ignore_errors: bool,
) -> Result<i32> {
    let verbosity = ctx.verbosity;
    let deps_file = ctx.config.deps_file().to_string();
    let (mut resolver, _) = ctx.resolver();

    let report = resolver
        .run_git(directory, args, ignore_errors, &deps_file, |event| {
            output::run_event(&event, verbosity)
        })
        .await?;
    log::debug!("git: {} runs, {} failed", report.runs, report.failures);
    Ok(if report.succeeded() { 0 } else { 1 })
}

/// Run a shell command in each listed repository.
///
/// With `--ignore-errors` or `--bg` the exit code is the number of failed
/// commands; otherwise the first failure stops the run with exit code 1.
pub async fn run(
    ctx: &mut Context,
    repospecs: &[String],
    command: &str,
    background: bool,
    ignore_errors: bool,
    on_uncloned: OnUncloned,
) -> Result<i32> {
    let verbosity = ctx.verbosity;
    let deps_file = ctx.config.deps_file().to_string();
    let requests = parse_all(repospecs.iter().map(String::as_str))?;

    // Everything is resolved (and cloned) before the first command starts.
    let targets = {
        let (mut resolver, _) = ctx.resolver();
        resolver
            .resolve_all(&requests, &ResolveOptions::with_policy(on_uncloned), &deps_file)
            .await?
            .resolved
    };

    let report = run_flat(&targets, command, background, ignore_errors, |event| {
        output::run_event(&event, verbosity)
    })
    .await;

    if report.succeeded() {
        Ok(0)
    } else if ignore_errors || background {
        Ok(report.failures.min(MAX_EXIT_CODE) as i32)
    } else {
        Ok(1)
    }
}
