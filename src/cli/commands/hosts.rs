//! hosts, add-host, edit-host and rm-host commands - Manage git hosts

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::cli::args::{AddHostArgs, EditHostArgs, Format};
use crate::cli::Context;
use crate::core::types::HostName;
use crate::engine::PasswordChange;
use crate::registry::{Host, HostUpdate};
use crate::ui::{output, prompts};

/// List registered hosts in search order.
pub fn hosts(ctx: &mut Context, format: Format) -> Result<i32> {
    let hosts = ctx.store.hosts().all();
    match format {
        Format::Plain => {
            output::result(format!("{:30} {:20} URL", "Name", "Type"));
            for host in hosts {
                output::result(format!(
                    "{:30} {:20} {}",
                    host.name.as_str(),
                    host.kind.name(),
                    host.url
                ));
            }
        }
        Format::Json => output::result(serde_json::to_string_pretty(hosts)?),
    }
    Ok(0)
}

/// `-p` with no value (or `-`, or empty) means prompt.
fn password_value(ctx: &Context, given: Option<String>) -> Result<Option<String>> {
    match given.as_deref() {
        None => Ok(None),
        Some("-") | Some("") => prompts::password("Password", ctx.interactive)
            .map(Some)
            .context("Failed to read password"),
        Some(_) => Ok(given),
    }
}

/// Register a new host.
pub async fn add_host(ctx: &mut Context, args: AddHostArgs) -> Result<i32> {
    let name = HostName::new(args.name.as_str())?;
    let mut host = Host::new(name.clone(), args.kind.into(), args.url.as_str());
    host.username = args.username.clone().filter(|u| !u.is_empty());
    host.ssh_key_path = args.ssh_key.clone();
    host.clone_url = args.clone_url.clone();
    host.clone_root = args.clone_root.clone();
    let password = password_value(ctx, args.password.clone())?;

    let verbosity = ctx.verbosity;
    let (mut resolver, secrets) = ctx.resolver();
    resolver
        .add_host(host, password, secrets, args.force)
        .await
        .context("Unable to add host")?;
    output::print(format!("Added host {name}"), verbosity);
    Ok(0)
}

fn clearable(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| if v.is_empty() { None } else { Some(v) })
}

fn clearable_path(value: Option<PathBuf>) -> Option<Option<PathBuf>> {
    value.map(|v| {
        if v.as_os_str().is_empty() {
            None
        } else {
            Some(v)
        }
    })
}

/// Change fields of a registered host.
pub async fn edit_host(ctx: &mut Context, args: EditHostArgs) -> Result<i32> {
    let name = HostName::new(args.name.as_str())?;
    let update = HostUpdate {
        url: args.url.clone(),
        username: clearable(args.username.clone()),
        ssh_key_path: clearable_path(args.ssh_key.clone()),
        clone_url: clearable(args.clone_url.clone()),
        clone_root: clearable_path(args.clone_root.clone()),
    };
    let password = if args.clear_password {
        PasswordChange::Clear
    } else {
        match password_value(ctx, args.password.clone())? {
            Some(value) => PasswordChange::Set(value),
            None => PasswordChange::Keep,
        }
    };

    let verbosity = ctx.verbosity;
    let (mut resolver, secrets) = ctx.resolver();
    let report = resolver
        .edit_host(&name, &update, password, secrets, args.rewrite_remotes)
        .await?;

    if update.url.is_some() {
        output::print(format!("New URL: {}", report.host.url), verbosity);
    }
    if update.username.is_some() {
        output::print(
            format!(
                "New username: {}",
                report.host.username.as_deref().unwrap_or("(none)")
            ),
            verbosity,
        );
    }
    for (record, url) in &report.rewritten {
        output::print(format!("{}: origin set to {}", record.repospec(), url), verbosity);
    }
    for record in &report.skipped {
        output::warn(
            format!(
                "{}: {} no longer exists; origin not updated",
                record.repospec(),
                record.path.display()
            ),
            verbosity,
        );
    }
    Ok(0)
}

/// Remove a host. Its clones stay recorded.
pub fn rm_host(ctx: &mut Context, name: &str) -> Result<i32> {
    let name = HostName::new(name)?;
    let verbosity = ctx.verbosity;
    let (mut resolver, secrets) = ctx.resolver();
    let removed = resolver.remove_host(&name, secrets)?;
    output::print(format!("Removed host {}", removed.host.name), verbosity);
    if !removed.orphans.is_empty() {
        output::warn(
            format!(
                "{} clone(s) still refer to {}:\n{}",
                removed.orphans.len(),
                removed.host.name,
                output::format_list(
                    &removed
                        .orphans
                        .iter()
                        .map(|r| r.repospec().to_string())
                        .collect::<Vec<_>>(),
                    "  "
                )
            ),
            verbosity,
        );
    }
    Ok(0)
}
