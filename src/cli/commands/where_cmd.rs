//! where, whence and listen commands - Locate repositories

use std::io;

use anyhow::{bail, Result};
use serde_json::json;

use crate::cli::args::{Format, WhereArgs};
use crate::cli::Context;
use crate::core::repospec::{parse_all, Repospec};
use crate::engine::{ResolveOptions, WhereEntry};
use crate::ui::output;

/// Print the local path of every requested repository.
pub async fn where_(ctx: &mut Context, args: WhereArgs) -> Result<i32> {
    let requests = parse_all(args.repospecs.iter().map(String::as_str))?;
    if args.dest.is_some() {
        let single = matches!(requests.as_slice(), [r] if !r.transitive && !r.spec.is_glob());
        if !single {
            bail!("--dest can only be used with a single repospec");
        }
    }

    let options = ResolveOptions {
        on_uncloned: args.on_uncloned(),
        dest: args.dest.clone(),
        ignore_missing: args.ignore_missing,
    };
    let deps_file = ctx.config.deps_file().to_string();
    let (mut resolver, _) = ctx.resolver();
    let expansion = resolver.resolve_all(&requests, &options, &deps_file).await?;

    let entries: Vec<WhereEntry> = expansion.resolved.iter().map(WhereEntry::from).collect();
    match args.format {
        Format::Plain => entries.iter().for_each(|e| output::result(&e.path)),
        Format::Json => output::result(serde_json::to_string(&entries)?),
    }
    Ok(0)
}

/// Print where a repository would be cloned from.
pub async fn whence(ctx: &mut Context, repospec: &str, format: Format) -> Result<i32> {
    let spec = Repospec::parse(repospec)?;
    let (mut resolver, _) = ctx.resolver();
    let (host, url) = resolver.whence(&spec).await?;
    match format {
        Format::Plain => output::result(url),
        Format::Json => output::result(json!({
            "repospec": spec.with_host(host.clone()).to_string(),
            "host": host.as_str(),
            "url": url,
        })),
    }
    Ok(0)
}

/// Answer repospecs from stdin until it closes.
pub async fn listen(ctx: &mut Context, format: Format) -> Result<i32> {
    let deps_file = ctx.config.deps_file().to_string();
    let (mut resolver, _) = ctx.resolver();
    let failures = resolver
        .listen(
            io::stdin().lock(),
            io::stdout().lock(),
            format == Format::Json,
            &ResolveOptions::default(),
            &deps_file,
        )
        .await?;
    log::debug!("listen: {failures} failed requests");
    Ok(0)
}
