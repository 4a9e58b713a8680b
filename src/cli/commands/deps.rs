//! deps command - List a repository and its dependencies

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::core::repospec::Repospec;
use crate::core::types::OnUncloned;
use crate::engine::{DepsFormat, DepsOptions};
use crate::ui::output;

/// Print one formatted line per repository in the dependency closure.
pub async fn deps(
    ctx: &mut Context,
    repospec: Option<&str>,
    file: Option<String>,
    format: &str,
    include_root: bool,
    on_uncloned: OnUncloned,
) -> Result<i32> {
    let format = DepsFormat::parse(format)?;
    let deps_file = ctx.config.deps_file().to_string();
    let (mut resolver, _) = ctx.resolver();

    let root = match repospec {
        Some(spec) => Repospec::parse(spec)?,
        None => {
            let cwd = std::env::current_dir().context("Failed to determine the current directory")?;
            resolver.what(&cwd)?.repospec()
        }
    };
    let options = DepsOptions {
        file,
        include_root,
        on_uncloned,
    };

    let entries = resolver.list_dependencies(&root, &deps_file, &options).await?;
    for entry in &entries {
        output::result(format.render(entry, resolver.vcs())?);
    }
    Ok(0)
}
