//! config command - Get, set, or list configuration values

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::ui::output;

/// List all keys, print one key, or set one key.
pub fn config(ctx: &mut Context, key: Option<&str>, value: Option<&str>) -> Result<i32> {
    let Some(key) = key else {
        for (key, value) in ctx.config.entries() {
            output::result(format!("{} = {}", key, value));
        }
        return Ok(0);
    };

    let old = ctx.config.get(key)?;
    let Some(value) = value else {
        output::result(old);
        return Ok(0);
    };

    ctx.config.set(key, value)?;
    let path = ctx.config.write().context("Failed to write config")?;
    log::debug!("wrote {}", path.display());
    output::result(format!("Old value: {}", old));
    output::result(format!("New value: {}", ctx.config.get(key)?));
    Ok(0)
}
