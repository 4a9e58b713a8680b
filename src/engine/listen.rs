//! engine::listen
//!
//! Long-lived resolution over a line protocol. Each input line is an
//! extended repospec; each answer is written and flushed before the next
//! line is read.
//!
//! Plain output is one path per resolved repository. JSON output is one
//! array of `{"repospec", "path"}` objects per request. A request that
//! fails produces an `error:` line (or `{"error": ...}`) and the loop goes
//! on.

use std::io::{BufRead, Write};

use serde::Serialize;

use super::errors::GotError;
use super::resolver::{ResolveOptions, Resolved, Resolver};
use crate::core::repospec::parse_extended;

/// One `where` answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WhereEntry {
    pub repospec: String,
    pub path: String,
}

impl From<&Resolved> for WhereEntry {
    fn from(resolved: &Resolved) -> Self {
        Self {
            repospec: resolved.spec.to_string(),
            path: resolved.path.display().to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorLine {
    error: String,
}

impl Resolver<'_> {
    /// Answer requests from `input` until it is exhausted.
    ///
    /// Returns the number of requests that failed. The registry is flushed
    /// after every request that changed it.
    pub async fn listen<R, W>(
        &mut self,
        input: R,
        mut output: W,
        json: bool,
        options: &ResolveOptions,
        deps_file: &str,
    ) -> Result<usize, GotError>
    where
        R: BufRead,
        W: Write,
    {
        let mut failures = 0;
        for line in input.lines() {
            let line = line.map_err(|e| GotError::io("cannot read request", e))?;
            let request = line.trim();
            if request.is_empty() {
                continue;
            }
            log::debug!("listen: {request}");

            let answer = self.answer(request, options, deps_file).await;
            let text = match answer {
                Ok(entries) => render(&entries, json)?,
                Err(err) => {
                    failures += 1;
                    log::debug!("listen: {request} failed: {err}");
                    render_error(&err, json)?
                }
            };
            output
                .write_all(text.as_bytes())
                .and_then(|()| output.flush())
                .map_err(|e| GotError::io("cannot write response", e))?;

            if self.store().is_dirty() {
                self.store_mut().flush()?;
            }
        }
        Ok(failures)
    }

    async fn answer(
        &mut self,
        request: &str,
        options: &ResolveOptions,
        deps_file: &str,
    ) -> Result<Vec<WhereEntry>, GotError> {
        let requests = parse_extended(request)?;
        let expansion = self.resolve_all(&requests, options, deps_file).await?;
        Ok(expansion.resolved.iter().map(WhereEntry::from).collect())
    }
}

fn render(entries: &[WhereEntry], json: bool) -> Result<String, GotError> {
    if json {
        let line = serde_json::to_string(entries)
            .map_err(|e| GotError::Fatal(format!("cannot encode response: {e}")))?;
        return Ok(format!("{line}\n"));
    }
    Ok(entries.iter().map(|e| format!("{}\n", e.path)).collect())
}

fn render_error(err: &GotError, json: bool) -> Result<String, GotError> {
    // Multi-line messages would break the one-line-per-answer framing.
    let message = err.to_string().replace('\n', " ");
    if json {
        let line = serde_json::to_string(&ErrorLine { error: message })
            .map_err(|e| GotError::Fatal(format!("cannot encode response: {e}")))?;
        return Ok(format!("{line}\n"));
    }
    Ok(format!("error: {message}\n"))
}
