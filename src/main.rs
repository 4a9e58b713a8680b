//! got binary entry point.
//!
//! A thin wrapper over [`got::cli::run`]: errors are printed with their
//! causes and turn into exit code 1.

use std::process::ExitCode;

fn main() -> ExitCode {
    match got::cli::run() {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(u8::MAX)),
        Err(err) => {
            got::ui::output::error(format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}
