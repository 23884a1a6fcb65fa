//! Checks that every source file and the aggregated snapshot are sound.
//!
//! Usage:
//!
//! ```text
//! warden-verify
//! ```
//!
//! Prints one line per check followed by the verdict. Exits 0 when every
//! check passed and 1 otherwise. Paths come from the same `WARDEN_*`
//! variables the supervisor reads.

use std::io::Write;
use std::process::ExitCode;
use thiserror::Error;
use tracing_subscriber::util::TryInitError;
use warden::aggregation::domain::SourceRegistry;
use warden::aggregation::services::{IntegrationVerifier, VerifierError};
use warden::config::Paths;
use warden::logging::init_logging;

#[derive(Debug, Error)]
enum VerifyCommandError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("failed to install logging: {0}")]
    Logging(#[from] TryInitError),
    #[error(transparent)]
    Verifier(#[from] VerifierError),
    #[error("failed to write report: {0}")]
    Output(#[from] std::io::Error),
}

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            drop(writeln!(std::io::stderr(), "warden-verify: {err}"));
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<bool, VerifyCommandError> {
    if let Some(extra) = std::env::args().nth(1) {
        return Err(VerifyCommandError::InvalidArgs(format!(
            "unexpected argument: {extra}"
        )));
    }
    init_logging("warn")?;

    let paths = Paths::from_lookup(&|key| std::env::var(key).ok());
    let verifier =
        IntegrationVerifier::open(SourceRegistry::defaults(), &paths.base, &paths.data, &paths.output)?;
    let report = verifier.verify();

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{report}")?;
    Ok(report.passed)
}
