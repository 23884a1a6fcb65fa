//! Supervises the capability providers and keeps the aggregated snapshot
//! current.
//!
//! Usage:
//!
//! ```text
//! warden [once|watch]
//! ```
//!
//! `watch` (the default) runs until SIGTERM, SIGINT or Ctrl+C. `once`
//! starts every provider, writes one snapshot, stops the providers and
//! exits. Paths and provider settings come from `WARDEN_*` environment
//! variables; `RUST_LOG` controls log verbosity.

use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use mockable::DefaultClock;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Builder;
use tracing::info;
use tracing_subscriber::util::TryInitError;
use warden::aggregation::domain::SourceRegistry;
use warden::aggregation::services::{Aggregator, ChangeWatcher};
use warden::config::{ConfigError, Settings};
use warden::logging::{DEFAULT_FILTER, init_logging};
use warden::runtime::{ControlLoop, RunMode, RunModeParseError, spawn_signal_listener};
use warden::supervisor::adapters::{ReqwestHttpProbe, TokioProcessLauncher};
use warden::supervisor::ports::HttpProbeError;
use warden::supervisor::services::{PROBE_TIMEOUT, StartupJournal};

/// Fatal startup failures.
#[derive(Debug, Error)]
enum BootstrapError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error(transparent)]
    Mode(#[from] RunModeParseError),
    #[error("failed to install logging: {0}")]
    Logging(#[from] TryInitError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to prepare directory {path}: {source}")]
    Directory {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to build async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("failed to build HTTP probe: {0}")]
    Probe(#[from] HttpProbeError),
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Logging may not be installed yet.
            drop(writeln!(std::io::stderr(), "warden: {err}"));
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), BootstrapError> {
    let mode = parse_args(std::env::args().skip(1))?;
    init_logging(DEFAULT_FILTER)?;
    let settings = Settings::from_env()?;
    info!(
        base = %settings.paths.base,
        data = %settings.paths.data,
        output = %settings.paths.output,
        pid = std::process::id(),
        "paths resolved"
    );

    let data_dir = prepare_dir(&settings.paths.data)?;
    let output_dir = prepare_dir(&settings.paths.output)?;
    let duplicate = |dir: &Dir| {
        dir.try_clone().map_err(|source| BootstrapError::Directory {
            path: settings.paths.data.to_string(),
            source,
        })
    };
    let watcher = ChangeWatcher::new(duplicate(&data_dir)?);
    let journal = if settings.log_startup {
        Some(StartupJournal::new(duplicate(&data_dir)?))
    } else {
        None
    };

    let clock = Arc::new(DefaultClock);
    let aggregator = Aggregator::new(
        SourceRegistry::defaults(),
        data_dir,
        output_dir,
        Arc::clone(&clock),
    );
    let probe = ReqwestHttpProbe::new(PROBE_TIMEOUT)?;

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(BootstrapError::Runtime)?;

    runtime.block_on(async move {
        let mut control = ControlLoop::new(
            settings.servers,
            Arc::new(TokioProcessLauncher::new()),
            Arc::new(probe),
            clock,
            aggregator,
            watcher,
        );
        if let Some(startup_journal) = journal {
            control = control.with_startup_journal(startup_journal);
        }

        let listener = (mode == RunMode::Watch).then(|| spawn_signal_listener(control.sender()));
        let summary = control.run(mode).await;
        if let Some(task) = listener {
            task.abort();
        }
        info!(
            started = summary.start.started.len(),
            failed = summary.start.failed.len(),
            aggregations = summary.aggregations,
            "run complete"
        );
    });
    Ok(())
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<RunMode, BootstrapError> {
    let mode = args
        .next()
        .map_or(Ok(RunMode::default()), |arg| arg.parse::<RunMode>())?;
    if let Some(extra) = args.next() {
        return Err(BootstrapError::InvalidArgs(format!(
            "unexpected extra argument: {extra}"
        )));
    }
    Ok(mode)
}

/// Creates `path` and its parents when missing, then opens it.
fn prepare_dir(path: &Utf8Path) -> Result<Dir, BootstrapError> {
    let to_error = |source| BootstrapError::Directory {
        path: path.to_string(),
        source,
    };
    Dir::create_ambient_dir_all(path, ambient_authority()).map_err(to_error)?;
    Dir::open_ambient_dir(path, ambient_authority()).map_err(to_error)
}
