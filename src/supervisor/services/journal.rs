//! Startup records for providers that never write their own source file.

use crate::clock::display_now;
use crate::supervisor::domain::{ServerConfig, ServerKind, ServerName};
use cap_std::fs_utf8::{Dir, OpenOptions};
use mockable::Clock;
use serde_json::json;
use std::collections::BTreeSet;
use std::io::Write;

/// Appends one `startup` line per server to `<name>.jsonl`, at most once per
/// supervisor lifetime.
#[derive(Debug)]
pub struct StartupJournal {
    data_dir: Dir,
    recorded: BTreeSet<ServerName>,
}

impl StartupJournal {
    /// Creates a journal writing into `data_dir`.
    #[must_use]
    pub const fn new(data_dir: Dir) -> Self {
        Self {
            data_dir,
            recorded: BTreeSet::new(),
        }
    }

    /// Returns the file a server's startup record goes to.
    #[must_use]
    pub fn file_name(name: &ServerName) -> String {
        format!("{name}.jsonl")
    }

    /// Appends the startup record for `config` unless one was already
    /// written during this lifetime.
    ///
    /// Returns `Ok(false)` when the record was skipped.
    ///
    /// # Errors
    ///
    /// Returns I/O errors from opening or appending to the source file.
    pub fn record(
        &mut self,
        config: &ServerConfig,
        pid: Option<u32>,
        clock: &impl Clock,
    ) -> std::io::Result<bool> {
        if !config.records_startup() || self.recorded.contains(config.name()) {
            return Ok(false);
        }

        let cwd = match config.kind() {
            ServerKind::Subprocess(subprocess) => subprocess.working_directory(),
            ServerKind::RemoteHttp(_) => None,
        };
        let record = json!({
            "type": "startup",
            "server": config.name().as_str(),
            "pid": pid,
            "cwd": cwd,
            "ts": display_now(clock),
        });

        let mut options = OpenOptions::new();
        options.append(true).create(true);
        let mut file = self
            .data_dir
            .open_with(Self::file_name(config.name()), &options)?;
        writeln!(file, "{record}")?;

        self.recorded.insert(config.name().clone());
        Ok(true)
    }
}
