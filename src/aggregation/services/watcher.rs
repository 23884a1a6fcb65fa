//! Modification-time polling over source files.

use crate::aggregation::domain::{DataSource, SourceChanged, SourceRegistry};
use cap_std::fs_utf8::Dir;
use cap_std::time::SystemTime;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Interval between modification-time polls of one source file.
pub const WATCH_INTERVAL: Duration = Duration::from_secs(3);

/// Interval of the unconditional aggregation tick.
pub const AGGREGATION_INTERVAL: Duration = Duration::from_secs(60);

/// Polls every source file and emits [`SourceChanged`] when its
/// modification time moves.
///
/// Each source gets its own task; dropping the watcher aborts them.
#[derive(Debug)]
pub struct ChangeWatcher {
    data_dir: Dir,
    interval: Duration,
    tasks: Vec<JoinHandle<()>>,
}

impl ChangeWatcher {
    /// Creates a watcher over files in `data_dir`.
    #[must_use]
    pub const fn new(data_dir: Dir) -> Self {
        Self {
            data_dir,
            interval: WATCH_INTERVAL,
            tasks: Vec::new(),
        }
    }

    /// Overrides the poll interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Attaches one poller per source.
    ///
    /// The current modification time of each file is the baseline, so
    /// attaching never emits an event by itself.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the data directory handle cannot be
    /// duplicated for a poller.
    pub fn watch_all(
        &mut self,
        registry: &SourceRegistry,
        events: &UnboundedSender<SourceChanged>,
    ) -> std::io::Result<usize> {
        for source in registry {
            let dir = self.data_dir.try_clone()?;
            let baseline = modified(&dir, source);
            let poller = SourcePoller {
                dir,
                source: source.clone(),
                last: baseline,
                events: events.clone(),
            };
            self.tasks.push(tokio::spawn(poller.run(self.interval)));
            info!(target: "warden::watcher", source = %source.name(), file = source.file_name(), "watching");
        }
        Ok(self.tasks.len())
    }

    /// Returns the number of attached pollers.
    #[must_use]
    pub const fn watched(&self) -> usize {
        self.tasks.len()
    }

    /// Aborts every poller.
    pub fn unwatch_all(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!(target: "warden::watcher", "watches detached");
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

struct SourcePoller {
    dir: Dir,
    source: DataSource,
    last: Option<SystemTime>,
    events: UnboundedSender<SourceChanged>,
}

impl SourcePoller {
    async fn run(mut self, period: Duration) {
        let start = tokio::time::Instant::now() + period;
        let mut ticker = tokio::time::interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if !self.poll() {
                debug!(target: "warden::watcher", source = %self.source.name(), "receiver gone; poller exiting");
                return;
            }
        }
    }

    /// Compares the current modification time with the last one seen.
    ///
    /// Returns `false` once nobody listens any more.
    fn poll(&mut self) -> bool {
        let current = modified(&self.dir, &self.source);
        if current == self.last {
            return true;
        }
        self.last = current;
        if current.is_none() {
            warn!(target: "warden::watcher", source = %self.source.name(), "source file disappeared");
            return true;
        }

        info!(target: "warden::watcher", source = %self.source.name(), file = self.source.file_name(), "file changed");
        self.events
            .send(SourceChanged {
                source: self.source.name().clone(),
            })
            .is_ok()
    }
}

fn modified(dir: &Dir, source: &DataSource) -> Option<SystemTime> {
    dir.metadata(source.file_name())
        .and_then(|metadata| metadata.modified())
        .ok()
}
