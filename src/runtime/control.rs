//! Event loop owning the supervisor, the aggregator and the watcher.

use crate::aggregation::domain::SourceChanged;
use crate::aggregation::services::{AGGREGATION_INTERVAL, Aggregator, ChangeWatcher};
use crate::supervisor::{
    domain::{ServerConfig, SupervisorEvent},
    ports::{HttpProbe, ProcessLauncher},
    services::{HEALTH_INTERVAL, HealthChecker, StartAllReport, StartupJournal, Supervisor},
};
use mockable::Clock;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Everything the control loop reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEvent {
    /// A process exit or restart timer from the supervisor.
    Supervisor(SupervisorEvent),
    /// A watched source file changed.
    SourceChanged(SourceChanged),
    /// The periodic aggregation tick fired.
    AggregateTick,
    /// The periodic health tick fired.
    HealthTick,
    /// A termination signal arrived.
    Shutdown,
}

/// How long the loop runs after the initial start and aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunMode {
    /// Start, aggregate once, stop everything and return.
    Once,
    /// Keep watching until [`ControlEvent::Shutdown`].
    #[default]
    Watch,
}

impl RunMode {
    /// Returns the command-line spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Once => "once",
            Self::Watch => "watch",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown invocation mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown mode '{0}'; expected once or watch")]
pub struct RunModeParseError(pub String);

impl FromStr for RunMode {
    type Err = RunModeParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "once" => Ok(Self::Once),
            "watch" => Ok(Self::Watch),
            other => Err(RunModeParseError(other.to_owned())),
        }
    }
}

/// Counters describing one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Outcome of the initial start.
    pub start: StartAllReport,
    /// Aggregation passes that wrote a snapshot.
    pub aggregations: usize,
    /// Aggregation passes that failed.
    pub failed_aggregations: usize,
    /// Health sweeps performed.
    pub health_sweeps: usize,
}

/// Single consumer of every [`ControlEvent`].
pub struct ControlLoop<L, P, C>
where
    L: ProcessLauncher,
    P: HttpProbe + 'static,
    C: Clock + Send + Sync + 'static,
{
    supervisor: Supervisor<L, C>,
    health: HealthChecker<P, C>,
    aggregator: Aggregator<C>,
    watcher: ChangeWatcher,
    sender: UnboundedSender<ControlEvent>,
    receiver: UnboundedReceiver<ControlEvent>,
    supervisor_events: Option<UnboundedReceiver<SupervisorEvent>>,
    background: Vec<JoinHandle<()>>,
    health_interval: Duration,
    aggregation_interval: Duration,
    summary: RunSummary,
}

impl<L, P, C> ControlLoop<L, P, C>
where
    L: ProcessLauncher,
    P: HttpProbe + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Wires a supervisor for `configs` to the aggregator and watcher.
    #[must_use]
    pub fn new(
        configs: Vec<ServerConfig>,
        launcher: Arc<L>,
        probe: Arc<P>,
        clock: Arc<C>,
        aggregator: Aggregator<C>,
        watcher: ChangeWatcher,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (supervisor_sender, supervisor_events) = mpsc::unbounded_channel();
        let supervisor = Supervisor::new(configs, launcher, Arc::clone(&clock), supervisor_sender);
        Self {
            supervisor,
            health: HealthChecker::new(probe, clock),
            aggregator,
            watcher,
            sender,
            receiver,
            supervisor_events: Some(supervisor_events),
            background: Vec::new(),
            health_interval: HEALTH_INTERVAL,
            aggregation_interval: AGGREGATION_INTERVAL,
            summary: RunSummary::default(),
        }
    }

    /// Enables startup records for flagged servers.
    #[must_use]
    pub fn with_startup_journal(mut self, journal: StartupJournal) -> Self {
        self.supervisor = self.supervisor.with_startup_journal(journal);
        self
    }

    /// Overrides the pause between server launches.
    #[must_use]
    pub fn with_start_stagger(mut self, stagger: Duration) -> Self {
        self.supervisor = self.supervisor.with_start_stagger(stagger);
        self
    }

    /// Overrides the health and aggregation tick periods.
    #[must_use]
    pub const fn with_intervals(mut self, health: Duration, aggregation: Duration) -> Self {
        self.health_interval = health;
        self.aggregation_interval = aggregation;
        self
    }

    /// Returns a sender for injecting events, such as
    /// [`ControlEvent::Shutdown`] from a signal listener.
    #[must_use]
    pub fn sender(&self) -> UnboundedSender<ControlEvent> {
        self.sender.clone()
    }

    /// Starts every server, aggregates once, then runs according to `mode`.
    ///
    /// Both modes end by stopping every subprocess and detaching the
    /// watches.
    pub async fn run(mut self, mode: RunMode) -> RunSummary {
        info!(mode = %mode, servers = self.supervisor.configs().len(), "warden starting");
        self.bootstrap().await;

        if mode == RunMode::Watch {
            self.attach();
            info!("warden ready");
            while let Some(event) = self.receiver.recv().await {
                if !self.apply(event).await {
                    break;
                }
            }
        }

        self.shutdown().await;
        self.summary
    }

    async fn bootstrap(&mut self) {
        if let Some(events) = self.supervisor_events.take() {
            self.background
                .push(forward(events, self.sender.clone(), ControlEvent::Supervisor));
        }

        match self.aggregator.ensure_sources() {
            Ok(0) => {}
            Ok(created) => info!(target: "warden::aggregator", created, "created missing source files"),
            Err(err) => warn!(target: "warden::aggregator", error = %err, "could not create source files"),
        }

        self.summary.start = self.supervisor.start_all().await;
        self.aggregate();
    }

    fn attach(&mut self) {
        let (source_sender, source_events) = mpsc::unbounded_channel();
        if let Err(err) = self
            .watcher
            .watch_all(self.aggregator.registry(), &source_sender)
        {
            error!(target: "warden::watcher", error = %err, "failed to attach watches");
        }
        self.background.push(forward(
            source_events,
            self.sender.clone(),
            ControlEvent::SourceChanged,
        ));
        self.background.push(spawn_ticker(
            self.health_interval,
            self.sender.clone(),
            ControlEvent::HealthTick,
        ));
        self.background.push(spawn_ticker(
            self.aggregation_interval,
            self.sender.clone(),
            ControlEvent::AggregateTick,
        ));
    }

    /// Applies one event. Returns `false` when the loop should stop.
    async fn apply(&mut self, event: ControlEvent) -> bool {
        match event {
            ControlEvent::Supervisor(notification) => {
                self.supervisor.handle_event(notification).await;
            }
            ControlEvent::SourceChanged(changed) => {
                debug!(target: "warden::watcher", source = %changed.source, "aggregating after change");
                self.aggregate();
            }
            ControlEvent::AggregateTick => self.aggregate(),
            ControlEvent::HealthTick => {
                self.health.check_all(&mut self.supervisor).await;
                self.summary.health_sweeps = self.summary.health_sweeps.saturating_add(1);
            }
            ControlEvent::Shutdown => return false,
        }
        true
    }

    fn aggregate(&mut self) {
        match self.aggregator.aggregate() {
            Ok(_) => {
                self.summary.aggregations = self.summary.aggregations.saturating_add(1);
            }
            Err(err) => {
                error!(target: "warden::aggregator", error = %err, "aggregation failed");
                self.summary.failed_aggregations =
                    self.summary.failed_aggregations.saturating_add(1);
            }
        }
    }

    async fn shutdown(&mut self) {
        info!("shutting down");
        self.supervisor.stop_all().await;
        self.watcher.unwatch_all();
        for task in self.background.drain(..) {
            task.abort();
        }
        info!("warden stopped");
    }
}

fn forward<T>(
    mut source: UnboundedReceiver<T>,
    sink: UnboundedSender<ControlEvent>,
    wrap: fn(T) -> ControlEvent,
) -> JoinHandle<()>
where
    T: Send + 'static,
{
    tokio::spawn(async move {
        while let Some(item) = source.recv().await {
            if sink.send(wrap(item)).is_err() {
                return;
            }
        }
    })
}

fn spawn_ticker(
    period: Duration,
    sink: UnboundedSender<ControlEvent>,
    event: ControlEvent,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if sink.send(event.clone()).is_err() {
                return;
            }
        }
    })
}
