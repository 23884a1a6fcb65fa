//! Provider supervision: start, stop, and restart on failure.

use super::StartupJournal;
use crate::supervisor::{
    domain::{
        HandleId, HandleTarget, ProcessExit, ServerConfig, ServerHandle, ServerKind, ServerName,
        SupervisorDomainError, SupervisorEvent,
    },
    ports::{ExitNotifier, LaunchRequest, ProcessLauncher, ProcessLauncherError},
};
use mockable::Clock;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

/// Delay between a crash and the restart attempt.
pub const RESTART_DELAY: Duration = Duration::from_secs(5);

/// Pause between consecutive launches in [`Supervisor::start_all`].
pub const START_STAGGER: Duration = Duration::from_secs(1);

/// Service-level errors for supervision operations.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] SupervisorDomainError),

    /// Spawning a server failed.
    #[error("failed to start {name}: {source}")]
    Launch {
        /// Server that failed to start.
        name: ServerName,
        /// Launcher failure.
        #[source]
        source: ProcessLauncherError,
    },

    /// Launcher operation failed.
    #[error(transparent)]
    Launcher(#[from] ProcessLauncherError),
}

/// Result type for supervision operations.
pub type SupervisorResult<T> = Result<T, SupervisorError>;

/// What happened in response to a process exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The exit belonged to a launch that is no longer current.
    Ignored,
    /// The server stopped cleanly or on request and stays down.
    Stopped,
    /// The server crashed and a restart was scheduled.
    RestartScheduled,
}

/// Result of starting every configured server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartAllReport {
    /// Servers that started.
    pub started: Vec<ServerName>,
    /// Servers whose start failed.
    pub failed: Vec<ServerName>,
}

/// Owns the live handle registry and applies the restart policy.
///
/// All mutation happens through `&mut self`, from the single control loop
/// that also consumes [`SupervisorEvent`]s.
pub struct Supervisor<L, C>
where
    L: ProcessLauncher,
    C: Clock + Send + Sync,
{
    configs: Vec<ServerConfig>,
    launcher: Arc<L>,
    clock: Arc<C>,
    events: UnboundedSender<SupervisorEvent>,
    handles: BTreeMap<ServerName, ServerHandle>,
    restarting: BTreeMap<ServerName, ServerHandle>,
    journal: Option<StartupJournal>,
    restart_delay: Duration,
    start_stagger: Duration,
}

impl<L, C> Supervisor<L, C>
where
    L: ProcessLauncher,
    C: Clock + Send + Sync,
{
    /// Creates a supervisor for `configs`.
    ///
    /// Exit notifications and restart timers are delivered to `events`; the
    /// owner feeds them back through [`Supervisor::handle_event`].
    #[must_use]
    pub const fn new(
        configs: Vec<ServerConfig>,
        launcher: Arc<L>,
        clock: Arc<C>,
        events: UnboundedSender<SupervisorEvent>,
    ) -> Self {
        Self {
            configs,
            launcher,
            clock,
            events,
            handles: BTreeMap::new(),
            restarting: BTreeMap::new(),
            journal: None,
            restart_delay: RESTART_DELAY,
            start_stagger: START_STAGGER,
        }
    }

    /// Enables startup records for flagged servers.
    #[must_use]
    pub fn with_startup_journal(mut self, journal: StartupJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Overrides the pause between launches in [`Supervisor::start_all`].
    #[must_use]
    pub const fn with_start_stagger(mut self, stagger: Duration) -> Self {
        self.start_stagger = stagger;
        self
    }

    /// Returns the configured servers in start order.
    #[must_use]
    pub fn configs(&self) -> &[ServerConfig] {
        &self.configs
    }

    /// Returns the configuration for `name`.
    #[must_use]
    pub fn config(&self, name: &ServerName) -> Option<&ServerConfig> {
        self.configs.iter().find(|config| config.name() == name)
    }

    /// Returns the registered handle for `name`.
    #[must_use]
    pub fn handle(&self, name: &ServerName) -> Option<&ServerHandle> {
        self.handles.get(name)
    }

    /// Returns every registered handle.
    pub fn handles(&self) -> impl Iterator<Item = &ServerHandle> {
        self.handles.values()
    }

    /// Returns whether `name` has a live handle that was not stopped on
    /// purpose.
    #[must_use]
    pub fn is_running(&self, name: &ServerName) -> bool {
        self.handles
            .get(name)
            .is_some_and(|handle| handle.state().is_live() && !handle.is_killed())
    }

    /// Returns whether a restart is pending for `name`.
    #[must_use]
    pub fn is_restarting(&self, name: &ServerName) -> bool {
        self.restarting.contains_key(name)
    }

    /// Returns whether the health checker should start `name` again: no
    /// handle is registered, or the registered one was killed.
    #[must_use]
    pub fn needs_revival(&self, name: &ServerName) -> bool {
        self.handles
            .get(name)
            .is_none_or(ServerHandle::is_killed)
    }

    /// Starts one server.
    ///
    /// Subprocesses are spawned and recorded as running straight away; the
    /// crash path only begins when an exit event arrives. Remote servers are
    /// registered without any network call.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::Launch`] when the process cannot be
    /// spawned.
    pub async fn start(&mut self, config: &ServerConfig) -> SupervisorResult<HandleId> {
        let handle_id = HandleId::new();
        let target = match config.kind() {
            ServerKind::Subprocess(subprocess) => {
                info!(target: "warden::supervisor", server = %config.name(), command = subprocess.command(), "starting server");
                let launched = self
                    .launcher
                    .launch(LaunchRequest {
                        handle_id,
                        name: config.name(),
                        config: subprocess,
                        exits: ExitNotifier::new(self.events.clone()),
                    })
                    .await
                    .map_err(|source| SupervisorError::Launch {
                        name: config.name().clone(),
                        source,
                    })?;
                HandleTarget::Process { pid: launched.pid }
            }
            ServerKind::RemoteHttp(remote) => {
                info!(target: "warden::supervisor", server = %config.name(), url = remote.url(), "registering HTTP server");
                HandleTarget::Remote(remote.clone())
            }
        };

        let mut handle =
            ServerHandle::starting(handle_id, config.name().clone(), target, &*self.clock);
        handle.mark_running()?;
        let pid = handle.pid();
        self.handles.insert(config.name().clone(), handle);

        if matches!(config.kind(), ServerKind::Subprocess(_)) {
            self.record_startup(config, pid);
        }
        Ok(handle_id)
    }

    /// Starts every configured server in order, pausing between launches.
    ///
    /// A failure is logged and never prevents the remaining servers from
    /// starting.
    pub async fn start_all(&mut self) -> StartAllReport {
        info!(target: "warden::supervisor", count = self.configs.len(), "starting all servers");
        let mut report = StartAllReport::default();
        let configs = self.configs.clone();
        let mut remaining = configs.len();

        for config in &configs {
            match self.start(config).await {
                Ok(_) => report.started.push(config.name().clone()),
                Err(err) => {
                    error!(target: "warden::supervisor", server = %config.name(), error = %err, "failed to start server");
                    report.failed.push(config.name().clone());
                }
            }
            remaining = remaining.saturating_sub(1);
            if remaining > 0 {
                tokio::time::sleep(self.start_stagger).await;
            }
        }

        info!(
            target: "warden::supervisor",
            started = report.started.len(),
            failed = report.failed.len(),
            "all servers started"
        );
        report
    }

    /// Sends a graceful termination request to every subprocess.
    ///
    /// Remote servers have nothing to stop locally and are skipped. Pending
    /// restarts are cancelled.
    pub async fn stop_all(&mut self) {
        self.restarting.clear();
        let names: Vec<ServerName> = self.handles.keys().cloned().collect();

        for name in names {
            let Some(handle) = self.handles.get_mut(&name) else {
                continue;
            };
            if matches!(handle.target(), HandleTarget::Remote(_)) || !handle.state().is_live() {
                continue;
            }

            info!(target: "warden::supervisor", server = %name, "stopping server");
            if let Err(err) = handle.mark_killed() {
                warn!(target: "warden::supervisor", server = %name, error = %err, "handle could not be marked stopped");
                continue;
            }
            let handle_id = handle.id();
            if let Err(err) = self.launcher.terminate(handle_id).await {
                warn!(target: "warden::supervisor", server = %name, error = %err, "termination request failed");
            }
        }
    }

    /// Applies one asynchronous notification.
    pub async fn handle_event(&mut self, event: SupervisorEvent) {
        match event {
            SupervisorEvent::Exited(exit) => {
                self.on_exit(&exit);
            }
            SupervisorEvent::RestartDue(name) => {
                self.on_restart_due(&name).await;
            }
        }
    }

    /// Applies the restart policy to a process exit.
    ///
    /// A non-zero (or signal) exit removes the handle at once and schedules a
    /// restart after the fixed delay. A zero exit, or the exit of a handle
    /// that was stopped on purpose, leaves the server down.
    pub fn on_exit(&mut self, exit: &ProcessExit) -> ExitOutcome {
        let Some(current) = self.handles.get_mut(&exit.name) else {
            debug!(target: "warden::supervisor", server = %exit.name, "exit for unregistered server ignored");
            return ExitOutcome::Ignored;
        };
        if current.id() != exit.handle_id {
            debug!(target: "warden::supervisor", server = %exit.name, "exit of a superseded launch ignored");
            return ExitOutcome::Ignored;
        }

        info!(target: "warden::supervisor", server = %exit.name, code = ?exit.code, "process exited");
        if current.is_killed() || !current.state().is_live() {
            return ExitOutcome::Stopped;
        }
        if exit.is_clean() {
            if let Err(err) = current.mark_stopped(exit.code) {
                warn!(target: "warden::supervisor", server = %exit.name, error = %err, "handle could not be marked stopped");
            }
            return ExitOutcome::Stopped;
        }

        let Some(mut crashed) = self.handles.remove(&exit.name) else {
            return ExitOutcome::Ignored;
        };
        if let Err(err) = crashed
            .mark_crashed(exit.code)
            .and_then(|()| crashed.mark_restarting())
        {
            warn!(target: "warden::supervisor", server = %exit.name, error = %err, "unexpected handle state on crash");
        }
        warn!(
            target: "warden::supervisor",
            server = %exit.name,
            delay_secs = self.restart_delay.as_secs(),
            "restarting after crash"
        );
        self.restarting.insert(exit.name.clone(), crashed);
        self.schedule_restart(exit.name.clone());
        ExitOutcome::RestartScheduled
    }

    async fn on_restart_due(&mut self, name: &ServerName) {
        if self.restarting.remove(name).is_none() {
            debug!(target: "warden::supervisor", server = %name, "restart cancelled");
            return;
        }
        if self.is_running(name) {
            debug!(target: "warden::supervisor", server = %name, "already running; restart skipped");
            return;
        }
        let Some(config) = self.config(name).cloned() else {
            warn!(target: "warden::supervisor", server = %name, "no configuration for restart");
            return;
        };
        if let Err(err) = self.start(&config).await {
            error!(target: "warden::supervisor", server = %name, error = %err, "restart failed");
        }
    }

    fn schedule_restart(&self, name: ServerName) {
        let events = self.events.clone();
        let delay = self.restart_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The supervisor may already be gone during shutdown.
            let _ignored = events.send(SupervisorEvent::RestartDue(name));
        });
    }

    fn record_startup(&mut self, config: &ServerConfig, pid: Option<u32>) {
        let Some(journal) = self.journal.as_mut() else {
            return;
        };
        if let Err(err) = journal.record(config, pid, &*self.clock) {
            warn!(target: "warden::supervisor", server = %config.name(), error = %err, "failed to append startup record");
        }
    }
}
