//! Periodic liveness checks with self-healing for subprocesses.

use super::Supervisor;
use crate::supervisor::{
    domain::{
        HealthReport, HealthStatus, RemoteHttpConfig, ServerConfig, ServerHandle, ServerKind,
        ServerName,
    },
    ports::{HttpProbe, ProcessLauncher},
};
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Interval between health sweeps.
pub const HEALTH_INTERVAL: Duration = Duration::from_secs(30);

/// Upper bound for one remote probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of one sweep over every configured server.
#[derive(Debug, Default)]
pub struct HealthSweep {
    /// Reports for subprocess servers, available immediately.
    pub reports: Vec<HealthReport>,
    /// In-flight remote probes. Dropping them leaves the probes running;
    /// each logs its own result.
    pub probes: Vec<JoinHandle<HealthReport>>,
}

/// Probes remote servers and revives subprocesses with no live handle.
#[derive(Debug)]
pub struct HealthChecker<P, C>
where
    P: HttpProbe + 'static,
    C: Clock + Send + Sync + 'static,
{
    probe: Arc<P>,
    clock: Arc<C>,
    timeout: Duration,
}

impl<P, C> HealthChecker<P, C>
where
    P: HttpProbe + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a health checker with the default probe timeout.
    #[must_use]
    pub const fn new(probe: Arc<P>, clock: Arc<C>) -> Self {
        Self {
            probe,
            clock,
            timeout: PROBE_TIMEOUT,
        }
    }

    /// Overrides the probe timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Checks every server the supervisor knows about.
    ///
    /// Remote probes run as spawned tasks so a slow endpoint never holds up
    /// the caller. Subprocess servers without a live handle are started
    /// again on the spot.
    pub async fn check_all<L, SC>(&self, supervisor: &mut Supervisor<L, SC>) -> HealthSweep
    where
        L: ProcessLauncher,
        SC: Clock + Send + Sync,
    {
        info!(target: "warden::health", "checking servers");
        let mut sweep = HealthSweep::default();
        let configs: Vec<ServerConfig> = supervisor.configs().to_vec();

        for config in &configs {
            match config.kind() {
                ServerKind::RemoteHttp(remote) => {
                    let probe = Arc::clone(&self.probe);
                    let clock = Arc::clone(&self.clock);
                    let timeout = self.timeout;
                    let name = config.name().clone();
                    let remote_config = remote.clone();
                    sweep.probes.push(tokio::spawn(async move {
                        let report =
                            probe_endpoint(&*probe, &*clock, timeout, name, &remote_config).await;
                        log_report(&report);
                        report
                    }));
                }
                ServerKind::Subprocess(_) => {
                    let report = self.check_subprocess(supervisor, config).await;
                    log_report(&report);
                    sweep.reports.push(report);
                }
            }
        }
        sweep
    }

    /// Probes one remote server, bounded by the configured timeout.
    pub async fn probe_remote(&self, name: ServerName, config: &RemoteHttpConfig) -> HealthReport {
        probe_endpoint(&*self.probe, &*self.clock, self.timeout, name, config).await
    }

    /// Checks one subprocess server and restarts it when no handle is
    /// registered or its last launch was terminated on purpose.
    ///
    /// A handle that exited on its own is reported dead with its state and
    /// exit code; the crash path owns any restart.
    pub async fn check_subprocess<L, SC>(
        &self,
        supervisor: &mut Supervisor<L, SC>,
        config: &ServerConfig,
    ) -> HealthReport
    where
        L: ProcessLauncher,
        SC: Clock + Send + Sync,
    {
        let name = config.name().clone();
        if !supervisor.needs_revival(&name) {
            let (status, detail) = match supervisor.handle(&name) {
                Some(handle) if !handle.state().is_live() => {
                    let code = handle
                        .exit_code()
                        .map_or_else(|| "unknown".to_owned(), |code| code.to_string());
                    (
                        HealthStatus::Dead,
                        format!("{} (exit {code})", handle.state().as_str()),
                    )
                }
                handle => {
                    let pid = handle.and_then(ServerHandle::pid);
                    (
                        HealthStatus::Ok,
                        pid.map_or_else(|| "pid: unknown".to_owned(), |pid| format!("pid: {pid}")),
                    )
                }
            };
            return HealthReport::new(name, status, self.clock.utc()).with_detail(detail);
        }

        warn!(target: "warden::health", server = %name, "no live handle; restarting");
        let detail = match supervisor.start(config).await {
            Ok(_) => "restarted".to_owned(),
            Err(err) => format!("restart failed: {err}"),
        };
        HealthReport::new(name, HealthStatus::Dead, self.clock.utc()).with_detail(detail)
    }
}

async fn probe_endpoint<P, C>(
    probe: &P,
    clock: &C,
    timeout: Duration,
    name: ServerName,
    config: &RemoteHttpConfig,
) -> HealthReport
where
    P: HttpProbe + ?Sized,
    C: Clock + ?Sized,
{
    let (status, detail) = match tokio::time::timeout(timeout, probe.get(config)).await {
        Ok(Ok(code)) => {
            let status = HealthStatus::from_http_status(code);
            let detail = if status == HealthStatus::AuthNeeded {
                "AUTH_NEEDED".to_owned()
            } else {
                format!("http {code}")
            };
            (status, detail)
        }
        Ok(Err(err)) => (HealthStatus::Down, err.kind().to_owned()),
        Err(_elapsed) => (HealthStatus::Down, "timeout".to_owned()),
    };
    HealthReport::new(name, status, clock.utc()).with_detail(detail)
}

fn log_report(report: &HealthReport) {
    if report.status().is_failure() {
        warn!(target: "warden::health", server = %report.server(), "{report}");
    } else {
        info!(target: "warden::health", server = %report.server(), "{report}");
    }
}
