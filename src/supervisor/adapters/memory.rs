//! In-memory supervisor adapters for deterministic tests.

use crate::supervisor::{
    domain::{HandleId, ProcessExit, RemoteHttpConfig, ServerName},
    ports::{
        ExitNotifier, HttpProbe, HttpProbeError, HttpProbeResult, LaunchRequest, LaunchedProcess,
        ProcessLauncher, ProcessLauncherError, ProcessLauncherResult,
    },
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// Base of the fake pid sequence.
const FIRST_FAKE_PID: u32 = 10_000;

/// Launcher that records launches without spawning processes.
///
/// Tests drive exits explicitly through [`InMemoryProcessLauncher::exit`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryProcessLauncher {
    state: Arc<RwLock<InMemoryLauncherState>>,
}

#[derive(Debug, Default)]
struct InMemoryLauncherState {
    next_pid: u32,
    launches: Vec<ServerName>,
    live: HashMap<HandleId, LiveProcess>,
    terminated: Vec<ServerName>,
    failing: HashSet<ServerName>,
}

#[derive(Debug)]
struct LiveProcess {
    name: ServerName,
    exits: ExitNotifier,
}

impl InMemoryProcessLauncher {
    /// Creates an empty launcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every launch of `name` fail with a spawn error.
    ///
    /// # Errors
    ///
    /// Returns launcher runtime errors when lock acquisition fails.
    pub fn fail_launches_of(&self, name: ServerName) -> ProcessLauncherResult<()> {
        self.write()?.failing.insert(name);
        Ok(())
    }

    /// Simulates the exit of the live process with identifier `handle_id`.
    ///
    /// Returns `false` when no such process is live.
    ///
    /// # Errors
    ///
    /// Returns launcher runtime errors when lock acquisition fails.
    pub fn exit(&self, handle_id: HandleId, code: Option<i32>) -> ProcessLauncherResult<bool> {
        let Some(process) = self.write()?.live.remove(&handle_id) else {
            return Ok(false);
        };
        Ok(process.exits.notify(ProcessExit {
            name: process.name,
            handle_id,
            code,
        }))
    }

    /// Returns the names of every launch, in order.
    ///
    /// # Errors
    ///
    /// Returns launcher runtime errors when lock acquisition fails.
    pub fn launches(&self) -> ProcessLauncherResult<Vec<ServerName>> {
        Ok(self.read()?.launches.clone())
    }

    /// Returns the identifier of the live process for `name`, if any.
    ///
    /// # Errors
    ///
    /// Returns launcher runtime errors when lock acquisition fails.
    pub fn live_handle(&self, name: &ServerName) -> ProcessLauncherResult<Option<HandleId>> {
        Ok(self
            .read()?
            .live
            .iter()
            .find(|(_, process)| &process.name == name)
            .map(|(handle_id, _)| *handle_id))
    }

    /// Returns the names of every terminated process, in order.
    ///
    /// # Errors
    ///
    /// Returns launcher runtime errors when lock acquisition fails.
    pub fn terminated(&self) -> ProcessLauncherResult<Vec<ServerName>> {
        Ok(self.read()?.terminated.clone())
    }

    fn read(
        &self,
    ) -> ProcessLauncherResult<std::sync::RwLockReadGuard<'_, InMemoryLauncherState>> {
        self.state
            .read()
            .map_err(|err| ProcessLauncherError::runtime(std::io::Error::other(err.to_string())))
    }

    fn write(
        &self,
    ) -> ProcessLauncherResult<std::sync::RwLockWriteGuard<'_, InMemoryLauncherState>> {
        self.state
            .write()
            .map_err(|err| ProcessLauncherError::runtime(std::io::Error::other(err.to_string())))
    }
}

#[async_trait]
impl ProcessLauncher for InMemoryProcessLauncher {
    async fn launch(&self, request: LaunchRequest<'_>) -> ProcessLauncherResult<LaunchedProcess> {
        let mut state = self.write()?;
        state.launches.push(request.name.clone());
        if state.failing.contains(request.name) {
            return Err(ProcessLauncherError::spawn(
                request.config.command(),
                std::io::Error::from(std::io::ErrorKind::NotFound),
            ));
        }

        let pid = FIRST_FAKE_PID.saturating_add(state.next_pid);
        state.next_pid = state.next_pid.saturating_add(1);
        state.live.insert(
            request.handle_id,
            LiveProcess {
                name: request.name.clone(),
                exits: request.exits,
            },
        );
        Ok(LaunchedProcess { pid: Some(pid) })
    }

    async fn terminate(&self, handle_id: HandleId) -> ProcessLauncherResult<()> {
        let mut state = self.write()?;
        let process = state
            .live
            .remove(&handle_id)
            .ok_or(ProcessLauncherError::UnknownHandle(handle_id))?;
        state.terminated.push(process.name.clone());
        process.exits.notify(ProcessExit {
            name: process.name,
            handle_id,
            code: None,
        });
        Ok(())
    }
}

/// Canned answer for one probed URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Answer with this HTTP status.
    Status(u16),
    /// Fail to connect.
    Unreachable,
    /// Never answer.
    Hang,
}

/// HTTP probe answering from a fixed table keyed by URL.
///
/// Unknown URLs are unreachable.
#[derive(Debug, Clone, Default)]
pub struct StaticHttpProbe {
    outcomes: HashMap<String, ProbeOutcome>,
}

impl StaticHttpProbe {
    /// Creates a probe with no configured answers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the answer for `url`.
    #[must_use]
    pub fn with_outcome(mut self, url: impl Into<String>, outcome: ProbeOutcome) -> Self {
        self.outcomes.insert(url.into(), outcome);
        self
    }
}

#[async_trait]
impl HttpProbe for StaticHttpProbe {
    async fn get(&self, config: &RemoteHttpConfig) -> HttpProbeResult<u16> {
        match self
            .outcomes
            .get(config.url())
            .copied()
            .unwrap_or(ProbeOutcome::Unreachable)
        {
            ProbeOutcome::Status(status) => Ok(status),
            ProbeOutcome::Unreachable => Err(HttpProbeError::connect(std::io::Error::from(
                std::io::ErrorKind::ConnectionRefused,
            ))),
            ProbeOutcome::Hang => {
                std::future::pending::<()>().await;
                Err(HttpProbeError::Timeout)
            }
        }
    }
}
