//! Process launcher backed by `tokio::process`.

use crate::supervisor::{
    domain::{
        HandleId, LineSeverity, OutputStream, ProcessExit, ServerName, classify_output_line,
    },
    ports::{
        ExitNotifier, LaunchRequest, LaunchedProcess, ProcessLauncher, ProcessLauncherError,
        ProcessLauncherResult,
    },
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tracing::{error, info, warn};

type Terminators = HashMap<HandleId, Tracked>;

/// What `terminate` needs to stop one live child.
#[derive(Debug)]
struct Tracked {
    #[cfg_attr(not(unix), expect(dead_code, reason = "only signalled directly on Unix"))]
    pid: Option<u32>,
    acknowledge: oneshot::Sender<()>,
}

/// Launches providers as child processes of the supervisor.
///
/// Each child gets a monitor task that forwards its output to the log,
/// keeps its standard input open, and reports its exit. On Unix,
/// [`ProcessLauncher::terminate`] signals the child directly, so the signal
/// is delivered even when the runtime stops before the monitor runs again.
#[derive(Debug, Clone, Default)]
pub struct TokioProcessLauncher {
    terminators: Arc<Mutex<Terminators>>,
}

impl TokioProcessLauncher {
    /// Creates a launcher with no tracked processes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn terminators(&self) -> ProcessLauncherResult<MutexGuard<'_, Terminators>> {
        self.terminators
            .lock()
            .map_err(|err| ProcessLauncherError::runtime(std::io::Error::other(err.to_string())))
    }
}

#[async_trait]
impl ProcessLauncher for TokioProcessLauncher {
    async fn launch(&self, request: LaunchRequest<'_>) -> ProcessLauncherResult<LaunchedProcess> {
        let config = request.config;
        let mut command = Command::new(config.command());
        command
            .args(config.args())
            .envs(config.env())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false);
        if let Some(directory) = config.working_directory() {
            command.current_dir(directory);
        }

        let mut child = command
            .spawn()
            .map_err(|err| ProcessLauncherError::spawn(config.command(), err))?;
        let pid = child.id();

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(
                request.name.clone(),
                stdout,
                OutputStream::Stdout,
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(
                request.name.clone(),
                stderr,
                OutputStream::Stderr,
            ));
        }

        let (terminate_tx, terminate_rx) = oneshot::channel();
        self.terminators()?.insert(
            request.handle_id,
            Tracked {
                pid,
                acknowledge: terminate_tx,
            },
        );

        tokio::spawn(monitor_child(MonitoredChild {
            child,
            name: request.name.clone(),
            handle_id: request.handle_id,
            exits: request.exits,
            terminate_rx,
            terminators: Arc::clone(&self.terminators),
        }));

        Ok(LaunchedProcess { pid })
    }

    async fn terminate(&self, handle_id: HandleId) -> ProcessLauncherResult<()> {
        let tracked = self
            .terminators()?
            .remove(&handle_id)
            .ok_or(ProcessLauncherError::UnknownHandle(handle_id))?;
        #[cfg(unix)]
        send_sigterm(tracked.pid).map_err(ProcessLauncherError::runtime)?;
        // The monitor may have observed the exit in the meantime.
        if tracked.acknowledge.send(()).is_err() {
            return Err(ProcessLauncherError::UnknownHandle(handle_id));
        }
        Ok(())
    }
}

struct MonitoredChild {
    child: Child,
    name: ServerName,
    handle_id: HandleId,
    exits: ExitNotifier,
    terminate_rx: oneshot::Receiver<()>,
    terminators: Arc<Mutex<Terminators>>,
}

enum Wake {
    Exited(std::io::Result<ExitStatus>),
    TerminateRequested,
    LauncherDropped,
}

async fn monitor_child(monitored: MonitoredChild) {
    let MonitoredChild {
        mut child,
        name,
        handle_id,
        exits,
        mut terminate_rx,
        terminators,
    } = monitored;

    // `Child::wait` closes stdin; providers treat EOF as a shutdown request.
    let stdin = child.stdin.take();

    let wake = tokio::select! {
        status = child.wait() => Wake::Exited(status),
        request = &mut terminate_rx => match request {
            Ok(()) => Wake::TerminateRequested,
            Err(_) => Wake::LauncherDropped,
        },
    };

    let status = match wake {
        Wake::Exited(status) => status,
        Wake::LauncherDropped => child.wait().await,
        Wake::TerminateRequested => {
            #[cfg(not(unix))]
            if let Err(err) = child.start_kill() {
                warn!(target: "warden::supervisor", server = %name, error = %err, "termination request failed");
            }
            child.wait().await
        }
    };
    drop(stdin);

    if let Ok(mut guard) = terminators.lock() {
        guard.remove(&handle_id);
    }

    let code = match status {
        Ok(exit_status) => exit_status.code(),
        Err(err) => {
            warn!(target: "warden::supervisor", server = %name, error = %err, "failed to collect exit status");
            None
        }
    };
    info!(target: "warden::supervisor", server = %name, code = ?code, "process exited");

    if !exits.notify(ProcessExit {
        name,
        handle_id,
        code,
    }) {
        warn!(target: "warden::supervisor", "exit notification dropped; supervisor is gone");
    }
}

/// Sends SIGTERM to `pid`. A process that is already gone is not an error.
#[cfg(unix)]
fn send_sigterm(pid: Option<u32>) -> std::io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let Some(pid) = pid else {
        return Ok(());
    };
    let raw_pid = i32::try_from(pid).map_err(std::io::Error::other)?;
    match kill(Pid::from_raw(raw_pid), Signal::SIGTERM) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(err) => Err(std::io::Error::from(err)),
    }
}

async fn forward_lines<R>(name: ServerName, stream: R, kind: OutputStream)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match classify_output_line(kind, trimmed) {
                    LineSeverity::Info => {
                        info!(target: "warden::supervisor", server = %name, "{trimmed}");
                    }
                    LineSeverity::Error => {
                        error!(target: "warden::supervisor", server = %name, "ERROR: {trimmed}");
                    }
                }
            }
            Ok(None) => break,
            Err(err) => {
                warn!(target: "warden::supervisor", server = %name, error = %err, "output stream failed");
                break;
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::supervisor::domain::{SubprocessConfig, SupervisorEvent};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn shell(script: &str) -> SubprocessConfig {
        SubprocessConfig::new("sh")
            .expect("valid command")
            .with_args(["-c", script])
    }

    async fn next_exit(receiver: &mut mpsc::UnboundedReceiver<SupervisorEvent>) -> ProcessExit {
        let event = tokio::time::timeout(Duration::from_secs(10), receiver.recv())
            .await
            .expect("exit should arrive in time")
            .expect("channel should stay open");
        match event {
            SupervisorEvent::Exited(exit) => exit,
            SupervisorEvent::RestartDue(name) => panic!("unexpected restart event for {name}"),
        }
    }

    #[tokio::test]
    async fn reports_exit_code_of_failed_process() {
        let launcher = TokioProcessLauncher::new();
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let name = ServerName::new("failing").expect("valid name");
        let config = shell("echo starting; echo boom >&2; exit 3");
        let handle_id = HandleId::new();

        let launched = launcher
            .launch(LaunchRequest {
                handle_id,
                name: &name,
                config: &config,
                exits: ExitNotifier::new(sender),
            })
            .await
            .expect("spawn should succeed");
        assert!(launched.pid.is_some());

        let exit = next_exit(&mut receiver).await;
        assert_eq!(exit.handle_id, handle_id);
        assert_eq!(exit.code, Some(3));
    }

    #[tokio::test]
    async fn applies_environment_overrides() {
        let launcher = TokioProcessLauncher::new();
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let name = ServerName::new("env-check").expect("valid name");
        let config = shell(r#"test "$WARDEN_TEST_VALUE" = "expected""#)
            .with_env([("WARDEN_TEST_VALUE".to_owned(), "expected".to_owned())]);

        launcher
            .launch(LaunchRequest {
                handle_id: HandleId::new(),
                name: &name,
                config: &config,
                exits: ExitNotifier::new(sender),
            })
            .await
            .expect("spawn should succeed");

        assert_eq!(next_exit(&mut receiver).await.code, Some(0));
    }

    #[tokio::test]
    async fn terminate_sends_sigterm() {
        let launcher = TokioProcessLauncher::new();
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let name = ServerName::new("sleeper").expect("valid name");
        let config = shell("exec sleep 30");
        let handle_id = HandleId::new();

        launcher
            .launch(LaunchRequest {
                handle_id,
                name: &name,
                config: &config,
                exits: ExitNotifier::new(sender),
            })
            .await
            .expect("spawn should succeed");
        launcher
            .terminate(handle_id)
            .await
            .expect("terminate should succeed");

        let exit = next_exit(&mut receiver).await;
        assert_eq!(exit.code, None);
    }

    #[test]
    fn terminate_signals_before_the_runtime_is_dropped() {
        let temp = tempfile::tempdir().expect("temp dir");
        let marker = temp.path().join("terminated");
        let script = format!(
            "trap 'echo terminated > \"{}\"; exit 0' TERM; sleep 30 & wait",
            marker.display()
        );
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime builds");

        runtime.block_on(async {
            let launcher = TokioProcessLauncher::new();
            let (sender, _receiver) = mpsc::unbounded_channel();
            let name = ServerName::new("trapper").expect("valid name");
            let config = shell(&script);
            let handle_id = HandleId::new();
            launcher
                .launch(LaunchRequest {
                    handle_id,
                    name: &name,
                    config: &config,
                    exits: ExitNotifier::new(sender),
                })
                .await
                .expect("spawn should succeed");
            // Give the shell time to install its trap.
            tokio::time::sleep(Duration::from_millis(300)).await;
            launcher
                .terminate(handle_id)
                .await
                .expect("terminate should succeed");
        });
        drop(runtime);

        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        while !marker.exists() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(50));
        }
        assert!(marker.exists(), "child never received SIGTERM");
    }

    #[tokio::test]
    async fn spawn_failure_is_reported() {
        let launcher = TokioProcessLauncher::new();
        let (sender, _receiver) = mpsc::unbounded_channel();
        let name = ServerName::new("missing").expect("valid name");
        let config = SubprocessConfig::new("/nonexistent/warden-provider").expect("valid command");

        let result = launcher
            .launch(LaunchRequest {
                handle_id: HandleId::new(),
                name: &name,
                config: &config,
                exits: ExitNotifier::new(sender),
            })
            .await;

        assert!(matches!(result, Err(ProcessLauncherError::Spawn { .. })));
    }

    #[tokio::test]
    async fn terminate_unknown_handle_is_rejected() {
        let launcher = TokioProcessLauncher::new();
        let result = launcher.terminate(HandleId::new()).await;
        assert!(matches!(result, Err(ProcessLauncherError::UnknownHandle(_))));
    }
}
