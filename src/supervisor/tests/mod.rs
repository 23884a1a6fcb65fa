//! Unit tests for supervisor services.

mod health_tests;

use crate::supervisor::{
    adapters::memory::InMemoryProcessLauncher,
    domain::{RemoteHttpConfig, ServerConfig, ServerName, SubprocessConfig, SupervisorEvent},
    services::Supervisor,
};
use mockable::DefaultClock;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};

pub(super) type TestSupervisor = Supervisor<InMemoryProcessLauncher, DefaultClock>;

pub(super) struct Harness {
    pub launcher: Arc<InMemoryProcessLauncher>,
    pub supervisor: TestSupervisor,
    pub events: UnboundedReceiver<SupervisorEvent>,
}

pub(super) fn name(value: &str) -> ServerName {
    ServerName::new(value).expect("valid server name")
}

pub(super) fn subprocess(value: &str) -> ServerConfig {
    let config = SubprocessConfig::new("npx")
        .expect("valid command")
        .with_args([format!("@example/{value}")]);
    ServerConfig::subprocess(name(value), config)
}

pub(super) fn remote(value: &str, url: &str) -> ServerConfig {
    ServerConfig::remote_http(name(value), RemoteHttpConfig::new(url).expect("valid URL"))
}

pub(super) fn harness(configs: Vec<ServerConfig>) -> Harness {
    let launcher = Arc::new(InMemoryProcessLauncher::new());
    let (sender, events) = mpsc::unbounded_channel();
    let supervisor = Supervisor::new(configs, launcher.clone(), Arc::new(DefaultClock), sender);
    Harness {
        launcher,
        supervisor,
        events,
    }
}

pub(super) async fn next_event(events: &mut UnboundedReceiver<SupervisorEvent>) -> SupervisorEvent {
    events.recv().await.expect("event channel should stay open")
}
