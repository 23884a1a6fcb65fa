//! Unit tests for health sweeps and remote probe classification.

use super::{harness, name, next_event, remote, subprocess};
use crate::supervisor::{
    adapters::memory::{ProbeOutcome, StaticHttpProbe},
    domain::{HealthStatus, RemoteHttpConfig},
    ports::{HttpProbe, HttpProbeError, MockHttpProbe},
    services::{HealthChecker, PROBE_TIMEOUT},
};
use mockable::DefaultClock;
use rstest::rstest;
use std::sync::Arc;
use tokio::time::Instant;

const DOCS_URL: &str = "https://docs.example.com/mcp";

fn checker<P>(probe: P) -> HealthChecker<P, DefaultClock>
where
    P: HttpProbe + 'static,
{
    HealthChecker::new(Arc::new(probe), Arc::new(DefaultClock))
}

fn docs_config() -> RemoteHttpConfig {
    RemoteHttpConfig::new(DOCS_URL).expect("valid URL")
}

#[rstest]
#[case(200, HealthStatus::Ok, "http 200")]
#[case(302, HealthStatus::Ok, "http 302")]
#[case(401, HealthStatus::AuthNeeded, "AUTH_NEEDED")]
#[case(404, HealthStatus::Warn, "http 404")]
#[case(500, HealthStatus::Warn, "http 500")]
#[tokio::test]
async fn remote_status_codes_are_classified(
    #[case] code: u16,
    #[case] expected: HealthStatus,
    #[case] detail: &str,
) {
    let mut probe = MockHttpProbe::new();
    probe.expect_get().times(1).returning(move |_| Ok(code));

    let report = checker(probe).probe_remote(name("docs"), &docs_config()).await;

    assert_eq!(report.status(), expected);
    assert_eq!(report.detail(), Some(detail));
}

#[rstest]
#[tokio::test]
async fn connection_failure_reports_down() {
    let mut probe = MockHttpProbe::new();
    probe.expect_get().returning(|_| {
        Err(HttpProbeError::connect(std::io::Error::from(
            std::io::ErrorKind::ConnectionRefused,
        )))
    });

    let report = checker(probe).probe_remote(name("docs"), &docs_config()).await;

    assert_eq!(report.status(), HealthStatus::Down);
    assert!(report.status().is_failure());
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn hanging_endpoint_is_down_after_the_probe_timeout() {
    let probe = StaticHttpProbe::new().with_outcome(DOCS_URL, ProbeOutcome::Hang);
    let began = Instant::now();

    let report = checker(probe).probe_remote(name("docs"), &docs_config()).await;

    assert_eq!(report.status(), HealthStatus::Down);
    assert_eq!(report.detail(), Some("timeout"));
    assert!(began.elapsed() >= PROBE_TIMEOUT);
}

#[rstest]
#[tokio::test]
async fn running_subprocess_reports_its_pid() {
    let mut test = harness(vec![subprocess("memory")]);
    test.supervisor
        .start(&subprocess("memory"))
        .await
        .expect("start succeeds");
    let pid = test
        .supervisor
        .handle(&name("memory"))
        .and_then(|handle| handle.pid())
        .expect("pid assigned");

    let sweep = checker(StaticHttpProbe::new())
        .check_all(&mut test.supervisor)
        .await;

    let report = sweep.reports.first().expect("one subprocess report");
    assert_eq!(report.status(), HealthStatus::Ok);
    assert_eq!(report.detail(), Some(format!("pid: {pid}").as_str()));
    assert_eq!(test.launcher.launches().expect("launches readable").len(), 1);
}

#[rstest]
#[tokio::test]
async fn cleanly_exited_subprocess_is_reported_stopped() {
    let mut test = harness(vec![subprocess("sequential")]);
    let handle_id = test
        .supervisor
        .start(&subprocess("sequential"))
        .await
        .expect("start succeeds");
    test.launcher.exit(handle_id, Some(0)).expect("exit simulated");
    let exited = next_event(&mut test.events).await;
    test.supervisor.handle_event(exited).await;

    let report = checker(StaticHttpProbe::new())
        .check_subprocess(&mut test.supervisor, &subprocess("sequential"))
        .await;

    assert_eq!(report.status(), HealthStatus::Dead);
    assert_eq!(report.detail(), Some("stopped (exit 0)"));
    assert_eq!(test.launcher.launches().expect("launches readable").len(), 1);
}

#[rstest]
#[tokio::test]
async fn absent_subprocess_is_revived_by_the_sweep() {
    let mut test = harness(vec![subprocess("memory")]);

    let sweep = checker(StaticHttpProbe::new())
        .check_all(&mut test.supervisor)
        .await;

    let report = sweep.reports.first().expect("one subprocess report");
    assert_eq!(report.status(), HealthStatus::Dead);
    assert_eq!(report.detail(), Some("restarted"));
    assert!(test.supervisor.is_running(&name("memory")));
}

#[rstest]
#[tokio::test]
async fn failed_revival_is_reported_and_does_not_stop_the_sweep() {
    let mut test = harness(vec![subprocess("knowledge-graph"), subprocess("memory")]);
    test.launcher
        .fail_launches_of(name("knowledge-graph"))
        .expect("failure configured");

    let sweep = checker(StaticHttpProbe::new())
        .check_all(&mut test.supervisor)
        .await;

    assert_eq!(sweep.reports.len(), 2);
    let failed = sweep.reports.first().expect("first report");
    assert_eq!(failed.status(), HealthStatus::Dead);
    assert!(
        failed
            .detail()
            .is_some_and(|detail| detail.starts_with("restart failed"))
    );
    assert!(test.supervisor.is_running(&name("memory")));
}

#[rstest]
#[tokio::test]
async fn remote_servers_are_probed_in_spawned_tasks() {
    let mut test = harness(vec![remote("docs", DOCS_URL)]);
    let probe = StaticHttpProbe::new().with_outcome(DOCS_URL, ProbeOutcome::Status(401));

    let sweep = checker(probe).check_all(&mut test.supervisor).await;

    assert!(sweep.reports.is_empty());
    assert_eq!(sweep.probes.len(), 1);
    let mut reports = Vec::new();
    for probe in sweep.probes {
        reports.push(probe.await.expect("probe task completes"));
    }
    let report = reports.first().expect("one remote report");
    assert_eq!(report.status(), HealthStatus::AuthNeeded);
    assert!(test.launcher.launches().expect("launches readable").is_empty());
}
