//! End-to-end behaviour of the control loop with in-memory adapters.

use crate::aggregation::{
    domain::{DataSource, SourceRegistry},
    services::{Aggregator, ChangeWatcher, SNAPSHOT_FILE},
};
use crate::runtime::{ControlEvent, ControlLoop, RunMode, RunModeParseError};
use crate::supervisor::{
    adapters::memory::{InMemoryProcessLauncher, ProbeOutcome, StaticHttpProbe},
    domain::{RemoteHttpConfig, ServerConfig, ServerName, SubprocessConfig},
};
use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use filetime::FileTime;
use mockable::DefaultClock;
use rstest::rstest;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const DOCS_URL: &str = "https://docs.example.com/mcp";

type TestLoop = ControlLoop<InMemoryProcessLauncher, StaticHttpProbe, DefaultClock>;

struct Fixture {
    root: TempDir,
    launcher: Arc<InMemoryProcessLauncher>,
}

impl Fixture {
    fn new() -> Self {
        let root = tempfile::tempdir().expect("temp dir");
        std::fs::create_dir(root.path().join("data")).expect("data dir");
        std::fs::create_dir(root.path().join("output")).expect("output dir");
        Self {
            root,
            launcher: Arc::new(InMemoryProcessLauncher::new()),
        }
    }

    fn data_path(&self) -> PathBuf {
        self.root.path().join("data")
    }

    fn snapshot_path(&self) -> PathBuf {
        self.root.path().join("output").join(SNAPSHOT_FILE)
    }

    fn control_loop(&self, watch_interval: Duration) -> TestLoop {
        let registry = SourceRegistry::new(vec![
            DataSource::new("memory", "memory.jsonl").expect("valid source"),
            DataSource::new("context7", "context7.jsonl").expect("valid source"),
        ])
        .expect("valid registry");
        let clock = Arc::new(DefaultClock);
        let aggregator = Aggregator::new(
            registry,
            open(&self.data_path()),
            open(&self.root.path().join("output")),
            Arc::clone(&clock),
        );
        let watcher = ChangeWatcher::new(open(&self.data_path())).with_interval(watch_interval);
        let probe = StaticHttpProbe::new().with_outcome(DOCS_URL, ProbeOutcome::Status(200));

        ControlLoop::new(
            configs(),
            Arc::clone(&self.launcher),
            Arc::new(probe),
            clock,
            aggregator,
            watcher,
        )
        .with_start_stagger(Duration::ZERO)
    }
}

fn open(path: &Path) -> Dir {
    let utf8 = Utf8Path::from_path(path).expect("temp path is UTF-8");
    Dir::open_ambient_dir(utf8, ambient_authority()).expect("directory opens")
}

fn name(value: &str) -> ServerName {
    ServerName::new(value).expect("valid name")
}

fn configs() -> Vec<ServerConfig> {
    let subprocess = |value: &str| {
        ServerConfig::subprocess(
            name(value),
            SubprocessConfig::new("npx").expect("valid command"),
        )
    };
    vec![
        subprocess("memory"),
        subprocess("context7"),
        ServerConfig::remote_http(
            name("docs"),
            RemoteHttpConfig::new(DOCS_URL).expect("valid URL"),
        ),
    ]
}

#[rstest]
#[case("once", RunMode::Once)]
#[case("watch", RunMode::Watch)]
fn run_modes_parse(#[case] input: &str, #[case] expected: RunMode) {
    assert_eq!(input.parse::<RunMode>(), Ok(expected));
    assert_eq!(expected.to_string(), input);
}

#[rstest]
fn unknown_run_mode_is_rejected() {
    assert_eq!(
        "daemon".parse::<RunMode>(),
        Err(RunModeParseError("daemon".to_owned()))
    );
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn once_mode_starts_aggregates_and_stops() {
    let fixture = Fixture::new();

    let summary = fixture
        .control_loop(Duration::from_secs(3))
        .run(RunMode::Once)
        .await;

    assert_eq!(
        summary.start.started,
        vec![name("memory"), name("context7"), name("docs")]
    );
    assert_eq!(summary.aggregations, 1);
    assert!(fixture.snapshot_path().exists());
    assert!(fixture.data_path().join("memory.jsonl").exists());
    assert_eq!(
        fixture.launcher.terminated().expect("terminations readable"),
        vec![name("memory"), name("context7")]
    );
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn watch_mode_runs_periodic_ticks_until_shutdown() {
    let fixture = Fixture::new();
    let control = fixture.control_loop(Duration::from_secs(3));
    let sender = control.sender();

    let (summary, ()) = tokio::join!(control.run(RunMode::Watch), async {
        tokio::time::sleep(Duration::from_secs(61)).await;
        sender.send(ControlEvent::Shutdown).expect("loop listening");
    });

    assert_eq!(summary.health_sweeps, 2);
    assert_eq!(summary.aggregations, 2);
    assert_eq!(summary.failed_aggregations, 0);
    assert_eq!(
        fixture.launcher.terminated().expect("terminations readable").len(),
        2
    );
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn crashed_process_is_restarted_by_the_loop() {
    let fixture = Fixture::new();
    let control = fixture.control_loop(Duration::from_secs(3));
    let sender = control.sender();
    let launcher = Arc::clone(&fixture.launcher);

    let (_summary, ()) = tokio::join!(control.run(RunMode::Watch), async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let crashed = launcher
            .live_handle(&name("memory"))
            .expect("launcher readable")
            .expect("memory is live");
        launcher.exit(crashed, Some(1)).expect("exit simulated");

        tokio::time::sleep(Duration::from_secs(6)).await;
        let relaunched = launcher
            .live_handle(&name("memory"))
            .expect("launcher readable")
            .expect("memory is live again");
        assert_ne!(relaunched, crashed);
        sender.send(ControlEvent::Shutdown).expect("loop listening");
    });

    let memory_launches = fixture
        .launcher
        .launches()
        .expect("launches readable")
        .into_iter()
        .filter(|launched| launched == &name("memory"))
        .count();
    assert_eq!(memory_launches, 2);
}

#[rstest]
#[tokio::test]
async fn source_change_triggers_one_extra_pass() {
    let fixture = Fixture::new();
    let control = fixture
        .control_loop(Duration::from_millis(40))
        .with_intervals(Duration::from_secs(3600), Duration::from_secs(3600));
    let sender = control.sender();
    let memory_file = fixture.data_path().join("memory.jsonl");

    let (summary, ()) = tokio::join!(control.run(RunMode::Watch), async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let later = FileTime::from_unix_time(FileTime::now().unix_seconds() + 30, 0);
        filetime::set_file_mtime(&memory_file, later).expect("mtime updated");
        tokio::time::sleep(Duration::from_millis(600)).await;
        sender.send(ControlEvent::Shutdown).expect("loop listening");
    });

    assert_eq!(summary.aggregations, 2);
}
