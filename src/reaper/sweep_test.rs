use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use maplit::btreemap;
use maplit::btreeset;
use pretty_assertions::assert_eq;

use crate::Config;
use crate::clock::Clock;
use crate::error::SubmitError;
use crate::reaper::ContainerReaper;
use crate::tree::DataTreeView;
use crate::tree::DeleteContainerRequest;
use crate::tree::EphemeralOwner;
use crate::tree::NodeView;
use crate::tree::RequestPipeline;

/// A data tree fixture; a `None` node is listed but vanished before lookup.
#[derive(Default)]
struct MockTree {
    containers: BTreeMap<String, Option<NodeView>>,
    ttls: BTreeMap<String, Option<NodeView>>,
}

impl DataTreeView for MockTree {
    fn container_paths(&self) -> BTreeSet<String> {
        self.containers.keys().cloned().collect()
    }

    fn ttl_paths(&self) -> BTreeSet<String> {
        self.ttls.keys().cloned().collect()
    }

    fn node(&self, path: &str) -> Option<NodeView> {
        self.containers.get(path).or_else(|| self.ttls.get(path)).cloned().flatten()
    }
}

#[derive(Default, Clone)]
struct MockPipeline {
    submitted: Arc<Mutex<Vec<String>>>,
    refuse: BTreeSet<String>,
}

impl MockPipeline {
    fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }
}

impl RequestPipeline for MockPipeline {
    fn submit(&self, request: DeleteContainerRequest) -> Result<(), SubmitError> {
        if self.refuse.contains(&request.path) {
            return Err(SubmitError::message(&request.path, "not the leader"));
        }
        self.submitted.lock().unwrap().push(request.path);
        Ok(())
    }
}

/// Fixed wall clock; monotonic reads always return 0 so the pacing sleep is
/// always the full minimum interval.
#[derive(Clone)]
struct MockClock {
    wall_ms: Arc<AtomicU64>,
}

impl MockClock {
    fn at(wall_ms: u64) -> Self {
        Self {
            wall_ms: Arc::new(AtomicU64::new(wall_ms)),
        }
    }
}

impl Clock for MockClock {
    fn wall_now_ms(&self) -> u64 {
        self.wall_ms.load(Ordering::SeqCst)
    }

    fn elapsed_now_ms(&self) -> u64 {
        0
    }
}

fn container(cversion: i32, mtime_ms: u64, child_count: usize) -> Option<NodeView> {
    Some(NodeView {
        cversion,
        mtime_ms,
        ephemeral_owner: EphemeralOwner::CONTAINER,
        child_count,
    })
}

fn ttl(ttl_ms: u64, mtime_ms: u64, child_count: usize) -> Option<NodeView> {
    Some(NodeView {
        cversion: 1,
        mtime_ms,
        ephemeral_owner: EphemeralOwner::ttl(ttl_ms),
        child_count,
    })
}

fn config() -> Config {
    Config {
        check_interval_ms: 1_000,
        max_per_minute: 60,
        max_never_used_interval_ms: 10_000,
        ..Config::default()
    }
}

#[test]
fn test_candidate_selection() {
    let tree = MockTree {
        containers: btreemap! {
            // Had children once, empty now: reap.
            "/app/drained".to_string() => container(3, 99_000, 0),
            // Still has children: keep.
            "/app/busy".to_string() => container(3, 99_000, 2),
            // Never used, younger than the grace period: keep.
            "/app/fresh".to_string() => container(0, 95_000, 0),
            // Never used, past the grace period: reap.
            "/app/stale".to_string() => container(0, 80_000, 0),
        },
        ttls: btreemap! {
            // Within its ttl: keep.
            "/ttl/live".to_string() => ttl(30_000, 90_000, 0),
            // Expired and childless: reap.
            "/ttl/expired".to_string() => ttl(5_000, 80_000, 0),
            // Expired but has a child: keep.
            "/ttl/busy".to_string() => ttl(5_000, 80_000, 1),
            // Zero ttl never expires.
            "/ttl/forever".to_string() => ttl(0, 10_000, 0),
        },
    };
    let reaper = ContainerReaper::new(&config(), tree, MockPipeline::default(), MockClock::at(100_000));

    let expected = btreeset! {
        "/app/drained".to_string(),
        "/app/stale".to_string(),
        "/ttl/expired".to_string(),
    };
    assert_eq!(expected, reaper.candidates());

    // A candidate that is neither deleted nor grows a child is selected
    // again by the next sweep.
    assert_eq!(expected, reaper.candidates());
}

#[test]
fn test_never_used_grace_disabled() {
    let tree = MockTree {
        containers: btreemap! {
            "/app/stale".to_string() => container(0, 0, 0),
        },
        ttls: BTreeMap::new(),
    };
    let config = Config {
        max_never_used_interval_ms: 0,
        ..config()
    };
    let reaper = ContainerReaper::new(&config, tree, MockPipeline::default(), MockClock::at(100_000));

    assert_eq!(BTreeSet::new(), reaper.candidates());
}

#[test]
fn test_vanished_node_is_skipped() {
    let tree = MockTree {
        containers: btreemap! {
            "/app/gone".to_string() => None,
            "/app/drained".to_string() => container(1, 0, 0),
        },
        ttls: btreemap! {
            "/ttl/gone".to_string() => None,
        },
    };
    let reaper = ContainerReaper::new(&config(), tree, MockPipeline::default(), MockClock::at(100_000));

    assert_eq!(btreeset! { "/app/drained".to_string() }, reaper.candidates());
}

#[tokio::test(start_paused = true)]
async fn test_sweep_paces_submissions() {
    let tree = MockTree {
        containers: btreemap! {
            "/a".to_string() => container(1, 0, 0),
            "/b".to_string() => container(1, 0, 0),
            "/c".to_string() => container(1, 0, 0),
        },
        ttls: BTreeMap::new(),
    };
    let pipeline = MockPipeline::default();
    // 60 per minute: at least one second between submissions.
    let reaper = ContainerReaper::new(&config(), tree, pipeline.clone(), MockClock::at(100_000));

    let started = tokio::time::Instant::now();
    reaper.sweep().await;

    assert_eq!(vec!["/a".to_string(), "/b".to_string(), "/c".to_string()], pipeline.submitted());
    assert!(
        started.elapsed() >= Duration::from_secs(3),
        "three submissions must span at least three pacing intervals, took {:?}",
        started.elapsed()
    );
}

#[tokio::test(start_paused = true)]
async fn test_sweep_continues_after_submit_failure() {
    let tree = MockTree {
        containers: btreemap! {
            "/a".to_string() => container(1, 0, 0),
            "/b".to_string() => container(1, 0, 0),
        },
        ttls: BTreeMap::new(),
    };
    let pipeline = MockPipeline {
        refuse: btreeset! { "/a".to_string() },
        ..MockPipeline::default()
    };
    let reaper = ContainerReaper::new(&config(), tree, pipeline.clone(), MockClock::at(100_000));

    reaper.sweep().await;

    assert_eq!(vec!["/b".to_string()], pipeline.submitted());
}

#[tokio::test(start_paused = true)]
async fn test_stop_interrupts_a_long_sweep() {
    let tree = MockTree {
        containers: btreemap! {
            "/a".to_string() => container(1, 0, 0),
            "/b".to_string() => container(1, 0, 0),
            "/c".to_string() => container(1, 0, 0),
            "/d".to_string() => container(1, 0, 0),
            "/e".to_string() => container(1, 0, 0),
        },
        ttls: BTreeMap::new(),
    };
    let pipeline = MockPipeline::default();
    let reaper = ContainerReaper::new(&config(), tree, pipeline.clone(), MockClock::at(100_000));

    let sweeper = reaper.clone();
    let handle = tokio::spawn(async move { sweeper.sweep().await });

    // Submissions land at t=0s, 1s and 2s; stop before the fourth.
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    reaper.stop();
    handle.await.unwrap();

    assert_eq!(3, pipeline.submitted().len());
}

#[tokio::test(start_paused = true)]
async fn test_start_and_stop_are_idempotent() {
    let tree = MockTree {
        containers: btreemap! {
            "/a".to_string() => container(1, 0, 0),
        },
        ttls: BTreeMap::new(),
    };
    let pipeline = MockPipeline::default();
    let reaper = ContainerReaper::new(&config(), tree, pipeline.clone(), MockClock::at(100_000));

    reaper.start();
    reaper.start();

    // Sweeps fire at 1s and 3s (each sweep ends with a 1s pacing sleep).
    tokio::time::sleep(Duration::from_millis(3_500)).await;
    let submitted = pipeline.submitted().len();
    assert!(submitted >= 2, "expected at least two sweeps, saw {}", submitted);

    reaper.stop();
    reaper.stop();

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(submitted, pipeline.submitted().len(), "no submissions after stop");

    // A stopped reaper stays stopped.
    reaper.start();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(submitted, pipeline.submitted().len());
}

#[test]
fn test_stop_without_start_is_safe() {
    let reaper = ContainerReaper::new(
        &config(),
        MockTree::default(),
        MockPipeline::default(),
        MockClock::at(0),
    );
    reaper.stop();
    reaper.stop();
}
