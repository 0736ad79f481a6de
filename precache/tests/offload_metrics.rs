//! Offload gauges and counters, including aborted tasks.

#![cfg(feature = "metrics")]

use std::time::Duration;

use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use metrics_util::{CompositeKey, MetricKind};
use precache::offload::OffloadManager;

type SnapshotEntry = (
    CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
);

fn labelled<'a>(
    entries: &'a [SnapshotEntry],
    kind: MetricKind,
    name: &str,
    label: (&str, &str),
) -> Option<&'a DebugValue> {
    entries.iter().find_map(|(key, _, _, value)| {
        let matches = key.kind() == kind
            && key.key().name() == name
            && key
                .key()
                .labels()
                .any(|l| l.key() == label.0 && l.value() == label.1);
        matches.then_some(value)
    })
}

#[test]
fn test_aborted_tasks_leave_the_active_gauge() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        // Single-threaded so spawned tasks see the local recorder.
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let manager = OffloadManager::default();
            manager.spawn("write_back", async {});
            manager.wait_all().await;

            // Aborted before their first poll and while sleeping.
            manager.spawn("write_back", tokio::time::sleep(Duration::from_secs(60)));
            tokio::task::yield_now().await;
            manager.spawn("write_back", tokio::time::sleep(Duration::from_secs(60)));

            manager.abort_all();
            manager.wait_all().await;
        })
    });

    let entries = snapshotter.snapshot().into_vec();

    match labelled(
        &entries,
        MetricKind::Gauge,
        "precache_offload_tasks_active",
        ("kind", "write_back"),
    ) {
        Some(DebugValue::Gauge(active)) => assert_eq!(active.0, 0.0),
        other => panic!("active gauge missing: {other:?}"),
    }

    let finished = |outcome: &str| {
        entries.iter().find_map(|(key, _, _, value)| {
            let matches = key.kind() == MetricKind::Counter
                && key.key().name() == "precache_offload_tasks_finished_total"
                && key
                    .key()
                    .labels()
                    .any(|l| l.key() == "outcome" && l.value() == outcome);
            match (matches, value) {
                (true, DebugValue::Counter(count)) => Some(*count),
                _ => None,
            }
        })
    };
    assert_eq!(finished("completed"), Some(1));
    assert_eq!(finished("aborted"), Some(2));
}
