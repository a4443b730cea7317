//! Coordinator and workers running together in one process.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use common::codec::output_file_name;
use common::rpc::{CoordinatorApi, CoordinatorServer, RpcError};
use common::{ihash, JobKind};
use mrl_coordinator::{MRCoordinator, Phase};
use mrl_worker::{Exit, GrpcCoordinator, MRWorker};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;

const POLL: Duration = Duration::from_millis(20);

fn write_inputs(dir: &Path, contents: &[&str]) -> Vec<String> {
    contents
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let path = dir.join(format!("pg-{i}.txt"));
            fs::write(&path, text).unwrap();
            path.to_string_lossy().to_string()
        })
        .collect()
}

fn worker(dir: &Path) -> MRWorker {
    MRWorker::new(workload::try_named("wc").unwrap(), dir, POLL)
}

/// Every output line, keyed by word, with the shard it was found in.
fn read_outputs(dir: &Path, shard_count: u32) -> BTreeMap<String, (String, u32)> {
    let mut all = BTreeMap::new();
    for shard in 0..shard_count {
        let contents = fs::read_to_string(dir.join(output_file_name(shard))).unwrap();
        let mut previous: Option<String> = None;
        for line in contents.lines() {
            let (key, value) = line.split_once(' ').unwrap();
            if let Some(prev) = &previous {
                assert!(prev.as_str() < key, "mr-out-{shard} is not sorted");
            }
            previous = Some(key.to_string());
            let dup = all.insert(key.to_string(), (value.to_string(), shard));
            assert!(dup.is_none(), "{key} appears twice");
        }
    }
    all
}

fn assert_word_count(dir: &Path) {
    let outputs = read_outputs(dir, 2);
    let expected = [("a", "2"), ("b", "2"), ("c", "1")];
    assert_eq!(outputs.len(), expected.len());
    for (word, count) in expected {
        let (value, shard) = &outputs[word];
        assert_eq!(value, count);
        assert_eq!(*shard, ihash(word.as_bytes()) % 2);
    }
}

#[tokio::test]
async fn word_count_with_several_workers() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = write_inputs(dir.path(), &["a b a", "b c"]);
    let coordinator = MRCoordinator::new(inputs, 2, Duration::from_secs(10));

    let (w1, w2, w3) = (worker(dir.path()), worker(dir.path()), worker(dir.path()));
    let (e1, e2, e3) = tokio::join!(
        w1.run(&coordinator),
        w2.run(&coordinator),
        w3.run(&coordinator)
    );
    for exit in [e1, e2, e3] {
        assert_eq!(exit.unwrap(), Exit::Finished);
    }

    assert!(coordinator.is_done().await);
    assert_word_count(dir.path());

    // Asking again after completion yields the sentinel.
    let after = coordinator.request_task().await;
    assert!(after.job.is_none());
    assert_eq!(
        worker(dir.path()).run(&coordinator).await.unwrap(),
        Exit::Finished
    );
}

#[tokio::test]
async fn crashed_worker_task_is_reassigned() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = write_inputs(dir.path(), &["a b a", "b c"]);
    let coordinator = MRCoordinator::new(inputs, 2, Duration::from_millis(200));

    // A worker takes a map task and dies without reporting.
    let lost = coordinator.request_task().await;
    assert_eq!(lost.job.kind, JobKind::Map);

    let exit = worker(dir.path()).run(&coordinator).await.unwrap();
    assert_eq!(exit, Exit::Finished);
    assert_word_count(dir.path());

    // The dead worker comes back and reports late.
    let err = CoordinatorApi::report_success(&coordinator, &lost.task_id, &lost.job)
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::UnknownTask(_)));
    assert_eq!(coordinator.snapshot().await.phase, Phase::Done);
}

#[tokio::test]
async fn slow_worker_duplicate_is_harmless() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = write_inputs(dir.path(), &["a b a", "b c"]);
    let coordinator = MRCoordinator::new(inputs, 2, Duration::from_millis(100));

    // A straggler takes the first map task, the lease runs out and the job
    // is executed by someone else. The straggler still finishes the work
    // and overwrites the same partition files.
    let slow = coordinator.request_task().await;
    tokio::time::sleep(Duration::from_millis(250)).await;

    let exit = worker(dir.path()).run(&coordinator).await.unwrap();
    assert_eq!(exit, Exit::Finished);

    worker(dir.path()).execute(&slow.job).await.unwrap();
    assert!(CoordinatorApi::report_success(&coordinator, &slow.task_id, &slow.job)
        .await
        .is_err());

    assert_word_count(dir.path());
    let snapshot = coordinator.snapshot().await;
    assert_eq!(snapshot.maps_done, 2);
    assert_eq!(snapshot.reduces_done, 2);
}

#[tokio::test]
async fn word_count_over_grpc() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = write_inputs(dir.path(), &["a b a", "b c"]);
    let coordinator = MRCoordinator::new(inputs, 2, Duration::from_secs(10));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(
        Server::builder()
            .add_service(CoordinatorServer::new(coordinator.clone()))
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async {
                let _ = stopped.await;
            }),
    );

    let client = GrpcCoordinator::connect(format!("http://{addr}"))
        .await
        .unwrap();
    let exit = worker(dir.path()).run(&client).await.unwrap();
    assert_eq!(exit, Exit::Finished);
    assert_word_count(dir.path());

    // Once the coordinator shuts down, a worker exits cleanly instead of
    // waiting for work that will never come.
    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
    let outcome = worker(dir.path()).run(&client).await;
    assert!(matches!(outcome, Ok(Exit::CoordinatorGone)), "{outcome:?}");
}

#[tokio::test]
async fn worker_without_coordinator_exits() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = GrpcCoordinator::connect(format!("http://{addr}"))
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::Unreachable(_)));
}
