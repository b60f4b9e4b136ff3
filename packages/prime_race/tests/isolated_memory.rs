//! Integration tests for the multi-process strategy.
//!
//! These spawn the `prime_race` binary in worker mode, so they live outside the library's unit
//! tests where the binary path is known.

#![cfg(not(miri))] // Miri cannot spawn processes.

use std::num::NonZero;
use std::path::Path;

use new_zealand::nz;
use prime_race::{
    Error, Interval, IsolatedMemory, Partition, ProcessPool, Sequential, SharedMemory, Strategy,
    StrategyKind,
};

fn worker_program() -> &'static Path {
    Path::new(env!("CARGO_BIN_EXE_prime_race"))
}

#[test]
fn primes_below_hundred() {
    let strategy = IsolatedMemory::new(nz!(4), worker_program());

    assert_eq!(strategy.kind(), StrategyKind::IsolatedMemory);
    assert_eq!(strategy.count_primes_below(100).unwrap(), 25);
}

#[test]
fn all_strategies_agree() {
    let total = 100;

    let sequential = Sequential.count_primes_below(total).unwrap();
    let shared = SharedMemory::new(nz!(4)).count_primes_below(total).unwrap();
    let isolated = IsolatedMemory::new(nz!(4), worker_program())
        .count_primes_below(total)
        .unwrap();

    assert_eq!(sequential, 25);
    assert_eq!(shared, 25);
    assert_eq!(isolated, 25);
}

#[test]
fn matches_sequential_for_various_shapes() {
    for total in [0, 2, 3, 50, 10_007] {
        let expected = Sequential.count_primes_below(total).unwrap();

        for workers in [1, 3, 5] {
            let strategy = IsolatedMemory::new(NonZero::new(workers).unwrap(), worker_program());

            assert_eq!(
                strategy.count_primes_below(total).unwrap(),
                expected,
                "total={total} workers={workers}"
            );
        }
    }
}

#[test]
fn more_workers_than_integers() {
    let strategy = IsolatedMemory::new(nz!(4), worker_program());

    assert_eq!(strategy.count_primes_below(3).unwrap(), 2);
}

#[test]
fn repeated_invocations_agree() {
    let strategy = IsolatedMemory::new(nz!(2), worker_program());

    let first = strategy.count_primes_below(5_000).unwrap();
    let second = strategy.count_primes_below(5_000).unwrap();

    assert_eq!(first, 669);
    assert_eq!(first, second);
}

#[test]
fn map_preserves_task_order() {
    let mut pool = ProcessPool::spawn(worker_program(), nz!(2)).unwrap();
    assert_eq!(pool.size(), 2);

    // More tasks than workers, with very uneven sizes, so they complete out of order.
    let tasks = [
        Interval::new(0, 20_000),
        Interval::new(0, 10),
        Interval::new(10, 100),
        Interval::new(5, 5),
        Interval::new(0, 1000),
    ];

    let counts = pool.map(&tasks).unwrap();

    assert_eq!(&*counts, &[2262, 4, 21, 0, 168]);

    pool.shutdown().unwrap();
}

#[test]
fn pool_serves_multiple_batches() {
    let partition = Partition::new(1000, nz!(3));
    let mut pool = ProcessPool::spawn(worker_program(), nz!(3)).unwrap();

    let first: u64 = pool.map(partition.intervals()).unwrap().iter().sum();
    let second: u64 = pool.map(partition.intervals()).unwrap().iter().sum();

    assert_eq!(first, 168);
    assert_eq!(second, 168);

    pool.shutdown().unwrap();
}

#[test]
fn empty_batch() {
    let mut pool = ProcessPool::spawn(worker_program(), nz!(1)).unwrap();

    assert!(pool.map(&[]).unwrap().is_empty());

    pool.shutdown().unwrap();
}

#[test]
fn dropping_pool_without_shutdown_does_not_hang() {
    let pool = ProcessPool::spawn(worker_program(), nz!(2)).unwrap();

    drop(pool);
}

#[test]
fn missing_worker_program() {
    let program = Path::new("./definitely/not/a/prime_race/binary");

    let result = IsolatedMemory::new(nz!(2), program).count_primes_below(100);

    match result {
        Err(Error::SpawnProcess { program: reported, .. }) => assert_eq!(reported, program),
        other => panic!("expected spawn failure, got {other:?}"),
    }
}

/// Pool failures, provoked by shell scripts standing in for the worker program.
#[cfg(unix)]
mod misbehaving_workers {
    use std::fs;
    use std::io;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use std::thread;
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;

    struct Script {
        path: PathBuf,
        _dir: TempDir,
    }

    fn script(body: &str) -> Script {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("worker.sh");

        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

        Script { path, _dir: dir }
    }

    fn spawn_pool(script: &Script, size: NonZero<usize>) -> ProcessPool {
        // A process forked concurrently by another test may briefly hold the script open for
        // writing, in which case it cannot be executed yet.
        for _ in 0..100 {
            match ProcessPool::spawn(&script.path, size) {
                Err(Error::SpawnProcess { source, .. })
                    if source.kind() == io::ErrorKind::ExecutableFileBusy =>
                {
                    thread::sleep(Duration::from_millis(10));
                }
                result => return result.unwrap(),
            }
        }

        panic!("worker script stayed busy");
    }

    #[test]
    fn worker_hangs_up_before_replying() {
        let script = script("read task\nexit 0");
        let mut pool = spawn_pool(&script, nz!(1));

        let result = pool.map(&[Interval::new(0, 100)]);

        assert!(
            matches!(result, Err(Error::WorkerHungUp { worker: 0 })),
            "{result:?}"
        );
    }

    #[test]
    fn worker_replies_to_wrong_task() {
        let script = script("read task\necho '{\"index\":7,\"count\":0}'\ncat > /dev/null");
        let mut pool = spawn_pool(&script, nz!(1));

        let result = pool.map(&[Interval::new(0, 100)]);

        assert!(
            matches!(
                result,
                Err(Error::MismatchedReply {
                    expected: 0,
                    received: 7,
                })
            ),
            "{result:?}"
        );

        // The worker itself is still healthy and exits cleanly once its input is closed.
        pool.shutdown().unwrap();
    }

    #[test]
    fn worker_replies_with_garbage() {
        let script = script("read task\necho 'not a reply'\ncat > /dev/null");
        let mut pool = spawn_pool(&script, nz!(1));

        let result = pool.map(&[Interval::new(0, 100)]);

        assert!(matches!(result, Err(Error::Wire(_))), "{result:?}");
    }

    #[test]
    fn worker_exits_unsuccessfully() {
        let script = script("cat > /dev/null\nexit 3");
        let mut pool = spawn_pool(&script, nz!(2));

        assert!(pool.map(&[]).unwrap().is_empty());

        match pool.shutdown() {
            Err(Error::WorkerExited { worker, status }) => {
                assert_eq!(worker, 0);
                assert_eq!(status.code(), Some(3));
            }
            other => panic!("expected unsuccessful exit, got {other:?}"),
        }
    }

    #[test]
    fn strategy_reports_worker_failure() {
        let script = script("read task\nexit 0");

        // Spawn once through the retrying helper so the script is known to be executable.
        drop(spawn_pool(&script, nz!(1)));

        let result = IsolatedMemory::new(nz!(2), &script.path).count_primes_below(100);

        assert!(
            matches!(result, Err(Error::WorkerHungUp { .. })),
            "{result:?}"
        );
    }
}
