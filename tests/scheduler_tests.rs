mod common;

use common::Scored;
use geneforge::algorithm::{Algorithm, AlgorithmController, AlgorithmState, GenerationStep};
use geneforge::error::GfResult;
use geneforge::operators::stop::GenerationLimit;
use geneforge::population::Statistics;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Round {
    forked: usize,
    calls: usize,
}

/// Step that checks the fork-join ordering and records what every
/// generation saw.
#[derive(Default)]
struct RoundRecorder {
    generation: Arc<AtomicU64>,
    forked: AtomicUsize,
    calls: AtomicUsize,
    seen_ids: AtomicU64,
    in_generation: AtomicBool,
    rounds: Mutex<Vec<Round>>,
    violations: Mutex<Vec<String>>,
    jitter: bool,
    work_delay: Option<Duration>,
    panicking_worker: Option<usize>,
}

impl RoundRecorder {
    fn violation(&self, msg: String) {
        self.violations.lock().push(msg);
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

impl GenerationStep for RoundRecorder {
    type Chromosome = Scored;

    fn initialize(&self) -> GfResult<()> {
        Ok(())
    }

    fn before_workers(&self, worker_count: usize) {
        if self.in_generation.swap(true, Ordering::SeqCst) {
            self.violation(format!("generation {} forked twice", self.generation()));
        }
        self.forked.store(worker_count, Ordering::SeqCst);
        self.calls.store(0, Ordering::SeqCst);
        self.seen_ids.store(0, Ordering::SeqCst);
    }

    fn work_step(&self, worker_id: usize, worker_count: usize) {
        if !self.in_generation.load(Ordering::SeqCst) {
            self.violation(format!("worker {} ran outside a generation", worker_id));
        }
        if worker_count != self.forked.load(Ordering::SeqCst) {
            self.violation(format!("worker {} saw {} workers", worker_id, worker_count));
        }
        if self.jitter {
            if fastrand::u8(..) < 32 {
                thread::yield_now();
            }
            if fastrand::u16(..) < 64 {
                thread::sleep(Duration::from_micros(50));
            }
        }
        if let Some(d) = self.work_delay {
            thread::sleep(d);
        }
        self.seen_ids.fetch_or(1 << worker_id, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panicking_worker == Some(worker_id) {
            panic!("worker {} failed", worker_id);
        }
    }

    fn after_workers(&self, _controller: &AlgorithmController<Scored>) {
        let forked = self.forked.load(Ordering::SeqCst);
        let calls = self.calls.load(Ordering::SeqCst);
        let ids = self.seen_ids.load(Ordering::SeqCst);
        if calls != forked || ids != (1u64 << forked) - 1 {
            self.violation(format!(
                "generation {}: {} calls, ids {:b}, {} forked",
                self.generation(),
                calls,
                ids,
                forked
            ));
        }
        if !self.in_generation.swap(false, Ordering::SeqCst) {
            self.violation("after_workers without before_workers".into());
        }
        self.rounds.lock().push(Round { forked, calls });
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn statistics(&self) -> Statistics {
        Statistics {
            generation: self.generation(),
            ..Statistics::default()
        }
    }
}

fn algorithm(recorder: RoundRecorder, workers: usize, limit: u64) -> Algorithm<RoundRecorder> {
    let algorithm = Algorithm::new(recorder, workers);
    algorithm.set_stop_criteria(Some(Arc::new(GenerationLimit { limit })));
    algorithm
}

fn wait_for_generation(algorithm: &Algorithm<RoundRecorder>, generation: u64) {
    while algorithm.step().generation() < generation {
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_after_workers_follows_every_work_step() {
    let recorder = RoundRecorder {
        jitter: true,
        ..RoundRecorder::default()
    };
    let algorithm = algorithm(recorder, 4, 10_000);
    assert!(algorithm.start_solving(false).unwrap());
    algorithm.wait_for_completion();

    assert_eq!(algorithm.state(), AlgorithmState::CriteriaStopped);
    let recorder = algorithm.step();
    assert!(recorder.violations.lock().is_empty(), "{:?}", recorder.violations.lock());
    let rounds = recorder.rounds.lock();
    assert_eq!(rounds.len(), 10_000);
    assert!(rounds.iter().all(|r| *r == Round { forked: 4, calls: 4 }));
}

#[test]
fn test_resize_applies_between_generations() {
    let recorder = RoundRecorder {
        work_delay: Some(Duration::from_millis(1)),
        ..RoundRecorder::default()
    };
    let algorithm = algorithm(recorder, 2, 100);
    algorithm.start_solving(false).unwrap();

    wait_for_generation(&algorithm, 20);
    algorithm.set_worker_count(4).unwrap();
    assert_eq!(algorithm.worker_count(), 4);
    algorithm.wait_for_completion();

    let recorder = algorithm.step();
    assert!(recorder.violations.lock().is_empty(), "{:?}", recorder.violations.lock());
    let rounds = recorder.rounds.lock();
    assert_eq!(rounds.len(), 100);
    assert!(rounds.iter().all(|r| r.forked == r.calls));

    let switch = rounds.iter().position(|r| r.forked == 4).unwrap();
    assert!(switch >= 20);
    assert!(rounds[..switch].iter().all(|r| r.forked == 2));
    assert!(rounds[switch..].iter().all(|r| r.forked == 4));
}

#[test]
fn test_pause_resize_and_resume() {
    let recorder = RoundRecorder {
        work_delay: Some(Duration::from_micros(200)),
        ..RoundRecorder::default()
    };
    let algorithm = algorithm(recorder, 2, u64::MAX);
    algorithm.start_solving(false).unwrap();
    wait_for_generation(&algorithm, 5);

    assert!(algorithm.pause_solving().unwrap());
    algorithm.wait_for_completion();
    let paused_at = algorithm.step().generation();
    thread::sleep(Duration::from_millis(20));
    assert_eq!(algorithm.step().generation(), paused_at);

    algorithm.set_worker_count(3).unwrap();
    assert!(algorithm.start_solving(true).unwrap());
    wait_for_generation(&algorithm, paused_at + 5);
    assert!(algorithm.stop_solving().unwrap());
    algorithm.wait_for_completion();
    assert_eq!(algorithm.state(), AlgorithmState::UserStopped);

    let recorder = algorithm.step();
    assert!(recorder.violations.lock().is_empty(), "{:?}", recorder.violations.lock());
    let rounds = recorder.rounds.lock();
    assert!(rounds[..paused_at as usize].iter().all(|r| r.forked == 2));
    assert!(rounds[paused_at as usize..].iter().all(|r| r.forked == 3));
}

#[test]
fn test_panicking_worker_does_not_block_join() {
    let recorder = RoundRecorder {
        panicking_worker: Some(1),
        ..RoundRecorder::default()
    };
    let algorithm = algorithm(recorder, 3, 50);
    algorithm.start_solving(false).unwrap();
    algorithm.wait_for_completion();

    assert_eq!(algorithm.state(), AlgorithmState::CriteriaStopped);
    let rounds = algorithm.step().rounds.lock();
    assert_eq!(rounds.len(), 50);
    assert!(rounds.iter().all(|r| r.calls == 3));
}

#[test]
fn test_drop_stops_running_algorithm() {
    let generation = Arc::new(AtomicU64::new(0));
    let recorder = RoundRecorder {
        generation: generation.clone(),
        ..RoundRecorder::default()
    };
    let algorithm = algorithm(recorder, 2, u64::MAX);
    algorithm.start_solving(false).unwrap();
    while generation.load(Ordering::SeqCst) < 3 {
        thread::sleep(Duration::from_millis(1));
    }
    drop(algorithm);

    let after_drop = generation.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(10));
    assert_eq!(generation.load(Ordering::SeqCst), after_drop);
}

#[test]
fn test_restart_after_criteria_stop() {
    let algorithm = algorithm(RoundRecorder::default(), 2, 10);
    algorithm.start_solving(false).unwrap();
    algorithm.wait_for_completion();
    assert_eq!(algorithm.step().generation(), 10);

    // Continuing re-checks the same limit after one more generation.
    assert!(algorithm.start_solving(true).unwrap());
    algorithm.wait_for_completion();
    assert_eq!(algorithm.step().generation(), 11);
    assert_eq!(algorithm.state(), AlgorithmState::CriteriaStopped);
}
