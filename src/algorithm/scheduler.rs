use super::gate::Gate;
use super::{AlgorithmController, AlgorithmHooks, AlgorithmState, Observer};
use crate::chromosome::Chromosome;
use crate::error::{GfError, GfResult};
use crate::operators::StopCriteria;
use crate::population::Statistics;
use parking_lot::{Mutex, MutexGuard};
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, trace};

pub const MAX_WORKERS: usize = 256;

/// Contiguous share of `total` items for `worker_id`; the last worker also
/// takes the remainder.
pub fn partition(total: usize, workers: usize, worker_id: usize) -> Range<usize> {
    let workers = workers.max(1);
    if worker_id >= workers {
        return total..total;
    }
    let chunk = total / workers;
    let start = chunk * worker_id;
    let end = if worker_id + 1 == workers { total } else { start + chunk };
    start..end
}

/// One generation's worth of work, split into a sequential phase before
/// the workers run, a parallel phase, and a sequential phase after.
///
/// `before_workers` always completes before any `work_step` of the same
/// generation starts, and `after_workers` starts only once every
/// `work_step` has returned.
pub trait GenerationStep: Send + Sync + 'static {
    type Chromosome: Chromosome;

    fn initialize(&self) -> GfResult<()>;

    fn before_workers(&self, worker_count: usize);

    fn work_step(&self, worker_id: usize, worker_count: usize);

    fn after_workers(&self, controller: &AlgorithmController<Self::Chromosome>);

    fn statistics(&self) -> Statistics;
}

struct WorkerPool {
    workers: usize,
    fork: Gate,
    join: Gate,
    countdown: AtomicUsize,
    // Whether the phase now being released does real work.
    phase_running: AtomicBool,
    exiting: AtomicBool,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    fn new(workers: usize) -> Self {
        Self {
            workers,
            fork: Gate::new(),
            join: Gate::new(),
            countdown: AtomicUsize::new(0),
            phase_running: AtomicBool::new(false),
            exiting: AtomicBool::new(false),
            handles: Mutex::new(Vec::with_capacity(workers)),
        }
    }

    // Workers are parked on the fork gate; each takes one permit and leaves.
    fn retire(&self) {
        self.exiting.store(true, Ordering::SeqCst);
        self.fork.release(self.workers);
    }

    fn join_workers(&self) {
        let handles = std::mem::take(&mut *self.handles.lock());
        for h in handles {
            if h.join().is_err() {
                error!("Worker thread terminated abnormally");
            }
        }
    }
}

/// Fork-join coordination state shared by the control path and the worker
/// pool.
///
/// The live pool is only swapped while both controller locks are held, so
/// it never changes in the middle of a generation.
pub struct GenerationScheduler {
    worker_count: AtomicUsize,
    pool: Mutex<Option<Arc<WorkerPool>>>,
    session: AtomicU64,
    control: Mutex<Vec<JoinHandle<()>>>,
}

impl GenerationScheduler {
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count: AtomicUsize::new(worker_count.clamp(1, MAX_WORKERS)),
            pool: Mutex::new(None),
            session: AtomicU64::new(0),
            control: Mutex::new(Vec::new()),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count.load(Ordering::Acquire)
    }

    fn current_pool(&self) -> Option<Arc<WorkerPool>> {
        self.pool.lock().clone()
    }

    // Stops and joins the live pool, if any.
    fn retire_pool(&self) {
        let old = self.pool.lock().take();
        if let Some(old) = old {
            old.retire();
            old.join_workers();
        }
    }
}

struct Engine<S: GenerationStep> {
    controller: AlgorithmController<S::Chromosome>,
    scheduler: GenerationScheduler,
    step: S,
    me: Weak<Engine<S>>,
}

impl<S: GenerationStep> Engine<S> {
    fn spawn_pool(self: &Arc<Self>, workers: usize) -> GfResult<Arc<WorkerPool>> {
        let pool = Arc::new(WorkerPool::new(workers));
        for id in 0..workers {
            let engine = Arc::clone(self);
            let p = Arc::clone(&pool);
            let spawned = thread::Builder::new()
                .name(format!("gf-worker-{}", id))
                .spawn(move || worker_loop(engine, p, id));
            match spawned {
                Ok(h) => pool.handles.lock().push(h),
                Err(e) => {
                    // Only the spawned prefix is waiting; give each of them a permit.
                    let started = pool.handles.lock().len();
                    pool.exiting.store(true, Ordering::SeqCst);
                    pool.fork.release(started);
                    pool.join_workers();
                    return Err(GfError::Spawn(e));
                }
            }
        }
        debug!("Spawned worker pool of {}", workers);
        Ok(pool)
    }

    // Runs with the state-change lock held and the state already Running.
    fn launch(&self) -> GfResult<()> {
        let engine = self.me.upgrade().ok_or_else(|| GfError::Hook {
            hook: "on_start",
            reason: "algorithm is being dropped".into(),
        })?;

        // A control path from an earlier run may still be queued on the
        // locks; bumping the session makes it leave without touching the
        // new pool.
        let session = self.scheduler.session.fetch_add(1, Ordering::SeqCst) + 1;
        self.scheduler.retire_pool();

        let workers = self.scheduler.worker_count();
        let pool = engine.spawn_pool(workers)?;
        *self.scheduler.pool.lock() = Some(pool);

        let control = Arc::clone(&engine);
        let spawned = thread::Builder::new()
            .name("gf-control".into())
            .spawn(move || control_loop(control, session));
        match spawned {
            Ok(h) => {
                self.scheduler.control.lock().push(h);
                info!("Started session {} with {} workers", session, workers);
                Ok(())
            }
            Err(e) => {
                self.scheduler.retire_pool();
                Err(GfError::Spawn(e))
            }
        }
    }

    fn set_worker_count(&self, count: usize) -> GfResult<()> {
        let count = count.clamp(1, MAX_WORKERS);
        let _params = self.controller.lock_params();
        let mut state = self.controller.lock_state();
        if count == self.scheduler.worker_count() {
            return Ok(());
        }
        self.scheduler.worker_count.store(count, Ordering::Release);

        // No generation is in flight while both locks are held: the old
        // workers are all parked on the fork gate.
        if *state == AlgorithmState::Running && self.scheduler.current_pool().is_some() {
            let Some(engine) = self.me.upgrade() else {
                return Ok(());
            };
            self.scheduler.retire_pool();
            match engine.spawn_pool(count) {
                Ok(pool) => {
                    *self.scheduler.pool.lock() = Some(pool);
                    debug!("Worker pool resized to {}", count);
                }
                Err(e) => {
                    // Without a pool the control path leaves at its next round.
                    error!("Worker pool resize failed: {}", e);
                    self.controller.set(&mut state, AlgorithmState::UserStopped);
                    self.controller
                        .observers()
                        .notify_state_changed(AlgorithmState::UserStopped, &self.controller);
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}

impl<S: GenerationStep> AlgorithmHooks for Engine<S> {
    fn initialize(&self) -> GfResult<()> {
        self.step.initialize()
    }

    fn on_start(&self) -> GfResult<()> {
        self.launch()
    }

    fn on_resume(&self) -> GfResult<()> {
        self.launch()
    }
}

fn guarded(what: &str, f: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        let msg = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".into());
        error!("{} panicked: {}", what, msg);
    }
}

fn control_loop<S: GenerationStep>(engine: Arc<Engine<S>>, session: u64) {
    let ctl = &engine.controller;
    let sched = &engine.scheduler;
    loop {
        let params = ctl.lock_params();
        let mut state = ctl.lock_state();
        if sched.session.load(Ordering::SeqCst) != session {
            return;
        }
        let Some(pool) = sched.current_pool() else { return };

        let running = *state == AlgorithmState::Running;
        if running {
            guarded("before_workers", || engine.step.before_workers(pool.workers));
        }

        pool.phase_running.store(running, Ordering::SeqCst);
        pool.countdown.store(pool.workers, Ordering::SeqCst);
        let join_seen = pool.join.epoch();
        pool.fork.release(pool.workers);
        pool.join.wait(join_seen);

        if !running {
            // The workers saw a non-running phase and are leaving.
            sched.pool.lock().take();
            MutexGuard::unlock_fair(state);
            MutexGuard::unlock_fair(params);
            pool.join_workers();
            debug!("Control path of session {} finished", session);
            return;
        }

        guarded("after_workers", || engine.step.after_workers(ctl));
        let stats = engine.step.statistics();
        trace!("Generation {} complete", stats.generation);
        ctl.check_stop_criteria_locked(&mut state, &stats);

        MutexGuard::unlock_fair(state);
        MutexGuard::unlock_fair(params);
    }
}

fn worker_loop<S: GenerationStep>(engine: Arc<Engine<S>>, pool: Arc<WorkerPool>, id: usize) {
    let mut fork_seen = 0;
    loop {
        fork_seen = pool.fork.wait(fork_seen);
        if pool.exiting.load(Ordering::SeqCst) {
            return;
        }

        let running = pool.phase_running.load(Ordering::SeqCst);
        if running {
            guarded("work_step", || engine.step.work_step(id, pool.workers));
        }

        // Read before decrementing: the join cannot open until we have.
        let join_seen = pool.join.epoch();
        if pool.countdown.fetch_sub(1, Ordering::AcqRel) == 1 {
            // The other workers and the control path.
            pool.join.release(pool.workers);
        } else {
            pool.join.wait(join_seen);
        }

        if !running {
            return;
        }
    }
}

/// Handle tying a [`GenerationStep`] to its controller and scheduler.
///
/// Dropping the handle stops a running algorithm and joins every thread.
pub struct Algorithm<S: GenerationStep> {
    engine: Arc<Engine<S>>,
}

impl<S: GenerationStep> Algorithm<S> {
    pub fn new(step: S, worker_count: usize) -> Self {
        let engine = Arc::new_cyclic(|me| Engine {
            controller: AlgorithmController::new(),
            scheduler: GenerationScheduler::new(worker_count),
            step,
            me: me.clone(),
        });
        Self { engine }
    }

    pub fn start_solving(&self, continue_from_saved: bool) -> GfResult<bool> {
        self.engine
            .controller
            .start_solving(self.engine.as_ref(), continue_from_saved)
    }

    pub fn stop_solving(&self) -> GfResult<bool> {
        self.engine.controller.stop_solving(self.engine.as_ref())
    }

    pub fn pause_solving(&self) -> GfResult<bool> {
        self.engine.controller.pause_solving(self.engine.as_ref())
    }

    /// Changes the pool size. A running algorithm switches pools between
    /// two generations; otherwise the count applies at the next start.
    pub fn set_worker_count(&self, count: usize) -> GfResult<()> {
        self.engine.set_worker_count(count)
    }

    pub fn worker_count(&self) -> usize {
        self.engine.scheduler.worker_count()
    }

    pub fn state(&self) -> AlgorithmState {
        self.engine.controller.state()
    }

    pub fn controller(&self) -> &AlgorithmController<S::Chromosome> {
        &self.engine.controller
    }

    pub fn scheduler(&self) -> &GenerationScheduler {
        &self.engine.scheduler
    }

    pub fn step(&self) -> &S {
        &self.engine.step
    }

    pub fn subscribe(&self, observer: Arc<dyn Observer<S::Chromosome>>) {
        self.engine.controller.observers().subscribe(observer);
    }

    pub fn unsubscribe(&self, observer: &Arc<dyn Observer<S::Chromosome>>) -> bool {
        self.engine.controller.observers().unsubscribe(observer)
    }

    pub fn set_stop_criteria(&self, criteria: Option<Arc<dyn StopCriteria>>) {
        self.engine.controller.set_stop_criteria(criteria);
    }

    /// Blocks until no control path is alive, i.e. the algorithm left the
    /// running state and every thread has been joined. Holds no lock while
    /// waiting.
    pub fn wait_for_completion(&self) {
        loop {
            let handles = std::mem::take(&mut *self.engine.scheduler.control.lock());
            if handles.is_empty() {
                return;
            }
            for h in handles {
                if h.join().is_err() {
                    error!("Control thread terminated abnormally");
                }
            }
        }
    }
}

impl<S: GenerationStep> Drop for Algorithm<S> {
    fn drop(&mut self) {
        if let Err(e) = self.stop_solving() {
            error!("Failed to stop algorithm on drop: {}", e);
        }
        self.wait_for_completion();
    }
}
