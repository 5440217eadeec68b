pub mod gate;
pub mod genetic;
pub mod observer;
pub mod scheduler;

pub use self::genetic::GeneticAlgorithm;
pub use self::observer::{Observer, ObserverList};
pub use self::scheduler::{partition, Algorithm, GenerationScheduler, GenerationStep};

use crate::chromosome::{Chromosome, ChromosomeRef};
use crate::error::GfResult;
use crate::operators::StopCriteria;
use crate::population::Statistics;
use parking_lot::{Mutex, MutexGuard, RwLock};
use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use strum_macros::{Display, EnumIter};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum AlgorithmState {
    Uninitialized,
    Running,
    Paused,
    UserStopped,
    CriteriaStopped,
}

impl AlgorithmState {
    pub fn is_running(self) -> bool {
        self == Self::Running
    }

    pub fn is_not_running(self) -> bool {
        self != Self::Running
    }

    pub fn is_stopped(self) -> bool {
        matches!(self, Self::UserStopped | Self::CriteriaStopped)
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Running,
            2 => Self::Paused,
            3 => Self::UserStopped,
            4 => Self::CriteriaStopped,
            _ => Self::Uninitialized,
        }
    }
}

/// Callbacks the controller runs while holding the state-change lock.
///
/// An `Err` makes the controller restore the state it had before the call
/// and skip the state-change notification.
pub trait AlgorithmHooks: Send + Sync {
    fn initialize(&self) -> GfResult<()>;

    fn on_start(&self) -> GfResult<()>;

    fn on_resume(&self) -> GfResult<()>;

    fn on_pause(&self) -> GfResult<()> {
        Ok(())
    }

    fn on_stop(&self) -> GfResult<()> {
        Ok(())
    }
}

/// Owns the execution state machine and the two gates that serialise state
/// changes and parameter changes.
///
/// Lock order is always parameter-change before state-change. Observers
/// are notified with the state-change lock held and must not call back into
/// lifecycle methods.
pub struct AlgorithmController<C: Chromosome> {
    state: Mutex<AlgorithmState>,
    params: Mutex<()>,
    observed: AtomicU8,
    stop_criteria: RwLock<Option<Arc<dyn StopCriteria>>>,
    observers: ObserverList<C>,
}

impl<C: Chromosome> Default for AlgorithmController<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Chromosome> AlgorithmController<C> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(AlgorithmState::Uninitialized),
            params: Mutex::new(()),
            observed: AtomicU8::new(AlgorithmState::Uninitialized as u8),
            stop_criteria: RwLock::new(None),
            observers: ObserverList::default(),
        }
    }

    /// Lock-free snapshot of the current state.
    pub fn state(&self) -> AlgorithmState {
        AlgorithmState::from_u8(self.observed.load(Ordering::Acquire))
    }

    pub fn lock_params(&self) -> MutexGuard<'_, ()> {
        self.params.lock()
    }

    pub fn lock_state(&self) -> MutexGuard<'_, AlgorithmState> {
        self.state.lock()
    }

    pub fn observers(&self) -> &ObserverList<C> {
        &self.observers
    }

    pub fn set_stop_criteria(&self, criteria: Option<Arc<dyn StopCriteria>>) {
        *self.stop_criteria.write() = criteria;
    }

    pub fn stop_criteria(&self) -> Option<Arc<dyn StopCriteria>> {
        self.stop_criteria.read().clone()
    }

    fn set(&self, guard: &mut AlgorithmState, state: AlgorithmState) {
        *guard = state;
        self.observed.store(state as u8, Ordering::Release);
    }

    // Enters `target` before running `hook` when `enter_first` is set, so
    // the hook already observes the new state.
    fn transition(
        &self,
        guard: &mut AlgorithmState,
        target: AlgorithmState,
        enter_first: bool,
        hook: impl FnOnce() -> GfResult<()>,
    ) -> GfResult<bool> {
        let previous = *guard;
        if enter_first {
            self.set(guard, target);
        }
        if let Err(e) = hook() {
            warn!("{}; staying in {}", e, previous);
            self.set(guard, previous);
            return Err(e);
        }
        self.set(guard, target);
        info!("Algorithm state {} -> {}", previous, target);
        self.observers.notify_state_changed(target, self);
        Ok(true)
    }

    /// Starts or resumes. `Ok(false)` means the call had no effect in the
    /// current state.
    pub fn start_solving(
        &self,
        hooks: &dyn AlgorithmHooks,
        continue_from_saved: bool,
    ) -> GfResult<bool> {
        let mut state = self.state.lock();
        match (*state, continue_from_saved) {
            (AlgorithmState::Uninitialized | AlgorithmState::UserStopped, _)
            | (AlgorithmState::CriteriaStopped, false) => {
                if continue_from_saved {
                    debug!("Starting from {} without reinitializing", *state);
                } else if let Err(e) = hooks.initialize() {
                    warn!("{}; staying in {}", e, *state);
                    return Err(e);
                }
                self.transition(&mut state, AlgorithmState::Running, true, || hooks.on_start())
            }
            (AlgorithmState::CriteriaStopped | AlgorithmState::Paused, true) => {
                self.transition(&mut state, AlgorithmState::Running, true, || hooks.on_resume())
            }
            _ => Ok(false),
        }
    }

    pub fn stop_solving(&self, hooks: &dyn AlgorithmHooks) -> GfResult<bool> {
        let mut state = self.state.lock();
        match *state {
            AlgorithmState::Running | AlgorithmState::Paused => {
                self.transition(&mut state, AlgorithmState::UserStopped, false, || hooks.on_stop())
            }
            _ => Ok(false),
        }
    }

    pub fn pause_solving(&self, hooks: &dyn AlgorithmHooks) -> GfResult<bool> {
        let mut state = self.state.lock();
        match *state {
            AlgorithmState::Running => {
                self.transition(&mut state, AlgorithmState::Paused, false, || hooks.on_pause())
            }
            _ => Ok(false),
        }
    }

    /// Evaluates the stop criteria. A missing criteria counts as satisfied.
    /// Returns whether the criteria held.
    pub fn check_stop_criteria(&self, stats: &Statistics) -> bool {
        let mut state = self.state.lock();
        self.check_stop_criteria_locked(&mut state, stats)
    }

    /// [`AlgorithmController::check_stop_criteria`] for callers that already
    /// hold the state-change lock.
    pub fn check_stop_criteria_locked(
        &self,
        state: &mut AlgorithmState,
        stats: &Statistics,
    ) -> bool {
        let hit = match self.stop_criteria.read().as_ref() {
            Some(criteria) => criteria.should_stop(stats),
            None => true,
        };
        if hit && *state == AlgorithmState::Running {
            self.set(state, AlgorithmState::CriteriaStopped);
            info!("Stop criteria met at generation {}", stats.generation);
            self.observers
                .notify_state_changed(AlgorithmState::CriteriaStopped, self);
        }
        hit
    }

    pub fn notify_statistics(&self, stats: &Statistics) {
        self.observers.notify_statistics(stats, self);
    }

    pub fn notify_new_best(&self, chromosome: &ChromosomeRef<C>) {
        self.observers.notify_new_best(chromosome, self);
    }
}
