use super::{AlgorithmController, AlgorithmState};
use crate::chromosome::{Chromosome, ChromosomeRef};
use crate::population::Statistics;
use parking_lot::RwLock;
use std::sync::Arc;

/// Receives engine events. Every method defaults to doing nothing.
///
/// Calls arrive on the control path with the state-change lock held.
pub trait Observer<C: Chromosome>: Send + Sync {
    fn on_statistic_update(&self, _stats: &Statistics, _controller: &AlgorithmController<C>) {}

    fn on_new_best_chromosome(
        &self,
        _chromosome: &ChromosomeRef<C>,
        _controller: &AlgorithmController<C>,
    ) {}

    fn on_state_changed(&self, _state: AlgorithmState, _controller: &AlgorithmController<C>) {}
}

/// Subscribers in subscription order. Notification works on a snapshot, so
/// an observer may (un)subscribe from inside a callback.
pub struct ObserverList<C: Chromosome> {
    observers: RwLock<Vec<Arc<dyn Observer<C>>>>,
}

impl<C: Chromosome> Default for ObserverList<C> {
    fn default() -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
        }
    }
}

impl<C: Chromosome> ObserverList<C> {
    /// Adds `observer`, or moves it to the most recent position when it is
    /// already subscribed.
    pub fn subscribe(&self, observer: Arc<dyn Observer<C>>) {
        let mut list = self.observers.write();
        list.retain(|o| !Arc::ptr_eq(o, &observer));
        list.push(observer);
    }

    /// Returns whether `observer` was subscribed.
    pub fn unsubscribe(&self, observer: &Arc<dyn Observer<C>>) -> bool {
        let mut list = self.observers.write();
        let before = list.len();
        list.retain(|o| !Arc::ptr_eq(o, observer));
        list.len() != before
    }

    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }

    fn snapshot(&self) -> Vec<Arc<dyn Observer<C>>> {
        self.observers.read().clone()
    }

    pub(crate) fn notify_state_changed(
        &self,
        state: AlgorithmState,
        controller: &AlgorithmController<C>,
    ) {
        for o in self.snapshot() {
            o.on_state_changed(state, controller);
        }
    }

    pub(crate) fn notify_statistics(
        &self,
        stats: &Statistics,
        controller: &AlgorithmController<C>,
    ) {
        for o in self.snapshot() {
            o.on_statistic_update(stats, controller);
        }
    }

    pub(crate) fn notify_new_best(
        &self,
        chromosome: &ChromosomeRef<C>,
        controller: &AlgorithmController<C>,
    ) {
        for o in self.snapshot() {
            o.on_new_best_chromosome(chromosome, controller);
        }
    }
}
