use crate::algorithm::partition;
use crate::chromosome::{Chromosome, ChromosomeRef};
use crate::population::{FitnessOrder, GroupKind, Population, SortedGroup};
use fastrand::Rng;
use parking_lot::{Mutex, MutexGuard};
use std::ops::Range;
use std::sync::Arc;

/// Parent indices chosen for one generation, kept in fitness order.
/// An index may appear more than once.
#[derive(Debug, Clone)]
pub struct SelectionResultSet {
    group: SortedGroup,
}

impl SelectionResultSet {
    pub fn new(order: FitnessOrder, size: usize) -> Self {
        Self {
            group: SortedGroup::new(GroupKind::Other, size, order),
        }
    }

    /// Empties the set for a new generation, adopting the population's
    /// current ordering. Storage is kept unless the size changed.
    pub fn prepare<C: Chromosome>(&mut self, population: &Population<C>, size: usize) {
        if self.group.max_size() != size {
            self.group = SortedGroup::new(GroupKind::Other, size, population.order().clone());
        } else {
            self.group.reset();
            self.group.set_order(population.order().clone(), population.slots());
        }
    }

    pub fn add<C: Chromosome>(
        &mut self,
        index: usize,
        population: &Population<C>,
    ) -> Option<usize> {
        self.group.add_unflagged(index, population.slots())
    }

    pub fn indices(&self) -> &[usize] {
        self.group.indices()
    }

    pub fn get(&self, position: usize) -> Option<usize> {
        self.group.get(position)
    }

    pub fn len(&self) -> usize {
        self.group.len()
    }

    pub fn is_empty(&self) -> bool {
        self.group.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.group.max_size()
    }
}

#[derive(Debug, Clone)]
pub struct Offspring<C> {
    pub chromosome: ChromosomeRef<C>,
    pub parent: usize,
}

impl<C: Chromosome> Offspring<C> {
    /// An offspring nobody touched still aliases its parent's payload.
    pub fn is_duplicate_of_parent(&self, population: &Population<C>) -> bool {
        population
            .chromosome(self.parent)
            .is_some_and(|p| Arc::ptr_eq(p, &self.chromosome))
    }
}

/// One worker's share of the offspring buffer.
#[derive(Debug)]
pub struct CouplingSlice<C> {
    start: usize,
    entries: Vec<Option<Offspring<C>>>,
    rng: Rng,
    crossovers: usize,
    mutations: usize,
}

impl<C> CouplingSlice<C> {
    fn empty() -> Self {
        Self {
            start: 0,
            entries: Vec::new(),
            rng: Rng::with_seed(0),
            crossovers: 0,
            mutations: 0,
        }
    }

    fn reset(&mut self, range: Range<usize>, seed: u64) {
        self.start = range.start;
        self.entries.clear();
        self.entries.resize_with(range.len(), || None);
        self.rng = Rng::with_seed(seed);
        self.crossovers = 0;
        self.mutations = 0;
    }

    /// First offspring position (over the whole generation) this slice owns.
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.entries.len()
    }

    pub fn rng_mut(&mut self) -> &mut Rng {
        &mut self.rng
    }

    /// Stores an offspring at `offset` within this slice. Out-of-range
    /// offsets are ignored.
    pub fn set(&mut self, offset: usize, chromosome: ChromosomeRef<C>, parent: usize) {
        if let Some(entry) = self.entries.get_mut(offset) {
            *entry = Some(Offspring { chromosome, parent });
        }
    }

    pub fn get(&self, offset: usize) -> Option<&Offspring<C>> {
        self.entries.get(offset).and_then(|e| e.as_ref())
    }

    pub fn record(&mut self, crossover: bool, mutation: bool) {
        self.crossovers += usize::from(crossover);
        self.mutations += usize::from(mutation);
    }
}

/// Offspring produced in one generation, pre-partitioned per worker.
///
/// Each worker locks only its own slice, so the locks are never contended
/// during the parallel phase; the control path reads everything after join.
#[derive(Debug)]
pub struct CouplingResultSet<C> {
    slices: Vec<Mutex<CouplingSlice<C>>>,
    total: usize,
    clear_duplicates: bool,
}

impl<C: Chromosome> CouplingResultSet<C> {
    pub fn new(clear_duplicates: bool) -> Self {
        Self {
            slices: Vec::new(),
            total: 0,
            clear_duplicates,
        }
    }

    /// Sizes the buffer for `total` offspring split over `workers`. Existing
    /// slices keep their storage.
    pub fn prepare(&mut self, total: usize, workers: usize, rng: &mut Rng) {
        let workers = workers.max(1);
        self.slices.truncate(workers);
        while self.slices.len() < workers {
            self.slices.push(Mutex::new(CouplingSlice::empty()));
        }
        for (id, slice) in self.slices.iter_mut().enumerate() {
            slice.get_mut().reset(partition(total, workers, id), rng.u64(..));
        }
        self.total = total;
    }

    /// The slice owned by `worker_id`.
    pub fn slice(&self, worker_id: usize) -> Option<MutexGuard<'_, CouplingSlice<C>>> {
        self.slices.get(worker_id).map(|s| s.lock())
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn worker_count(&self) -> usize {
        self.slices.len()
    }

    pub fn clear_duplicates(&self) -> bool {
        self.clear_duplicates
    }

    pub fn set_clear_duplicates(&mut self, clear: bool) {
        self.clear_duplicates = clear;
    }

    /// Produced offspring in buffer order. Offspring that still alias their
    /// parent are dropped when duplicate clearing is on.
    pub fn collect(&self, population: &Population<C>) -> Vec<Offspring<C>> {
        let mut out = Vec::with_capacity(self.total);
        for slice in &self.slices {
            let slice = slice.lock();
            for entry in slice.entries.iter().flatten() {
                if self.clear_duplicates && entry.is_duplicate_of_parent(population) {
                    continue;
                }
                out.push(entry.clone());
            }
        }
        out
    }

    /// Crossover and mutation counts summed over all slices.
    pub fn operation_counts(&self) -> (usize, usize) {
        self.slices.iter().fold((0, 0), |(c, m), s| {
            let s = s.lock();
            (c + s.crossovers, m + s.mutations)
        })
    }
}
