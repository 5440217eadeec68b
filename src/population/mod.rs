pub mod sorted_group;
pub mod stats;

pub use self::sorted_group::{FitnessOrder, GroupKind, SortedGroup};
pub use self::stats::{StatValue, Statistics, StatsRow};

use crate::chromosome::{Chromosome, ChromosomeRef, FitnessComparator};
use crate::config::PopulationParams;
use crate::operators::ScalingOperation;
use fastrand::Rng;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

/// Membership bits maintained by the best and worst [`SortedGroup`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupFlags(u8);

impl GroupFlags {
    pub const BEST: Self = Self(0b01);
    pub const WORST: Self = Self(0b10);

    #[inline(always)]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline(always)]
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    #[inline(always)]
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone)]
pub struct ChromosomeSlot<C> {
    chromosome: ChromosomeRef<C>,
    scaled_fitness: f32,
    index: usize,
    pub(crate) flags: GroupFlags,
}

impl<C> ChromosomeSlot<C> {
    pub fn new(chromosome: ChromosomeRef<C>, scaled_fitness: f32, index: usize) -> Self {
        Self {
            chromosome,
            scaled_fitness,
            index,
            flags: GroupFlags::default(),
        }
    }

    pub fn chromosome(&self) -> &ChromosomeRef<C> {
        &self.chromosome
    }

    #[inline(always)]
    pub fn scaled_fitness(&self) -> f32 {
        self.scaled_fitness
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn flags(&self) -> GroupFlags {
        self.flags
    }
}

impl<C: Chromosome> ChromosomeSlot<C> {
    #[inline(always)]
    pub fn fitness(&self) -> f32 {
        self.chromosome.fitness()
    }
}

/// Which inputs of a full resort changed. Unset parts are skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Resort {
    pub statistics: bool,
    pub rescale: bool,
    pub reorder: bool,
}

impl Resort {
    pub const ALL: Self = Self {
        statistics: true,
        rescale: true,
        reorder: true,
    };
}

/// Chromosome storage.
///
/// In sorted mode `slots` is kept ordered best first after every mutation.
/// Otherwise slots are in arrival order and only the best and worst groups
/// know anything about ranking.
#[derive(Debug)]
pub struct Population<C: Chromosome> {
    params: PopulationParams,
    prototype: ChromosomeRef<C>,
    slots: Vec<ChromosomeSlot<C>>,
    order: FitnessOrder,
    best: SortedGroup,
    worst: SortedGroup,
    scaling: Option<Arc<dyn ScalingOperation>>,
    stats: Statistics,
}

impl<C: Chromosome> Population<C> {
    pub fn new(
        params: PopulationParams,
        prototype: C,
        comparator: Arc<dyn FitnessComparator>,
    ) -> Self {
        let order = FitnessOrder::new(comparator, params.scaled_fitness);
        let (best_size, worst_size) = Self::group_sizes(&params);
        Self {
            slots: Vec::with_capacity(params.population_size),
            best: SortedGroup::new(GroupKind::Best, best_size, order.clone()),
            worst: SortedGroup::new(GroupKind::Worst, worst_size, order.clone()),
            prototype: Arc::new(prototype),
            scaling: None,
            stats: Statistics::default(),
            order,
            params,
        }
    }

    pub fn with_scaling(mut self, scaling: Arc<dyn ScalingOperation>) -> Self {
        self.scaling = Some(scaling);
        self
    }

    fn group_sizes(params: &PopulationParams) -> (usize, usize) {
        if params.sorted {
            (0, 0)
        } else {
            (params.best_track, params.worst_track)
        }
    }

    // --- accessors ---

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.params.population_size
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.params.population_size
    }

    pub fn is_sorted(&self) -> bool {
        self.params.sorted
    }

    pub fn params(&self) -> &PopulationParams {
        &self.params
    }

    pub fn prototype(&self) -> &ChromosomeRef<C> {
        &self.prototype
    }

    pub fn order(&self) -> &FitnessOrder {
        &self.order
    }

    pub fn comparator(&self) -> &Arc<dyn FitnessComparator> {
        &self.order.comparator
    }

    pub fn slots(&self) -> &[ChromosomeSlot<C>] {
        &self.slots
    }

    pub fn get(&self, index: usize) -> Option<&ChromosomeSlot<C>> {
        self.slots.get(index)
    }

    pub fn chromosome(&self, index: usize) -> Option<&ChromosomeRef<C>> {
        self.slots.get(index).map(|s| &s.chromosome)
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    pub fn best_group(&self) -> &SortedGroup {
        &self.best
    }

    pub fn worst_group(&self) -> &SortedGroup {
        &self.worst
    }

    pub fn record_operations(&mut self, selections: usize, crossovers: usize, mutations: usize) {
        self.stats.record_operations(selections, crossovers, mutations);
    }

    pub fn next_generation(&mut self) {
        self.stats.next_generation();
    }

    // --- lifecycle ---

    /// Resets the population. Fixed-size populations are always refilled
    /// from the prototype; resizable ones only when `fill` is set.
    pub fn initialize(&mut self, fill: bool, rng: &mut Rng) {
        self.best.clear(&mut self.slots);
        self.worst.clear(&mut self.slots);
        self.stats.clear();

        if !self.params.resizable || fill {
            let chromosomes = self.spawn_from_prototype(self.params.population_size, rng);
            self.slots = chromosomes
                .into_iter()
                .enumerate()
                .map(|(i, c)| ChromosomeSlot::new(c, 0.0, i))
                .collect();
            self.resort(Resort::ALL);
        } else {
            self.slots.clear();
            self.stats.set_totals(0, 0.0, 0.0);
            self.stats.set_extremes(None, None);
        }
    }

    fn spawn_from_prototype(&self, count: usize, rng: &mut Rng) -> Vec<ChromosomeRef<C>> {
        let base = rng.u64(..);
        let prototype = &self.prototype;
        (0..count)
            .into_par_iter()
            .map(|i| {
                let mut local = Rng::with_seed(base.wrapping_add(i as u64));
                Arc::new(prototype.new_from_prototype(&mut local))
            })
            .collect()
    }

    #[inline(always)]
    fn scale(&self, fitness: f32) -> f32 {
        match &self.scaling {
            Some(s) => s.scale(fitness, &self.stats),
            None => fitness,
        }
    }

    fn make_slot(&self, chromosome: ChromosomeRef<C>) -> ChromosomeSlot<C> {
        let scaled = self.scale(chromosome.fitness());
        ChromosomeSlot::new(chromosome, scaled, usize::MAX)
    }

    #[inline(always)]
    fn account_added(&mut self, fitness: f32, scaled: f32) {
        self.stats.apply_delta(1, fitness, scaled);
    }

    #[inline(always)]
    fn account_removed(&mut self, fitness: f32, scaled: f32) {
        self.stats.apply_delta(-1, -fitness, -scaled);
    }

    fn reindex_from(&mut self, start: usize) {
        for (i, slot) in self.slots.iter_mut().enumerate().skip(start) {
            slot.index = i;
        }
    }

    // Position after every slot ranked at least as high as `slot`.
    fn insertion_point(&self, range: std::ops::Range<usize>, slot: &ChromosomeSlot<C>) -> usize {
        let start = range.start;
        start
            + self.slots[range].partition_point(|s| self.order.compare(s, slot) != Ordering::Less)
    }

    fn update_extremes(&mut self) {
        let (best, worst) = if self.params.sorted {
            (self.slots.first(), self.slots.last())
        } else {
            (
                self.best.first().and_then(|i| self.slots.get(i)),
                self.worst.first().and_then(|i| self.slots.get(i)),
            )
        };
        let pair = |s: &ChromosomeSlot<C>| (s.fitness(), s.scaled_fitness);
        let best = best.map(pair);
        let worst = worst.map(pair);
        self.stats.set_extremes(best, worst);
    }

    // --- insertion ---

    /// Adds a chromosome. Returns its slot index, or `None` when it ranked
    /// below every member of a full population and was discarded.
    pub fn insert(&mut self, chromosome: ChromosomeRef<C>) -> Option<usize> {
        if self.capacity() == 0 {
            return None;
        }
        let slot = self.make_slot(chromosome);
        let placed = if self.params.sorted {
            self.insert_sorted(slot)
        } else {
            self.insert_unsorted(slot)
        };
        if placed.is_some() {
            self.update_extremes();
        }
        placed
    }

    fn insert_sorted(&mut self, mut slot: ChromosomeSlot<C>) -> Option<usize> {
        let pos = self.insertion_point(0..self.slots.len(), &slot);
        if self.is_full() {
            if pos >= self.slots.len() {
                return None;
            }
            if let Some(evicted) = self.slots.pop() {
                self.account_removed(evicted.fitness(), evicted.scaled_fitness);
            }
        }
        self.account_added(slot.fitness(), slot.scaled_fitness);
        slot.index = pos;
        self.slots.insert(pos, slot);
        self.reindex_from(pos);
        Some(pos)
    }

    fn insert_unsorted(&mut self, mut slot: ChromosomeSlot<C>) -> Option<usize> {
        if self.is_full() {
            // Only the tracked worst member can be evicted.
            let worst = self.worst.first()?;
            if self.order.compare(&slot, &self.slots[worst]) != Ordering::Greater {
                return None;
            }
            self.replace_unsorted(worst, slot);
            return Some(worst);
        }
        let index = self.slots.len();
        slot.index = index;
        self.account_added(slot.fitness(), slot.scaled_fitness);
        self.slots.push(slot);
        self.best.add(index, &mut self.slots);
        self.worst.add(index, &mut self.slots);
        Some(index)
    }

    /// Adds a batch. Sorted populations sort the batch once and merge it in
    /// a single pass. Returns how many chromosomes were kept.
    pub fn insert_group(&mut self, chromosomes: Vec<ChromosomeRef<C>>) -> usize {
        if chromosomes.is_empty() || self.capacity() == 0 {
            return 0;
        }
        let kept = if self.params.sorted {
            let incoming: Vec<_> = chromosomes.into_iter().map(|c| self.make_slot(c)).collect();
            self.merge_sorted(incoming)
        } else {
            let mut kept = 0;
            for c in chromosomes {
                let slot = self.make_slot(c);
                if self.insert_unsorted(slot).is_some() {
                    kept += 1;
                }
            }
            kept
        };
        self.update_extremes();
        kept
    }

    // Two-pointer merge of a batch into the sorted slots, capped at capacity.
    // Existing slots win ties.
    fn merge_sorted(&mut self, mut incoming: Vec<ChromosomeSlot<C>>) -> usize {
        let order = self.order.clone();
        incoming.sort_by(|a, b| order.compare(b, a));

        let capacity = self.capacity();
        let existing = std::mem::take(&mut self.slots);
        let mut merged = Vec::with_capacity(capacity.min(existing.len() + incoming.len()));
        let mut old = existing.into_iter().peekable();
        let mut new = incoming.into_iter().peekable();
        let mut kept = 0;

        loop {
            let take_old = match (old.peek(), new.peek()) {
                (Some(o), Some(n)) => order.compare(o, n) != Ordering::Less,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };
            let next = if take_old { old.next() } else { new.next() };
            let Some(slot) = next else { break };

            if merged.len() < capacity {
                if !take_old {
                    self.account_added(slot.fitness(), slot.scaled_fitness);
                    kept += 1;
                }
                merged.push(slot);
            } else if take_old {
                self.account_removed(slot.fitness(), slot.scaled_fitness);
            }
        }

        self.slots = merged;
        self.reindex_from(0);
        kept
    }

    // --- replacement ---

    /// Swaps the chromosome at `index` and moves it to its new rank.
    /// Returns the index it ended up at.
    pub fn replace(&mut self, index: usize, chromosome: ChromosomeRef<C>) -> Option<usize> {
        if index >= self.slots.len() {
            return None;
        }
        let slot = self.make_slot(chromosome);
        let placed = if self.params.sorted {
            self.replace_sorted(index, slot)
        } else {
            self.replace_unsorted(index, slot);
            index
        };
        self.update_extremes();
        Some(placed)
    }

    // Slides only the slots between the old and the new rank.
    fn replace_sorted(&mut self, index: usize, mut slot: ChromosomeSlot<C>) -> usize {
        let old = &self.slots[index];
        let (old_fitness, old_scaled) = (old.fitness(), old.scaled_fitness);
        self.account_removed(old_fitness, old_scaled);
        self.account_added(slot.fitness(), slot.scaled_fitness);

        let up = self.insertion_point(0..index, &slot);
        let target = if up < index {
            up
        } else {
            self.insertion_point(index + 1..self.slots.len(), &slot) - 1
        };

        slot.index = target;
        self.slots[index] = slot;
        match target.cmp(&index) {
            Ordering::Less => self.slots[target..=index].rotate_right(1),
            Ordering::Greater => self.slots[index..=target].rotate_left(1),
            Ordering::Equal => {}
        }
        let (lo, hi) = (target.min(index), target.max(index));
        for i in lo..=hi {
            self.slots[i].index = i;
        }
        target
    }

    fn replace_unsorted(&mut self, index: usize, mut slot: ChromosomeSlot<C>) {
        let flags = self.slots[index].flags;
        let old = &self.slots[index];
        let (old_fitness, old_scaled) = (old.fitness(), old.scaled_fitness);
        self.account_removed(old_fitness, old_scaled);
        self.account_added(slot.fitness(), slot.scaled_fitness);

        slot.index = index;
        slot.flags = flags;
        self.slots[index] = slot;

        for group in [&mut self.best, &mut self.worst] {
            let was_member = match group.kind() {
                GroupKind::Best => flags.contains(GroupFlags::BEST),
                GroupKind::Worst => flags.contains(GroupFlags::WORST),
                GroupKind::Other => false,
            };
            if was_member {
                group.rebuild(&mut self.slots);
            } else {
                group.add(index, &mut self.slots);
            }
        }
    }

    /// Replaces several slots at once. Pairs beyond the shorter input are
    /// ignored, out-of-range indices are skipped and a repeated index keeps
    /// its last chromosome. Returns the number of slots replaced.
    pub fn replace_group(&mut self, indices: &[usize], chromosomes: &[ChromosomeRef<C>]) -> usize {
        let mut pending: Vec<Option<ChromosomeRef<C>>> = vec![None; self.slots.len()];
        for (&i, c) in indices.iter().zip(chromosomes) {
            if let Some(p) = pending.get_mut(i) {
                *p = Some(Arc::clone(c));
            }
        }
        let count = pending.iter().filter(|p| p.is_some()).count();
        if count == 0 {
            return 0;
        }

        if self.params.sorted {
            let mut incoming = Vec::with_capacity(count);
            let mut old_totals = (0.0f32, 0.0f32);
            let mut survivors = Vec::with_capacity(self.slots.len() - count);
            for (slot, p) in std::mem::take(&mut self.slots).into_iter().zip(pending) {
                match p {
                    Some(c) => {
                        old_totals.0 += slot.fitness();
                        old_totals.1 += slot.scaled_fitness;
                        incoming.push(c);
                    }
                    None => survivors.push(slot),
                }
            }
            self.stats.apply_delta(-(count as isize), -old_totals.0, -old_totals.1);
            self.slots = survivors;
            let incoming = incoming.into_iter().map(|c| self.make_slot(c)).collect();
            self.merge_sorted(incoming);
        } else {
            let mut rebuild_best = false;
            let mut rebuild_worst = false;
            let mut replaced = Vec::with_capacity(count);
            for (index, p) in pending.into_iter().enumerate() {
                let Some(c) = p else { continue };
                let mut slot = self.make_slot(c);
                let old = &self.slots[index];
                let (old_fitness, old_scaled, flags) =
                    (old.fitness(), old.scaled_fitness, old.flags);
                rebuild_best |= flags.contains(GroupFlags::BEST);
                rebuild_worst |= flags.contains(GroupFlags::WORST);
                self.account_removed(old_fitness, old_scaled);
                self.account_added(slot.fitness(), slot.scaled_fitness);
                slot.index = index;
                slot.flags = flags;
                self.slots[index] = slot;
                replaced.push(index);
            }
            let groups = [(&mut self.best, rebuild_best), (&mut self.worst, rebuild_worst)];
            for (group, rebuild) in groups {
                if rebuild {
                    group.rebuild(&mut self.slots);
                } else {
                    for &i in &replaced {
                        group.add(i, &mut self.slots);
                    }
                }
            }
        }
        self.update_extremes();
        count
    }

    // --- removal ---

    /// Removes the slot at `index`. Only resizable populations shrink.
    pub fn remove(&mut self, index: usize) -> Option<ChromosomeRef<C>> {
        if !self.params.resizable || index >= self.slots.len() {
            return None;
        }
        let slot = self.slots.remove(index);
        self.account_removed(slot.fitness(), slot.scaled_fitness);
        self.reindex_from(index);
        if !self.params.sorted {
            self.best.rebuild(&mut self.slots);
            self.worst.rebuild(&mut self.slots);
        }
        self.update_extremes();
        Some(slot.chromosome)
    }

    /// Removes every listed slot. Returns the number removed.
    pub fn remove_group(&mut self, indices: &[usize]) -> usize {
        if !self.params.resizable {
            return 0;
        }
        let mut doomed = vec![false; self.slots.len()];
        for &i in indices {
            if let Some(d) = doomed.get_mut(i) {
                *d = true;
            }
        }
        let first = match doomed.iter().position(|&d| d) {
            Some(first) => first,
            None => return 0,
        };

        let mut removed = 0;
        let mut totals = (0.0f32, 0.0f32);
        let mut keep = doomed.iter().map(|&d| !d);
        self.slots.retain(|s| {
            let k = keep.next().unwrap_or(true);
            if !k {
                removed += 1;
                totals.0 += s.fitness();
                totals.1 += s.scaled_fitness;
            }
            k
        });
        self.stats.apply_delta(-(removed as isize), -totals.0, -totals.1);
        self.reindex_from(first);
        if !self.params.sorted {
            self.best.rebuild(&mut self.slots);
            self.worst.rebuild(&mut self.slots);
        }
        self.update_extremes();
        removed
    }

    // --- queries ---

    /// Indices of the best chromosomes starting at rank `start`. Unsorted
    /// populations can only answer up to their best track count.
    pub fn best_indices(&self, start: usize, count: usize) -> Vec<usize> {
        if self.params.sorted {
            let end = start.saturating_add(count).min(self.slots.len());
            (start.min(end)..end).collect()
        } else {
            let members = self.best.indices();
            let end = start.saturating_add(count).min(members.len());
            members[start.min(end)..end].to_vec()
        }
    }

    /// Indices of the worst chromosomes, worst first.
    pub fn worst_indices(&self, start: usize, count: usize) -> Vec<usize> {
        if self.params.sorted {
            let len = self.slots.len();
            let end = start.saturating_add(count).min(len);
            (start.min(end)..end).map(|r| len - 1 - r).collect()
        } else {
            let members = self.worst.indices();
            let end = start.saturating_add(count).min(members.len());
            members[start.min(end)..end].to_vec()
        }
    }

    pub fn best_chromosomes(&self, start: usize, count: usize) -> Vec<ChromosomeRef<C>> {
        self.best_indices(start, count)
            .into_iter()
            .map(|i| Arc::clone(&self.slots[i].chromosome))
            .collect()
    }

    pub fn worst_chromosomes(&self, start: usize, count: usize) -> Vec<ChromosomeRef<C>> {
        self.worst_indices(start, count)
            .into_iter()
            .map(|i| Arc::clone(&self.slots[i].chromosome))
            .collect()
    }

    pub fn best_chromosome(&self) -> Option<&ChromosomeRef<C>> {
        let index = if self.params.sorted { 0 } else { self.best.first()? };
        self.chromosome(index)
    }

    /// Rank of the slot at `index`, counted from the best (or with `reverse`
    /// from the worst). `None` when the rank is unknown.
    pub fn ranking(&self, index: usize, reverse: bool) -> Option<usize> {
        let len = self.slots.len();
        if index >= len {
            return None;
        }
        if self.params.sorted {
            return Some(if reverse { len - 1 - index } else { index });
        }
        if let Some(r) = self.best.ranking(index, &self.slots) {
            return Some(if reverse { len - 1 - r } else { r });
        }
        self.worst
            .ranking(index, &self.slots)
            .map(|r| if reverse { r } else { len - 1 - r })
    }

    // --- reconfiguration ---

    /// Recomputes whatever `what` names from scratch.
    pub fn resort(&mut self, what: Resort) {
        debug!(
            "Resorting population of {} (stats={}, rescale={}, reorder={})",
            self.slots.len(),
            what.statistics,
            what.rescale,
            what.reorder
        );
        if what.statistics {
            self.refresh_raw_statistics();
        }
        if what.rescale {
            self.rescale_all();
        }
        if what.reorder {
            if self.params.sorted {
                let order = self.order.clone();
                self.slots.par_sort_by(|a, b| order.compare(b, a));
                self.reindex_from(0);
            } else {
                self.best.rebuild(&mut self.slots);
                self.worst.rebuild(&mut self.slots);
            }
        }
        self.update_extremes();
    }

    fn refresh_raw_statistics(&mut self) {
        let total: f32 = self.slots.iter().map(|s| s.fitness()).sum();
        let scaled: f32 = self.slots.iter().map(|s| s.scaled_fitness).sum();
        self.stats.set_totals(self.slots.len(), total, scaled);

        // Raw extremes feed population-relative scaling before the reorder.
        let cmp = &self.order.comparator;
        let fitness = self.slots.iter().map(|s| s.fitness());
        let best = fitness.clone().max_by(|a, b| cmp.compare(*a, *b));
        let worst = fitness.min_by(|a, b| cmp.compare(*a, *b));
        self.stats.best_fitness.set(best.unwrap_or_default());
        self.stats.worst_fitness.set(worst.unwrap_or_default());
    }

    fn rescale_all(&mut self) {
        match &self.scaling {
            Some(scaling) => {
                let stats = &self.stats;
                self.slots
                    .par_iter_mut()
                    .for_each(|s| s.scaled_fitness = scaling.scale(s.chromosome.fitness(), stats));
            }
            None => self.slots.iter_mut().for_each(|s| s.scaled_fitness = s.chromosome.fitness()),
        }
        let scaled: f32 = self.slots.iter().map(|s| s.scaled_fitness).sum();
        let (size, total) = (self.slots.len(), self.stats.total_fitness.current);
        self.stats.set_totals(size, total, scaled);
    }

    /// Rescales when the scaling operator reports that its inputs moved.
    pub fn rescale_if_needed(&mut self) -> bool {
        let needed = self
            .scaling
            .as_ref()
            .is_some_and(|s| s.needs_rescaling(&self.stats));
        if needed {
            self.resort(Resort {
                statistics: false,
                rescale: true,
                reorder: self.order.scaled,
            });
        }
        needed
    }

    pub fn set_scaling(&mut self, scaling: Option<Arc<dyn ScalingOperation>>) {
        self.scaling = scaling;
        self.resort(Resort {
            statistics: false,
            rescale: true,
            reorder: self.order.scaled,
        });
    }

    pub fn set_sort_comparator(&mut self, comparator: Arc<dyn FitnessComparator>) {
        let order = FitnessOrder::new(comparator, self.order.scaled);
        self.apply_order(order);
        self.resort(Resort {
            statistics: true,
            rescale: true,
            reorder: true,
        });
    }

    fn apply_order(&mut self, order: FitnessOrder) {
        self.best.set_order(order.clone(), &self.slots);
        self.worst.set_order(order.clone(), &self.slots);
        self.order = order;
    }

    /// Applies new parameters doing only the work the difference requires.
    pub fn set_parameters(&mut self, params: PopulationParams, rng: &mut Rng) {
        let old = std::mem::replace(&mut self.params, params);
        let new = self.params.clone();
        let mut what = Resort::default();

        if old.sorted != new.sorted || old.scaled_fitness != new.scaled_fitness {
            if old.scaled_fitness != new.scaled_fitness {
                let comparator = Arc::clone(&self.order.comparator);
                let order = FitnessOrder::new(comparator, new.scaled_fitness);
                self.apply_order(order);
            }
            what.reorder = true;
        }
        // Group indices are only valid until the slots get sorted.
        if new.sorted && !old.sorted {
            self.best.clear(&mut self.slots);
            self.worst.clear(&mut self.slots);
        }

        // Capacity shrink drops the tail: the worst slots in sorted mode.
        if self.slots.len() > new.population_size {
            if new.sorted && !old.sorted {
                self.resort(Resort {
                    reorder: true,
                    ..Resort::default()
                });
                what.reorder = false;
            }
            for slot in self.slots.drain(new.population_size..) {
                self.stats.apply_delta(-1, -slot.fitness(), -slot.scaled_fitness);
            }
            if !new.sorted {
                what.reorder = true;
            }
        }

        let (best_size, worst_size) = Self::group_sizes(&new);
        let grew = best_size > self.best.max_size() || worst_size > self.worst.max_size();
        self.best.set_max_size(best_size, &mut self.slots);
        self.worst.set_max_size(worst_size, &mut self.slots);
        if grew && !new.sorted {
            what.reorder = true;
        }

        // Fixed-size populations are topped up from the prototype.
        if !new.resizable && self.slots.len() < new.population_size {
            let missing = new.population_size - self.slots.len();
            let fresh = self.spawn_from_prototype(missing, rng);
            if what.reorder {
                for c in fresh {
                    let mut slot = self.make_slot(c);
                    slot.index = self.slots.len();
                    self.stats.apply_delta(1, slot.fitness(), slot.scaled_fitness);
                    self.slots.push(slot);
                }
            } else {
                self.insert_group(fresh);
            }
        }

        if what.reorder {
            self.resort(what);
        } else {
            self.update_extremes();
        }
        debug!("Population parameters applied: {:?}", self.params);
    }
}
