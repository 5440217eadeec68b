use super::{ChromosomeSlot, GroupFlags};
use crate::chromosome::{Chromosome, FitnessComparator};
use std::cmp::Ordering;
use std::sync::Arc;

/// Orders population slots by raw or scaled fitness.
#[derive(Debug, Clone)]
pub struct FitnessOrder {
    pub comparator: Arc<dyn FitnessComparator>,
    pub scaled: bool,
}

impl FitnessOrder {
    pub fn new(comparator: Arc<dyn FitnessComparator>, scaled: bool) -> Self {
        Self { comparator, scaled }
    }

    /// `Greater` means `a` ranks above `b`.
    #[inline(always)]
    pub fn compare<C: Chromosome>(&self, a: &ChromosomeSlot<C>, b: &ChromosomeSlot<C>) -> Ordering {
        self.comparator.compare(self.key(a), self.key(b))
    }

    #[inline(always)]
    pub fn key<C: Chromosome>(&self, slot: &ChromosomeSlot<C>) -> f32 {
        if self.scaled {
            slot.scaled_fitness()
        } else {
            slot.fitness()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// Top-K of the population.
    Best,
    /// Bottom-K, ordered worst first.
    Worst,
    /// Ad-hoc ordered index list without membership flags. Repeats allowed.
    Other,
}

impl GroupKind {
    #[inline(always)]
    fn flag(self) -> Option<GroupFlags> {
        match self {
            Self::Best => Some(GroupFlags::BEST),
            Self::Worst => Some(GroupFlags::WORST),
            Self::Other => None,
        }
    }
}

/// Bounded, incrementally maintained ordered list of slot indices.
///
/// The group does not own the slots; every operation borrows them. For
/// `Best` and `Worst` the slot flags mirror membership, which makes the
/// "already a member" and "not a member" checks O(1).
#[derive(Debug, Clone)]
pub struct SortedGroup {
    kind: GroupKind,
    max_size: usize,
    indices: Vec<usize>,
    order: FitnessOrder,
}

impl SortedGroup {
    pub fn new(kind: GroupKind, max_size: usize, order: FitnessOrder) -> Self {
        Self {
            kind,
            max_size,
            indices: Vec::with_capacity(max_size),
            order,
        }
    }

    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.indices.len() >= self.max_size
    }

    /// Member indices, best-ranked first in the group's own direction.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn get(&self, position: usize) -> Option<usize> {
        self.indices.get(position).copied()
    }

    pub fn first(&self) -> Option<usize> {
        self.indices.first().copied()
    }

    pub fn order(&self) -> &FitnessOrder {
        &self.order
    }

    // Direction-aware comparison: `Greater` means `a` belongs closer to the front.
    #[inline(always)]
    fn rank<C: Chromosome>(&self, a: &ChromosomeSlot<C>, b: &ChromosomeSlot<C>) -> Ordering {
        let ord = self.order.compare(a, b);
        match self.kind {
            GroupKind::Worst => ord.reverse(),
            _ => ord,
        }
    }

    #[inline(always)]
    fn is_member<C>(&self, slot: &ChromosomeSlot<C>) -> bool {
        self.kind.flag().is_some_and(|f| slot.flags.contains(f))
    }

    fn mark<C>(&self, slot: &mut ChromosomeSlot<C>, member: bool) {
        if let Some(f) = self.kind.flag() {
            if member {
                slot.flags.insert(f);
            } else {
                slot.flags.remove(f);
            }
        }
    }

    /// Offers `index` to the group. Returns its position, or `None` when it
    /// was already a member, out of range, or not strictly better than the
    /// current last member of a full group.
    pub fn add<C: Chromosome>(
        &mut self,
        index: usize,
        slots: &mut [ChromosomeSlot<C>],
    ) -> Option<usize> {
        let (pos, evicted) = self.place(index, slots)?;
        if let Some(dropped) = evicted {
            self.mark(&mut slots[dropped], false);
        }
        self.mark(&mut slots[index], true);
        Some(pos)
    }

    /// [`SortedGroup::add`] for `Other` groups, which keep no flags and so
    /// only need shared access to the slots.
    pub fn add_unflagged<C: Chromosome>(
        &mut self,
        index: usize,
        slots: &[ChromosomeSlot<C>],
    ) -> Option<usize> {
        if self.kind.flag().is_some() {
            return None;
        }
        self.place(index, slots).map(|(pos, _)| pos)
    }

    fn place<C: Chromosome>(
        &mut self,
        index: usize,
        slots: &[ChromosomeSlot<C>],
    ) -> Option<(usize, Option<usize>)> {
        if self.max_size == 0 || index >= slots.len() || self.is_member(&slots[index]) {
            return None;
        }

        if self.is_full() {
            let last = *self.indices.last()?;
            if self.rank(&slots[index], &slots[last]) != Ordering::Greater {
                return None;
            }
        }

        // Equal members already present stay ahead of the newcomer.
        let candidate = &slots[index];
        let pos = self
            .indices
            .iter()
            .position(|&m| self.rank(candidate, &slots[m]) == Ordering::Greater)
            .unwrap_or(self.indices.len());

        let evicted = if self.is_full() { self.indices.pop() } else { None };
        self.indices.insert(pos, index);
        Some((pos, evicted))
    }

    pub fn remove<C: Chromosome>(&mut self, index: usize, slots: &mut [ChromosomeSlot<C>]) -> bool {
        if self.kind.flag().is_some() && !slots.get(index).is_some_and(|s| self.is_member(s)) {
            return false;
        }
        match self.indices.iter().position(|&m| m == index) {
            Some(pos) => {
                self.indices.remove(pos);
                if let Some(slot) = slots.get_mut(index) {
                    self.mark(slot, false);
                }
                true
            }
            None => false,
        }
    }

    /// Position of `index` inside the group.
    pub fn ranking<C: Chromosome>(
        &self,
        index: usize,
        slots: &[ChromosomeSlot<C>],
    ) -> Option<usize> {
        let slot = slots.get(index)?;
        if self.kind.flag().is_some() && !self.is_member(slot) {
            return None;
        }
        let last = *self.indices.last()?;
        if self.rank(slot, &slots[last]) == Ordering::Less {
            return None;
        }
        self.indices.iter().position(|&m| m == index)
    }

    pub fn set_max_size<C: Chromosome>(
        &mut self,
        max_size: usize,
        slots: &mut [ChromosomeSlot<C>],
    ) {
        if max_size < self.indices.len() {
            let dropped: Vec<usize> = self.indices.drain(max_size..).collect();
            for i in dropped {
                if let Some(slot) = slots.get_mut(i) {
                    self.mark(slot, false);
                }
            }
        }
        self.max_size = max_size;
        self.indices.shrink_to(max_size);
    }

    /// Switches the ordering and re-sorts current members in place.
    pub fn set_order<C: Chromosome>(&mut self, order: FitnessOrder, slots: &[ChromosomeSlot<C>]) {
        self.order = order;
        for i in 1..self.indices.len() {
            let mut j = i;
            while j > 0 {
                let (a, b) = (&slots[self.indices[j]], &slots[self.indices[j - 1]]);
                if self.rank(a, b) != Ordering::Greater {
                    break;
                }
                self.indices.swap(j, j - 1);
                j -= 1;
            }
        }
    }

    /// Copies members into `other`. With `same_sorting` the raw index list is
    /// copied; otherwise every member is re-offered under `other`'s ordering.
    pub fn copy_to<C: Chromosome>(
        &self,
        other: &mut SortedGroup,
        slots: &mut [ChromosomeSlot<C>],
        same_sorting: bool,
    ) {
        other.clear(slots);
        if same_sorting {
            for &i in self.indices.iter().take(other.max_size) {
                other.indices.push(i);
                if let Some(slot) = slots.get_mut(i) {
                    other.mark(slot, true);
                }
            }
        } else {
            for &i in &self.indices {
                other.add(i, slots);
            }
        }
    }

    /// Drops every member, clearing their flags.
    pub fn clear<C>(&mut self, slots: &mut [ChromosomeSlot<C>]) {
        for i in std::mem::take(&mut self.indices) {
            if let Some(slot) = slots.get_mut(i) {
                self.mark(slot, false);
            }
        }
        self.indices.reserve(self.max_size);
    }

    /// Recomputes membership from scratch. Clears this group's flag on every
    /// slot first, since stale indices may no longer point at the flagged slots.
    pub fn rebuild<C: Chromosome>(&mut self, slots: &mut [ChromosomeSlot<C>]) {
        self.indices.clear();
        if let Some(f) = self.kind.flag() {
            for slot in slots.iter_mut() {
                slot.flags.remove(f);
            }
        }
        for i in 0..slots.len() {
            self.add(i, slots);
        }
    }

    /// Empties a group that keeps no flags.
    pub fn reset(&mut self) {
        debug_assert!(self.kind.flag().is_none());
        self.indices.clear();
    }
}
