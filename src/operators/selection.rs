use super::{SelectionOperation, SelectionResultSet};
use crate::chromosome::Chromosome;
use crate::population::Population;
use fastrand::Rng;
use std::cmp::Ordering;

/// Uniformly random parents.
#[derive(Debug, Clone, Copy)]
pub struct RandomSelection {
    pub size: usize,
}

impl<C: Chromosome> SelectionOperation<C> for RandomSelection {
    fn name(&self) -> &'static str {
        "random"
    }

    fn select(&self, population: &Population<C>, result: &mut SelectionResultSet, rng: &mut Rng) {
        result.prepare(population, self.size);
        if population.is_empty() {
            return;
        }
        for _ in 0..self.size {
            result.add(rng.usize(0..population.len()), population);
        }
    }
}

/// Best of `rounds` random contestants, repeated `size` times.
#[derive(Debug, Clone, Copy)]
pub struct TournamentSelection {
    pub size: usize,
    pub rounds: usize,
}

impl<C: Chromosome> SelectionOperation<C> for TournamentSelection {
    fn name(&self) -> &'static str {
        "tournament"
    }

    fn select(&self, population: &Population<C>, result: &mut SelectionResultSet, rng: &mut Rng) {
        result.prepare(population, self.size);
        let len = population.len();
        if len == 0 {
            return;
        }
        let order = population.order();
        let slots = population.slots();
        for _ in 0..self.size {
            let mut winner = rng.usize(0..len);
            for _ in 1..self.rounds.max(1) {
                let contestant = rng.usize(0..len);
                if order.compare(&slots[contestant], &slots[winner]) == Ordering::Greater {
                    winner = contestant;
                }
            }
            result.add(winner, population);
        }
    }
}

/// Fitness-proportional selection on fitness shifted so the worst member
/// still has a small chance.
#[derive(Debug, Clone, Copy)]
pub struct RouletteSelection {
    pub size: usize,
}

impl RouletteSelection {
    const FLOOR: f32 = 1e-6;
}

impl<C: Chromosome> SelectionOperation<C> for RouletteSelection {
    fn name(&self) -> &'static str {
        "roulette"
    }

    fn select(&self, population: &Population<C>, result: &mut SelectionResultSet, rng: &mut Rng) {
        result.prepare(population, self.size);
        if population.is_empty() {
            return;
        }
        let order = population.order();
        let slots = population.slots();
        let keys: Vec<f32> = slots.iter().map(|s| order.key(s)).collect();
        let worst = keys
            .iter()
            .copied()
            .filter(|k| !k.is_nan())
            .min_by(|a, b| order.comparator.compare(*a, *b))
            .unwrap_or(0.0);

        // Distance from the worst grows with quality under either comparator.
        let mut cumulative = Vec::with_capacity(keys.len());
        let mut total = 0.0f32;
        for k in keys {
            let weight = if k.is_nan() { 0.0 } else { (k - worst).abs() };
            total += weight + Self::FLOOR;
            cumulative.push(total);
        }

        for _ in 0..self.size {
            let ticket = rng.f32() * total;
            let index = cumulative
                .partition_point(|&c| c <= ticket)
                .min(cumulative.len() - 1);
            result.add(index, population);
        }
    }
}
