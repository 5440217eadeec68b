use super::{CouplingResultSet, ReplacementOperation};
use crate::chromosome::{Chromosome, ChromosomeRef};
use crate::population::Population;
use fastrand::Rng;
use std::collections::HashSet;

#[inline]
fn is_elite<C: Chromosome>(population: &Population<C>, index: usize, elitism: usize) -> bool {
    elitism > 0 && population.ranking(index, false).is_some_and(|r| r < elitism)
}

// Random non-elite indices not already in `targets`, appended until `wanted`.
fn top_up_random<C: Chromosome>(
    population: &Population<C>,
    targets: &mut Vec<usize>,
    wanted: usize,
    elitism: usize,
    rng: &mut Rng,
) {
    if targets.len() >= wanted {
        return;
    }
    let taken: HashSet<usize> = targets.iter().copied().collect();
    let mut candidates: Vec<usize> = (0..population.len())
        .filter(|i| !taken.contains(i) && !is_elite(population, *i, elitism))
        .collect();
    rng.shuffle(&mut candidates);
    targets.extend(candidates.into_iter().take(wanted - targets.len()));
}

fn apply<C: Chromosome>(
    population: &mut Population<C>,
    targets: &[usize],
    children: Vec<ChromosomeRef<C>>,
) -> usize {
    let n = targets.len().min(children.len());
    population.replace_group(&targets[..n], &children[..n])
}

/// Offspring overwrite the worst non-elite members.
///
/// Unsorted populations only know their tracked worst members; any
/// shortfall is filled with random non-elite slots.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorstReplacement;

impl<C: Chromosome> ReplacementOperation<C> for WorstReplacement {
    fn name(&self) -> &'static str {
        "worst"
    }

    fn replace(
        &self,
        population: &mut Population<C>,
        offspring: &CouplingResultSet<C>,
        elitism: usize,
        rng: &mut Rng,
    ) -> usize {
        let children: Vec<_> = offspring
            .collect(population)
            .into_iter()
            .map(|o| o.chromosome)
            .collect();
        if children.is_empty() {
            return 0;
        }
        let mut targets: Vec<usize> = population
            .worst_indices(0, children.len())
            .into_iter()
            .filter(|&i| !is_elite(population, i, elitism))
            .collect();
        top_up_random(population, &mut targets, children.len(), elitism, rng);
        apply(population, &targets, children)
    }
}

/// Offspring overwrite random non-elite members.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomReplacement;

impl<C: Chromosome> ReplacementOperation<C> for RandomReplacement {
    fn name(&self) -> &'static str {
        "random"
    }

    fn replace(
        &self,
        population: &mut Population<C>,
        offspring: &CouplingResultSet<C>,
        elitism: usize,
        rng: &mut Rng,
    ) -> usize {
        let children: Vec<_> = offspring
            .collect(population)
            .into_iter()
            .map(|o| o.chromosome)
            .collect();
        if children.is_empty() {
            return 0;
        }
        let mut targets = Vec::with_capacity(children.len());
        top_up_random(population, &mut targets, children.len(), elitism, rng);
        apply(population, &targets, children)
    }
}
