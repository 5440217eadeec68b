#![allow(dead_code)]

use fastrand::Rng;
use geneforge::chromosome::{Chromosome, ChromosomeRef, Maximize};
use geneforge::config::PopulationParams;
use geneforge::population::Population;
use std::sync::Arc;

/// Chromosome with a fixed fitness and a tag to tell equal-fitness members apart.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub fitness: f32,
    pub tag: usize,
}

impl Chromosome for Scored {
    fn fitness(&self) -> f32 {
        self.fitness
    }

    fn refresh_fitness(&mut self) {}

    fn crossover(&self, other: &Self, rng: &mut Rng) -> Self {
        if rng.bool() {
            self.clone()
        } else {
            other.clone()
        }
    }

    fn mutate(&mut self, rng: &mut Rng) {
        self.fitness += rng.f32() - 0.5;
    }

    fn clone_chromosome(&self, _setup_only: bool) -> Self {
        self.clone()
    }

    fn new_from_prototype(&self, rng: &mut Rng) -> Self {
        Self {
            fitness: rng.f32() * 100.0,
            tag: rng.usize(..),
        }
    }
}

pub fn scored(fitness: f32, tag: usize) -> ChromosomeRef<Scored> {
    Arc::new(Scored { fitness, tag })
}

pub fn params(size: usize, sorted: bool, track: usize) -> PopulationParams {
    PopulationParams::builder()
        .population_size(size)
        .sorted(sorted)
        .resizable(true)
        .best_track(track)
        .worst_track(track)
        .build()
}

pub fn population(size: usize, sorted: bool, track: usize) -> Population<Scored> {
    Population::new(
        params(size, sorted, track),
        Scored { fitness: 0.0, tag: 0 },
        Arc::new(Maximize),
    )
}

pub fn fitnesses(pop: &Population<Scored>) -> Vec<f32> {
    pop.slots().iter().map(|s| s.fitness()).collect()
}

pub fn group_fitnesses(pop: &Population<Scored>, indices: &[usize]) -> Vec<f32> {
    indices
        .iter()
        .map(|&i| pop.slots()[i].fitness())
        .collect()
}
