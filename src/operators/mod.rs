pub mod coupling;
pub mod registry;
pub mod replacement;
pub mod result_set;
pub mod scaling;
pub mod selection;
pub mod stop;

pub use self::registry::OperatorRegistry;
pub use self::result_set::{CouplingResultSet, CouplingSlice, SelectionResultSet};

use crate::chromosome::Chromosome;
use crate::population::{Population, Statistics};
use fastrand::Rng;
use std::fmt::Debug;

/// Picks parent indices into `result`. Runs on the control path before the
/// workers are released.
pub trait SelectionOperation<C: Chromosome>: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    fn select(&self, population: &Population<C>, result: &mut SelectionResultSet, rng: &mut Rng);
}

/// Produces offspring for one worker.
///
/// `slice` covers a disjoint range of the generation's offspring buffer, so
/// concurrent calls for different workers never touch the same entries. The
/// population is read-only for the whole parallel phase.
pub trait CouplingOperation<C: Chromosome>: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    fn couple(
        &self,
        population: &Population<C>,
        parents: &SelectionResultSet,
        slice: &mut CouplingSlice<C>,
    );
}

/// Moves offspring into the population. Returns how many slots changed.
pub trait ReplacementOperation<C: Chromosome>: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    fn replace(
        &self,
        population: &mut Population<C>,
        offspring: &CouplingResultSet<C>,
        elitism: usize,
        rng: &mut Rng,
    ) -> usize;
}

/// Population-relative fitness transform.
///
/// Must be monotone non-decreasing in `fitness` so the configured
/// comparator orders scaled values the same way as raw ones.
pub trait ScalingOperation: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    fn scale(&self, fitness: f32, stats: &Statistics) -> f32;

    /// Whether the statistics this transform depends on moved since the
    /// previous generation.
    fn needs_rescaling(&self, stats: &Statistics) -> bool;
}

pub trait StopCriteria: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    fn should_stop(&self, stats: &Statistics) -> bool;
}
