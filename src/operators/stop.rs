use super::StopCriteria;
use crate::chromosome::FitnessComparator;
use crate::population::Statistics;
use std::cmp::Ordering;
use std::sync::Arc;

/// Stops once `limit` generations have completed.
#[derive(Debug, Clone, Copy)]
pub struct GenerationLimit {
    pub limit: u64,
}

impl StopCriteria for GenerationLimit {
    fn name(&self) -> &'static str {
        "generation"
    }

    fn should_stop(&self, stats: &Statistics) -> bool {
        stats.generation >= self.limit
    }
}

/// Stops once the best fitness is at least as good as `target`.
#[derive(Debug, Clone)]
pub struct FitnessTarget {
    pub target: f32,
    pub comparator: Arc<dyn FitnessComparator>,
}

impl StopCriteria for FitnessTarget {
    fn name(&self) -> &'static str {
        "fitness"
    }

    fn should_stop(&self, stats: &Statistics) -> bool {
        stats.population_size.current > 0
            && self.comparator.compare(stats.best_fitness.current, self.target) != Ordering::Less
    }
}

/// Stops when any inner criterion does.
#[derive(Debug, Clone, Default)]
pub struct AnyOf {
    pub criteria: Vec<Arc<dyn StopCriteria>>,
}

impl StopCriteria for AnyOf {
    fn name(&self) -> &'static str {
        "any"
    }

    fn should_stop(&self, stats: &Statistics) -> bool {
        self.criteria.iter().any(|c| c.should_stop(stats))
    }
}
