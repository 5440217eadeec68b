use super::ScalingOperation;
use crate::population::Statistics;

#[derive(Debug, Clone, Copy, Default)]
pub struct NoScaling;

impl ScalingOperation for NoScaling {
    fn name(&self) -> &'static str {
        "none"
    }

    #[inline(always)]
    fn scale(&self, fitness: f32, _stats: &Statistics) -> f32 {
        fitness
    }

    fn needs_rescaling(&self, _stats: &Statistics) -> bool {
        false
    }
}

/// Distance from the current worst fitness.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowScaling;

impl ScalingOperation for WindowScaling {
    fn name(&self) -> &'static str {
        "window"
    }

    #[inline(always)]
    fn scale(&self, fitness: f32, stats: &Statistics) -> f32 {
        fitness - stats.worst_fitness.current
    }

    fn needs_rescaling(&self, stats: &Statistics) -> bool {
        stats.worst_fitness.current != stats.worst_fitness.previous
    }
}

/// Stretches fitness around the average by `factor`.
#[derive(Debug, Clone, Copy)]
pub struct LinearScaling {
    pub factor: f32,
}

impl ScalingOperation for LinearScaling {
    fn name(&self) -> &'static str {
        "linear"
    }

    #[inline(always)]
    fn scale(&self, fitness: f32, stats: &Statistics) -> f32 {
        let avg = stats.avg_fitness.current;
        self.factor * (fitness - avg) + avg
    }

    fn needs_rescaling(&self, stats: &Statistics) -> bool {
        stats.avg_fitness.current != stats.avg_fitness.previous
    }
}
