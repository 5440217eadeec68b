use serde::Serialize;

/// A statistic with its value from the previous generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatValue<T> {
    pub current: T,
    pub previous: T,
}

impl<T: Copy + Default> StatValue<T> {
    #[inline(always)]
    pub fn set(&mut self, value: T) {
        self.current = value;
    }

    #[inline(always)]
    pub fn next_generation(&mut self) {
        self.previous = self.current;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl StatValue<f32> {
    #[inline(always)]
    pub fn apply_delta(&mut self, delta: f32) {
        self.current += delta;
    }

    /// Relative change against the previous generation. Falls back to the
    /// absolute change when the previous value was zero.
    pub fn progress(&self) -> f32 {
        if self.previous == 0.0 {
            self.current - self.previous
        } else {
            (self.current - self.previous) / self.previous.abs()
        }
    }
}

impl StatValue<usize> {
    #[inline(always)]
    pub fn apply_delta(&mut self, delta: isize) {
        self.current = self.current.saturating_add_signed(delta);
    }
}

/// Running population statistics.
///
/// Mutators keep totals current through signed deltas; only a full resort
/// recomputes them from scratch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub generation: u64,
    pub population_size: StatValue<usize>,

    pub total_fitness: StatValue<f32>,
    pub avg_fitness: StatValue<f32>,
    pub best_fitness: StatValue<f32>,
    pub worst_fitness: StatValue<f32>,

    pub total_scaled: StatValue<f32>,
    pub avg_scaled: StatValue<f32>,
    pub best_scaled: StatValue<f32>,
    pub worst_scaled: StatValue<f32>,

    pub selection_count: StatValue<usize>,
    pub crossover_count: StatValue<usize>,
    pub mutation_count: StatValue<usize>,
}

/// Flat per-generation record used for CSV export.
#[derive(Debug, Clone, Serialize)]
pub struct StatsRow {
    pub generation: u64,
    pub population_size: usize,
    pub best_fitness: f32,
    pub avg_fitness: f32,
    pub worst_fitness: f32,
    pub best_scaled: f32,
    pub avg_scaled: f32,
    pub worst_scaled: f32,
    pub selections: usize,
    pub crossovers: usize,
    pub mutations: usize,
}

impl Statistics {
    /// Clears every value, keeping the generation counter.
    pub fn clear(&mut self) {
        let generation = self.generation;
        *self = Self::default();
        self.generation = generation;
    }

    /// Closes the current generation: values become `previous` and the
    /// per-generation operation counters restart at zero.
    pub fn next_generation(&mut self) {
        self.generation += 1;
        self.population_size.next_generation();
        for v in self.fitness_values_mut() {
            v.next_generation();
        }
        for c in [
            &mut self.selection_count,
            &mut self.crossover_count,
            &mut self.mutation_count,
        ] {
            c.next_generation();
            c.set(0);
        }
    }

    pub(crate) fn apply_delta(&mut self, size: isize, fitness: f32, scaled: f32) {
        self.population_size.apply_delta(size);
        self.total_fitness.apply_delta(fitness);
        self.total_scaled.apply_delta(scaled);
        self.refresh_averages();
    }

    pub(crate) fn set_totals(&mut self, size: usize, fitness: f32, scaled: f32) {
        self.population_size.set(size);
        self.total_fitness.set(fitness);
        self.total_scaled.set(scaled);
        self.refresh_averages();
    }

    pub(crate) fn set_extremes(&mut self, best: Option<(f32, f32)>, worst: Option<(f32, f32)>) {
        let (b, bs) = best.unwrap_or_default();
        let (w, ws) = worst.unwrap_or_default();
        self.best_fitness.set(b);
        self.best_scaled.set(bs);
        self.worst_fitness.set(w);
        self.worst_scaled.set(ws);
    }

    pub fn record_operations(&mut self, selections: usize, crossovers: usize, mutations: usize) {
        self.selection_count.apply_delta(selections as isize);
        self.crossover_count.apply_delta(crossovers as isize);
        self.mutation_count.apply_delta(mutations as isize);
    }

    pub fn row(&self) -> StatsRow {
        StatsRow {
            generation: self.generation,
            population_size: self.population_size.current,
            best_fitness: self.best_fitness.current,
            avg_fitness: self.avg_fitness.current,
            worst_fitness: self.worst_fitness.current,
            best_scaled: self.best_scaled.current,
            avg_scaled: self.avg_scaled.current,
            worst_scaled: self.worst_scaled.current,
            selections: self.selection_count.previous,
            crossovers: self.crossover_count.previous,
            mutations: self.mutation_count.previous,
        }
    }

    fn refresh_averages(&mut self) {
        let n = self.population_size.current;
        if n == 0 {
            self.avg_fitness.set(0.0);
            self.avg_scaled.set(0.0);
        } else {
            self.avg_fitness.set(self.total_fitness.current / n as f32);
            self.avg_scaled.set(self.total_scaled.current / n as f32);
        }
    }

    fn fitness_values_mut(&mut self) -> [&mut StatValue<f32>; 8] {
        [
            &mut self.total_fitness,
            &mut self.avg_fitness,
            &mut self.best_fitness,
            &mut self.worst_fitness,
            &mut self.total_scaled,
            &mut self.avg_scaled,
            &mut self.best_scaled,
            &mut self.worst_scaled,
        ]
    }
}
