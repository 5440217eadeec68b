use super::Chromosome;
use fastrand::Rng;

/// Real-valued vector scored on the negated sphere function, so the optimum
/// is `0.0` at the origin under a maximising comparator.
#[derive(Debug, Clone, PartialEq)]
pub struct RealVector {
    genes: Vec<f32>,
    lower: f32,
    upper: f32,
    fitness: f32,
}

impl RealVector {
    pub fn prototype(len: usize, lower: f32, upper: f32) -> Self {
        let (lower, upper) = if lower <= upper {
            (lower, upper)
        } else {
            (upper, lower)
        };
        let mut v = Self {
            genes: vec![0.0; len],
            lower,
            upper,
            fitness: 0.0,
        };
        v.refresh_fitness();
        v
    }

    pub fn from_genes(genes: Vec<f32>, lower: f32, upper: f32) -> Self {
        let mut v = Self::prototype(0, lower, upper);
        v.genes = genes
            .into_iter()
            .map(|g| g.clamp(v.lower, v.upper))
            .collect();
        v.refresh_fitness();
        v
    }

    pub fn genes(&self) -> &[f32] {
        &self.genes
    }

    #[inline(always)]
    fn span(&self) -> f32 {
        self.upper - self.lower
    }
}

impl Chromosome for RealVector {
    fn fitness(&self) -> f32 {
        self.fitness
    }

    fn refresh_fitness(&mut self) {
        self.fitness = -self.genes.iter().map(|g| g * g).sum::<f32>();
    }

    // Uniform crossover; genes beyond the shorter parent come from `self`.
    fn crossover(&self, other: &Self, rng: &mut Rng) -> Self {
        let mut child = self.clone();
        for (g, &o) in child.genes.iter_mut().zip(other.genes.iter()) {
            if rng.bool() {
                *g = o;
            }
        }
        child
    }

    fn mutate(&mut self, rng: &mut Rng) {
        if self.genes.is_empty() {
            return;
        }
        let idx = rng.usize(0..self.genes.len());
        let step = (rng.f32() - 0.5) * 0.2 * self.span();
        self.genes[idx] = (self.genes[idx] + step).clamp(self.lower, self.upper);
    }

    fn clone_chromosome(&self, setup_only: bool) -> Self {
        if setup_only {
            Self::prototype(self.genes.len(), self.lower, self.upper)
        } else {
            self.clone()
        }
    }

    fn new_from_prototype(&self, rng: &mut Rng) -> Self {
        let span = self.span();
        let genes = (0..self.genes.len())
            .map(|_| self.lower + rng.f32() * span)
            .collect();
        let mut v = Self {
            genes,
            lower: self.lower,
            upper: self.upper,
            fitness: 0.0,
        };
        v.refresh_fitness();
        v
    }
}
