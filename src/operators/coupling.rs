use super::{CouplingOperation, CouplingSlice, SelectionResultSet};
use crate::chromosome::Chromosome;
use crate::population::Population;
use std::sync::Arc;

/// Pairs consecutive parents. Offspring `i` descends from parents `i` and
/// `i + 1` of the selection (wrapping), so the result only depends on the
/// offspring position and the slice's rng, never on the worker count.
#[derive(Debug, Clone, Copy)]
pub struct SimpleCoupling {
    pub crossover_probability: f32,
    pub mutation_probability: f32,
}

impl<C: Chromosome> CouplingOperation<C> for SimpleCoupling {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn couple(
        &self,
        population: &Population<C>,
        parents: &SelectionResultSet,
        slice: &mut CouplingSlice<C>,
    ) {
        let n = parents.len();
        if n == 0 {
            return;
        }
        let caps = C::CAPABILITIES;

        for offset in 0..slice.len() {
            let position = slice.start() + offset;
            let Some(first) = parents.get(position % n) else { continue };
            let Some(parent) = population.chromosome(first) else { continue };
            let mate = parents
                .get((position + 1) % n)
                .and_then(|i| population.chromosome(i));

            let rng = slice.rng_mut();
            let crossover = caps.crossover && n > 1 && rng.f32() < self.crossover_probability;
            let mutation = caps.mutation && rng.f32() < self.mutation_probability;

            let child = match (crossover, mate) {
                (true, Some(mate)) => {
                    let mut c = parent.crossover(mate, rng);
                    if mutation {
                        c.mutate(rng);
                    }
                    c.refresh_fitness();
                    Arc::new(c)
                }
                _ if mutation => {
                    let mut c = parent.clone_chromosome(false);
                    c.mutate(rng);
                    c.refresh_fitness();
                    Arc::new(c)
                }
                _ => Arc::clone(parent),
            };
            slice.set(offset, child, first);
            slice.record(crossover && mate.is_some(), mutation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chromosome::{Capabilities, Maximize, RealVector};
    use crate::config::PopulationParams;
    use crate::operators::CouplingResultSet;
    use fastrand::Rng;

    #[derive(Debug, Clone)]
    struct Frozen(f32);

    impl Chromosome for Frozen {
        const CAPABILITIES: Capabilities = Capabilities::MUTATION_ONLY;

        fn fitness(&self) -> f32 {
            self.0
        }
        fn refresh_fitness(&mut self) {}
        fn crossover(&self, _: &Self, _: &mut Rng) -> Self {
            panic!("crossover called on a mutation-only chromosome")
        }
        fn mutate(&mut self, _: &mut Rng) {
            self.0 += 1.0;
        }
        fn clone_chromosome(&self, _: bool) -> Self {
            self.clone()
        }
        fn new_from_prototype(&self, rng: &mut Rng) -> Self {
            Frozen(rng.f32())
        }
    }

    fn setup<C: Chromosome>(proto: C) -> (Population<C>, SelectionResultSet) {
        let params = PopulationParams::builder().population_size(6).build();
        let mut pop = Population::new(params, proto, Arc::new(Maximize));
        pop.initialize(false, &mut Rng::with_seed(3));
        let mut sel = SelectionResultSet::new(pop.order().clone(), 4);
        sel.prepare(&pop, 4);
        for i in 0..4 {
            sel.add(i, &pop);
        }
        (pop, sel)
    }

    #[test]
    fn test_untouched_offspring_alias_parent() {
        let (pop, sel) = setup(RealVector::prototype(3, -1.0, 1.0));
        let op = SimpleCoupling {
            crossover_probability: 0.0,
            mutation_probability: 0.0,
        };
        let mut set = CouplingResultSet::new(false);
        set.prepare(4, 1, &mut Rng::with_seed(1));
        op.couple(&pop, &sel, &mut set.slice(0).unwrap());
        let all = set.collect(&pop);
        assert_eq!(all.len(), 4);
        assert!(all.iter().all(|o| o.is_duplicate_of_parent(&pop)));
        assert_eq!(set.operation_counts(), (0, 0));
    }

    #[test]
    fn test_capabilities_gate_crossover() {
        let (pop, sel) = setup(Frozen(0.0));
        let op = SimpleCoupling {
            crossover_probability: 1.0,
            mutation_probability: 1.0,
        };
        let mut set = CouplingResultSet::new(true);
        set.prepare(4, 2, &mut Rng::with_seed(1));
        for w in 0..2 {
            op.couple(&pop, &sel, &mut set.slice(w).unwrap());
        }
        assert_eq!(set.operation_counts(), (0, 4));
        assert_eq!(set.collect(&pop).len(), 4);
    }
}
