use super::coupling::SimpleCoupling;
use super::replacement::{RandomReplacement, WorstReplacement};
use super::scaling::{LinearScaling, NoScaling, WindowScaling};
use super::selection::{RandomSelection, RouletteSelection, TournamentSelection};
use super::stop::{AnyOf, FitnessTarget, GenerationLimit};
use super::{
    CouplingOperation, ReplacementOperation, ScalingOperation, SelectionOperation, StopCriteria,
};
use crate::chromosome::Chromosome;
use crate::config::OperatorParams;
use crate::error::{GfError, GfResult};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub type SelectionFactory<C> = fn(&OperatorParams) -> Arc<dyn SelectionOperation<C>>;
pub type CouplingFactory<C> = fn(&OperatorParams) -> Arc<dyn CouplingOperation<C>>;
pub type ReplacementFactory<C> = fn(&OperatorParams) -> Arc<dyn ReplacementOperation<C>>;
pub type ScalingFactory = fn(&OperatorParams) -> Arc<dyn ScalingOperation>;

/// Named operator catalogue. Built by the application and handed to the
/// algorithm; there is no process-wide instance.
pub struct OperatorRegistry<C: Chromosome> {
    selection: HashMap<String, SelectionFactory<C>>,
    coupling: HashMap<String, CouplingFactory<C>>,
    replacement: HashMap<String, ReplacementFactory<C>>,
    scaling: HashMap<String, ScalingFactory>,
}

fn random_selection<C: Chromosome>(p: &OperatorParams) -> Arc<dyn SelectionOperation<C>> {
    Arc::new(RandomSelection {
        size: p.selection_size,
    })
}

fn tournament_selection<C: Chromosome>(p: &OperatorParams) -> Arc<dyn SelectionOperation<C>> {
    Arc::new(TournamentSelection {
        size: p.selection_size,
        rounds: p.tournament_size,
    })
}

fn roulette_selection<C: Chromosome>(p: &OperatorParams) -> Arc<dyn SelectionOperation<C>> {
    Arc::new(RouletteSelection {
        size: p.selection_size,
    })
}

fn simple_coupling<C: Chromosome>(p: &OperatorParams) -> Arc<dyn CouplingOperation<C>> {
    Arc::new(SimpleCoupling {
        crossover_probability: p.crossover_probability,
        mutation_probability: p.mutation_probability,
    })
}

fn worst_replacement<C: Chromosome>(_: &OperatorParams) -> Arc<dyn ReplacementOperation<C>> {
    Arc::new(WorstReplacement)
}

fn random_replacement<C: Chromosome>(_: &OperatorParams) -> Arc<dyn ReplacementOperation<C>> {
    Arc::new(RandomReplacement)
}

fn no_scaling(_: &OperatorParams) -> Arc<dyn ScalingOperation> {
    Arc::new(NoScaling)
}

fn window_scaling(_: &OperatorParams) -> Arc<dyn ScalingOperation> {
    Arc::new(WindowScaling)
}

fn linear_scaling(p: &OperatorParams) -> Arc<dyn ScalingOperation> {
    Arc::new(LinearScaling {
        factor: p.scaling_factor,
    })
}

impl<C: Chromosome> OperatorRegistry<C> {
    pub fn empty() -> Self {
        Self {
            selection: HashMap::new(),
            coupling: HashMap::new(),
            replacement: HashMap::new(),
            scaling: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut reg = Self::empty();
        reg.register_selection("random", random_selection::<C>);
        reg.register_selection("tournament", tournament_selection::<C>);
        reg.register_selection("roulette", roulette_selection::<C>);
        reg.register_coupling("simple", simple_coupling::<C>);
        reg.register_replacement("worst", worst_replacement::<C>);
        reg.register_replacement("random", random_replacement::<C>);
        reg.register_scaling("none", no_scaling);
        reg.register_scaling("window", window_scaling);
        reg.register_scaling("linear", linear_scaling);
        reg
    }

    pub fn register_selection(&mut self, name: &str, factory: SelectionFactory<C>) {
        self.selection.insert(name.to_string(), factory);
    }

    pub fn register_coupling(&mut self, name: &str, factory: CouplingFactory<C>) {
        self.coupling.insert(name.to_string(), factory);
    }

    pub fn register_replacement(&mut self, name: &str, factory: ReplacementFactory<C>) {
        self.replacement.insert(name.to_string(), factory);
    }

    pub fn register_scaling(&mut self, name: &str, factory: ScalingFactory) {
        self.scaling.insert(name.to_string(), factory);
    }

    fn lookup<F: Copy>(map: &HashMap<String, F>, kind: &'static str, name: &str) -> GfResult<F> {
        map.get(name).copied().ok_or_else(|| GfError::UnknownOperator {
            kind,
            name: name.to_string(),
        })
    }

    pub fn selection(&self, params: &OperatorParams) -> GfResult<Arc<dyn SelectionOperation<C>>> {
        Ok(Self::lookup(&self.selection, "selection", &params.selection)?(params))
    }

    pub fn coupling(&self, params: &OperatorParams) -> GfResult<Arc<dyn CouplingOperation<C>>> {
        Ok(Self::lookup(&self.coupling, "coupling", &params.coupling)?(params))
    }

    pub fn replacement(
        &self,
        params: &OperatorParams,
    ) -> GfResult<Arc<dyn ReplacementOperation<C>>> {
        Ok(Self::lookup(&self.replacement, "replacement", &params.replacement)?(params))
    }

    pub fn scaling(&self, params: &OperatorParams) -> GfResult<Arc<dyn ScalingOperation>> {
        Ok(Self::lookup(&self.scaling, "scaling", &params.scaling)?(params))
    }

    /// Generation limit, plus the fitness target when one is configured.
    pub fn stop_criteria(&self, params: &OperatorParams) -> Arc<dyn StopCriteria> {
        let limit: Arc<dyn StopCriteria> = Arc::new(GenerationLimit {
            limit: params.max_generations,
        });
        match params.target_fitness {
            Some(target) => Arc::new(AnyOf {
                criteria: vec![
                    limit,
                    Arc::new(FitnessTarget {
                        target,
                        comparator: params.comparator.build(),
                    }),
                ],
            }),
            None => limit,
        }
    }

    /// `(kind, name)` pairs, sorted.
    pub fn names(&self) -> Vec<(&'static str, String)> {
        let mut out: Vec<(&'static str, String)> = Vec::new();
        out.extend(self.selection.keys().map(|k| ("selection", k.clone())));
        out.extend(self.coupling.keys().map(|k| ("coupling", k.clone())));
        out.extend(self.replacement.keys().map(|k| ("replacement", k.clone())));
        out.extend(self.scaling.keys().map(|k| ("scaling", k.clone())));
        out.extend(["generation", "fitness", "any"].map(|k| ("stop", k.to_string())));
        out.sort();
        out
    }
}

impl<C: Chromosome> Default for OperatorRegistry<C> {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl<C: Chromosome> fmt::Debug for OperatorRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("operators", &self.names())
            .finish()
    }
}
