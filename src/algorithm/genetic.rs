use super::scheduler::{Algorithm, GenerationStep};
use super::AlgorithmController;
use crate::chromosome::{Chromosome, ChromosomeRef};
use crate::config::Config;
use crate::error::GfResult;
use crate::operators::{
    CouplingOperation, CouplingResultSet, OperatorRegistry, ReplacementOperation,
    SelectionOperation, SelectionResultSet,
};
use crate::population::{Population, Statistics};
use fastrand::Rng;
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use std::sync::Arc;
use tracing::{debug, trace};

/// Generational GA: selection before the workers, coupling in parallel,
/// replacement and bookkeeping after.
pub struct GeneticAlgorithm<C: Chromosome> {
    config: Config,
    population: RwLock<Population<C>>,
    parents: RwLock<SelectionResultSet>,
    offspring: RwLock<CouplingResultSet<C>>,
    selection: Arc<dyn SelectionOperation<C>>,
    coupling: Arc<dyn CouplingOperation<C>>,
    replacement: Arc<dyn ReplacementOperation<C>>,
    rng: Mutex<Rng>,
    last_best: Mutex<Option<ChromosomeRef<C>>>,
}

impl<C: Chromosome> GeneticAlgorithm<C> {
    /// Validates `config` and resolves its operators through `registry`.
    pub fn new(mut config: Config, prototype: C, registry: &OperatorRegistry<C>) -> GfResult<Self> {
        config.validate()?;
        let ops = &config.operators;
        let scaling = registry.scaling(ops)?;
        let selection = registry.selection(ops)?;
        let coupling = registry.coupling(ops)?;
        let replacement = registry.replacement(ops)?;

        let population =
            Population::new(config.population.clone(), prototype, ops.comparator.build())
                .with_scaling(scaling);
        let parents = SelectionResultSet::new(population.order().clone(), ops.selection_size);
        let offspring = CouplingResultSet::new(ops.clear_duplicates);
        let rng = match config.algorithm.seed {
            Some(seed) => Rng::with_seed(seed),
            None => Rng::new(),
        };

        debug!(
            "GA operators: selection={}, coupling={}, replacement={}, scaling={}",
            selection.name(),
            coupling.name(),
            replacement.name(),
            ops.scaling
        );

        Ok(Self {
            population: RwLock::new(population),
            parents: RwLock::new(parents),
            offspring: RwLock::new(offspring),
            selection,
            coupling,
            replacement,
            rng: Mutex::new(rng),
            last_best: Mutex::new(None),
            config,
        })
    }

    /// Wraps the GA in an [`Algorithm`] with the configured worker count and
    /// the stop criteria the registry derives from the configuration.
    pub fn into_algorithm(self, registry: &OperatorRegistry<C>) -> Algorithm<Self> {
        let criteria = registry.stop_criteria(&self.config.operators);
        let workers = self.config.algorithm.workers;
        let algorithm = Algorithm::new(self, workers);
        algorithm.set_stop_criteria(Some(criteria));
        algorithm
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Read access to the population. Blocks while a generation's
    /// replacement phase is running.
    pub fn population(&self) -> RwLockReadGuard<'_, Population<C>> {
        self.population.read()
    }

    pub fn best_chromosome(&self) -> Option<ChromosomeRef<C>> {
        self.population.read().best_chromosome().cloned()
    }
}

impl<C: Chromosome> GenerationStep for GeneticAlgorithm<C> {
    type Chromosome = C;

    fn initialize(&self) -> GfResult<()> {
        let mut rng = self.rng.lock();
        let mut pop = self.population.write();
        pop.initialize(self.config.population.fill_on_init, &mut rng);
        *self.last_best.lock() = pop.best_chromosome().cloned();
        debug!("Population initialized with {} chromosomes", pop.len());
        Ok(())
    }

    fn before_workers(&self, worker_count: usize) {
        let mut rng = self.rng.lock();
        let pop = self.population.read();
        self.selection
            .select(&pop, &mut self.parents.write(), &mut rng);
        self.offspring
            .write()
            .prepare(self.config.algorithm.offspring, worker_count, &mut rng);
    }

    fn work_step(&self, worker_id: usize, _worker_count: usize) {
        let pop = self.population.read();
        let parents = self.parents.read();
        let offspring = self.offspring.read();
        let Some(mut slice) = offspring.slice(worker_id) else {
            return;
        };
        self.coupling.couple(&pop, &parents, &mut slice);
    }

    fn after_workers(&self, controller: &AlgorithmController<C>) {
        let (stats, best) = {
            let mut rng = self.rng.lock();
            let mut pop = self.population.write();
            let offspring = self.offspring.read();
            let replaced = self.replacement.replace(
                &mut pop,
                &offspring,
                self.config.algorithm.elitism,
                &mut rng,
            );
            pop.rescale_if_needed();
            let (crossovers, mutations) = offspring.operation_counts();
            pop.record_operations(self.parents.read().len(), crossovers, mutations);
            pop.next_generation();
            trace!(
                "Generation {}: replaced {}, best {}",
                pop.statistics().generation,
                replaced,
                pop.statistics().best_fitness.previous
            );
            (pop.statistics().clone(), pop.best_chromosome().cloned())
        };

        controller.notify_statistics(&stats);
        if let Some(best) = best {
            let mut last = self.last_best.lock();
            let changed = last.as_ref().map_or(true, |prev| !Arc::ptr_eq(prev, &best));
            if changed {
                *last = Some(Arc::clone(&best));
                drop(last);
                controller.notify_new_best(&best);
            }
        }
    }

    fn statistics(&self) -> Statistics {
        self.population.read().statistics().clone()
    }
}
