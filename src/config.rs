use crate::algorithm::scheduler::MAX_WORKERS;
use crate::chromosome::ComparatorKind;
use crate::error::{GfError, GfResult};
use clap::{parser::ValueSource, ArgAction, ArgMatches, Args};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;
use typed_builder::TypedBuilder;

#[derive(Args, Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    #[command(flatten)]
    pub population: PopulationParams,
    #[command(flatten)]
    pub algorithm: AlgorithmParams,
    #[command(flatten)]
    pub operators: OperatorParams,
}

#[derive(Args, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TypedBuilder)]
#[serde(default)]
pub struct PopulationParams {
    /// Maximum number of chromosomes.
    #[arg(long, default_value_t = 100)]
    #[builder(default = 100)]
    pub population_size: usize,

    /// Allows the population to hold fewer chromosomes than its capacity.
    #[arg(long, default_value_t = false)]
    #[builder(default = false)]
    pub resizable: bool,

    /// Keeps every slot ordered instead of tracking best/worst groups only.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    #[builder(default = true)]
    pub sorted: bool,

    /// Orders chromosomes by scaled fitness instead of raw fitness.
    #[arg(long, default_value_t = false)]
    #[builder(default = false)]
    pub scaled_fitness: bool,

    #[arg(long, default_value_t = 5)]
    #[builder(default = 5)]
    pub best_track: usize,

    #[arg(long, default_value_t = 5)]
    #[builder(default = 5)]
    pub worst_track: usize,

    /// Fills a resizable population from the prototype on initialization.
    #[arg(long, default_value_t = false)]
    #[builder(default = false)]
    pub fill_on_init: bool,
}

impl Default for PopulationParams {
    fn default() -> Self {
        Self {
            population_size: 100,
            resizable: false,
            sorted: true,
            scaled_fitness: false,
            best_track: 5,
            worst_track: 5,
            fill_on_init: false,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AlgorithmParams {
    #[arg(long, default_value_t = 4)]
    pub workers: usize,

    /// Top chromosomes guaranteed to survive a generation unchanged.
    #[arg(long, default_value_t = 2)]
    pub elitism: usize,

    /// Offspring produced per generation.
    #[arg(long, default_value_t = 20)]
    pub offspring: usize,

    #[arg(long)]
    pub seed: Option<u64>,
}

impl Default for AlgorithmParams {
    fn default() -> Self {
        Self {
            workers: 4,
            elitism: 2,
            offspring: 20,
            seed: None,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OperatorParams {
    #[arg(long, default_value = "maximize")]
    pub comparator: ComparatorKind,

    #[arg(long, default_value = "tournament")]
    pub selection: String,
    /// Parents chosen per generation.
    #[arg(long, default_value_t = 20)]
    pub selection_size: usize,
    #[arg(long, default_value_t = 3)]
    pub tournament_size: usize,

    #[arg(long, default_value = "simple")]
    pub coupling: String,
    #[arg(long, default_value_t = 0.8)]
    pub crossover_probability: f32,
    #[arg(long, default_value_t = 0.1)]
    pub mutation_probability: f32,
    /// Drops offspring that are unchanged copies of their parent.
    #[arg(long, default_value_t = false)]
    pub clear_duplicates: bool,

    #[arg(long, default_value = "worst")]
    pub replacement: String,

    #[arg(long, default_value = "none")]
    pub scaling: String,
    #[arg(long, default_value_t = 1.5)]
    pub scaling_factor: f32,

    #[arg(long, default_value_t = 100)]
    pub max_generations: u64,
    #[arg(long)]
    pub target_fitness: Option<f32>,
}

impl Default for OperatorParams {
    fn default() -> Self {
        Self {
            comparator: ComparatorKind::Maximize,
            selection: "tournament".to_string(),
            selection_size: 20,
            tournament_size: 3,
            coupling: "simple".to_string(),
            crossover_probability: 0.8,
            mutation_probability: 0.1,
            clear_duplicates: false,
            replacement: "worst".to_string(),
            scaling: "none".to_string(),
            scaling_factor: 1.5,
            max_generations: 100,
            target_fitness: None,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> GfResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Checks hard errors and clamps soft ones so the engine can consume the
    /// values read-only.
    pub fn validate(&mut self) -> GfResult<()> {
        let size = self.population.population_size;
        if size == 0 {
            return Err(GfError::Config("population_size must be at least 1".into()));
        }
        for (name, p) in [
            ("crossover_probability", self.operators.crossover_probability),
            ("mutation_probability", self.operators.mutation_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(GfError::Config(format!("{} must be in [0, 1], got {}", name, p)));
            }
        }

        macro_rules! clamp_field {
            ($value:expr, $lo:expr, $hi:expr, $name:expr) => {
                let clamped = $value.clamp($lo, $hi);
                if clamped != $value {
                    warn!("Clamping {} from {} to {}", $name, $value, clamped);
                    $value = clamped;
                }
            };
        }

        // Unsorted populations can only report a best chromosome through the best group.
        let min_track = usize::from(!self.population.sorted);
        clamp_field!(self.population.best_track, min_track, size, "best_track");
        clamp_field!(self.population.worst_track, min_track, size, "worst_track");
        clamp_field!(self.algorithm.elitism, 0, size - 1, "elitism");
        clamp_field!(self.algorithm.workers, 1, MAX_WORKERS, "workers");
        clamp_field!(self.algorithm.offspring, 1, size, "offspring");
        clamp_field!(self.operators.selection_size, 1, usize::MAX, "selection_size");
        clamp_field!(self.operators.tournament_size, 1, size, "tournament_size");
        Ok(())
    }

    /// Overrides file values with the ones the user actually typed.
    pub fn merge_from_cli(&mut self, cli: &Config, matches: &ArgMatches) {
        macro_rules! update_if_present {
            ($($section:ident . $field:ident),* $(,)?) => {
                $(
                    if matches.value_source(stringify!($field)) == Some(ValueSource::CommandLine) {
                        self.$section.$field = cli.$section.$field.clone();
                    }
                )*
            };
        }

        update_if_present!(
            population.population_size,
            population.resizable,
            population.sorted,
            population.scaled_fitness,
            population.best_track,
            population.worst_track,
            population.fill_on_init,
            algorithm.workers,
            algorithm.elitism,
            algorithm.offspring,
            algorithm.seed,
            operators.comparator,
            operators.selection,
            operators.selection_size,
            operators.tournament_size,
            operators.coupling,
            operators.crossover_probability,
            operators.mutation_probability,
            operators.clear_duplicates,
            operators.replacement,
            operators.scaling,
            operators.scaling_factor,
            operators.max_generations,
            operators.target_fitness,
        );
    }
}
