use crate::reports;
use clap::{ArgMatches, Args};
use geneforge::algorithm::{
    AlgorithmController, AlgorithmState, GenerationStep, GeneticAlgorithm, Observer,
};
use geneforge::chromosome::{BitString, Chromosome, ChromosomeRef, RealVector};
use geneforge::config::Config;
use geneforge::error::GfResult;
use geneforge::operators::OperatorRegistry;
use geneforge::population::{Statistics, StatsRow};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use strum_macros::{Display, EnumString};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Problem {
    /// Real vector in [-5.12, 5.12], fitness is the negated sum of squares.
    Sphere,
    /// Bit string, fitness is the number of set bits.
    OneMax,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: Config,

    #[arg(long, default_value = "sphere")]
    pub problem: Problem,

    /// Genes per chromosome.
    #[arg(long, default_value_t = 16)]
    pub genes: usize,

    /// JSON configuration; flags typed on the command line take precedence.
    #[arg(long = "config")]
    pub config_file: Option<PathBuf>,

    /// Writes per-generation statistics to this file.
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Generations between progress reports.
    #[arg(long, default_value_t = 10)]
    pub report_every: u64,
}

/// Records every generation and logs one line per report interval.
struct ProgressLog {
    every: u64,
    rows: Mutex<Vec<StatsRow>>,
}

impl ProgressLog {
    fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            rows: Mutex::new(Vec::new()),
        }
    }

    fn rows(&self) -> Vec<StatsRow> {
        self.rows.lock().clone()
    }
}

impl<C: Chromosome> Observer<C> for ProgressLog {
    fn on_statistic_update(&self, stats: &Statistics, _: &AlgorithmController<C>) {
        if stats.generation % self.every == 0 {
            info!(
                "📈 Generation {}: best {:.4}, avg {:.4}",
                stats.generation, stats.best_fitness.current, stats.avg_fitness.current
            );
        }
        self.rows.lock().push(stats.row());
    }

    fn on_new_best_chromosome(&self, chromosome: &ChromosomeRef<C>, _: &AlgorithmController<C>) {
        debug!("New best chromosome, fitness {:.4}", chromosome.fitness());
    }

    fn on_state_changed(&self, state: AlgorithmState, _: &AlgorithmController<C>) {
        debug!("State changed to {}", state);
    }
}

pub fn run(args: RunArgs, matches: Option<&ArgMatches>) -> GfResult<()> {
    let config = match &args.config_file {
        Some(path) => {
            info!("📂 Loading configuration from {}", path.display());
            let mut file_config = Config::load_from_file(path)?;
            if let Some(m) = matches {
                file_config.merge_from_cli(&args.config, m);
            }
            file_config
        }
        None => args.config.clone(),
    };

    info!("🧬 Problem: {} with {} genes", args.problem, args.genes);
    match args.problem {
        Problem::Sphere => solve(config, RealVector::prototype(args.genes, -5.12, 5.12), &args),
        Problem::OneMax => solve(config, BitString::prototype(args.genes), &args),
    }
}

fn solve<C: Chromosome>(config: Config, prototype: C, args: &RunArgs) -> GfResult<()> {
    let registry = OperatorRegistry::with_defaults();
    let ga = GeneticAlgorithm::new(config, prototype, &registry)?;
    let algorithm = ga.into_algorithm(&registry);

    let progress = Arc::new(ProgressLog::new(args.report_every));
    algorithm.subscribe(progress.clone());

    let started = Instant::now();
    algorithm.start_solving(false)?;
    algorithm.wait_for_completion();
    let elapsed = started.elapsed();

    let rows = progress.rows();
    reports::print_generation_summary(&rows, args.report_every);

    let stats = algorithm.step().statistics();
    let best = algorithm
        .step()
        .best_chromosome()
        .map_or(f32::NAN, |c| c.fitness());
    println!(
        "\n🏁 Finished ({}) after {} generations in {:.2?}",
        algorithm.state(),
        stats.generation,
        elapsed
    );
    println!("Best fitness: {:.6}", best);

    if let Some(path) = &args.csv {
        write_csv(path, &rows)?;
        info!("💾 Wrote {} rows to {}", rows.len(), path.display());
    }
    Ok(())
}

fn write_csv(path: &Path, rows: &[StatsRow]) -> GfResult<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}
