pub mod binary;
pub mod real;

pub use self::binary::BitString;
pub use self::real::RealVector;

use fastrand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::Debug;
use std::sync::Arc;
use strum_macros::{Display, EnumIter, EnumString};

/// Shared-ownership handle to a chromosome.
///
/// Population slots, selection buffers and coupling buffers alias the same
/// payload across generations. Cloning the handle creates a new binding; the
/// last owner frees the chromosome.
pub type ChromosomeRef<C> = Arc<C>;

/// Optional operations a chromosome type supports.
///
/// Declared once per type through [`Chromosome::CAPABILITIES`] so operators
/// never probe individual chromosomes at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub crossover: bool,
    pub mutation: bool,
}

impl Capabilities {
    pub const ALL: Self = Self {
        crossover: true,
        mutation: true,
    };
    pub const MUTATION_ONLY: Self = Self {
        crossover: false,
        mutation: true,
    };
    pub const CROSSOVER_ONLY: Self = Self {
        crossover: true,
        mutation: false,
    };
}

/// A candidate solution. Opaque to the engine beyond its fitness and its
/// reproduction operations.
pub trait Chromosome: Clone + Send + Sync + Debug + 'static {
    const CAPABILITIES: Capabilities = Capabilities::ALL;

    /// Cached fitness. Only valid after [`Chromosome::refresh_fitness`] when
    /// the genes were changed by `crossover` or `mutate`.
    fn fitness(&self) -> f32;

    fn refresh_fitness(&mut self);

    fn crossover(&self, other: &Self, rng: &mut Rng) -> Self;

    fn mutate(&mut self, rng: &mut Rng);

    /// Copies the chromosome. With `setup_only` the copy shares the
    /// configuration (length, bounds) but not the genes.
    fn clone_chromosome(&self, setup_only: bool) -> Self;

    /// Builds a fresh random chromosome with the prototype's configuration.
    fn new_from_prototype(&self, rng: &mut Rng) -> Self;

    fn compare_fitness(&self, other: &Self, comparator: &dyn FitnessComparator) -> Ordering {
        comparator.compare(self.fitness(), other.fitness())
    }
}

/// Orders two fitness values. `Greater` means `a` is the better one.
pub trait FitnessComparator: Send + Sync + Debug {
    fn compare(&self, a: f32, b: f32) -> Ordering;

    fn kind(&self) -> ComparatorKind;
}

// NaN always ranks below any real value.
#[inline(always)]
fn nan_last(a: f32, b: f32) -> Option<Ordering> {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Some(Ordering::Equal),
        (true, false) => Some(Ordering::Less),
        (false, true) => Some(Ordering::Greater),
        (false, false) => None,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Maximize;

impl FitnessComparator for Maximize {
    #[inline(always)]
    fn compare(&self, a: f32, b: f32) -> Ordering {
        nan_last(a, b).unwrap_or_else(|| a.partial_cmp(&b).unwrap_or(Ordering::Equal))
    }

    fn kind(&self) -> ComparatorKind {
        ComparatorKind::Maximize
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Minimize;

impl FitnessComparator for Minimize {
    #[inline(always)]
    fn compare(&self, a: f32, b: f32) -> Ordering {
        nan_last(a, b).unwrap_or_else(|| b.partial_cmp(&a).unwrap_or(Ordering::Equal))
    }

    fn kind(&self) -> ComparatorKind {
        ComparatorKind::Minimize
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    EnumIter,
    EnumString,
    Display,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ComparatorKind {
    #[default]
    Maximize,
    Minimize,
}

impl ComparatorKind {
    pub fn build(self) -> Arc<dyn FitnessComparator> {
        match self {
            Self::Maximize => Arc::new(Maximize),
            Self::Minimize => Arc::new(Minimize),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maximize_orders_higher_first() {
        assert_eq!(Maximize.compare(2.0, 1.0), Ordering::Greater);
        assert_eq!(Maximize.compare(1.0, 2.0), Ordering::Less);
        assert_eq!(Maximize.compare(1.0, 1.0), Ordering::Equal);
    }

    #[test]
    fn test_minimize_orders_lower_first() {
        assert_eq!(Minimize.compare(1.0, 2.0), Ordering::Greater);
        assert_eq!(Minimize.compare(2.0, 1.0), Ordering::Less);
    }

    #[test]
    fn test_nan_is_always_worst() {
        assert_eq!(Maximize.compare(f32::NAN, -1e9), Ordering::Less);
        assert_eq!(Minimize.compare(f32::NAN, 1e9), Ordering::Less);
        assert_eq!(Minimize.compare(0.0, f32::NAN), Ordering::Greater);
    }

    #[test]
    fn test_comparator_kind_parses() {
        let kind: ComparatorKind = "minimize".parse().unwrap();
        assert_eq!(kind, ComparatorKind::Minimize);
        assert_eq!(kind.build().kind(), ComparatorKind::Minimize);
    }
}
