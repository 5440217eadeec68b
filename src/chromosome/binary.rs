use super::Chromosome;
use fastrand::Rng;

/// Bit string scored by the number of set bits (one-max).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitString {
    bits: Vec<bool>,
    ones: usize,
}

impl BitString {
    pub fn prototype(len: usize) -> Self {
        Self {
            bits: vec![false; len],
            ones: 0,
        }
    }

    pub fn from_bits(bits: Vec<bool>) -> Self {
        let mut b = Self { bits, ones: 0 };
        b.refresh_fitness();
        b
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }
}

impl Chromosome for BitString {
    fn fitness(&self) -> f32 {
        self.ones as f32
    }

    fn refresh_fitness(&mut self) {
        self.ones = self.bits.iter().filter(|&&b| b).count();
    }

    // Single point crossover.
    fn crossover(&self, other: &Self, rng: &mut Rng) -> Self {
        let len = self.bits.len().min(other.bits.len());
        if len == 0 {
            return self.clone();
        }
        let cut = rng.usize(0..=len);
        let mut bits = self.bits.clone();
        bits[cut..len].copy_from_slice(&other.bits[cut..len]);
        Self { bits, ones: 0 }
    }

    fn mutate(&mut self, rng: &mut Rng) {
        if self.bits.is_empty() {
            return;
        }
        let idx = rng.usize(0..self.bits.len());
        self.bits[idx] = !self.bits[idx];
    }

    fn clone_chromosome(&self, setup_only: bool) -> Self {
        if setup_only {
            Self::prototype(self.bits.len())
        } else {
            self.clone()
        }
    }

    fn new_from_prototype(&self, rng: &mut Rng) -> Self {
        let bits = (0..self.bits.len()).map(|_| rng.bool()).collect();
        Self::from_bits(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_max_fitness() {
        let b = BitString::from_bits(vec![true, false, true, true]);
        assert_eq!(b.fitness(), 3.0);
    }

    #[test]
    fn test_crossover_keeps_length() {
        let mut rng = Rng::with_seed(3);
        let a = BitString::from_bits(vec![true; 10]);
        let b = BitString::from_bits(vec![false; 10]);
        for _ in 0..50 {
            let mut c = a.crossover(&b, &mut rng);
            c.refresh_fitness();
            assert_eq!(c.len(), 10);
            // Single cut: a prefix of ones followed by zeros.
            let ones = c.fitness() as usize;
            assert!(c.bits()[..ones].iter().all(|&x| x));
        }
    }
}
