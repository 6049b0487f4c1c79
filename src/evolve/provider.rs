//! Genetic operators — genome generation, parent selection, crossover, mutation.
//!
//! The [`EvolutionProvider`] trait is the seam between the generation loop
//! and the genetic machinery, so the loop can be driven by scripted
//! operators in tests. [`BitFlipEvolution`] is the production provider: a
//! seeded ChaCha8 RNG drives fitness-proportional selection, single-point
//! crossover, and independent bit-flip mutation.

use log::debug;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::FitnessTable;
use crate::genome::Genome;

/// Supplies the genetic operators for the generation loop.
pub trait EvolutionProvider {
    /// Create a fresh random genome of `bit_len` bits.
    fn generate(&mut self, bit_len: usize) -> Genome;

    /// Pick two parents from the population, weighted by fitness.
    fn select_parents(&mut self, population: &[Genome], fitness: &FitnessTable)
        -> (Genome, Genome);

    /// Recombine two equal-length parents into two children.
    fn crossover(&mut self, a: &Genome, b: &Genome) -> (Genome, Genome);

    /// Return a mutated copy: up to `flips` uniformly chosen bit positions,
    /// each flipped independently with `probability`.
    fn mutate(&mut self, genome: &Genome, flips: usize, probability: f64) -> Genome;
}

/// Production operators over a seeded RNG.
#[derive(Debug)]
pub struct BitFlipEvolution {
    rng: ChaCha8Rng,
}

impl BitFlipEvolution {
    /// Create a provider whose entire output is determined by `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl EvolutionProvider for BitFlipEvolution {
    fn generate(&mut self, bit_len: usize) -> Genome {
        Genome::from_bits((0..bit_len).map(|_| self.rng.gen()).collect())
    }

    /// Roulette selection with replacement: each pick lands on a genome
    /// with probability proportional to its rating. Negative ratings count
    /// as zero weight; when every weight is zero the pick falls back to a
    /// uniform draw instead of failing.
    fn select_parents(
        &mut self,
        population: &[Genome],
        fitness: &FitnessTable,
    ) -> (Genome, Genome) {
        let pick = |rng: &mut ChaCha8Rng| {
            population
                .choose_weighted(rng, |g| fitness.score(g).max(0) as f64)
                .cloned()
                .unwrap_or_else(|_| {
                    debug!("no positive ratings in population, selecting uniformly");
                    population
                        .choose(rng)
                        .cloned()
                        .unwrap_or_else(|| Genome::from_bits(Vec::new()))
                })
        };
        let first = pick(&mut self.rng);
        let second = pick(&mut self.rng);
        (first, second)
    }

    /// Single-point crossover at a uniform split in `1..len`. Parents of
    /// fewer than two bits, or of differing lengths, pass through unchanged.
    fn crossover(&mut self, a: &Genome, b: &Genome) -> (Genome, Genome) {
        if a.len() != b.len() || a.len() < 2 {
            return (a.clone(), b.clone());
        }
        let split = self.rng.gen_range(1..a.len());

        let mut first = a.bits()[..split].to_vec();
        first.extend_from_slice(&b.bits()[split..]);
        let mut second = b.bits()[..split].to_vec();
        second.extend_from_slice(&a.bits()[split..]);
        (Genome::from_bits(first), Genome::from_bits(second))
    }

    fn mutate(&mut self, genome: &Genome, flips: usize, probability: f64) -> Genome {
        let mut mutated = genome.clone();
        if mutated.is_empty() {
            return mutated;
        }
        for _ in 0..flips {
            let index = self.rng.gen_range(0..mutated.len());
            if self.rng.gen_bool(probability) {
                mutated = mutated.with_flipped(index);
            }
        }
        mutated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genome(bits: &[u8]) -> Genome {
        Genome::from_bits(bits.iter().map(|&b| b != 0).collect())
    }

    #[test]
    fn generate_has_the_requested_length() {
        let mut evo = BitFlipEvolution::new(1);
        assert_eq!(evo.generate(64).len(), 64);
        assert!(evo.generate(0).is_empty());
    }

    #[test]
    fn same_seed_same_genomes() {
        let mut a = BitFlipEvolution::new(42);
        let mut b = BitFlipEvolution::new(42);
        assert_eq!(a.generate(128), b.generate(128));
    }

    #[test]
    fn crossover_preserves_length_and_material() {
        let mut evo = BitFlipEvolution::new(7);
        let a = genome(&[1, 1, 1, 1, 1, 1, 1, 1]);
        let b = genome(&[0, 0, 0, 0, 0, 0, 0, 0]);
        let (ca, cb) = evo.crossover(&a, &b);

        assert_eq!(ca.len(), 8);
        assert_eq!(cb.len(), 8);
        // Children are bitwise complements: every position holds one parent's
        // bit in one child and the other parent's bit in the other.
        for i in 0..8 {
            assert_ne!(ca.bit(i), cb.bit(i));
        }
        // A single split point means one leading run from each parent.
        let ones_then_zeros = ca.bits().windows(2).filter(|w| w[0] != w[1]).count();
        assert_eq!(ones_then_zeros, 1);
    }

    #[test]
    fn crossover_of_single_bit_parents_is_identity() {
        let mut evo = BitFlipEvolution::new(3);
        let a = genome(&[1]);
        let b = genome(&[0]);
        let (ca, cb) = evo.crossover(&a, &b);
        assert_eq!(ca, a);
        assert_eq!(cb, b);
    }

    #[test]
    fn zero_probability_mutation_is_identity() {
        let mut evo = BitFlipEvolution::new(11);
        let g = genome(&[1, 0, 1, 0, 1, 0, 1, 0]);
        assert_eq!(evo.mutate(&g, 10, 0.0), g);
    }

    #[test]
    fn mutation_changes_at_most_flips_bits() {
        let mut evo = BitFlipEvolution::new(13);
        let g = genome(&[0; 32]);
        for flips in [0, 1, 2, 5] {
            let mutated = evo.mutate(&g, flips, 1.0);
            let changed = (0..g.len()).filter(|&i| mutated.bit(i) != g.bit(i)).count();
            assert!(changed <= flips, "{changed} > {flips}");
        }
    }

    #[test]
    fn mutation_is_deterministic_per_seed() {
        let g = genome(&[0; 16]);
        let a = BitFlipEvolution::new(5).mutate(&g, 4, 0.5);
        let b = BitFlipEvolution::new(5).mutate(&g, 4, 0.5);
        assert_eq!(a, b);
    }

    #[test]
    fn selection_prefers_positive_weight() {
        let mut evo = BitFlipEvolution::new(17);
        let loser = genome(&[0, 0, 0, 0]);
        let winner = genome(&[1, 1, 1, 1]);
        let mut fitness = FitnessTable::default();
        fitness.insert(loser.clone(), 0);
        fitness.insert(winner.clone(), 5);

        let population = vec![loser, winner.clone()];
        for _ in 0..20 {
            let (a, b) = evo.select_parents(&population, &fitness);
            assert_eq!(a, winner);
            assert_eq!(b, winner);
        }
    }

    #[test]
    fn all_zero_fitness_falls_back_to_uniform() {
        let mut evo = BitFlipEvolution::new(19);
        let population = vec![genome(&[0, 1]), genome(&[1, 0])];
        let fitness = FitnessTable::default();
        let (a, b) = evo.select_parents(&population, &fitness);
        assert!(population.contains(&a));
        assert!(population.contains(&b));
    }

    #[test]
    fn negative_ratings_count_as_zero_weight() {
        let mut evo = BitFlipEvolution::new(23);
        let bad = genome(&[0, 0]);
        let good = genome(&[1, 1]);
        let mut fitness = FitnessTable::default();
        fitness.insert(bad.clone(), -4);
        fitness.insert(good.clone(), 1);

        let population = vec![bad, good.clone()];
        for _ in 0..20 {
            let (a, _) = evo.select_parents(&population, &fitness);
            assert_eq!(a, good);
        }
    }
}
