//! Generational evolution — rate, rank, keep the elites, breed the rest.
//!
//! [`GenerationLoop`] orchestrates one evolutionary cycle at a time:
//! shuffle the population, collect a human rating for every genome, rank,
//! carry the top two over unchanged, breed the remainder from
//! fitness-weighted parents, play the winners back, and persist the ranked
//! generation to the archive. The loop owns no device or file handle; it
//! talks to its collaborators through the [`Rater`], [`EvolutionProvider`],
//! and [`Archive`] seams, which keeps every cycle testable headless.

pub mod provider;

pub use provider::{BitFlipEvolution, EvolutionProvider};

use std::collections::HashMap;
use std::io;

use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::fitness::{Rater, RatingError};
use crate::genome::Genome;

/// Top-ranked genomes copied unchanged into the next generation.
pub const ELITE_COUNT: usize = 2;

/// Ratings keyed by genome content.
///
/// Offspring produced mid-breed are not in the rated set; looking them up
/// scores 0, which keeps selection well-defined without special cases.
#[derive(Debug, Default)]
pub struct FitnessTable {
    scores: HashMap<Genome, i32>,
}

impl FitnessTable {
    /// Record a rating. The first rating wins when the same bit pattern
    /// was rated more than once.
    pub fn insert(&mut self, genome: Genome, rating: i32) {
        self.scores.entry(genome).or_insert(rating);
    }

    /// The rating for a genome, or 0 if it was never rated.
    pub fn score(&self, genome: &Genome) -> i32 {
        match self.scores.get(genome) {
            Some(&rating) => rating,
            None => {
                debug!("genome {genome} not in the rated set, scoring 0");
                0
            }
        }
    }
}

/// Writes one persisted artifact per genome, organized by generation.
pub trait Archive {
    fn save(&mut self, genome: &Genome, generation: u32, index: usize) -> io::Result<()>;
}

/// Sizing and mutation settings for a run.
#[derive(Debug, Clone)]
pub struct EvolveConfig {
    /// Genomes per generation. Must be at least [`ELITE_COUNT`].
    pub population_size: usize,
    /// Bits per genome.
    pub genome_bits: usize,
    /// Candidate bit flips per mutation.
    pub num_mutations: usize,
    /// Probability that a candidate flip actually happens.
    pub mutation_probability: f64,
}

/// What a finished cycle looked like, handed to the continue callback.
#[derive(Debug, Clone)]
pub struct GenerationSummary {
    pub generation: u32,
    pub best_rating: i32,
}

/// The generational state machine.
pub struct GenerationLoop<P, R, A> {
    config: EvolveConfig,
    provider: P,
    rater: R,
    archive: A,
    rng: ChaCha8Rng,
    population: Vec<Genome>,
    generation: u32,
}

impl<P, R, A> GenerationLoop<P, R, A>
where
    P: EvolutionProvider,
    R: Rater,
    A: Archive,
{
    /// Seed an initial population and wire up the collaborators.
    pub fn new(config: EvolveConfig, mut provider: P, rater: R, archive: A, seed: u64) -> Self {
        debug_assert!(config.population_size >= ELITE_COUNT);
        let population = (0..config.population_size)
            .map(|_| provider.generate(config.genome_bits))
            .collect();
        Self {
            config,
            provider,
            rater,
            archive,
            rng: ChaCha8Rng::seed_from_u64(seed),
            population,
            generation: 0,
        }
    }

    /// The current population, in whatever order the last cycle left it.
    pub fn population(&self) -> &[Genome] {
        &self.population
    }

    /// Index of the generation the next cycle will rate.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// The rating collaborator.
    pub fn rater(&self) -> &R {
        &self.rater
    }

    /// The persistence collaborator.
    pub fn archive(&self) -> &A {
        &self.archive
    }

    /// Run one full cycle: shuffle, rate, rank, breed, preview, persist.
    ///
    /// The next generation replaces the current one before returning. Only
    /// rating and preview failures abort the cycle; a genome whose save
    /// fails is logged and skipped so the rest of the generation persists.
    pub fn evolve_once(&mut self) -> Result<GenerationSummary, RatingError> {
        // Shuffle decorrelates rating order from genome origin. Purely
        // cosmetic for the user; ranking ties keep this order.
        self.population.shuffle(&mut self.rng);

        let mut rated: Vec<(Genome, i32)> = Vec::with_capacity(self.population.len());
        for genome in &self.population {
            rated.push((genome.clone(), self.rater.rate(genome)?));
        }

        // Stable sort: equal ratings keep their shuffled order.
        rated.sort_by(|a, b| b.1.cmp(&a.1));
        let best_rating = rated.first().map_or(0, |(_, rating)| *rating);

        let mut fitness = FitnessTable::default();
        for (genome, rating) in &rated {
            fitness.insert(genome.clone(), *rating);
        }
        let ranked: Vec<Genome> = rated.into_iter().map(|(genome, _)| genome).collect();

        let next = self.breed(&ranked, &fitness);

        println!("Population {} done", self.generation);
        self.preview_winners(&ranked)?;
        self.persist(&ranked);

        info!(
            "generation {} rated, best {}, population {}",
            self.generation,
            best_rating,
            next.len()
        );

        let summary = GenerationSummary {
            generation: self.generation,
            best_rating,
        };
        self.population = next;
        self.generation += 1;
        Ok(summary)
    }

    /// Cycle until the continue callback declines or a rating fails.
    pub fn run(
        &mut self,
        mut keep_going: impl FnMut(&GenerationSummary) -> bool,
    ) -> Result<(), RatingError> {
        loop {
            let summary = self.evolve_once()?;
            if !keep_going(&summary) {
                return Ok(());
            }
        }
    }

    /// Elites first, then fitness-weighted offspring up to the configured
    /// size. Offspring come in pairs, so the last pair is truncated when
    /// the population size is odd: the target size is an invariant.
    fn breed(&mut self, ranked: &[Genome], fitness: &FitnessTable) -> Vec<Genome> {
        let elites = ELITE_COUNT.min(ranked.len());
        let mut next: Vec<Genome> = ranked[..elites].to_vec();

        while next.len() < self.config.population_size {
            let (parent_a, parent_b) = self.provider.select_parents(ranked, fitness);
            let (child_a, child_b) = self.provider.crossover(&parent_a, &parent_b);
            for child in [child_a, child_b] {
                next.push(self.provider.mutate(
                    &child,
                    self.config.num_mutations,
                    self.config.mutation_probability,
                ));
            }
        }
        next.truncate(self.config.population_size);
        next
    }

    fn preview_winners(&mut self, ranked: &[Genome]) -> Result<(), RatingError> {
        let captions = [
            "==> Here is the no1 hit ...",
            "==> Here is the second best ...",
        ];
        for (genome, caption) in ranked.iter().zip(captions) {
            self.rater.preview(genome, caption)?;
        }
        Ok(())
    }

    fn persist(&mut self, ranked: &[Genome]) {
        println!("Saving population midi ...");
        for (index, genome) in ranked.iter().enumerate() {
            if let Err(err) = self.archive.save(genome, self.generation, index) {
                warn!(
                    "skipping save of genome {index} in generation {}: {err}",
                    self.generation
                );
            }
        }
        println!("Done");
    }
}

/// Interpret a continue-prompt answer. Only an explicit negative stops.
pub fn wants_another_round(answer: &str) -> bool {
    let normalized = answer.trim().to_ascii_lowercase();
    normalized != "n" && normalized != "no"
}
