//! Generation-loop integration tests — scripted ratings, no MIDI device.
//!
//! The loop's collaborators are all swapped for in-memory doubles here:
//! raters that score deterministically, an archive that records instead of
//! writing files.

use std::io;

use genotune::evolve::{
    Archive, BitFlipEvolution, EvolveConfig, GenerationLoop, ELITE_COUNT,
};
use genotune::fitness::{Rater, RatingError};
use genotune::genome::Genome;

const GENOME_BITS: usize = 32;

fn config(population_size: usize) -> EvolveConfig {
    EvolveConfig {
        population_size,
        genome_bits: GENOME_BITS,
        num_mutations: 2,
        mutation_probability: 0.5,
    }
}

fn ones(genome: &Genome) -> i32 {
    genome.bits().iter().filter(|&&bit| bit).count() as i32
}

/// Rates every genome by its number of set bits and remembers the
/// preview captions it was asked to play.
#[derive(Default)]
struct OnesRater {
    previews: Vec<String>,
}

impl Rater for OnesRater {
    fn rate(&mut self, genome: &Genome) -> Result<i32, RatingError> {
        Ok(ones(genome))
    }

    fn preview(&mut self, _genome: &Genome, caption: &str) -> Result<(), RatingError> {
        self.previews.push(caption.to_string());
        Ok(())
    }
}

/// Records saves instead of writing files; optionally fails one index.
#[derive(Default)]
struct MemoryArchive {
    saves: Vec<(u32, usize, Genome)>,
    fail_index: Option<usize>,
}

impl Archive for MemoryArchive {
    fn save(&mut self, genome: &Genome, generation: u32, index: usize) -> io::Result<()> {
        if self.fail_index == Some(index) {
            return Err(io::Error::other("disk on fire"));
        }
        self.saves.push((generation, index, genome.clone()));
        Ok(())
    }
}

fn sorted_ratings(population: &[Genome]) -> Vec<i32> {
    let mut ratings: Vec<i32> = population.iter().map(ones).collect();
    ratings.sort_unstable_by(|a, b| b.cmp(a));
    ratings
}

#[test]
fn elites_survive_bit_for_bit() {
    let mut generations = GenerationLoop::new(
        config(8),
        BitFlipEvolution::new(1),
        OnesRater::default(),
        MemoryArchive::default(),
        99,
    );
    let before = generations.population().to_vec();
    let best_two = sorted_ratings(&before);

    generations.evolve_once().unwrap();

    let after = generations.population();
    // The two best ratings of the old population lead the new one, and the
    // carried genomes are bit-identical members of the old population.
    assert_eq!(ones(&after[0]), best_two[0]);
    assert_eq!(ones(&after[1]), best_two[1]);
    assert!(before.contains(&after[0]));
    assert!(before.contains(&after[1]));
}

#[test]
fn ties_keep_rating_order() {
    // With every genome rated identically, the elites are simply the two
    // heard first: the sort is stable over the shuffled order.
    struct FlatRater {
        heard: Vec<Genome>,
    }
    impl Rater for FlatRater {
        fn rate(&mut self, genome: &Genome) -> Result<i32, RatingError> {
            self.heard.push(genome.clone());
            Ok(3)
        }
        fn preview(&mut self, _genome: &Genome, _caption: &str) -> Result<(), RatingError> {
            Ok(())
        }
    }

    let mut generations = GenerationLoop::new(
        config(6),
        BitFlipEvolution::new(2),
        FlatRater { heard: Vec::new() },
        MemoryArchive::default(),
        7,
    );
    generations.evolve_once().unwrap();

    let heard = generations.rater().heard.clone();
    let after = generations.population();
    assert_eq!(after[0], heard[0]);
    assert_eq!(after[1], heard[1]);
}

#[test]
fn population_size_is_invariant_even_when_odd() {
    for size in [4, 7, 10] {
        let mut generations = GenerationLoop::new(
            config(size),
            BitFlipEvolution::new(3),
            OnesRater::default(),
            MemoryArchive::default(),
            11,
        );
        for _ in 0..3 {
            generations.evolve_once().unwrap();
            assert_eq!(generations.population().len(), size, "size {size}");
        }
    }
}

#[test]
fn every_genome_is_archived_each_generation() {
    let mut generations = GenerationLoop::new(
        config(5),
        BitFlipEvolution::new(4),
        OnesRater::default(),
        MemoryArchive::default(),
        13,
    );
    let initial = generations.population().to_vec();
    generations.evolve_once().unwrap();
    generations.evolve_once().unwrap();

    let saves = &generations.archive().saves;
    assert_eq!(saves.len(), 10);

    let generation_zero: Vec<&Genome> = saves
        .iter()
        .filter(|(generation, _, _)| *generation == 0)
        .map(|(_, _, genome)| genome)
        .collect();
    assert_eq!(generation_zero.len(), 5);
    // Generation 0 persists exactly the initial population, ranked.
    for genome in &initial {
        assert!(generation_zero.contains(&genome));
    }
    let indices: Vec<usize> = saves
        .iter()
        .filter(|(generation, _, _)| *generation == 0)
        .map(|(_, index, _)| *index)
        .collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);
}

#[test]
fn a_failed_save_skips_only_that_genome() {
    let archive = MemoryArchive {
        saves: Vec::new(),
        fail_index: Some(1),
    };
    let mut generations = GenerationLoop::new(
        config(4),
        BitFlipEvolution::new(5),
        OnesRater::default(),
        archive,
        17,
    );
    generations.evolve_once().unwrap();

    let indices: Vec<usize> = generations
        .archive()
        .saves
        .iter()
        .map(|(_, index, _)| *index)
        .collect();
    assert_eq!(indices, vec![0, 2, 3]);
}

#[test]
fn winners_are_previewed_in_rank_order() {
    let mut generations = GenerationLoop::new(
        config(4),
        BitFlipEvolution::new(6),
        OnesRater::default(),
        MemoryArchive::default(),
        19,
    );
    generations.evolve_once().unwrap();

    let previews = &generations.rater().previews;
    assert_eq!(previews.len(), ELITE_COUNT);
    assert!(previews[0].contains("no1"));
    assert!(previews[1].contains("second best"));
}

#[test]
fn run_stops_as_soon_as_the_user_declines() {
    let mut generations = GenerationLoop::new(
        config(4),
        BitFlipEvolution::new(7),
        OnesRater::default(),
        MemoryArchive::default(),
        23,
    );
    let mut cycles = 0;
    generations
        .run(|summary| {
            cycles += 1;
            assert_eq!(summary.generation, cycles - 1);
            cycles < 3
        })
        .unwrap();

    assert_eq!(cycles, 3);
    assert_eq!(generations.generation(), 3);
}

#[test]
fn summaries_report_the_best_rating() {
    let mut generations = GenerationLoop::new(
        config(4),
        BitFlipEvolution::new(8),
        OnesRater::default(),
        MemoryArchive::default(),
        29,
    );
    let best = sorted_ratings(generations.population())[0];
    let summary = generations.evolve_once().unwrap();
    assert_eq!(summary.generation, 0);
    assert_eq!(summary.best_rating, best);
}
