//! Genotune — breed melodies by ear over a MIDI output.
//!
//! Each generation plays every genome in the population, asks for a 0-5
//! rating, keeps the two best, breeds the rest, and saves the whole ranked
//! generation as MIDI files before asking whether to keep going.

use std::io::{self, Write as _};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use clap::Parser;
use log::info;

use genotune::cli::Options;
use genotune::evolve::{wants_another_round, BitFlipEvolution, EvolveConfig, GenerationLoop};
use genotune::fitness::ConsoleRater;
use genotune::midi::{MidiArchive, MidiPlayer};

fn main() {
    env_logger::init();

    if let Err(err) = run() {
        let interrupted = err.chain().any(|cause| {
            cause
                .downcast_ref::<io::Error>()
                .is_some_and(|e| e.kind() == io::ErrorKind::Interrupted)
        });
        if interrupted {
            println!("\nInterrupted.");
            return;
        }
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let options = Options::parse();

    if options.list_ports {
        let ports = MidiPlayer::list_ports();
        if ports.is_empty() {
            println!("no MIDI output ports available");
        }
        for name in ports {
            println!("{name}");
        }
        return Ok(());
    }

    println!("=== Genetic Algorithm Music ===");
    let config = options.resolve()?;

    let seed = config.seed.unwrap_or_else(rand::random);
    info!("rng seed {seed}");

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))
            .context("installing interrupt handler")?;
    }

    let player = MidiPlayer::connect(config.midi_port.as_deref(), Arc::clone(&stop))
        .context("opening MIDI output")?;

    let run_id = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("reading the clock")?
        .as_secs();
    let archive = MidiArchive::new(
        config.out_dir.join(run_id.to_string()),
        config.decode.clone(),
        config.bpm,
    );
    let rater = ConsoleRater::new(player, config.decode.clone());
    let provider = BitFlipEvolution::new(seed);

    let evolve_config = EvolveConfig {
        population_size: config.population_size,
        genome_bits: config.decode.bit_len(),
        num_mutations: config.num_mutations,
        mutation_probability: config.mutation_probability,
    };
    let mut generations = GenerationLoop::new(
        evolve_config,
        provider,
        rater,
        archive,
        seed.wrapping_add(1),
    );

    generations.run(|_summary| ask_continue())?;
    Ok(())
}

fn ask_continue() -> bool {
    print!("Continue? [Y/n] ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match io::stdin().read_line(&mut answer) {
        Ok(0) | Err(_) => false,
        Ok(_) => wants_another_round(&answer),
    }
}
