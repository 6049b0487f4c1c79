//! Command-line surface — options with defaults and interactive prompt fallbacks.
//!
//! Every core option can be passed as a flag; whatever is omitted is
//! prompted for on the console with its default shown, the way the
//! original interactive session works. `--yes` accepts all defaults
//! silently for scripted runs.

use std::fmt::Display;
use std::io::{self, Write as _};
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use thiserror::Error;

use crate::melody::DecodeParams;
use crate::scale::{self, ScaleError, KEYS};

const DEFAULT_NUM_BARS: u32 = 8;
const DEFAULT_NOTES_PER_BAR: u32 = 4;
const DEFAULT_NUM_STEPS: u32 = 1;
const DEFAULT_PAUSES: bool = true;
const DEFAULT_KEY: &str = "C";
const DEFAULT_SCALE: &str = "major";
const DEFAULT_OCTAVE: i32 = 4;
const DEFAULT_POPULATION_SIZE: usize = 10;
const DEFAULT_NUM_MUTATIONS: usize = 2;
const DEFAULT_MUTATION_PROBABILITY: f64 = 0.5;
const DEFAULT_BPM: u32 = 128;

/// Breed melodies by ear over a MIDI output.
#[derive(Debug, Parser)]
#[command(name = "genotune", version, about)]
pub struct Options {
    /// Number of bars per melody.
    #[arg(long)]
    pub num_bars: Option<u32>,

    /// Notes per bar.
    #[arg(long)]
    pub notes_per_bar: Option<u32>,

    /// Transposed step rows layered into saved files.
    #[arg(long)]
    pub num_steps: Option<u32>,

    /// Whether melodies may contain rests.
    #[arg(long)]
    pub pauses: Option<bool>,

    /// Key of the scale root.
    #[arg(long)]
    pub key: Option<String>,

    /// Scale pattern name.
    #[arg(long)]
    pub scale: Option<String>,

    /// Octave of the scale root (C4 = middle C).
    #[arg(long)]
    pub octave: Option<i32>,

    /// Genomes per generation.
    #[arg(long)]
    pub population_size: Option<usize>,

    /// Candidate bit flips per mutation.
    #[arg(long)]
    pub num_mutations: Option<usize>,

    /// Probability that a candidate flip happens.
    #[arg(long)]
    pub mutation_probability: Option<f64>,

    /// Tempo written to saved MIDI files.
    #[arg(long)]
    pub bpm: Option<u32>,

    /// RNG seed for a reproducible run; random when omitted.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Substring of the MIDI output port name to play through.
    #[arg(long)]
    pub midi_port: Option<String>,

    /// Directory that receives one folder of MIDI files per run.
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// List MIDI output ports and exit.
    #[arg(long)]
    pub list_ports: bool,

    /// Accept every default without prompting.
    #[arg(long, short = 'y')]
    pub yes: bool,
}

/// A fully resolved, validated run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub decode: DecodeParams,
    pub population_size: usize,
    pub num_mutations: usize,
    pub mutation_probability: f64,
    pub bpm: u32,
    pub seed: Option<u64>,
    pub midi_port: Option<String>,
    pub out_dir: PathBuf,
}

/// Errors from resolving the options into a config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Scale(#[from] ScaleError),
    #[error("population size must be at least 2, got {0}")]
    PopulationTooSmall(usize),
    #[error("mutation probability must be within 0..=1, got {0}")]
    BadProbability(f64),
    #[error("prompt failed: {0}")]
    Io(#[from] io::Error),
}

impl Options {
    /// Fill in missing options from prompts (or defaults under `--yes`)
    /// and validate the result.
    pub fn resolve(self) -> Result<Config, ConfigError> {
        let assume = self.yes;

        let num_bars = prompt_value(self.num_bars, "Number of bars", DEFAULT_NUM_BARS, assume)?;
        let notes_per_bar = prompt_value(
            self.notes_per_bar,
            "Notes per bar",
            DEFAULT_NOTES_PER_BAR,
            assume,
        )?;
        let num_steps =
            prompt_value(self.num_steps, "Number of steps", DEFAULT_NUM_STEPS, assume)?;
        let pauses = prompt_bool(self.pauses, "Introduce Pauses?", DEFAULT_PAUSES, assume)?;
        let key = prompt_choice(
            self.key,
            "Key",
            KEYS,
            DEFAULT_KEY,
            assume,
            ScaleError::UnknownKey,
        )?;
        let scale_names: Vec<&str> = scale::pattern_names().collect();
        let scale = prompt_choice(
            self.scale,
            "Scale",
            &scale_names,
            DEFAULT_SCALE,
            assume,
            ScaleError::UnknownPattern,
        )?;
        let octave = prompt_value(self.octave, "Scale Root", DEFAULT_OCTAVE, assume)?;
        let population_size = prompt_value(
            self.population_size,
            "Population size",
            DEFAULT_POPULATION_SIZE,
            assume,
        )?;
        let num_mutations = prompt_value(
            self.num_mutations,
            "Number of mutations",
            DEFAULT_NUM_MUTATIONS,
            assume,
        )?;
        let mutation_probability = prompt_value(
            self.mutation_probability,
            "Mutations probability",
            DEFAULT_MUTATION_PROBABILITY,
            assume,
        )?;
        let bpm = self.bpm.unwrap_or(DEFAULT_BPM);

        if population_size < 2 {
            return Err(ConfigError::PopulationTooSmall(population_size));
        }
        if !(0.0..=1.0).contains(&mutation_probability) {
            return Err(ConfigError::BadProbability(mutation_probability));
        }
        // The octave can push the root past the MIDI range; catch it
        // before the first decode does.
        scale::midi_number(&key, octave)?;

        Ok(Config {
            decode: DecodeParams {
                num_bars,
                notes_per_bar,
                num_steps,
                allow_pauses: pauses,
                key,
                scale,
                octave,
            },
            population_size,
            num_mutations,
            mutation_probability,
            bpm,
            seed: self.seed,
            midi_port: self.midi_port,
            out_dir: self.out_dir,
        })
    }
}

/// Interpret a yes/no answer. `None` means unrecognized.
pub fn parse_bool(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" | "1" => Some(true),
        "n" | "no" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// Case-insensitive lookup of `input` in `choices`, returning the
/// canonical spelling.
pub fn match_choice<'a>(input: &str, choices: &[&'a str]) -> Option<&'a str> {
    let trimmed = input.trim();
    choices
        .iter()
        .find(|choice| choice.eq_ignore_ascii_case(trimmed))
        .copied()
}

fn read_answer() -> io::Result<Option<String>> {
    let mut line = String::new();
    let bytes = io::stdin().read_line(&mut line)?;
    // EOF: behave as if the default was accepted.
    Ok((bytes > 0).then_some(line))
}

fn prompt_value<T>(given: Option<T>, label: &str, default: T, assume: bool) -> io::Result<T>
where
    T: FromStr + Display,
{
    if let Some(value) = given {
        return Ok(value);
    }
    if assume {
        return Ok(default);
    }
    loop {
        print!("{label} [{default}]: ");
        io::stdout().flush()?;
        let Some(line) = read_answer()? else {
            return Ok(default);
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(default);
        }
        match trimmed.parse() {
            Ok(value) => return Ok(value),
            Err(_) => println!("'{trimmed}' is not a valid value, try again."),
        }
    }
}

fn prompt_bool(given: Option<bool>, label: &str, default: bool, assume: bool) -> io::Result<bool> {
    if let Some(value) = given {
        return Ok(value);
    }
    if assume {
        return Ok(default);
    }
    let shown = if default { "Y/n" } else { "y/N" };
    loop {
        print!("{label} [{shown}]: ");
        io::stdout().flush()?;
        let Some(line) = read_answer()? else {
            return Ok(default);
        };
        if line.trim().is_empty() {
            return Ok(default);
        }
        match parse_bool(&line) {
            Some(value) => return Ok(value),
            None => println!("Please answer y or n."),
        }
    }
}

fn prompt_choice(
    given: Option<String>,
    label: &str,
    choices: &[&str],
    default: &str,
    assume: bool,
    unknown: fn(String) -> ScaleError,
) -> Result<String, ConfigError> {
    if let Some(value) = given {
        // Flags go through the same matcher, so spelling is forgiving but
        // unknown names fail fast.
        return match match_choice(&value, choices) {
            Some(canonical) => Ok(canonical.to_string()),
            None => Err(unknown(value).into()),
        };
    }
    if assume {
        return Ok(default.to_string());
    }
    loop {
        print!("{label} ({}) [{default}]: ", choices.join(", "));
        io::stdout().flush()?;
        let Some(line) = read_answer()? else {
            return Ok(default.to_string());
        };
        if line.trim().is_empty() {
            return Ok(default.to_string());
        }
        match match_choice(&line, choices) {
            Some(canonical) => return Ok(canonical.to_string()),
            None => println!("Pick one of: {}", choices.join(", ")),
        }
    }
}
