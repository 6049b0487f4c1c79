//! Human fitness oracle — plays a decoded genome and collects a rating by ear.
//!
//! The [`Rater`] trait is the seam that keeps the generation loop testable
//! without a MIDI device: production code rates through [`ConsoleRater`],
//! which blocks on playback and console input; tests script the ratings.

use std::io::{self, Write as _};
use std::thread;
use std::time::Duration;

use log::debug;
use thiserror::Error;

use crate::genome::Genome;
use crate::melody::{self, DecodeError, DecodeParams};
use crate::midi::Player;

/// Settle time after playback, so consecutive melodies do not blur together.
const SETTLE_PAUSE: Duration = Duration::from_secs(1);

/// Errors while rating a genome. Malformed console input is never an
/// error; it simply rates 0.
#[derive(Debug, Error)]
pub enum RatingError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("playback failed: {0}")]
    Playback(#[from] io::Error),
}

/// Assigns a fitness rating to a genome. Higher is better.
pub trait Rater {
    /// Play the genome and return its rating.
    fn rate(&mut self, genome: &Genome) -> Result<i32, RatingError>;

    /// Play the genome with a caption, without collecting a rating.
    fn preview(&mut self, genome: &Genome, caption: &str) -> Result<(), RatingError>;
}

/// Parse a console rating line. Anything that is not an integer counts as 0.
pub fn parse_rating(input: &str) -> i32 {
    let trimmed = input.trim();
    trimmed.parse().unwrap_or_else(|_| {
        debug!("rating input '{trimmed}' is not an integer, scoring 0");
        0
    })
}

/// The production oracle: decodes, plays through a [`Player`], and reads a
/// rating from the console. The prompt suggests 0-5 but the range is
/// advisory; whatever integer the user types ranks as given.
pub struct ConsoleRater<P> {
    player: P,
    params: DecodeParams,
}

impl<P: Player> ConsoleRater<P> {
    pub fn new(player: P, params: DecodeParams) -> Self {
        Self { player, params }
    }

    fn read_line() -> io::Result<String> {
        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
        Ok(line)
    }
}

impl<P: Player> Rater for ConsoleRater<P> {
    fn rate(&mut self, genome: &Genome) -> Result<i32, RatingError> {
        let performance = melody::decode(genome, &self.params)?;

        println!("Playing song ...");
        self.player.play(&performance)?;

        print!("Rating (0-5): ");
        io::stdout().flush()?;
        let line = Self::read_line()?;
        thread::sleep(SETTLE_PAUSE);

        Ok(parse_rating(&line))
    }

    fn preview(&mut self, genome: &Genome, caption: &str) -> Result<(), RatingError> {
        let performance = melody::decode(genome, &self.params)?;

        print!("{caption}     [Press Enter]");
        io::stdout().flush()?;
        Self::read_line()?;

        self.player.play(&performance)?;
        thread::sleep(SETTLE_PAUSE);
        Ok(())
    }
}
