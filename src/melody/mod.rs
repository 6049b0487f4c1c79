//! Genome decoding — from bit slots to a melody and its transposed steps.
//!
//! Decoding is a pure function of the genome and its layout parameters.
//! Each note slot becomes either a rest or a scale-degree index; adjacent
//! identical pitched slots merge into one sustained note. The melody is
//! then realized as `num_steps` step rows, each transposed two scale
//! degrees above the last, sharing one velocity/duration lane.

use thiserror::Error;

use crate::genome::{Genome, BITS_PER_NOTE};
use crate::scale::{self, ScaleError};

/// Velocity written for every sounding note. Rests carry velocity 0.
pub const NOTE_VELOCITY: u8 = 127;

/// Scale degrees built for every decode. Generous headroom so that the
/// highest transposed index stays inside the scale.
pub const SCALE_DEGREES: usize = 15;

/// Layout and tonality parameters for decoding a genome.
#[derive(Debug, Clone)]
pub struct DecodeParams {
    pub num_bars: u32,
    pub notes_per_bar: u32,
    pub num_steps: u32,
    pub allow_pauses: bool,
    pub key: String,
    pub scale: String,
    pub octave: i32,
}

impl DecodeParams {
    /// Genome bit length implied by the grid: bars x notes x bits-per-note.
    pub fn bit_len(&self) -> usize {
        self.num_bars as usize * self.notes_per_bar as usize * BITS_PER_NOTE
    }
}

/// Errors from genome decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("notes per bar must be at least 1")]
    InvalidLayout,
    #[error("genome has {actual} bits, grid needs {expected}")]
    GenomeLength { expected: usize, actual: usize },
    #[error(transparent)]
    Scale(#[from] ScaleError),
}

/// Mismatched sequence lengths in a decoded performance.
///
/// The decoder always produces equal-length lanes, so hitting this is a
/// programming-error signal rather than input validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("melody lanes disagree: {notes} notes, {velocities} velocities, {beats} beats")]
pub struct ShapeError {
    pub notes: usize,
    pub velocities: usize,
    pub beats: usize,
}

/// A decoded melody before transposition: three parallel lanes.
///
/// `notes[i]` is a scale-degree index (0 for rests, which are marked by
/// `velocity[i] == 0`); `beat[i]` is the duration in quarter notes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Melody {
    pub notes: Vec<usize>,
    pub velocity: Vec<u8>,
    pub beat: Vec<f64>,
}

impl Melody {
    /// Number of entries.
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    /// True if the melody has no entries.
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

/// A melody realized as absolute pitches, one row per step.
///
/// Row k plays the melody transposed `2 * k` scale degrees up. Velocity
/// and beat lanes are shared by every row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Performance {
    pub steps: Vec<Vec<u8>>,
    pub velocity: Vec<u8>,
    pub beat: Vec<f64>,
}

impl Performance {
    /// Check that every step row matches the shared lanes in length.
    pub fn validate_shape(&self) -> Result<(), ShapeError> {
        let len = self.velocity.len();
        let bad_row = self
            .steps
            .iter()
            .map(Vec::len)
            .find(|&row_len| row_len != len);
        if self.beat.len() == len && bad_row.is_none() {
            Ok(())
        } else {
            Err(ShapeError {
                notes: bad_row.unwrap_or(len),
                velocities: len,
                beats: self.beat.len(),
            })
        }
    }
}

/// Decode a genome into its intermediate melody.
///
/// Slot values in the upper half of the range are rests; `allow_pauses =
/// false` folds every value into the lower half first, so rests cannot be
/// encoded at all. Adjacent slots decoding to the same pitched index merge
/// into a single entry with summed duration. Rests never merge: each rest
/// slot stands alone, and a pitched slot after a rest starts a new entry.
pub fn decode_melody(genome: &Genome, params: &DecodeParams) -> Result<Melody, DecodeError> {
    if params.num_bars > 0 && params.notes_per_bar == 0 {
        return Err(DecodeError::InvalidLayout);
    }
    if genome.len() != params.bit_len() {
        return Err(DecodeError::GenomeLength {
            expected: params.bit_len(),
            actual: genome.len(),
        });
    }
    if params.num_bars == 0 {
        return Ok(Melody::default());
    }

    let note_length = 4.0 / f64::from(params.notes_per_bar);
    let pitched_values = 1u8 << (BITS_PER_NOTE - 1);

    let mut melody = Melody::default();
    for mut value in genome.slots() {
        if !params.allow_pauses {
            value %= pitched_values;
        }

        if value >= pitched_values {
            melody.notes.push(0);
            melody.velocity.push(0);
            melody.beat.push(note_length);
            continue;
        }

        let index = usize::from(value);
        let continues_run = melody.notes.last() == Some(&index)
            && melody.velocity.last().is_some_and(|&v| v > 0);
        if continues_run {
            if let Some(beat) = melody.beat.last_mut() {
                *beat += note_length;
            }
        } else {
            melody.notes.push(index);
            melody.velocity.push(NOTE_VELOCITY);
            melody.beat.push(note_length);
        }
    }
    Ok(melody)
}

/// Decode a genome all the way to a performance.
///
/// Builds the scale with [`SCALE_DEGREES`] degrees and emits one transposed
/// pitch row per step: row k, position i is
/// `scale[(notes[i] + 2k) % scale.len()]`.
pub fn decode(genome: &Genome, params: &DecodeParams) -> Result<Performance, DecodeError> {
    let melody = decode_melody(genome, params)?;
    let scale = scale::build_scale(&params.key, params.octave, &params.scale, SCALE_DEGREES)?;

    let steps = (0..params.num_steps as usize)
        .map(|step| {
            melody
                .notes
                .iter()
                .map(|&note| scale[(note + step * 2) % scale.len()])
                .collect()
        })
        .collect();

    Ok(Performance {
        steps,
        velocity: melody.velocity,
        beat: melody.beat,
    })
}
