//! Scale construction — note names, interval patterns, and absolute pitches.
//!
//! A scale is an ordered run of MIDI pitch numbers built from a root note,
//! an octave, and a named cyclic interval pattern. Octave numbering follows
//! the piano convention: C4 = middle C = MIDI 60.

use thiserror::Error;

/// Key names offered on the command line. Enharmonic spellings are listed
/// separately but map to the same semitone offset.
pub const KEYS: &[&str] = &[
    "C", "C#", "Db", "D", "D#", "Eb", "E", "F", "F#", "Gb", "G", "G#", "Ab", "A", "A#", "Bb", "B",
];

/// Interval patterns, in semitone steps, cycled when a scale needs more
/// degrees than one octave provides.
const SCALE_PATTERNS: &[(&str, &[u8])] = &[
    ("major", &[2, 2, 1, 2, 2, 2, 1]),
    ("minorN", &[2, 1, 2, 2, 1, 2, 2]),
    ("minorH", &[2, 1, 2, 2, 1, 3, 1]),
    ("minorM", &[2, 1, 2, 2, 2, 2, 1]),
    ("pentamajor", &[2, 2, 3, 2, 3]),
    ("pentaminor", &[3, 2, 2, 3, 2]),
    ("bluesminor", &[3, 2, 1, 1, 3, 2]),
    ("ionian", &[2, 2, 1, 2, 2, 2, 1]),
    ("dorian", &[2, 1, 2, 2, 2, 1, 2]),
    ("phrygian", &[1, 2, 2, 2, 1, 2, 2]),
    ("lydian", &[2, 2, 2, 1, 2, 2, 1]),
    ("mixolydian", &[2, 2, 1, 2, 2, 1, 2]),
    ("aeolian", &[2, 1, 2, 2, 1, 2, 2]),
    ("locrian", &[1, 2, 2, 1, 2, 2, 2]),
];

/// Errors from scale construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScaleError {
    #[error("unknown scale pattern '{0}'")]
    UnknownPattern(String),
    #[error("unknown key '{0}'")]
    UnknownKey(String),
    #[error("pitch for {name}{octave} leaves the MIDI range 0..=127")]
    PitchOutOfRange { name: String, octave: i32 },
}

/// Semitone offset of a note name within the octave, C = 0.
///
/// Sharp and flat spellings are both accepted, including the enharmonic
/// duplicates (B# = C, Cb = B, E# = F, Fb = E).
pub fn semitone_offset(name: &str) -> Option<u8> {
    let offset = match name {
        "C" | "B#" => 0,
        "C#" | "Db" => 1,
        "D" => 2,
        "D#" | "Eb" => 3,
        "E" | "Fb" => 4,
        "F" | "E#" => 5,
        "F#" | "Gb" => 6,
        "G" => 7,
        "G#" | "Ab" => 8,
        "A" => 9,
        "A#" | "Bb" => 10,
        "B" | "Cb" => 11,
        _ => return None,
    };
    Some(offset)
}

/// MIDI number for a note name in an octave: C-1 = 0, C4 = 60, A4 = 69.
pub fn midi_number(name: &str, octave: i32) -> Result<u8, ScaleError> {
    let offset = semitone_offset(name).ok_or_else(|| ScaleError::UnknownKey(name.to_string()))?;
    let midi = 12 * (octave + 1) + i32::from(offset);
    u8::try_from(midi)
        .ok()
        .filter(|&m| m <= 127)
        .ok_or_else(|| ScaleError::PitchOutOfRange {
            name: name.to_string(),
            octave,
        })
}

/// Look up a scale pattern by name.
pub fn pattern(name: &str) -> Option<&'static [u8]> {
    SCALE_PATTERNS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, steps)| *steps)
}

/// Names of all supported scale patterns, in registry order.
pub fn pattern_names() -> impl Iterator<Item = &'static str> {
    SCALE_PATTERNS.iter().map(|(n, _)| *n)
}

/// Build a scale of `degrees` absolute pitches.
///
/// The first pitch is the root; each following degree adds the next step
/// from the cyclic pattern. Fails if the pattern or key is unknown, or if
/// any degree would leave the MIDI range.
pub fn build_scale(
    root: &str,
    octave: i32,
    pattern_name: &str,
    degrees: usize,
) -> Result<Vec<u8>, ScaleError> {
    let steps = pattern(pattern_name)
        .ok_or_else(|| ScaleError::UnknownPattern(pattern_name.to_string()))?;

    let mut current = u32::from(midi_number(root, octave)?);
    let mut pitches = Vec::with_capacity(degrees);
    if degrees > 0 {
        pitches.push(current as u8);
    }
    for degree in 2..=degrees {
        current += u32::from(steps[(degree - 2) % steps.len()]);
        if current > 127 {
            return Err(ScaleError::PitchOutOfRange {
                name: root.to_string(),
                octave,
            });
        }
        pitches.push(current as u8);
    }
    Ok(pitches)
}
