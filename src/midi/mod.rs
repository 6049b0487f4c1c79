//! MIDI output — live device playback and standard MIDI file writing.

pub mod file;
pub mod output;

pub use file::{write_melody_file, ArchiveError, MidiArchive};
pub use output::MidiPlayer;

use std::io;

use crate::melody::Performance;

/// A live playback sink. Playback is strictly sequential; the device is an
/// exclusively owned resource acquired once at process start and passed
/// down explicitly.
pub trait Player {
    fn play(&mut self, performance: &Performance) -> io::Result<()>;
}
