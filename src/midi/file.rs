//! Standard MIDI file output — persisted artifacts, one file per genome.
//!
//! Uses the `midly` crate. Output is SMF format 0: a single track on a
//! single channel, 480 ticks per quarter note, track name and tempo set
//! once at tick 0. Every step row of the performance is written at the
//! same time offsets, so a saved file is polyphonic across rows even
//! though live playback only sounds the first row. Rests advance time
//! without emitting notes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use thiserror::Error;

use crate::evolve::Archive;
use crate::genome::Genome;
use crate::melody::{self, DecodeError, DecodeParams, Performance, ShapeError};

/// Ticks per quarter note in MIDI output.
const TICKS_PER_QUARTER: u16 = 480;

/// Track name written to every saved file.
const TRACK_NAME: &str = "Sample Track";

/// Errors while saving one genome's file.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("write failed: {0}")]
    Io(#[from] io::Error),
}

/// Write a performance to `path` as a standard MIDI file.
///
/// The performance shape is validated first; parent directories are
/// created as needed.
pub fn write_melody_file(
    path: &Path,
    performance: &Performance,
    bpm: u32,
    track_name: &str,
) -> Result<(), ArchiveError> {
    performance.validate_shape()?;

    let smf = performance_to_smf(performance, bpm, track_name);
    let mut buf = Vec::new();
    smf.write_std(&mut buf)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, &buf)?;
    Ok(())
}

fn beats_to_ticks(beats: f64) -> u32 {
    (beats * f64::from(TICKS_PER_QUARTER)).round() as u32
}

/// Convert a performance to an in-memory SMF.
fn performance_to_smf<'a>(performance: &Performance, bpm: u32, track_name: &'a str) -> Smf<'a> {
    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));

    let mut track: Vec<TrackEvent<'a>> = Vec::new();
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(track_name.as_bytes())),
    });
    let tempo_microseconds = 60_000_000 / bpm.max(1);
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo_microseconds))),
    });

    // Collect (tick, is_on, pitch, velocity) in absolute time, then delta
    // encode. Time advances per position whether or not it sounds.
    let mut events: Vec<(u32, bool, u8, u8)> = Vec::new();
    let mut time_beats = 0.0f64;
    for (i, &velocity) in performance.velocity.iter().enumerate() {
        let beat = performance.beat[i];
        if velocity > 0 {
            let start = beats_to_ticks(time_beats);
            let end = beats_to_ticks(time_beats + beat);
            for row in &performance.steps {
                events.push((start, true, row[i], velocity));
                events.push((end, false, row[i], velocity));
            }
        }
        time_beats += beat;
    }
    // Note-offs sort before note-ons at the same tick, so back-to-back
    // notes of the same pitch release before they retrigger.
    events.sort_by_key(|&(tick, is_on, _, _)| (tick, is_on));

    let mut last_tick = 0u32;
    for (tick, is_on, pitch, velocity) in events {
        let message = if is_on {
            MidiMessage::NoteOn {
                key: u7::new(pitch),
                vel: u7::new(velocity),
            }
        } else {
            MidiMessage::NoteOff {
                key: u7::new(pitch),
                vel: u7::new(velocity),
            }
        };
        track.push(TrackEvent {
            delta: u28::new(tick - last_tick),
            kind: TrackEventKind::Midi {
                channel: u4::new(0),
                message,
            },
        });
        last_tick = tick;
    }

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    smf.tracks.push(track);
    smf
}

/// Persists genomes as MIDI files under
/// `<root>/<generation>/<scale>-<key>-<index>.mid`.
pub struct MidiArchive {
    root: PathBuf,
    params: DecodeParams,
    bpm: u32,
}

impl MidiArchive {
    /// `root` already includes the per-run directory.
    pub fn new(root: PathBuf, params: DecodeParams, bpm: u32) -> Self {
        Self { root, params, bpm }
    }

    /// Where a genome of a given generation lands on disk.
    pub fn path_for(&self, generation: u32, index: usize) -> PathBuf {
        self.root.join(generation.to_string()).join(format!(
            "{}-{}-{}.mid",
            self.params.scale, self.params.key, index
        ))
    }

    fn save_genome(
        &self,
        genome: &Genome,
        generation: u32,
        index: usize,
    ) -> Result<PathBuf, ArchiveError> {
        let performance = melody::decode(genome, &self.params)?;
        let path = self.path_for(generation, index);
        write_melody_file(&path, &performance, self.bpm, TRACK_NAME)?;
        Ok(path)
    }
}

impl Archive for MidiArchive {
    fn save(&mut self, genome: &Genome, generation: u32, index: usize) -> io::Result<()> {
        self.save_genome(genome, generation, index)
            .map(|_| ())
            .map_err(io::Error::other)
    }
}
