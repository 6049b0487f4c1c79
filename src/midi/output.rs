//! Live MIDI playback — connects to a MIDI output device and plays performances.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::info;
use midir::{MidiOutput, MidiOutputConnection};

use super::Player;
use crate::melody::Performance;

/// Seconds of playback per quarter note are `beat / BEAT_SECONDS_DIVISOR`.
/// Fixed by the live interface; saved files carry the real tempo instead.
const BEAT_SECONDS_DIVISOR: f64 = 6.0;

/// Everything plays on MIDI channel 0.
const CHANNEL: u8 = 0;

const NOTE_ON: u8 = 0x90;
const NOTE_OFF: u8 = 0x80;
const CONTROL_CHANGE: u8 = 0xB0;
const ALL_NOTES_OFF: u8 = 123;

/// Active MIDI output connection.
///
/// Only the first step row of a performance is audible live; the remaining
/// rows exist in the persisted files. A shared stop flag is checked between
/// notes so an interrupt lands at the next note boundary, never mid-note.
pub struct MidiPlayer {
    connection: MidiOutputConnection,
    port_name: String,
    stop: Arc<AtomicBool>,
}

impl MidiPlayer {
    /// Connect to a MIDI output port.
    /// Finds a port whose name contains `preferred` (or the first available
    /// port). The stop flag interrupts playback when set.
    pub fn connect(preferred: Option<&str>, stop: Arc<AtomicBool>) -> io::Result<Self> {
        let midi_out = MidiOutput::new("genotune")
            .map_err(|e| io::Error::other(format!("MIDI init: {e}")))?;

        let ports = midi_out.ports();
        if ports.is_empty() {
            return Err(io::Error::other("no MIDI output ports available"));
        }

        // Find matching port
        let (port, port_name) = if let Some(name_filter) = preferred {
            ports
                .iter()
                .find_map(|p| {
                    let name = midi_out.port_name(p).unwrap_or_default();
                    if name.contains(name_filter) {
                        Some((p.clone(), name))
                    } else {
                        None
                    }
                })
                .ok_or_else(|| {
                    io::Error::other(format!("MIDI port matching '{name_filter}' not found"))
                })?
        } else {
            let p = ports[0].clone();
            let name = midi_out
                .port_name(&p)
                .unwrap_or_else(|_| "unknown".to_string());
            (p, name)
        };

        let connection = midi_out
            .connect(&port, "genotune-play")
            .map_err(|e| io::Error::other(format!("MIDI connect: {e}")))?;
        info!("playing through MIDI port '{port_name}'");

        Ok(Self {
            connection,
            port_name,
            stop,
        })
    }

    /// Get the connected port name.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// List all available MIDI output port names.
    pub fn list_ports() -> Vec<String> {
        let Ok(midi_out) = MidiOutput::new("genotune-list") else {
            return Vec::new();
        };
        midi_out
            .ports()
            .iter()
            .filter_map(|p| midi_out.port_name(p).ok())
            .collect()
    }

    fn send(&mut self, message: &[u8]) -> io::Result<()> {
        self.connection
            .send(message)
            .map_err(|e| io::Error::other(format!("MIDI send: {e}")))
    }

    fn all_notes_off(&mut self) -> io::Result<()> {
        self.send(&[CONTROL_CHANGE | CHANNEL, ALL_NOTES_OFF, 0])
    }
}

impl Player for MidiPlayer {
    fn play(&mut self, performance: &Performance) -> io::Result<()> {
        let Some(lead) = performance.steps.first() else {
            return Ok(());
        };

        for (i, (&pitch, &velocity)) in lead.iter().zip(&performance.velocity).enumerate() {
            if self.stop.load(Ordering::SeqCst) {
                self.all_notes_off()?;
                return Err(io::Error::new(
                    io::ErrorKind::Interrupted,
                    "playback interrupted",
                ));
            }

            let beat = performance.beat.get(i).copied().unwrap_or_default();
            self.send(&[NOTE_ON | CHANNEL, pitch, velocity])?;
            thread::sleep(Duration::from_secs_f64(beat / BEAT_SECONDS_DIVISOR));
            self.send(&[NOTE_OFF | CHANNEL, pitch, velocity])?;
        }
        Ok(())
    }
}

impl Drop for MidiPlayer {
    /// Release with silence: whatever note was sounding when the process
    /// winds down must not hang on the synth.
    fn drop(&mut self) {
        let _ = self.all_notes_off();
    }
}
