//! The MIDI file writer boundary and a Standard MIDI File implementation.
//!
//! The encoder talks to a writer through three small traits so that it never
//! depends on a container format. [`SmfWriter`] implements them over `midly`
//! and produces a format 1 (parallel) file.

use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use thiserror::Error;

use crate::sequencing::notes::note_number;

#[derive(Debug, Error)]
pub enum MidiError {
    #[error("MIDI writer is not available: {0}")]
    Unavailable(String),
    #[error("'{0}' is not a pitch that fits in a MIDI key")]
    InvalidPitch(String),
    #[error("MIDI channel {0} is out of range")]
    InvalidChannel(u8),
    #[error("MIDI velocity {0} is out of range")]
    InvalidVelocity(u8),
    #[error("failed to serialize MIDI file")]
    Io(#[from] std::io::Error),
}

/// Creates empty files
pub trait MidiWriter {
    type File: MidiFileSink;

    fn new_file(&self, ticks_per_beat: u16) -> Self::File;
}

/// A file container that accepts tracks and serializes on demand
pub trait MidiFileSink {
    type Track: MidiTrackSink;

    fn add_track(&mut self) -> &mut Self::Track;

    fn to_bytes(&self) -> Result<Vec<u8>, MidiError>;
}

/// Calls arrive in emission order; `delta` is relative to the previous note call
pub trait MidiTrackSink {
    fn set_name(&mut self, name: &str);

    /// Only called on the first track of a file
    fn set_tempo(&mut self, bpm: f64);

    fn set_program(&mut self, channel: u8, program: u8);

    fn note_on(&mut self, channel: u8, pitch: &str, delta: u32, velocity: u8) -> Result<(), MidiError>;

    fn note_off(&mut self, channel: u8, pitch: &str, delta: u32, velocity: u8) -> Result<(), MidiError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SmfWriter;

impl MidiWriter for SmfWriter {
    type File = SmfFile;

    fn new_file(&self, ticks_per_beat: u16) -> SmfFile {
        SmfFile {
            ticks_per_beat,
            tracks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmfFile {
    ticks_per_beat: u16,
    tracks: Vec<SmfTrack>,
}

impl MidiFileSink for SmfFile {
    type Track = SmfTrack;

    fn add_track(&mut self) -> &mut SmfTrack {
        self.tracks.push(SmfTrack::default());
        let last = self.tracks.len() - 1;
        &mut self.tracks[last]
    }

    fn to_bytes(&self) -> Result<Vec<u8>, MidiError> {
        let header = Header::new(Format::Parallel, Timing::Metrical(u15::new(self.ticks_per_beat)));
        let mut smf = Smf::new(header);

        for track in &self.tracks {
            let mut events = Vec::with_capacity(track.events.len() + 4);
            if let Some(name) = &track.name {
                events.push(TrackEvent {
                    delta: u28::new(0),
                    kind: TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes())),
                });
            }
            if let Some(tempo) = track.tempo {
                events.push(TrackEvent {
                    delta: u28::new(0),
                    kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo))),
                });
            }
            if let Some((channel, program)) = track.program {
                events.push(TrackEvent {
                    delta: u28::new(0),
                    kind: TrackEventKind::Midi {
                        channel: u4::new(channel),
                        message: MidiMessage::ProgramChange {
                            program: u7::new(program),
                        },
                    },
                });
            }
            events.extend(track.events.iter().map(|e| TrackEvent {
                delta: u28::new(e.delta),
                kind: TrackEventKind::Midi {
                    channel: u4::new(e.channel),
                    message: if e.on {
                        MidiMessage::NoteOn {
                            key: u7::new(e.key),
                            vel: u7::new(e.velocity),
                        }
                    } else {
                        MidiMessage::NoteOff {
                            key: u7::new(e.key),
                            vel: u7::new(e.velocity),
                        }
                    },
                },
            }));
            events.push(TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
            });
            smf.tracks.push(events);
        }

        let mut bytes = Vec::new();
        smf.write_std(&mut bytes)?;
        Ok(bytes)
    }
}

#[derive(Debug, Clone, Copy)]
struct NoteMessage {
    delta: u32,
    channel: u8,
    key: u8,
    velocity: u8,
    on: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SmfTrack {
    name: Option<String>,
    /// Microseconds per quarter note
    tempo: Option<u32>,
    program: Option<(u8, u8)>,
    events: Vec<NoteMessage>,
}

impl SmfTrack {
    fn push_note(&mut self, on: bool, channel: u8, pitch: &str, delta: u32, velocity: u8) -> Result<(), MidiError> {
        if channel > 15 {
            return Err(MidiError::InvalidChannel(channel));
        }
        if velocity > 127 {
            return Err(MidiError::InvalidVelocity(velocity));
        }
        let key = note_number(pitch).ok_or_else(|| MidiError::InvalidPitch(pitch.to_owned()))?;
        self.events.push(NoteMessage {
            delta,
            channel,
            key,
            velocity,
            on,
        });
        Ok(())
    }
}

impl MidiTrackSink for SmfTrack {
    fn set_name(&mut self, name: &str) {
        self.name = Some(name.to_owned());
    }

    fn set_tempo(&mut self, bpm: f64) {
        self.tempo = Some(tempo_micros(bpm));
    }

    fn set_program(&mut self, channel: u8, program: u8) {
        self.program = Some((channel & 0x0f, program & 0x7f));
    }

    fn note_on(&mut self, channel: u8, pitch: &str, delta: u32, velocity: u8) -> Result<(), MidiError> {
        self.push_note(true, channel, pitch, delta, velocity)
    }

    fn note_off(&mut self, channel: u8, pitch: &str, delta: u32, velocity: u8) -> Result<(), MidiError> {
        self.push_note(false, channel, pitch, delta, velocity)
    }
}

/// Microseconds per quarter note, capped to the 24 bits a tempo event holds
pub fn tempo_micros(bpm: f64) -> u32 {
    if !(bpm.is_finite() && bpm > 0.0) {
        return 500_000;
    }
    ((60_000_000.0 / bpm).round() as u32).min(0x00ff_ffff)
}
