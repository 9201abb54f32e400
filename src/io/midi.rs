//! Step events to MIDI ticks.
//!
//! Resolution is fixed at 128 ticks per beat, which makes one step 32
//! ticks. Each event becomes an `on`/`off` pair; the pairs of a track are
//! merged, sorted by tick with releases ahead of attacks at the same tick,
//! and turned into delta times against a running cursor.

use crate::project::{InstrumentId, Project};
use crate::sequencing::{extract_events, time::STEPS_PER_BEAT, EventEncoder, SequencerEvent};

use super::smf::{MidiError, MidiFileSink, MidiTrackSink, MidiWriter};

pub const TICKS_PER_BEAT: u16 = 128;
pub const TICKS_PER_STEP: u32 = TICKS_PER_BEAT as u32 / STEPS_PER_BEAT as u32;

/// General MIDI percussion channel, never used for melodic tracks
pub const PERCUSSION_CHANNEL: u8 = 9;

/// Variant order is the tie-break: at equal ticks `Off` sorts first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NoteKind {
    Off,
    On,
}

/// A sub-event at an absolute tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickEvent {
    pub tick: u32,
    pub kind: NoteKind,
    pub pitch: String,
    pub velocity: u8,
}

/// A sub-event relative to the one emitted before it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaEvent {
    pub delta: u32,
    pub kind: NoteKind,
    pub pitch: String,
    pub velocity: u8,
}

/// Scale a `(0, 1]` velocity onto 0..=127
pub fn midi_velocity(velocity: f32) -> u8 {
    (velocity.clamp(0.0, 1.0) * 127.0).round() as u8
}

/// Expand events into on/off pairs and order them by tick, `Off` first on ties
pub fn to_tick_events(events: &[SequencerEvent]) -> Vec<TickEvent> {
    let mut ticks = Vec::with_capacity(events.len() * 2);
    for event in events {
        ticks.push(TickEvent {
            tick: event.start_step as u32 * TICKS_PER_STEP,
            kind: NoteKind::On,
            pitch: event.pitch.clone(),
            velocity: midi_velocity(event.velocity),
        });
        ticks.push(TickEvent {
            tick: event.end_step() as u32 * TICKS_PER_STEP,
            kind: NoteKind::Off,
            pitch: event.pitch.clone(),
            velocity: 0,
        });
    }
    // Stable: equal (tick, kind) keep extraction order
    ticks.sort_by_key(|t| (t.tick, t.kind));
    ticks
}

/// Delta-encode a tick-sorted stream against a cursor starting at 0
pub fn delta_encode(ticks: &[TickEvent]) -> Vec<DeltaEvent> {
    let mut cursor = 0u32;
    ticks
        .iter()
        .map(|t| {
            let delta = t.tick.saturating_sub(cursor);
            cursor = t.tick;
            DeltaEvent {
                delta,
                kind: t.kind,
                pitch: t.pitch.clone(),
                velocity: t.velocity,
            }
        })
        .collect()
}

/// Running sum of deltas, recovering absolute ticks
pub fn decode_deltas(deltas: &[DeltaEvent]) -> Vec<u32> {
    deltas
        .iter()
        .scan(0u32, |tick, d| {
            *tick += d.delta;
            Some(*tick)
        })
        .collect()
}

/// Channel for the `index`-th exported track, cycling 0..=15 without 9
pub fn channel_for(index: usize) -> u8 {
    let slot = (index % 15) as u8;
    if slot >= PERCUSSION_CHANNEL {
        slot + 1
    } else {
        slot
    }
}

/// Turns a canonical event list into one track's delta-time stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MidiEncoder;

impl EventEncoder for MidiEncoder {
    type Output = Vec<DeltaEvent>;

    fn encode(&self, events: &[SequencerEvent]) -> Vec<DeltaEvent> {
        delta_encode(&to_tick_events(events))
    }
}

/// Everything the writer needs for one track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedTrack {
    pub name: String,
    pub channel: u8,
    pub program: u8,
    pub events: Vec<DeltaEvent>,
}

impl EncodedTrack {
    pub fn new(name: impl Into<String>, instrument: InstrumentId, channel: u8, events: &[SequencerEvent]) -> Self {
        Self {
            name: name.into(),
            channel,
            program: instrument.midi_program(),
            events: MidiEncoder.encode(events),
        }
    }
}

/// Encode every track in project order. Muted tracks are included.
pub fn encode_project(project: &Project) -> Vec<EncodedTrack> {
    project
        .tracks()
        .iter()
        .enumerate()
        .map(|(i, track)| {
            EncodedTrack::new(
                track.name.clone(),
                track.instrument,
                channel_for(i),
                &extract_events(&track.pattern),
            )
        })
        .collect()
}

/// Hand encoded tracks to a writer and return the serialized file.
///
/// The first track carries the tempo; every track carries its program.
pub fn write_file<W: MidiWriter>(writer: &W, tempo_bpm: f64, tracks: &[EncodedTrack]) -> Result<Vec<u8>, MidiError> {
    let mut file = writer.new_file(TICKS_PER_BEAT);
    for (i, encoded) in tracks.iter().enumerate() {
        let track = file.add_track();
        track.set_name(&encoded.name);
        if i == 0 {
            track.set_tempo(tempo_bpm);
        }
        track.set_program(encoded.channel, encoded.program);
        for event in &encoded.events {
            match event.kind {
                NoteKind::On => track.note_on(encoded.channel, &event.pitch, event.delta, event.velocity)?,
                NoteKind::Off => track.note_off(encoded.channel, &event.pitch, event.delta, event.velocity)?,
            }
        }
    }
    file.to_bytes()
}
