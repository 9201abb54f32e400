//! Live playback: project canonical events onto the engine's loop-relative
//! transport and manage the voices that sound them.

#[cfg(feature = "rtrb")]
pub mod clock;
pub mod engine;
pub mod session;

use std::time::Duration;

use crate::sequencing::{time::sixteenth_duration, EventEncoder, SequencerEvent, TransportTime};

pub use engine::{AudioEngine, EngineError, NoteCallback, Part, Subdivision, Transport, Voice};
pub use session::PlaybackSession;

/// A note placed on the transport, ready to hand to a part
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledNote {
    /// Loop-relative scheduling key
    pub time: TransportTime,
    /// How long the note sounds
    pub duration: Duration,
    pub pitch: String,
    /// Attack velocity in (0, 1]
    pub velocity: f32,
}

/// Maps step-domain events onto bars:beats:sixteenths at a given tempo
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackEncoder {
    tempo_bpm: f64,
}

impl PlaybackEncoder {
    pub fn new(tempo_bpm: f64) -> Self {
        Self { tempo_bpm }
    }
}

impl EventEncoder for PlaybackEncoder {
    type Output = Vec<ScheduledNote>;

    fn encode(&self, events: &[SequencerEvent]) -> Vec<ScheduledNote> {
        let step = sixteenth_duration(self.tempo_bpm);
        events
            .iter()
            .map(|event| ScheduledNote {
                time: TransportTime::from_step(event.start_step),
                duration: step.saturating_mul(u32::try_from(event.duration_steps).unwrap_or(u32::MAX)),
                pitch: event.pitch.clone(),
                velocity: event.velocity,
            })
            .collect()
    }
}
