//! The audio-engine boundary.
//!
//! Synthesis itself lives outside this crate. The playback session only needs
//! three things from an engine:
//!
//! 1. a single transport clock (tempo, swing, loop, position, start/stop)
//! 2. loopable parts that call back once per scheduled note
//! 3. voices, one per instrument family, that can play a note for a duration
//!
//! Part callbacks run on the engine's clock, not synchronously with the code
//! that scheduled them, so everything handed to a part must be owned (`Send`).

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::ScheduledNote;
use crate::project::InstrumentId;

/// Grid the transport's swing is applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subdivision {
    Eighth,
    Sixteenth,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("audio engine is not available: {0}")]
    Unavailable(String),
    #[error("failed to create a voice for {instrument}: {reason}")]
    Voice {
        instrument: InstrumentId,
        reason: String,
    },
    #[error("failed to schedule a part: {0}")]
    Part(String),
}

/// The engine's process-wide playback clock
pub trait Transport {
    fn set_bpm(&mut self, bpm: f64);

    /// `amount` is in [0, 1]
    fn set_swing(&mut self, amount: f64, subdivision: Subdivision);

    fn set_loop(&mut self, enabled: bool, length_bars: u32);

    /// Current position in (fractional) sixteenth-note steps
    fn position_steps(&self) -> f64;

    fn set_position_steps(&mut self, steps: f64);

    /// Start running after `delay`
    fn start(&mut self, delay: Duration);

    fn stop(&mut self);

    fn is_started(&self) -> bool;
}

/// A synthesis instance for one track
pub trait Voice: Send + Sync {
    fn set_volume_db(&self, volume_db: f32);

    /// Sound `pitch` at engine time `time` (seconds) and release after `duration`
    fn trigger_attack_release(&self, pitch: &str, duration: Duration, time: f64, velocity: f32);

    /// Release all engine resources held by this voice
    fn dispose(&self);
}

/// A loopable group of scheduled notes
pub trait Part: Send {
    /// Cancel every pending callback and release the part
    fn dispose(&mut self);
}

/// Invoked by a part with the engine time (seconds) and the note that is due
pub type NoteCallback = Box<dyn FnMut(f64, &ScheduledNote) + Send>;

pub trait AudioEngine {
    fn transport(&mut self) -> &mut dyn Transport;

    fn create_voice(&mut self, instrument: InstrumentId) -> Result<Arc<dyn Voice>, EngineError>;

    /// Schedule `notes` as a unit that loops every `loop_bars` bars
    fn create_part(
        &mut self,
        notes: Vec<ScheduledNote>,
        loop_bars: u32,
        callback: NoteCallback,
    ) -> Result<Box<dyn Part>, EngineError>;
}
