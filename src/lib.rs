pub mod config;
pub mod error;
pub mod io; // MIDI export and project files
pub mod playback; // Live scheduling against an audio engine
pub mod project; // Tracks, instruments, transport settings
pub mod sequencer;
pub mod sequencing; // Grid, events, musical time

pub use config::SequencerConfig;
pub use error::SequencerError;
pub use sequencer::{Sequencer, Slot};
