//! Getting events out of the process: MIDI files and saved projects.

pub mod midi;
#[cfg(feature = "serde")]
pub mod persistence;
pub mod smf;

use std::time::{SystemTime, UNIX_EPOCH};

pub use midi::{encode_project, write_file, DeltaEvent, EncodedTrack, MidiEncoder, NoteKind, TickEvent};
pub use smf::{MidiError, MidiFileSink, MidiTrackSink, MidiWriter, SmfWriter};

pub const MIDI_MIME_TYPE: &str = "audio/midi";

/// `agentic-sequencer-<unix millis>.mid`
pub fn export_file_name(at: SystemTime) -> String {
    let millis = at.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_millis());
    format!("agentic-sequencer-{millis}.mid")
}
