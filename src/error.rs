use thiserror::Error;

use crate::config::ConfigError;
use crate::io::MidiError;
use crate::playback::EngineError;
use crate::project::ProjectError;
use crate::sequencing::PatternError;

/// Errors surfaced by the [`Sequencer`](crate::Sequencer) controller
#[derive(Debug, Error)]
pub enum SequencerError {
    #[error("audio engine is not ready")]
    AudioEngineUnavailable,
    #[error("MIDI writer is not ready")]
    MidiWriterUnavailable,
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Midi(#[from] MidiError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to write {path}")]
    Export {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
