//! Sequencer - the application controller
//!
//! Owns the project, the one playback session, and the two external
//! collaborators. Both collaborators load asynchronously in a real host, so
//! each sits in a slot that starts out `Loading` and is filled once with
//! either a ready instance or the reason it failed. Operations that need a
//! collaborator which is not ready report it on the status line instead of
//! failing hard.
//!
//! While the transport runs, tempo, swing, volume, mute, instrument and
//! track-list changes go straight through teardown-and-reschedule. Grid
//! edits only mark the schedule out of sync; [`Sequencer::resync`] applies
//! them.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use log::{info, warn};

use crate::config::SequencerConfig;
use crate::error::SequencerError;
use crate::io::{encode_project, export_file_name, write_file, MidiError, MidiWriter};
use crate::playback::{AudioEngine, EngineError, PlaybackSession};
use crate::project::{InstrumentId, Project, Track, TrackId};

/// Lifecycle of a lazily loaded collaborator
#[derive(Debug)]
pub enum Slot<T> {
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> Slot<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Slot::Ready(_))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Slot::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn ready_mut(&mut self) -> Option<&mut T> {
        match self {
            Slot::Ready(value) => Some(value),
            _ => None,
        }
    }
}

pub struct Sequencer<E: AudioEngine, W: MidiWriter> {
    project: Project,
    session: PlaybackSession,
    engine: Slot<E>,
    writer: Slot<W>,
    status: String,
    export_dir: PathBuf,
}

impl<E: AudioEngine, W: MidiWriter> Sequencer<E, W> {
    /// Fresh project from `config`, with one empty track
    pub fn new(config: &SequencerConfig) -> Result<Self, SequencerError> {
        config.validate()?;
        let mut project = Project::new(config.rows.iter().cloned(), config.steps)?;
        project.set_tempo(config.tempo_bpm)?;
        project.set_swing(config.swing_percent)?;
        project.add_track()?;
        Ok(Self::with_project(project, config))
    }

    /// Wrap an existing (for example, loaded) project
    pub fn with_project(project: Project, config: &SequencerConfig) -> Self {
        Self {
            project,
            session: PlaybackSession::with_start_delay(config.start_delay()),
            engine: Slot::Loading,
            writer: Slot::Loading,
            status: "Loading audio engine...".into(),
            export_dir: config.export_dir.clone(),
        }
    }

    /// Fill the audio engine slot once loading has finished.
    ///
    /// Replacing a ready engine stops playback on it first; the session's
    /// voices belong to the old engine.
    pub fn attach_audio_engine(&mut self, engine: Result<E, EngineError>) {
        if let Some(old) = self.engine.ready_mut() {
            self.session.stop(old);
        } else {
            self.session.teardown();
        }
        self.engine = match engine {
            Ok(engine) => {
                self.set_status("Ready");
                Slot::Ready(engine)
            }
            Err(err) => {
                warn!("audio engine failed to load: {err}");
                self.set_status(format!("Audio unavailable: {err}"));
                Slot::Failed(err.to_string())
            }
        };
    }

    /// Fill the MIDI writer slot once loading has finished
    pub fn attach_midi_writer(&mut self, writer: Result<W, MidiError>) {
        self.writer = match writer {
            Ok(writer) => Slot::Ready(writer),
            Err(err) => {
                warn!("MIDI writer failed to load: {err}");
                self.set_status(format!("MIDI export unavailable: {err}"));
                Slot::Failed(err.to_string())
            }
        };
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn tracks(&self) -> &[Track] {
        self.project.tracks()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn engine(&self) -> &Slot<E> {
        &self.engine
    }

    /// The ready engine, for hosts that drive its clock
    pub fn engine_mut(&mut self) -> Option<&mut E> {
        self.engine.ready_mut()
    }

    pub fn writer(&self) -> &Slot<W> {
        &self.writer
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn is_playing(&self) -> bool {
        self.session.is_playing()
    }

    /// A grid edit has not reached the live schedule yet
    pub fn is_out_of_sync(&self) -> bool {
        self.session.is_out_of_sync(&self.project)
    }

    // -- transport --

    pub fn play(&mut self) -> Result<(), SequencerError> {
        let Some(engine) = self.engine.ready_mut() else {
            self.report_engine_missing();
            return Err(SequencerError::AudioEngineUnavailable);
        };
        match self.session.start(engine, &self.project) {
            Ok(()) => {
                self.status = format!("Playing at {:.0} BPM", self.project.tempo_bpm());
                Ok(())
            }
            Err(err) => {
                warn!("playback failed to start: {err}");
                self.set_status(format!("Playback failed: {err}"));
                Err(err.into())
            }
        }
    }

    pub fn stop(&mut self) {
        if let Some(engine) = self.engine.ready_mut() {
            self.session.stop(engine);
        } else {
            self.session.teardown();
        }
        self.set_status("Stopped");
    }

    pub fn toggle_playback(&mut self) -> Result<(), SequencerError> {
        if self.is_playing() {
            self.stop();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Apply pending grid edits to the running schedule
    pub fn resync(&mut self) -> Result<(), SequencerError> {
        self.reschedule()?;
        if self.is_playing() {
            self.set_status("Pattern synced");
        }
        Ok(())
    }

    // -- track list --

    pub fn add_track(&mut self) -> Result<TrackId, SequencerError> {
        let id = self.project.add_track()?;
        self.reschedule()?;
        Ok(id)
    }

    pub fn remove_track(&mut self, id: TrackId) -> Result<Track, SequencerError> {
        let track = self.project.remove_track(id)?;
        self.reschedule()?;
        Ok(track)
    }

    pub fn rename_track(&mut self, id: TrackId, name: impl Into<String>) -> Result<(), SequencerError> {
        self.project.rename_track(id, name)?;
        Ok(())
    }

    pub fn set_instrument(&mut self, id: TrackId, instrument: InstrumentId) -> Result<(), SequencerError> {
        self.project.set_instrument(id, instrument)?;
        self.reschedule()
    }

    pub fn set_volume_db(&mut self, id: TrackId, volume_db: f32) -> Result<(), SequencerError> {
        self.project.set_volume_db(id, volume_db)?;
        self.reschedule()
    }

    pub fn set_muted(&mut self, id: TrackId, muted: bool) -> Result<(), SequencerError> {
        self.project.set_muted(id, muted)?;
        self.reschedule()
    }

    // -- grid --

    pub fn toggle_cell(
        &mut self,
        id: TrackId,
        row: usize,
        step: usize,
        forced: Option<bool>,
    ) -> Result<(), SequencerError> {
        self.project.toggle_cell(id, row, step, forced)?;
        Ok(())
    }

    pub fn set_velocity(&mut self, id: TrackId, row: usize, step: usize, velocity: f32) -> Result<(), SequencerError> {
        self.project.set_velocity(id, row, step, velocity)?;
        Ok(())
    }

    pub fn clear_pattern(&mut self, id: TrackId) -> Result<(), SequencerError> {
        self.project.clear_pattern(id)?;
        Ok(())
    }

    // -- global controls --

    pub fn set_tempo(&mut self, bpm: f64) -> Result<(), SequencerError> {
        self.project.set_tempo(bpm)?;
        self.reschedule()
    }

    pub fn set_swing(&mut self, percent: f64) -> Result<(), SequencerError> {
        self.project.set_swing(percent)?;
        self.reschedule()
    }

    // -- export --

    /// Encode every track into a MIDI file.
    ///
    /// Returns `Ok(None)` when the writer is not ready yet; the request is
    /// skipped and can simply be repeated.
    pub fn export(&mut self) -> Result<Option<Vec<u8>>, SequencerError> {
        let Some(writer) = self.writer.ready() else {
            self.report_writer_missing();
            return Ok(None);
        };
        let tracks = encode_project(&self.project);
        let bytes = write_file(writer, self.project.tempo_bpm(), &tracks)?;
        info!("exported {} tracks, {} bytes", tracks.len(), bytes.len());
        self.set_status(format!("Exported {} tracks", tracks.len()));
        Ok(Some(bytes))
    }

    /// Export into the configured directory under a timestamped name
    pub fn export_to_dir(&mut self, at: SystemTime) -> Result<Option<PathBuf>, SequencerError> {
        let dir = self.export_dir.clone();
        self.export_to(&dir, at)
    }

    pub fn export_to(&mut self, dir: &Path, at: SystemTime) -> Result<Option<PathBuf>, SequencerError> {
        let Some(bytes) = self.export()? else {
            return Ok(None);
        };
        let path = dir.join(export_file_name(at));
        std::fs::write(&path, bytes).map_err(|source| SequencerError::Export {
            path: path.display().to_string(),
            source,
        })?;
        self.set_status(format!("Saved {}", path.display()));
        Ok(Some(path))
    }

    fn reschedule(&mut self) -> Result<(), SequencerError> {
        if !self.session.is_playing() {
            return Ok(());
        }
        let Some(engine) = self.engine.ready_mut() else {
            self.session.teardown();
            return Err(SequencerError::AudioEngineUnavailable);
        };
        if let Err(err) = self.session.reschedule(engine, &self.project) {
            warn!("reschedule failed: {err}");
            self.set_status(format!("Playback stopped: {err}"));
            return Err(err.into());
        }
        Ok(())
    }

    fn report_engine_missing(&mut self) {
        let message = match &self.engine {
            Slot::Loading => "Audio engine is still loading".to_owned(),
            Slot::Failed(reason) => format!("Audio unavailable: {reason}"),
            Slot::Ready(_) => return,
        };
        warn!("{message}");
        self.status = message;
    }

    fn report_writer_missing(&mut self) {
        let message = match &self.writer {
            Slot::Loading => "MIDI export is still loading, try again".to_owned(),
            Slot::Failed(reason) => format!("MIDI export unavailable: {reason}"),
            Slot::Ready(_) => return,
        };
        warn!("{message}");
        self.status = message;
    }

    fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }
}
