//! Tracks and the project that owns them.
//!
//! A track owns exactly one pattern. Every pattern in a project shares the
//! same row layout and step count, so the loop length is a project-wide
//! property.

pub mod instrument;

use std::collections::HashSet;

use thiserror::Error;

use crate::sequencing::{notes, time::loop_length_bars, Pattern, PatternError};

pub use instrument::InstrumentId;

pub const DEFAULT_VOLUME_DB: f32 = -8.0;
pub const MIN_VOLUME_DB: f32 = -24.0;
pub const MAX_VOLUME_DB: f32 = 6.0;

pub const DEFAULT_TEMPO_BPM: f64 = 120.0;
pub const MIN_TEMPO_BPM: f64 = 70.0;
pub const MAX_TEMPO_BPM: f64 = 180.0;

pub const MAX_SWING_PERCENT: f64 = 60.0;

/// Opaque, never-reused track identifier
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub u32);

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectError {
    #[error("no track with id {0}")]
    UnknownTrack(TrackId),
    #[error("{what} must be a finite number, got {value}")]
    NotFinite { what: &'static str, value: f64 },
    #[error("track {0} does not share the project's row layout and step count")]
    LayoutMismatch(TrackId),
    #[error("track id {0} is used more than once")]
    DuplicateTrack(TrackId),
    #[error("no track ids left to hand out")]
    IdsExhausted,
    #[error("row '{0}' is not a pitch")]
    BadRow(String),
    #[error("row '{0}' appears more than once")]
    DuplicateRow(String),
    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// One row of the track list: a named, voiced pattern
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    pub instrument: InstrumentId,
    pub pattern: Pattern,
    /// Output level in dB, within [-24, 6]
    pub volume_db: f32,
    pub muted: bool,
}

/// The full editable state: tracks plus transport settings
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    tracks: Vec<Track>,
    tempo_bpm: f64,
    swing_percent: f64,
    /// Empty pattern every new track starts from
    template: Pattern,
    /// Number of tracks ever created; drives ids and default instruments
    created: u32,
}

impl Project {
    /// Create a project with no tracks
    pub fn new<I, S>(rows: I, steps: usize) -> Result<Self, ProjectError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            tracks: Vec::new(),
            tempo_bpm: DEFAULT_TEMPO_BPM,
            swing_percent: 0.0,
            template: Pattern::new(rows, steps)?,
            created: 0,
        })
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn tempo_bpm(&self) -> f64 {
        self.tempo_bpm
    }

    pub fn swing_percent(&self) -> f64 {
        self.swing_percent
    }

    /// Row pitch labels shared by every pattern
    pub fn rows(&self) -> &[String] {
        self.template.pitches()
    }

    /// Steps per pattern
    pub fn total_steps(&self) -> usize {
        self.template.steps()
    }

    /// Loop length in bars: `ceil(total_steps / 16)`
    pub fn loop_length_bars(&self) -> usize {
        loop_length_bars(self.total_steps())
    }

    /// Append a track with the next default instrument, an empty pattern
    /// and the default volume.
    pub fn add_track(&mut self) -> Result<TrackId, ProjectError> {
        let n = self.created;
        self.created = n.checked_add(1).ok_or(ProjectError::IdsExhausted)?;

        let id = TrackId(n);
        self.tracks.push(Track {
            id,
            name: format!("Track {}", n + 1),
            instrument: InstrumentId::nth_default(n as usize),
            pattern: self.template.cleared(),
            volume_db: DEFAULT_VOLUME_DB,
            muted: false,
        });
        Ok(id)
    }

    /// Remove a track for good
    pub fn remove_track(&mut self, id: TrackId) -> Result<Track, ProjectError> {
        let index = self
            .tracks
            .iter()
            .position(|t| t.id == id)
            .ok_or(ProjectError::UnknownTrack(id))?;
        Ok(self.tracks.remove(index))
    }

    pub fn rename_track(&mut self, id: TrackId, name: impl Into<String>) -> Result<(), ProjectError> {
        self.track_mut(id)?.name = name.into();
        Ok(())
    }

    pub fn set_instrument(&mut self, id: TrackId, instrument: InstrumentId) -> Result<(), ProjectError> {
        self.track_mut(id)?.instrument = instrument;
        Ok(())
    }

    /// Set a track's level, clamped to [-24, 6] dB
    pub fn set_volume_db(&mut self, id: TrackId, volume_db: f32) -> Result<(), ProjectError> {
        let volume = finite("volume", volume_db as f64)?;
        self.track_mut(id)?.volume_db = (volume as f32).clamp(MIN_VOLUME_DB, MAX_VOLUME_DB);
        Ok(())
    }

    pub fn set_muted(&mut self, id: TrackId, muted: bool) -> Result<(), ProjectError> {
        self.track_mut(id)?.muted = muted;
        Ok(())
    }

    /// Toggle (or force) one cell of a track's pattern
    pub fn toggle_cell(
        &mut self,
        id: TrackId,
        row: usize,
        step: usize,
        forced: Option<bool>,
    ) -> Result<(), ProjectError> {
        let track = self.track_mut(id)?;
        track.pattern = track.pattern.toggle_cell(row, step, forced)?;
        Ok(())
    }

    pub fn set_velocity(
        &mut self,
        id: TrackId,
        row: usize,
        step: usize,
        velocity: f32,
    ) -> Result<(), ProjectError> {
        let track = self.track_mut(id)?;
        track.pattern = track.pattern.set_velocity(row, step, velocity)?;
        Ok(())
    }

    /// Replace a track's pattern with a fresh empty one
    pub fn clear_pattern(&mut self, id: TrackId) -> Result<(), ProjectError> {
        let track = self.track_mut(id)?;
        track.pattern = track.pattern.cleared();
        Ok(())
    }

    /// Set the tempo, clamped to [70, 180] BPM
    pub fn set_tempo(&mut self, bpm: f64) -> Result<(), ProjectError> {
        self.tempo_bpm = finite("tempo", bpm)?.clamp(MIN_TEMPO_BPM, MAX_TEMPO_BPM);
        Ok(())
    }

    /// Set the swing amount, clamped to [0, 60] percent
    pub fn set_swing(&mut self, percent: f64) -> Result<(), ProjectError> {
        self.swing_percent = finite("swing", percent)?.clamp(0.0, MAX_SWING_PERCENT);
        Ok(())
    }

    /// Check invariants that deserialization alone cannot: rows are distinct
    /// pitches, every pattern matches the template layout, ids are unique and
    /// below the creation counter, and the continuous controls are in range.
    pub fn validate(&mut self) -> Result<(), ProjectError> {
        let mut keys = HashSet::new();
        for row in self.template.pitches() {
            let key = notes::note_number(row).ok_or_else(|| ProjectError::BadRow(row.clone()))?;
            if !keys.insert(key) {
                return Err(ProjectError::DuplicateRow(row.clone()));
            }
        }

        let mut seen = HashSet::new();
        for track in &mut self.tracks {
            if track.pattern.pitches() != self.template.pitches() || track.pattern.steps() != self.template.steps() {
                return Err(ProjectError::LayoutMismatch(track.id));
            }
            if !seen.insert(track.id) {
                return Err(ProjectError::DuplicateTrack(track.id));
            }
            let next = track.id.0.checked_add(1).ok_or(ProjectError::IdsExhausted)?;
            self.created = self.created.max(next);
            track.volume_db = finite("volume", track.volume_db as f64)?.clamp(MIN_VOLUME_DB as f64, MAX_VOLUME_DB as f64) as f32;
        }
        self.tempo_bpm = finite("tempo", self.tempo_bpm)?.clamp(MIN_TEMPO_BPM, MAX_TEMPO_BPM);
        self.swing_percent = finite("swing", self.swing_percent)?.clamp(0.0, MAX_SWING_PERCENT);
        Ok(())
    }

    fn track_mut(&mut self, id: TrackId) -> Result<&mut Track, ProjectError> {
        self.tracks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(ProjectError::UnknownTrack(id))
    }
}

fn finite(what: &'static str, value: f64) -> Result<f64, ProjectError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ProjectError::NotFinite { what, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> Project {
        Project::new(["C5", "B4", "A#4", "A4"], 32).unwrap()
    }

    #[test]
    fn add_track_uses_defaults() {
        let mut p = project();
        let a = p.add_track().unwrap();
        let b = p.add_track().unwrap();

        let first = p.track(a).unwrap();
        assert_eq!(first.name, "Track 1");
        assert_eq!(first.instrument, InstrumentId::Keys);
        assert_eq!(first.volume_db, DEFAULT_VOLUME_DB);
        assert!(!first.muted);
        assert!(first.pattern.is_silent());
        assert_eq!(first.pattern.steps(), 32);

        assert_eq!(p.track(b).unwrap().instrument, InstrumentId::Bass);
        assert_ne!(a, b);
    }

    #[test]
    fn removed_ids_are_not_reused() {
        let mut p = project();
        let a = p.add_track().unwrap();
        p.remove_track(a).unwrap();
        let b = p.add_track().unwrap();

        assert_ne!(a, b);
        assert!(p.track(a).is_none());
        assert_eq!(p.remove_track(a), Err(ProjectError::UnknownTrack(a)));
    }

    #[test]
    fn loop_length_follows_steps() {
        assert_eq!(project().loop_length_bars(), 2);
        assert_eq!(Project::new(["C4"], 64).unwrap().loop_length_bars(), 4);
    }

    #[test]
    fn continuous_controls_are_clamped() {
        let mut p = project();
        let id = p.add_track().unwrap();

        p.set_volume_db(id, 40.0).unwrap();
        assert_eq!(p.track(id).unwrap().volume_db, MAX_VOLUME_DB);
        p.set_volume_db(id, -100.0).unwrap();
        assert_eq!(p.track(id).unwrap().volume_db, MIN_VOLUME_DB);

        p.set_tempo(500.0).unwrap();
        assert_eq!(p.tempo_bpm(), MAX_TEMPO_BPM);
        p.set_swing(-5.0).unwrap();
        assert_eq!(p.swing_percent(), 0.0);
        p.set_swing(75.0).unwrap();
        assert_eq!(p.swing_percent(), MAX_SWING_PERCENT);
    }

    #[test]
    fn non_finite_controls_are_rejected() {
        let mut p = project();
        let id = p.add_track().unwrap();
        assert!(matches!(
            p.set_tempo(f64::NAN),
            Err(ProjectError::NotFinite { what: "tempo", .. })
        ));
        assert!(p.set_volume_db(id, f32::INFINITY).is_err());
        assert_eq!(p.tempo_bpm(), DEFAULT_TEMPO_BPM);
    }

    #[test]
    fn cell_edits_replace_the_pattern() {
        let mut p = project();
        let id = p.add_track().unwrap();
        let before = p.track(id).unwrap().pattern.clone();

        p.toggle_cell(id, 1, 3, None).unwrap();
        let after = &p.track(id).unwrap().pattern;
        assert!(after.cell(1, 3).unwrap().active);
        assert!(!before.same_version(after));

        p.clear_pattern(id).unwrap();
        assert!(p.track(id).unwrap().pattern.is_silent());
    }

    #[test]
    fn validate_repairs_counters_and_rejects_bad_layouts() {
        let mut p = project();
        let a = p.add_track().unwrap();
        p.created = 0;
        p.tempo_bpm = 999.0;
        p.validate().unwrap();
        assert_eq!(p.tempo_bpm(), MAX_TEMPO_BPM);
        assert_ne!(p.add_track().unwrap(), a);

        let mut bad = project();
        let id = bad.add_track().unwrap();
        bad.tracks[0].pattern = Pattern::new(["C4"], 16).unwrap();
        assert_eq!(bad.validate(), Err(ProjectError::LayoutMismatch(id)));
    }

    #[test]
    fn id_space_runs_out_without_reuse() {
        let mut p = project();
        p.created = u32::MAX;
        assert_eq!(p.add_track(), Err(ProjectError::IdsExhausted));
        assert!(p.tracks().is_empty());
        assert_eq!(p.created, u32::MAX);
    }

    #[test]
    fn validate_rejects_bad_rows() {
        let mut dup = Project::new(["C#4", "Db4"], 16).unwrap();
        assert_eq!(dup.validate(), Err(ProjectError::DuplicateRow("Db4".into())));

        let mut bad = Project::new(["C4", "H2"], 16).unwrap();
        assert_eq!(bad.validate(), Err(ProjectError::BadRow("H2".into())));
    }

    #[test]
    fn cell_edits_reject_out_of_range() {
        let mut p = project();
        let id = p.add_track().unwrap();
        assert!(matches!(
            p.toggle_cell(id, 4, 0, None),
            Err(ProjectError::Pattern(PatternError::RowOutOfRange { .. }))
        ));
        assert!(matches!(
            p.toggle_cell(TrackId(99), 0, 0, None),
            Err(ProjectError::UnknownTrack(TrackId(99)))
        ));
    }
}
