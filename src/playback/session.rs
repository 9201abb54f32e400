//! PlaybackSession - the single live schedule
//!
//! At most one session is live at a time. It owns every voice and part it
//! allocated and releases all of them together in `teardown()`, which runs
//! before every (re)schedule, on stop, and on drop.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use super::engine::{AudioEngine, EngineError, Part, Subdivision, Voice};
use super::PlaybackEncoder;
use crate::project::{Project, TrackId};
use crate::sequencing::{extract_events, EventEncoder, Pattern};

/// Delay between a fresh start request and the transport actually running
pub const DEFAULT_START_DELAY: Duration = Duration::from_millis(50);

struct LiveTrack {
    track: TrackId,
    voice: Arc<dyn Voice>,
    part: Option<Box<dyn Part>>,
}

pub struct PlaybackSession {
    live: Vec<LiveTrack>,
    /// Pattern versions the current schedule was built from
    scheduled: Vec<(TrackId, Pattern)>,
    playing: bool,
    start_delay: Duration,
}

impl PlaybackSession {
    pub fn new() -> Self {
        Self::with_start_delay(DEFAULT_START_DELAY)
    }

    pub fn with_start_delay(start_delay: Duration) -> Self {
        Self {
            live: Vec::new(),
            scheduled: Vec::new(),
            playing: false,
            start_delay,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Voices currently allocated by this session
    pub fn live_voices(&self) -> usize {
        self.live.len()
    }

    /// Parts currently scheduled by this session
    pub fn live_parts(&self) -> usize {
        self.live.iter().filter(|t| t.part.is_some()).count()
    }

    /// Tracks that currently hold a voice
    pub fn voiced_tracks(&self) -> impl Iterator<Item = TrackId> + '_ {
        self.live.iter().map(|t| t.track)
    }

    /// Start from step 0 after the settle delay.
    ///
    /// Any previous schedule is torn down first. On failure the session is
    /// left fully torn down and stopped.
    pub fn start(&mut self, engine: &mut dyn AudioEngine, project: &Project) -> Result<(), EngineError> {
        self.teardown();
        engine.transport().stop();

        if let Err(err) = self.schedule(engine, project) {
            engine.transport().stop();
            self.playing = false;
            return Err(err);
        }

        let transport = engine.transport();
        transport.set_position_steps(0.0);
        transport.start(self.start_delay);
        self.playing = true;

        info!(
            "transport started at {:.0} BPM, {} voices over {} bars",
            project.tempo_bpm(),
            self.live.len(),
            project.loop_length_bars()
        );
        Ok(())
    }

    /// Rebuild the schedule in place while playing, keeping the transport position.
    ///
    /// Does nothing when stopped: the next `start` schedules from scratch.
    pub fn reschedule(&mut self, engine: &mut dyn AudioEngine, project: &Project) -> Result<(), EngineError> {
        if !self.playing {
            return Ok(());
        }

        let position = engine.transport().position_steps();
        if let Err(err) = self.schedule(engine, project) {
            engine.transport().stop();
            self.playing = false;
            return Err(err);
        }
        engine.transport().set_position_steps(position);

        debug!("rescheduled at step {:.2}", position);
        Ok(())
    }

    /// Stop the transport and release everything
    pub fn stop(&mut self, engine: &mut dyn AudioEngine) {
        engine.transport().stop();
        self.teardown();
        self.playing = false;
        info!("transport stopped");
    }

    /// Release every part and voice this session allocated.
    ///
    /// Safe to call any number of times.
    pub fn teardown(&mut self) {
        if self.live.is_empty() {
            self.scheduled.clear();
            return;
        }

        let count = self.live.len();
        // Parts first so no callback can reach a disposed voice
        for live in &mut self.live {
            if let Some(mut part) = live.part.take() {
                part.dispose();
            }
        }
        for live in self.live.drain(..) {
            live.voice.dispose();
        }
        self.scheduled.clear();

        debug!("tore down {} voices", count);
    }

    /// True when a pattern, or the track list, changed after the live
    /// schedule was built
    pub fn is_out_of_sync(&self, project: &Project) -> bool {
        if !self.playing {
            return false;
        }
        project.tracks().len() != self.scheduled.len()
            || project
                .tracks()
                .iter()
                .zip(&self.scheduled)
                .any(|(track, (id, pattern))| track.id != *id || !track.pattern.same_version(pattern))
    }

    /// Tear down, configure the transport, and allocate one voice plus one
    /// part per sounding track
    fn schedule(&mut self, engine: &mut dyn AudioEngine, project: &Project) -> Result<(), EngineError> {
        self.teardown();

        let loop_bars = project.loop_length_bars() as u32;
        let transport = engine.transport();
        transport.set_bpm(project.tempo_bpm());
        transport.set_swing(project.swing_percent() / 100.0, Subdivision::Eighth);
        transport.set_loop(true, loop_bars);

        let encoder = PlaybackEncoder::new(project.tempo_bpm());
        for track in project.tracks() {
            if track.muted {
                continue;
            }
            let events = extract_events(&track.pattern);
            if events.is_empty() {
                continue;
            }

            let voice = match engine.create_voice(track.instrument) {
                Ok(voice) => voice,
                Err(err) => {
                    warn!("voice for track {} failed: {}", track.id, err);
                    self.teardown();
                    return Err(err);
                }
            };
            voice.set_volume_db(track.volume_db);

            // Registered before the part exists so a part failure still releases it
            self.live.push(LiveTrack {
                track: track.id,
                voice: Arc::clone(&voice),
                part: None,
            });

            let notes = encoder.encode(&events);
            let callback = Box::new(move |time: f64, note: &super::ScheduledNote| {
                voice.trigger_attack_release(&note.pitch, note.duration, time, note.velocity);
            });

            match engine.create_part(notes, loop_bars, callback) {
                Ok(part) => {
                    if let Some(live) = self.live.last_mut() {
                        live.part = Some(part);
                    }
                }
                Err(err) => {
                    warn!("part for track {} failed: {}", track.id, err);
                    self.teardown();
                    return Err(err);
                }
            }
        }

        self.scheduled = project
            .tracks()
            .iter()
            .map(|t| (t.id, t.pattern.clone()))
            .collect();

        debug!(
            "scheduled {} of {} tracks, loop {} bars",
            self.live.len(),
            project.tracks().len(),
            loop_bars
        );
        Ok(())
    }
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
