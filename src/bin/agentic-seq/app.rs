//! App - owns the sequencer, the reference engine and the editor cursor

use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime};

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::DefaultTerminal;
use rtrb::Consumer;

use agentic_sequencer::{
    io::{persistence, SmfWriter},
    playback::{
        clock::{ClockEngine, NoteTrigger},
        Transport,
    },
    project::{Track, TrackId},
    sequencing::pattern::{velocity_from_display, velocity_to_display},
    Sequencer, SequencerConfig, SequencerError,
};

use crate::ui;

/// How long a triggered row stays lit
const FLASH: Duration = Duration::from_millis(120);
const TEMPO_STEP: f64 = 5.0;
const SWING_STEP: f64 = 5.0;
const VOLUME_STEP: f32 = 1.0;
const VELOCITY_STEP: i16 = 10;

pub type AppSequencer = Sequencer<ClockEngine, SmfWriter>;

pub struct App {
    pub seq: AppSequencer,
    triggers: Consumer<NoteTrigger>,
    /// Pitch label and when it last sounded
    pub flashes: Vec<(String, Instant)>,
    pub selected: usize,
    pub cursor_row: usize,
    pub cursor_step: usize,
    project_path: Option<PathBuf>,
    last_tick: Instant,
    should_quit: bool,
}

impl App {
    pub fn new(config: SequencerConfig, project_path: Option<PathBuf>) -> EyreResult<Self> {
        let loaded = match &project_path {
            Some(path) if path.exists() => Some(
                persistence::load_project(path)
                    .wrap_err_with(|| format!("failed to load project {}", path.display()))?,
            ),
            _ => None,
        };
        let mut seq = match loaded {
            Some(project) => AppSequencer::with_project(project, &config),
            None => AppSequencer::new(&config)?,
        };

        let (engine, triggers) = ClockEngine::new();
        seq.attach_audio_engine(Ok(engine));
        seq.attach_midi_writer(Ok(SmfWriter));

        Ok(Self {
            seq,
            triggers,
            flashes: Vec::new(),
            selected: 0,
            cursor_row: 0,
            cursor_step: 0,
            project_path,
            last_tick: Instant::now(),
            should_quit: false,
        })
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.advance_clock();
            self.poll_triggers();

            terminal.draw(|frame| ui::render(frame, self))?;

            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }
        self.seq.stop();
        Ok(())
    }

    pub fn selected_track(&self) -> Option<&Track> {
        self.seq.tracks().get(self.selected)
    }

    /// Playhead in whole steps, when the transport is running
    pub fn playhead(&self) -> Option<usize> {
        if !self.seq.is_playing() {
            return None;
        }
        let engine = self.seq.engine().ready()?;
        Some(engine.clock_transport().position_steps().floor() as usize)
    }

    pub fn is_flashing(&self, pitch: &str) -> bool {
        self.flashes.iter().any(|(p, _)| p == pitch)
    }

    fn advance_clock(&mut self) {
        let now = Instant::now();
        let elapsed = now - self.last_tick;
        self.last_tick = now;
        if let Some(engine) = self.seq.engine_mut() {
            engine.advance(elapsed);
        }
    }

    fn poll_triggers(&mut self) {
        let now = Instant::now();
        let selected = self.selected_track().map(|t| t.instrument);
        while let Ok(trigger) = self.triggers.pop() {
            if Some(trigger.instrument) == selected {
                self.flashes.push((trigger.pitch, now));
            }
        }
        self.flashes.retain(|(_, at)| now.duration_since(*at) < FLASH);
    }

    fn selected_id(&self) -> Option<TrackId> {
        self.selected_track().map(|t| t.id)
    }

    fn handle_key(&mut self, key: KeyCode) {
        let result = match key {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
                Ok(())
            }
            KeyCode::Char(' ') => self.seq.toggle_playback(),
            KeyCode::Char('r') => self.seq.resync(),

            KeyCode::Up => {
                self.cursor_row = self.cursor_row.saturating_sub(1);
                Ok(())
            }
            KeyCode::Down => {
                self.cursor_row = (self.cursor_row + 1).min(self.seq.project().rows().len().saturating_sub(1));
                Ok(())
            }
            KeyCode::Left => {
                self.cursor_step = self.cursor_step.saturating_sub(1);
                Ok(())
            }
            KeyCode::Right => {
                self.cursor_step = (self.cursor_step + 1).min(self.seq.project().total_steps().saturating_sub(1));
                Ok(())
            }
            KeyCode::Enter | KeyCode::Char('x') => self.with_track(|app, id| {
                app.seq.toggle_cell(id, app.cursor_row, app.cursor_step, None)
            }),
            KeyCode::Char('+') | KeyCode::Char('=') => self.nudge_velocity(VELOCITY_STEP),
            KeyCode::Char('-') => self.nudge_velocity(-VELOCITY_STEP),
            KeyCode::Char('c') => self.with_track(|app, id| app.seq.clear_pattern(id)),

            KeyCode::Tab => {
                let count = self.seq.tracks().len().max(1);
                self.selected = (self.selected + 1) % count;
                Ok(())
            }
            KeyCode::Char('a') => self.seq.add_track().map(|_| {
                self.selected = self.seq.tracks().len().saturating_sub(1);
            }),
            KeyCode::Char('d') => self.with_track(|app, id| {
                app.seq.remove_track(id)?;
                app.selected = app.selected.min(app.seq.tracks().len().saturating_sub(1));
                Ok(())
            }),
            KeyCode::Char('m') => self.with_track(|app, id| {
                let muted = app.selected_track().map_or(false, |t| t.muted);
                app.seq.set_muted(id, !muted)
            }),
            KeyCode::Char('i') => self.with_track(|app, id| {
                let next = app.selected_track().map(|t| t.instrument.next());
                match next {
                    Some(instrument) => app.seq.set_instrument(id, instrument),
                    None => Ok(()),
                }
            }),
            KeyCode::Char(',') => self.nudge_volume(-VOLUME_STEP),
            KeyCode::Char('.') => self.nudge_volume(VOLUME_STEP),

            KeyCode::Char('[') => self.seq.set_tempo(self.seq.project().tempo_bpm() - TEMPO_STEP),
            KeyCode::Char(']') => self.seq.set_tempo(self.seq.project().tempo_bpm() + TEMPO_STEP),
            KeyCode::Char('{') => self.seq.set_swing(self.seq.project().swing_percent() - SWING_STEP),
            KeyCode::Char('}') => self.seq.set_swing(self.seq.project().swing_percent() + SWING_STEP),

            KeyCode::Char('e') => self.seq.export_to_dir(SystemTime::now()).map(|_| ()),
            KeyCode::Char('s') => {
                self.save();
                Ok(())
            }
            _ => Ok(()),
        };

        if let Err(err) = result {
            log::warn!("{err}");
        }
    }

    fn with_track(
        &mut self,
        f: impl FnOnce(&mut Self, TrackId) -> Result<(), SequencerError>,
    ) -> Result<(), SequencerError> {
        match self.selected_id() {
            Some(id) => f(self, id),
            None => Ok(()),
        }
    }

    fn nudge_velocity(&mut self, delta: i16) -> Result<(), SequencerError> {
        self.with_track(|app, id| {
            let Some(cell) = app
                .selected_track()
                .and_then(|t| t.pattern.cell(app.cursor_row, app.cursor_step).ok())
            else {
                return Ok(());
            };
            let display = (velocity_to_display(cell.velocity) as i16 + delta).clamp(10, 127) as u8;
            app.seq
                .set_velocity(id, app.cursor_row, app.cursor_step, velocity_from_display(display))
        })
    }

    fn nudge_volume(&mut self, delta: f32) -> Result<(), SequencerError> {
        self.with_track(|app, id| {
            let volume = app.selected_track().map_or(0.0, |t| t.volume_db);
            app.seq.set_volume_db(id, volume + delta)
        })
    }

    fn save(&self) {
        let Some(path) = &self.project_path else {
            log::warn!("no project path given, nothing saved");
            return;
        };
        if let Err(err) = persistence::save_project(path, self.seq.project()) {
            log::warn!("{err}");
        }
    }
}
