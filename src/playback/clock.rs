//! ClockEngine - a silent, cooperative reference engine
//!
//! Implements the engine boundary without producing audio: the host drives
//! the clock by calling [`ClockEngine::advance`] with elapsed wall time, due
//! part callbacks fire in schedule order, and every voice trigger is pushed
//! into a lock-free ring buffer for a UI (or a test) to drain.
//!
//! Swing model: with an eighth-note subdivision, notes on the off-beat eighth
//! (step 2 of each beat) are delayed by `amount` steps; with a sixteenth-note
//! subdivision, odd steps are delayed by `amount / 2` steps.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rtrb::{Consumer, Producer, RingBuffer};

use super::engine::{AudioEngine, EngineError, NoteCallback, Part, Subdivision, Transport, Voice};
use super::ScheduledNote;
use crate::project::InstrumentId;
use crate::sequencing::time::{sixteenth_duration, STEPS_PER_BAR, STEPS_PER_BEAT};

/// Capacity of the trigger ring buffer
pub const TRIGGER_CAPACITY: usize = 1024;

/// A note a voice was asked to play
#[derive(Debug, Clone, PartialEq)]
pub struct NoteTrigger {
    pub voice: u64,
    pub instrument: InstrumentId,
    pub pitch: String,
    /// Engine time in seconds
    pub time: f64,
    pub duration: Duration,
    pub velocity: f32,
    pub volume_db: f32,
}

#[derive(Debug, Clone)]
pub struct ClockTransport {
    bpm: f64,
    swing: f64,
    subdivision: Subdivision,
    looping: bool,
    loop_bars: u32,
    /// Position in fractional steps
    position: f64,
    /// Start delay still to elapse
    pending_delay: f64,
    started: bool,
}

impl Default for ClockTransport {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            swing: 0.0,
            subdivision: Subdivision::Eighth,
            looping: false,
            loop_bars: 1,
            position: 0.0,
            pending_delay: 0.0,
            started: false,
        }
    }
}

impl ClockTransport {
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn swing(&self) -> f64 {
        self.swing
    }

    pub fn loop_steps(&self) -> Option<f64> {
        (self.looping && self.loop_bars > 0).then(|| (self.loop_bars as usize * STEPS_PER_BAR) as f64)
    }

    /// Where a note on `step` actually lands once swing is applied
    fn swung(&self, step: usize) -> f64 {
        let offset = match self.subdivision {
            Subdivision::Eighth if step % STEPS_PER_BEAT == 2 => self.swing,
            Subdivision::Sixteenth if step % 2 == 1 => self.swing * 0.5,
            _ => 0.0,
        };
        step as f64 + offset
    }
}

impl Transport for ClockTransport {
    fn set_bpm(&mut self, bpm: f64) {
        self.bpm = bpm;
    }

    fn set_swing(&mut self, amount: f64, subdivision: Subdivision) {
        self.swing = amount.clamp(0.0, 1.0);
        self.subdivision = subdivision;
    }

    fn set_loop(&mut self, enabled: bool, length_bars: u32) {
        self.looping = enabled;
        self.loop_bars = length_bars;
    }

    fn position_steps(&self) -> f64 {
        self.position
    }

    fn set_position_steps(&mut self, steps: f64) {
        self.position = match self.loop_steps() {
            Some(len) => steps.rem_euclid(len),
            None => steps.max(0.0),
        };
    }

    fn start(&mut self, delay: Duration) {
        self.started = true;
        self.pending_delay = delay.as_secs_f64();
    }

    fn stop(&mut self) {
        self.started = false;
        self.pending_delay = 0.0;
    }

    fn is_started(&self) -> bool {
        self.started
    }
}

struct PartState {
    notes: Vec<ScheduledNote>,
    loop_steps: usize,
    callback: Option<NoteCallback>,
}

/// Handle returned to the session; disposing it silences the part
struct ClockPart {
    state: Arc<Mutex<PartState>>,
}

impl Part for ClockPart {
    fn dispose(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.callback = None;
            state.notes.clear();
        }
    }
}

struct ClockVoice {
    id: u64,
    instrument: InstrumentId,
    volume_db: Mutex<f32>,
    triggers: Arc<Mutex<Producer<NoteTrigger>>>,
    live: Arc<AtomicUsize>,
    disposed: Mutex<bool>,
}

impl Voice for ClockVoice {
    fn set_volume_db(&self, volume_db: f32) {
        if let Ok(mut v) = self.volume_db.lock() {
            *v = volume_db;
        }
    }

    fn trigger_attack_release(&self, pitch: &str, duration: Duration, time: f64, velocity: f32) {
        if self.disposed.lock().map_or(true, |d| *d) {
            return;
        }
        let volume_db = self.volume_db.lock().map_or(0.0, |v| *v);
        let trigger = NoteTrigger {
            voice: self.id,
            instrument: self.instrument,
            pitch: pitch.to_owned(),
            time,
            duration,
            velocity,
            volume_db,
        };
        if let Ok(mut tx) = self.triggers.lock() {
            // A full ring means nobody is draining; dropping is fine for a silent engine
            let _ = tx.push(trigger);
        }
    }

    fn dispose(&self) {
        if let Ok(mut disposed) = self.disposed.lock() {
            if !*disposed {
                *disposed = true;
                self.live.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }
}

pub struct ClockEngine {
    transport: ClockTransport,
    parts: Vec<Arc<Mutex<PartState>>>,
    triggers: Arc<Mutex<Producer<NoteTrigger>>>,
    live_voices: Arc<AtomicUsize>,
    next_voice: AtomicU64,
    /// Seconds the clock has run since creation
    now: f64,
}

impl ClockEngine {
    /// Create an engine and the consumer end of its trigger ring
    pub fn new() -> (Self, Consumer<NoteTrigger>) {
        let (tx, rx) = RingBuffer::new(TRIGGER_CAPACITY);
        let engine = Self {
            transport: ClockTransport::default(),
            parts: Vec::new(),
            triggers: Arc::new(Mutex::new(tx)),
            live_voices: Arc::new(AtomicUsize::new(0)),
            next_voice: AtomicU64::new(0),
            now: 0.0,
        };
        (engine, rx)
    }

    pub fn clock_transport(&self) -> &ClockTransport {
        &self.transport
    }

    /// Voices created and not yet disposed
    pub fn live_voices(&self) -> usize {
        self.live_voices.load(Ordering::SeqCst)
    }

    /// Parts that can still fire
    pub fn live_parts(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| p.lock().map_or(false, |s| s.callback.is_some()))
            .count()
    }

    /// Engine time in seconds
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Move the clock forward by `elapsed`, firing every note that falls
    /// inside the covered window.
    pub fn advance(&mut self, elapsed: Duration) {
        self.parts
            .retain(|p| p.lock().map_or(false, |s| s.callback.is_some()));

        let mut remaining = elapsed.as_secs_f64();
        if !self.transport.started {
            self.now += remaining;
            return;
        }

        if self.transport.pending_delay > 0.0 {
            let wait = self.transport.pending_delay.min(remaining);
            self.transport.pending_delay -= wait;
            self.now += wait;
            remaining -= wait;
            if remaining <= 0.0 {
                return;
            }
        }

        let step_secs = sixteenth_duration(self.transport.bpm).as_secs_f64();
        let mut from = self.transport.position;
        let mut steps_left = remaining / step_secs;
        let window_start = self.now;
        let mut covered = 0.0;

        loop {
            let to = match self.transport.loop_steps() {
                Some(len) => (from + steps_left).min(len),
                None => from + steps_left,
            };
            self.fire(from, to, window_start + covered * step_secs - from * step_secs);
            covered += to - from;
            steps_left -= to - from;

            match self.transport.loop_steps() {
                Some(len) if to >= len && steps_left > 0.0 => from = 0.0,
                Some(len) if to >= len => {
                    from = 0.0;
                    break;
                }
                _ => {
                    from = to;
                    break;
                }
            }
        }

        self.transport.position = from;
        self.now += remaining;
    }

    /// Fire notes whose swung step lies in `[from, to)`, earliest first.
    ///
    /// `origin` is the engine time of step 0 for this pass.
    fn fire(&self, from: f64, to: f64, origin: f64) {
        let step_secs = sixteenth_duration(self.transport.bpm).as_secs_f64();

        // (swung step, part, note)
        let mut due: Vec<(f64, usize, usize)> = Vec::new();
        for (p, part) in self.parts.iter().enumerate() {
            let Ok(state) = part.lock() else {
                continue;
            };
            if state.callback.is_none() {
                continue;
            }
            for (n, note) in state.notes.iter().enumerate() {
                let step = note.time.to_step();
                if step >= state.loop_steps {
                    continue;
                }
                let at = self.transport.swung(step);
                if at >= from && at < to {
                    due.push((at, p, n));
                }
            }
        }
        due.sort_by(|a, b| a.0.total_cmp(&b.0));

        for (at, p, n) in due {
            let Ok(mut state) = self.parts[p].lock() else {
                continue;
            };
            let PartState { notes, callback, .. } = &mut *state;
            if let (Some(callback), Some(note)) = (callback.as_mut(), notes.get(n)) {
                callback(origin + at * step_secs, note);
            }
        }
    }
}

impl AudioEngine for ClockEngine {
    fn transport(&mut self) -> &mut dyn Transport {
        &mut self.transport
    }

    fn create_voice(&mut self, instrument: InstrumentId) -> Result<Arc<dyn Voice>, EngineError> {
        self.live_voices.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(ClockVoice {
            id: self.next_voice.fetch_add(1, Ordering::SeqCst),
            instrument,
            volume_db: Mutex::new(0.0),
            triggers: Arc::clone(&self.triggers),
            live: Arc::clone(&self.live_voices),
            disposed: Mutex::new(false),
        }))
    }

    fn create_part(
        &mut self,
        notes: Vec<ScheduledNote>,
        loop_bars: u32,
        callback: NoteCallback,
    ) -> Result<Box<dyn Part>, EngineError> {
        if loop_bars == 0 {
            return Err(EngineError::Part("loop length must be at least one bar".into()));
        }
        let state = Arc::new(Mutex::new(PartState {
            notes,
            loop_steps: loop_bars as usize * STEPS_PER_BAR,
            callback: Some(callback),
        }));
        self.parts.push(Arc::clone(&state));
        Ok(Box::new(ClockPart { state }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencing::TransportTime;

    fn note(step: usize, pitch: &str) -> ScheduledNote {
        ScheduledNote {
            time: TransportTime::from_step(step),
            duration: Duration::from_millis(125),
            pitch: pitch.into(),
            velocity: 0.8,
        }
    }

    fn drain(rx: &mut Consumer<NoteTrigger>) -> Vec<NoteTrigger> {
        let mut out = Vec::new();
        while let Ok(t) = rx.pop() {
            out.push(t);
        }
        out
    }

    fn voiced_part(engine: &mut ClockEngine, notes: Vec<ScheduledNote>, loop_bars: u32) -> (Arc<dyn Voice>, Box<dyn Part>) {
        let voice = engine.create_voice(InstrumentId::Lead).unwrap();
        let cb_voice = Arc::clone(&voice);
        let part = engine
            .create_part(
                notes,
                loop_bars,
                Box::new(move |time, n: &ScheduledNote| {
                    cb_voice.trigger_attack_release(&n.pitch, n.duration, time, n.velocity)
                }),
            )
            .unwrap();
        (voice, part)
    }

    #[test]
    fn nothing_fires_before_start() {
        let (mut engine, mut rx) = ClockEngine::new();
        let _keep = voiced_part(&mut engine, vec![note(0, "C4")], 1);
        engine.advance(Duration::from_secs(1));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn fires_in_order_after_start_delay() {
        let (mut engine, mut rx) = ClockEngine::new();
        let _keep = voiced_part(&mut engine, vec![note(0, "C4"), note(4, "E4"), note(8, "G4")], 1);

        engine.transport().set_bpm(120.0);
        engine.transport().set_loop(true, 1);
        engine.transport().start(Duration::from_millis(50));

        // Inside the settle delay
        engine.advance(Duration::from_millis(40));
        assert!(drain(&mut rx).is_empty());

        // 10ms of delay left, then 0.6s = 4.8 steps: fires steps 0 and 4
        engine.advance(Duration::from_millis(610));
        let fired: Vec<String> = drain(&mut rx).into_iter().map(|t| t.pitch).collect();
        assert_eq!(fired, vec!["C4", "E4"]);
        assert!((engine.clock_transport().position_steps() - 4.8).abs() < 1e-9);
    }

    #[test]
    fn fires_by_time_not_list_order() {
        let (mut engine, mut rx) = ClockEngine::new();
        // Extraction order is row order, so later steps can come first
        let _keep = voiced_part(&mut engine, vec![note(8, "G4"), note(0, "C4")], 1);
        engine.transport().set_loop(true, 1);
        engine.transport().start(Duration::ZERO);

        engine.advance(Duration::from_millis(1100));
        let fired: Vec<String> = drain(&mut rx).into_iter().map(|t| t.pitch).collect();
        assert_eq!(fired, vec!["C4", "G4"]);
    }

    #[test]
    fn loops_back_to_the_top() {
        let (mut engine, mut rx) = ClockEngine::new();
        let _keep = voiced_part(&mut engine, vec![note(0, "C4"), note(12, "A4")], 1);
        engine.transport().set_loop(true, 1);
        engine.transport().start(Duration::ZERO);

        // 120 BPM, 16 steps = 2s; run 2.25s -> C4, A4, C4 again
        engine.advance(Duration::from_millis(2250));
        let fired: Vec<String> = drain(&mut rx).into_iter().map(|t| t.pitch).collect();
        assert_eq!(fired, vec!["C4", "A4", "C4"]);
        assert!((engine.clock_transport().position_steps() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn swing_delays_offbeat_eighths() {
        let (mut engine, mut rx) = ClockEngine::new();
        let _keep = voiced_part(&mut engine, vec![note(2, "D4")], 1);
        engine.transport().set_loop(true, 1);
        engine.transport().set_swing(0.5, Subdivision::Eighth);
        engine.transport().start(Duration::ZERO);

        // 2.4 steps: unswung would have fired at step 2
        engine.advance(Duration::from_millis(300));
        assert!(drain(&mut rx).is_empty());

        engine.advance(Duration::from_millis(100));
        let fired = drain(&mut rx);
        assert_eq!(fired.len(), 1);
        assert!((fired[0].time - 2.5 * 0.125).abs() < 1e-9);
    }

    #[test]
    fn disposed_parts_and_voices_go_quiet() {
        let (mut engine, mut rx) = ClockEngine::new();
        let (voice, mut part) = voiced_part(&mut engine, vec![note(0, "C4")], 1);
        assert_eq!(engine.live_voices(), 1);
        assert_eq!(engine.live_parts(), 1);

        part.dispose();
        voice.dispose();
        voice.dispose();
        assert_eq!(engine.live_voices(), 0);
        assert_eq!(engine.live_parts(), 0);

        engine.transport().set_loop(true, 1);
        engine.transport().start(Duration::ZERO);
        engine.advance(Duration::from_secs(1));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn triggers_carry_voice_volume() {
        let (mut engine, mut rx) = ClockEngine::new();
        let (voice, _part) = voiced_part(&mut engine, vec![note(0, "C4")], 1);
        voice.set_volume_db(-8.0);
        engine.transport().set_loop(true, 1);
        engine.transport().start(Duration::ZERO);
        engine.advance(Duration::from_millis(10));

        let fired = drain(&mut rx);
        assert_eq!(fired[0].volume_db, -8.0);
        assert_eq!(fired[0].instrument, InstrumentId::Lead);
    }

    #[test]
    fn zero_tempo_runs_at_the_fallback_rate() {
        let (mut engine, mut rx) = ClockEngine::new();
        let _keep = voiced_part(&mut engine, vec![note(0, "C4"), note(4, "E4")], 1);
        engine.transport().set_bpm(0.0);
        engine.transport().set_loop(true, 1);
        engine.transport().start(Duration::ZERO);

        engine.advance(Duration::from_millis(600));
        let fired: Vec<String> = drain(&mut rx).into_iter().map(|t| t.pitch).collect();
        assert_eq!(fired, vec!["C4", "E4"]);
    }

    #[test]
    fn zero_bar_part_is_rejected() {
        let (mut engine, _rx) = ClockEngine::new();
        let result = engine.create_part(vec![], 0, Box::new(|_: f64, _: &ScheduledNote| {}));
        assert!(matches!(result, Err(EngineError::Part(_))));
    }
}
