use std::time::Duration;

use agentic_sequencer::io::SmfWriter;
use agentic_sequencer::playback::clock::{ClockEngine, NoteTrigger};
use agentic_sequencer::playback::Transport;
use agentic_sequencer::{Sequencer, SequencerConfig, SequencerError};
use rtrb::Consumer;

type Seq = Sequencer<ClockEngine, SmfWriter>;

/// 16 steps at 120 BPM: one step is 125ms, the loop is 2s
fn setup() -> (Seq, Consumer<NoteTrigger>) {
    let config = SequencerConfig {
        rows: vec!["G4".into(), "E4".into(), "C4".into()],
        steps: 16,
        start_delay_ms: 0,
        ..Default::default()
    };
    let mut seq = Seq::new(&config).unwrap();
    let (engine, rx) = ClockEngine::new();
    seq.attach_audio_engine(Ok(engine));
    (seq, rx)
}

fn drain(rx: &mut Consumer<NoteTrigger>) -> Vec<NoteTrigger> {
    let mut out = Vec::new();
    while let Ok(t) = rx.pop() {
        out.push(t);
    }
    out
}

fn advance(seq: &mut Seq, ms: u64) {
    if let Some(engine) = seq.engine_mut() {
        engine.advance(Duration::from_millis(ms));
    }
}

fn live(seq: &Seq) -> (usize, usize) {
    let engine = seq.engine().ready().unwrap();
    (engine.live_voices(), engine.live_parts())
}

#[test]
fn plays_merged_runs_in_order() {
    let (mut seq, mut rx) = setup();
    let id = seq.tracks()[0].id;
    for step in [0, 1, 2] {
        seq.toggle_cell(id, 2, step, None).unwrap();
    }
    seq.toggle_cell(id, 0, 8, None).unwrap();

    seq.play().unwrap();
    advance(&mut seq, 1100);

    let fired = drain(&mut rx);
    let pitches: Vec<&str> = fired.iter().map(|t| t.pitch.as_str()).collect();
    assert_eq!(pitches, vec!["C4", "G4"]);
    assert_eq!(fired[0].duration, Duration::from_millis(375));
    assert_eq!(fired[0].volume_db, -8.0);
}

#[test]
fn stop_releases_every_voice_and_part() {
    let (mut seq, mut rx) = setup();
    let a = seq.tracks()[0].id;
    let b = seq.add_track().unwrap();
    seq.toggle_cell(a, 0, 0, None).unwrap();
    seq.toggle_cell(b, 1, 4, None).unwrap();

    seq.play().unwrap();
    assert_eq!(live(&seq), (2, 2));

    seq.stop();
    assert_eq!(live(&seq), (0, 0));
    advance(&mut seq, 3000);
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn repeated_restarts_do_not_leak() {
    let (mut seq, _rx) = setup();
    let id = seq.tracks()[0].id;
    seq.toggle_cell(id, 0, 0, None).unwrap();

    for _ in 0..5 {
        seq.play().unwrap();
        seq.set_tempo(140.0).unwrap();
        seq.set_swing(20.0).unwrap();
    }
    assert_eq!(live(&seq), (1, 1));
}

#[test]
fn grid_edits_apply_on_resync() {
    let (mut seq, mut rx) = setup();
    let id = seq.tracks()[0].id;
    seq.toggle_cell(id, 2, 0, None).unwrap();
    seq.play().unwrap();

    // Added while playing: not heard until resync
    seq.toggle_cell(id, 1, 4, None).unwrap();
    assert!(seq.is_out_of_sync());
    advance(&mut seq, 2000);
    let pitches: Vec<String> = drain(&mut rx).into_iter().map(|t| t.pitch).collect();
    assert_eq!(pitches, vec!["C4"]);

    seq.resync().unwrap();
    assert!(!seq.is_out_of_sync());
    advance(&mut seq, 2000);
    let pitches: Vec<String> = drain(&mut rx).into_iter().map(|t| t.pitch).collect();
    assert_eq!(pitches, vec!["C4", "E4"]);
}

#[test]
fn reschedule_keeps_the_loop_position() {
    let (mut seq, _rx) = setup();
    let id = seq.tracks()[0].id;
    seq.toggle_cell(id, 0, 0, None).unwrap();
    seq.play().unwrap();
    advance(&mut seq, 500);

    seq.set_volume_db(id, -3.0).unwrap();
    let position = seq.engine().ready().unwrap().clock_transport().position_steps();
    assert!((position - 4.0).abs() < 1e-9);
}

#[test]
fn muted_tracks_stay_silent() {
    let (mut seq, mut rx) = setup();
    let id = seq.tracks()[0].id;
    seq.toggle_cell(id, 0, 0, None).unwrap();
    seq.set_muted(id, true).unwrap();

    seq.play().unwrap();
    assert_eq!(live(&seq), (0, 0));
    advance(&mut seq, 1000);
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn play_without_engine_is_reported() {
    let mut seq = Seq::new(&SequencerConfig::default()).unwrap();
    assert!(matches!(seq.play(), Err(SequencerError::AudioEngineUnavailable)));
    assert!(!seq.is_playing());
}
