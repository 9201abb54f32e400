//! Benchmarks for the playback and MIDI encoders.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use agentic_sequencer::io::midi::{write_file, EncodedTrack, MidiEncoder};
use agentic_sequencer::io::SmfWriter;
use agentic_sequencer::playback::PlaybackEncoder;
use agentic_sequencer::project::InstrumentId;
use agentic_sequencer::sequencing::{extract_events, EventEncoder};

use super::busy_pattern;
use crate::STEP_COUNTS;

pub fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec/encode");

    for &steps in STEP_COUNTS {
        let events = extract_events(&busy_pattern(steps));

        let playback = PlaybackEncoder::new(120.0);
        group.bench_with_input(BenchmarkId::new("playback", steps), &steps, |b, _| {
            b.iter(|| playback.encode(black_box(&events)))
        });

        group.bench_with_input(BenchmarkId::new("midi", steps), &steps, |b, _| {
            b.iter(|| MidiEncoder.encode(black_box(&events)))
        });

        // Eight tracks through the SMF writer, as an export would
        let tracks: Vec<EncodedTrack> = (0..8)
            .map(|i| EncodedTrack::new(format!("Track {}", i + 1), InstrumentId::nth_default(i), i as u8, &events))
            .collect();
        group.bench_with_input(BenchmarkId::new("smf_file", steps), &steps, |b, _| {
            b.iter(|| write_file(&SmfWriter, 120.0, black_box(&tracks)).unwrap())
        });
    }

    group.finish();
}
