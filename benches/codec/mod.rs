//! Benchmarks for extraction and encoding.

mod encode;
mod extract;

pub use encode::bench_encode;
pub use extract::bench_extract;

use agentic_sequencer::sequencing::{notes::default_rows, Pattern};

/// Default 13-row grid with every third cell on, plus a few long runs
pub fn busy_pattern(steps: usize) -> Pattern {
    let mut pattern = Pattern::new(default_rows(), steps).unwrap();
    for row in 0..pattern.rows() {
        for step in (row % 3..steps).step_by(3) {
            pattern = pattern.toggle_cell(row, step, Some(true)).unwrap();
        }
    }
    for step in 0..steps / 2 {
        pattern = pattern.toggle_cell(0, step, Some(true)).unwrap();
    }
    pattern
}
