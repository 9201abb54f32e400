use super::pattern::Pattern;

/// One sustained note compiled from a run of active cells.
///
/// Events are value snapshots: they hold no reference back into the
/// pattern they were extracted from.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SequencerEvent {
    /// First step of the run
    pub start_step: usize,
    /// Number of cells merged into this event (always >= 1)
    pub duration_steps: usize,
    /// Pitch label of the row ("C4", "F#3", ...)
    pub pitch: String,
    /// Velocity of the run's first cell, in (0, 1]
    pub velocity: f32,
}

impl SequencerEvent {
    /// Step just past the end of the run
    pub fn end_step(&self) -> usize {
        self.start_step + self.duration_steps
    }
}

/// A projection of the canonical event list into some time domain.
///
/// Both the live playback encoder and the MIDI encoder implement this; neither
/// ever sees the pattern grid.
pub trait EventEncoder {
    type Output;

    fn encode(&self, events: &[SequencerEvent]) -> Self::Output;
}

/// Compile a pattern into its canonical, ordered event list.
///
/// Rows are scanned independently, left to right. Each maximal run of
/// contiguous active cells becomes one event; the run's velocity is the
/// velocity of its first cell (later cells in the run are ignored). Output
/// is row 0's events first, then row 1's, and so on, each row in increasing
/// `start_step` order.
pub fn extract_events(pattern: &Pattern) -> Vec<SequencerEvent> {
    let mut events = Vec::new();

    for (row, pitch) in pattern.pitches().iter().enumerate() {
        let Some(cells) = pattern.row(row) else {
            continue;
        };

        let mut step = 0;
        while step < cells.len() {
            if !cells[step].active {
                step += 1;
                continue;
            }

            let start = step;
            while step < cells.len() && cells[step].active {
                step += 1;
            }

            events.push(SequencerEvent {
                start_step: start,
                duration_steps: step - start,
                pitch: pitch.clone(),
                velocity: cells[start].velocity,
            });
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern_with(active: &[(usize, usize)]) -> Pattern {
        let mut p = Pattern::new(["C5", "B4", "A#4"], 16).unwrap();
        for &(row, step) in active {
            p = p.toggle_cell(row, step, Some(true)).unwrap();
        }
        p
    }

    #[test]
    fn empty_pattern_has_no_events() {
        let p = pattern_with(&[]);
        assert!(extract_events(&p).is_empty());
    }

    #[test]
    fn contiguous_cells_merge_into_runs() {
        let p = pattern_with(&[(1, 2), (1, 3), (1, 4), (1, 7)]);
        let events = extract_events(&p);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].start_step, 2);
        assert_eq!(events[0].duration_steps, 3);
        assert_eq!(events[0].pitch, "B4");
        assert_eq!(events[1].start_step, 7);
        assert_eq!(events[1].duration_steps, 1);
        assert_eq!(events[1].end_step(), 8);
    }

    #[test]
    fn run_velocity_comes_from_first_cell() {
        let p = pattern_with(&[(0, 4), (0, 5), (0, 6)])
            .set_velocity(0, 4, 0.25)
            .unwrap()
            .set_velocity(0, 5, 1.0)
            .unwrap()
            .set_velocity(0, 6, 0.5)
            .unwrap();

        let events = extract_events(&p);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].velocity, 0.25);
    }

    #[test]
    fn rows_emit_in_row_order() {
        let p = pattern_with(&[(2, 0), (0, 9), (1, 5), (0, 1)]);
        let events = extract_events(&p);

        let summary: Vec<(&str, usize)> = events
            .iter()
            .map(|e| (e.pitch.as_str(), e.start_step))
            .collect();
        assert_eq!(summary, vec![("C5", 1), ("C5", 9), ("B4", 5), ("A#4", 0)]);
    }

    #[test]
    fn run_reaching_last_step_is_closed() {
        let p = pattern_with(&[(0, 14), (0, 15)]);
        let events = extract_events(&p);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start_step, 14);
        assert_eq!(events[0].duration_steps, 2);
    }

    #[test]
    fn full_row_is_one_event() {
        let all: Vec<_> = (0..16).map(|s| (0, s)).collect();
        let events = extract_events(&pattern_with(&all));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].duration_steps, 16);
    }

    #[test]
    fn extraction_is_repeatable() {
        let p = pattern_with(&[(0, 0), (0, 1), (2, 8), (1, 15)]);
        assert_eq!(extract_events(&p), extract_events(&p));
    }
}
