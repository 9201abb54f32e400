/*
Pattern Store
=============

A pattern is the editable grid behind one track: one row per pitch, a fixed
number of steps per row (whole bars of 16 sixteenth-note steps).

    step:   0 1 2 3 4 5 6 7 ...
    C5      . . . . x . . . ...
    B4      . . x x x . . x ...
    ...
    C4      x . . . x . . . ...

Patterns are immutable values. Every edit returns a new `Pattern` that
shares nothing mutable with its predecessor, so:
- the event extractor can read a pattern without locking or copying
- the playback side can detect "pattern changed since last schedule" with
  a cheap identity check (`same_version`) instead of a deep comparison

Cells are stored row-major in one shared slice.
*/

use std::sync::Arc;

use thiserror::Error;

use super::time::{loop_length_bars, STEPS_PER_BAR};

/// Velocity of every freshly created or cleared cell
pub const DEFAULT_VELOCITY: f32 = 0.8;

/// Smallest velocity a cell can hold (one MIDI velocity unit)
pub const MIN_VELOCITY: f32 = 1.0 / 127.0;

/// Lowest value the velocity slider shows (on the 0-127 display scale)
pub const MIN_DISPLAY_VELOCITY: u8 = 10;

/// A single (row, step) slot of the grid
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub active: bool,
    /// Attack velocity in (0, 1]
    pub velocity: f32,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            active: false,
            velocity: DEFAULT_VELOCITY,
        }
    }
}

/// Errors produced by pattern construction and edits
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PatternError {
    #[error("row {row} is out of range (pattern has {rows} rows)")]
    RowOutOfRange { row: usize, rows: usize },
    #[error("step {step} is out of range (pattern has {steps} steps)")]
    StepOutOfRange { step: usize, steps: usize },
    #[error("step count must be a positive multiple of 16, got {0}")]
    InvalidStepCount(usize),
    #[error("a pattern needs at least one row")]
    NoRows,
    #[error("velocity must be a finite number, got {0}")]
    InvalidVelocity(f32),
    #[error("expected {expected} cells, found {found}")]
    CellCount { expected: usize, found: usize },
}

/// Immutable pitch × step grid
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "RawPattern")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    /// Pitch label of each row, in row order
    pitches: Arc<[String]>,
    /// Steps per row
    steps: usize,
    /// Row-major cells, `pitches.len() * steps` long
    cells: Arc<[Cell]>,
}

impl Pattern {
    /// Create an empty pattern: every cell inactive at the default velocity
    pub fn new<I, S>(pitches: I, steps: usize) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pitches: Arc<[String]> = pitches.into_iter().map(Into::into).collect();
        if pitches.is_empty() {
            return Err(PatternError::NoRows);
        }
        if steps == 0 || steps % STEPS_PER_BAR != 0 {
            return Err(PatternError::InvalidStepCount(steps));
        }

        let cells = vec![Cell::default(); pitches.len() * steps].into();
        Ok(Self {
            pitches,
            steps,
            cells,
        })
    }

    /// Number of pitch rows
    pub fn rows(&self) -> usize {
        self.pitches.len()
    }

    /// Number of steps per row
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Pitch labels, one per row
    pub fn pitches(&self) -> &[String] {
        &self.pitches
    }

    /// Pitch label of a row
    pub fn pitch(&self, row: usize) -> Option<&str> {
        self.pitches.get(row).map(String::as_str)
    }

    /// Loop length of this pattern in whole bars
    pub fn loop_length_bars(&self) -> usize {
        loop_length_bars(self.steps)
    }

    /// All cells of one row, in step order
    pub fn row(&self, row: usize) -> Option<&[Cell]> {
        if row >= self.rows() {
            return None;
        }
        let start = row * self.steps;
        Some(&self.cells[start..start + self.steps])
    }

    /// Read a single cell, rejecting out-of-range coordinates
    pub fn cell(&self, row: usize, step: usize) -> Result<Cell, PatternError> {
        let index = self.index(row, step)?;
        Ok(self.cells[index])
    }

    /// Number of active cells across all rows
    pub fn active_count(&self) -> usize {
        self.cells.iter().filter(|c| c.active).count()
    }

    /// True when no cell is active
    pub fn is_silent(&self) -> bool {
        !self.cells.iter().any(|c| c.active)
    }

    /// Set `active` to `forced` if given, otherwise flip it.
    ///
    /// Velocity is left as it was, so re-enabling a cell restores its
    /// previous velocity.
    pub fn toggle_cell(
        &self,
        row: usize,
        step: usize,
        forced: Option<bool>,
    ) -> Result<Pattern, PatternError> {
        let index = self.index(row, step)?;
        Ok(self.with_cell(index, |cell| {
            cell.active = forced.unwrap_or(!cell.active);
        }))
    }

    /// Set the velocity of a cell without touching its `active` flag.
    ///
    /// Finite values are clamped into `[MIN_VELOCITY, 1.0]`.
    pub fn set_velocity(&self, row: usize, step: usize, value: f32) -> Result<Pattern, PatternError> {
        let index = self.index(row, step)?;
        let velocity = clamp_velocity(value)?;
        Ok(self.with_cell(index, |cell| cell.velocity = velocity))
    }

    /// A fresh empty pattern with the same rows and step count.
    ///
    /// `self` is not modified.
    pub fn cleared(&self) -> Pattern {
        Self {
            pitches: Arc::clone(&self.pitches),
            steps: self.steps,
            cells: vec![Cell::default(); self.cells.len()].into(),
        }
    }

    /// True when both values are the same version (no edit happened between them)
    pub fn same_version(&self, other: &Pattern) -> bool {
        Arc::ptr_eq(&self.cells, &other.cells) && Arc::ptr_eq(&self.pitches, &other.pitches)
    }

    fn index(&self, row: usize, step: usize) -> Result<usize, PatternError> {
        if row >= self.rows() {
            return Err(PatternError::RowOutOfRange {
                row,
                rows: self.rows(),
            });
        }
        if step >= self.steps {
            return Err(PatternError::StepOutOfRange {
                step,
                steps: self.steps,
            });
        }
        Ok(row * self.steps + step)
    }

    /// Copy-on-write: clone the cell slice, edit one cell, wrap as a new version
    fn with_cell(&self, index: usize, edit: impl FnOnce(&mut Cell)) -> Pattern {
        let mut cells = self.cells.to_vec();
        edit(&mut cells[index]);
        Self {
            pitches: Arc::clone(&self.pitches),
            steps: self.steps,
            cells: cells.into(),
        }
    }
}

/// Unvalidated on-disk shape of a pattern
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawPattern {
    pitches: Vec<String>,
    steps: usize,
    cells: Vec<Cell>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawPattern> for Pattern {
    type Error = PatternError;

    fn try_from(raw: RawPattern) -> Result<Self, Self::Error> {
        let empty = Pattern::new(raw.pitches, raw.steps)?;
        let expected = empty.cells.len();
        if raw.cells.len() != expected {
            return Err(PatternError::CellCount {
                expected,
                found: raw.cells.len(),
            });
        }
        let cells = raw
            .cells
            .into_iter()
            .map(|cell| {
                Ok(Cell {
                    active: cell.active,
                    velocity: clamp_velocity(cell.velocity)?,
                })
            })
            .collect::<Result<Vec<_>, PatternError>>()?;
        Ok(Self {
            cells: cells.into(),
            ..empty
        })
    }
}

fn clamp_velocity(value: f32) -> Result<f32, PatternError> {
    if !value.is_finite() {
        return Err(PatternError::InvalidVelocity(value));
    }
    Ok(value.clamp(MIN_VELOCITY, 1.0))
}

/// Map the velocity slider (10-127) onto the internal (0, 1] scale
pub fn velocity_from_display(display: u8) -> f32 {
    display.clamp(MIN_DISPLAY_VELOCITY, 127) as f32 / 127.0
}

/// Map an internal velocity onto the velocity slider (10-127)
pub fn velocity_to_display(velocity: f32) -> u8 {
    let scaled = (velocity * 127.0).round();
    (scaled.clamp(MIN_DISPLAY_VELOCITY as f32, 127.0)) as u8
}
